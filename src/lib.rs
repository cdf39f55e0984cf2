//! Per-source SRTP/SRTCP crypto contexts: key derivation, AES and Twofish
//! counter and F8 modes, HMAC authentication, ROC estimation and replay
//! protection.

pub mod config;
pub mod crypto;
pub mod error;
pub mod rtp;
pub mod srtp;

pub use crypto::{AuthenticationAlgorithm, CipherFamily, EncryptionAlgorithm};
pub use error::{ConfigError, SrtpError};
pub use srtp::{CryptoContext, CryptoContextCtrl, CryptoParams, SessionKeys};
