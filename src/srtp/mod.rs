//! SRTP and SRTCP crypto contexts (RFC 3711).

pub mod context;
pub mod control;
pub mod packet;
pub mod params;
pub mod replay;
mod session;

pub use context::CryptoContext;
pub use control::CryptoContextCtrl;
pub use packet::{protect_rtcp, protect_rtp, unprotect_rtcp, unprotect_rtp};
pub use params::{CryptoParams, SESSION_SALT_LEN, TEMPLATE_SSRC};
pub use replay::{ReplayWindow, REPLAY_WINDOW_SIZE};
pub use session::SessionKeys;
