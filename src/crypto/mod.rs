//! Cryptographic building blocks: AES/Twofish block primitive, counter and F8
//! modes, key derivation and message authentication.

pub mod auth;
pub mod block;
pub mod ctr;
pub mod f8;
pub mod kdf;
pub mod key;

use serde::{Deserialize, Serialize};

pub use auth::{AuthenticationAlgorithm, Authenticator};
pub use block::{BlockCipher, CipherFamily};
pub use ctr::{CounterModeCipher, IV_PREFIX_LEN};
pub use f8::F8ModeCipher;
pub use kdf::KeyDerivation;
pub use key::KeyBytes;

/// Payload encryption transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncryptionAlgorithm {
    #[default]
    Null,
    AesCm,
    AesF8,
    TwofishCm,
    TwofishF8,
}

impl EncryptionAlgorithm {
    /// Block cipher used for the payload and for key derivation.
    pub fn family(self) -> CipherFamily {
        match self {
            Self::TwofishCm | Self::TwofishF8 => CipherFamily::Twofish,
            Self::Null | Self::AesCm | Self::AesF8 => CipherFamily::Aes,
        }
    }

    pub fn is_f8(self) -> bool {
        matches!(self, Self::AesF8 | Self::TwofishF8)
    }
}

/// The keyed payload cipher of a context.
///
/// `Disabled` covers the null algorithm, contexts whose keys were never
/// derived and contexts whose configuration was rejected.
#[derive(Debug, Clone, Default)]
pub enum CipherEngine {
    #[default]
    Disabled,
    Counter(CounterModeCipher),
    F8(F8ModeCipher),
}

impl CipherEngine {
    /// Key an engine for `algorithm` with the session key and salt.
    pub fn keyed(
        algorithm: EncryptionAlgorithm,
        session_key: &[u8],
        session_salt: &[u8],
    ) -> Result<Self, crate::error::ConfigError> {
        let family = algorithm.family();
        Ok(match algorithm {
            EncryptionAlgorithm::Null => Self::Disabled,
            EncryptionAlgorithm::AesCm | EncryptionAlgorithm::TwofishCm => {
                Self::Counter(CounterModeCipher::with_family(family, session_key)?)
            }
            EncryptionAlgorithm::AesF8 | EncryptionAlgorithm::TwofishF8 => {
                Self::F8(F8ModeCipher::with_family(family, session_key, session_salt)?)
            }
        })
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }
}
