//! Algorithm selection and key lengths for a crypto context.

use crate::crypto::block::MAX_CIPHER_KEY_LEN;
use crate::crypto::ctr::IV_PREFIX_LEN;
use crate::crypto::kdf::validate_key_derivation_rate;
use crate::crypto::key::MAX_KEY_LEN;
use crate::crypto::{AuthenticationAlgorithm, EncryptionAlgorithm};
use crate::error::ConfigError;

/// Session salt length used by every RFC 3711 profile (112 bits).
pub const SESSION_SALT_LEN: usize = 14;

/// SSRC value marking a template context that is only cloned, never used.
pub const TEMPLATE_SSRC: u32 = 0;

/// Parameters shared by the RTP and RTCP contexts of one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CryptoParams {
    pub encryption: EncryptionAlgorithm,
    pub authentication: AuthenticationAlgorithm,
    /// Session cipher key length (n_e).
    pub cipher_key_len: usize,
    /// Session authentication key length (n_a).
    pub auth_key_len: usize,
    /// Session salt length (n_s).
    pub salt_len: usize,
    pub tag_len: usize,
    /// Power of two; 0 derives keys once.
    pub key_derivation_rate: u64,
}

impl CryptoParams {
    /// No encryption, no authentication.
    pub fn null() -> Self {
        Self {
            encryption: EncryptionAlgorithm::Null,
            authentication: AuthenticationAlgorithm::Null,
            cipher_key_len: 0,
            auth_key_len: 0,
            salt_len: 0,
            tag_len: 0,
            key_derivation_rate: 0,
        }
    }

    pub fn aes_cm_128_hmac_sha1_80() -> Self {
        Self {
            encryption: EncryptionAlgorithm::AesCm,
            authentication: AuthenticationAlgorithm::HmacSha1,
            cipher_key_len: 16,
            auth_key_len: 20,
            salt_len: SESSION_SALT_LEN,
            tag_len: 10,
            key_derivation_rate: 0,
        }
    }

    pub fn aes_cm_128_hmac_sha1_32() -> Self {
        Self {
            tag_len: 4,
            ..Self::aes_cm_128_hmac_sha1_80()
        }
    }

    pub fn aes_cm_256_hmac_sha1_80() -> Self {
        Self {
            cipher_key_len: 32,
            ..Self::aes_cm_128_hmac_sha1_80()
        }
    }

    pub fn aes_f8_128_hmac_sha1_80() -> Self {
        Self {
            encryption: EncryptionAlgorithm::AesF8,
            ..Self::aes_cm_128_hmac_sha1_80()
        }
    }

    /// HMAC over Skein-512 with a 64 bit tag.
    ///
    /// Not interoperable with libzrtp's `SK64`, which uses the native
    /// Skein-MAC construction. Only negotiate it between peers built on this
    /// crate.
    pub fn aes_cm_128_hmac_skein_64() -> Self {
        Self {
            authentication: AuthenticationAlgorithm::HmacSkein,
            auth_key_len: 32,
            tag_len: 8,
            ..Self::aes_cm_128_hmac_sha1_80()
        }
    }

    /// ZRTP `2FS1` cipher with `HS80` authentication.
    pub fn twofish_cm_128_hmac_sha1_80() -> Self {
        Self {
            encryption: EncryptionAlgorithm::TwofishCm,
            ..Self::aes_cm_128_hmac_sha1_80()
        }
    }

    pub fn twofish_cm_128_hmac_sha1_32() -> Self {
        Self {
            tag_len: 4,
            ..Self::twofish_cm_128_hmac_sha1_80()
        }
    }

    /// ZRTP `2FS3` cipher with `HS80` authentication.
    pub fn twofish_cm_256_hmac_sha1_80() -> Self {
        Self {
            cipher_key_len: 32,
            ..Self::twofish_cm_128_hmac_sha1_80()
        }
    }

    pub fn twofish_f8_128_hmac_sha1_80() -> Self {
        Self {
            encryption: EncryptionAlgorithm::TwofishF8,
            ..Self::aes_cm_128_hmac_sha1_80()
        }
    }

    /// Look up a profile by its SDES crypto suite name, e.g.
    /// `AES_CM_128_HMAC_SHA1_80`.
    pub fn from_suite_name(name: &str) -> Option<Self> {
        let params = match name.trim().to_ascii_uppercase().as_str() {
            "NULL" => Self::null(),
            "AES_CM_128_HMAC_SHA1_80" => Self::aes_cm_128_hmac_sha1_80(),
            "AES_CM_128_HMAC_SHA1_32" => Self::aes_cm_128_hmac_sha1_32(),
            "AES_256_CM_HMAC_SHA1_80" | "AES_CM_256_HMAC_SHA1_80" => {
                Self::aes_cm_256_hmac_sha1_80()
            }
            "F8_128_HMAC_SHA1_80" | "AES_F8_128_HMAC_SHA1_80" => Self::aes_f8_128_hmac_sha1_80(),
            "AES_CM_128_HMAC_SKEIN_64" => Self::aes_cm_128_hmac_skein_64(),
            "TWOFISH_CM_128_HMAC_SHA1_80" => Self::twofish_cm_128_hmac_sha1_80(),
            "TWOFISH_CM_128_HMAC_SHA1_32" => Self::twofish_cm_128_hmac_sha1_32(),
            "TWOFISH_CM_256_HMAC_SHA1_80" => Self::twofish_cm_256_hmac_sha1_80(),
            "TWOFISH_F8_128_HMAC_SHA1_80" => Self::twofish_f8_128_hmac_sha1_80(),
            _ => return None,
        };
        Some(params)
    }

    pub fn with_key_derivation_rate(mut self, kdr: u64) -> Self {
        self.key_derivation_rate = kdr;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_key_derivation_rate(self.key_derivation_rate)?;

        if self.encryption != EncryptionAlgorithm::Null {
            if self.cipher_key_len != 16 && self.cipher_key_len != MAX_CIPHER_KEY_LEN {
                return Err(ConfigError::UnsupportedKeyLength(self.cipher_key_len));
            }
            if self.salt_len == 0 || self.salt_len > IV_PREFIX_LEN {
                return Err(ConfigError::SessionSaltLength(self.salt_len));
            }
            if self.encryption.is_f8() && self.salt_len > self.cipher_key_len {
                return Err(ConfigError::SaltLongerThanKey {
                    salt: self.salt_len,
                    key: self.cipher_key_len,
                });
            }
        }

        if self.authentication != AuthenticationAlgorithm::Null {
            if self.auth_key_len == 0 {
                return Err(ConfigError::EmptyAuthKey);
            }
            if self.auth_key_len > MAX_KEY_LEN {
                return Err(ConfigError::KeyTooLong(self.auth_key_len));
            }
            let max = self.authentication.mac_len();
            if self.tag_len > max {
                return Err(ConfigError::TagTooLong {
                    tag: self.tag_len,
                    max,
                });
            }
        }

        Ok(())
    }

    /// Zero the lengths that a null algorithm leaves unused.
    pub(crate) fn normalized(mut self) -> Self {
        if self.encryption == EncryptionAlgorithm::Null {
            self.cipher_key_len = 0;
            self.salt_len = 0;
        }
        if self.authentication == AuthenticationAlgorithm::Null {
            self.auth_key_len = 0;
            self.tag_len = 0;
        }
        self
    }

    pub fn is_null(&self) -> bool {
        self.encryption == EncryptionAlgorithm::Null
            && self.authentication == AuthenticationAlgorithm::Null
    }
}

impl Default for CryptoParams {
    fn default() -> Self {
        Self::aes_cm_128_hmac_sha1_80()
    }
}
