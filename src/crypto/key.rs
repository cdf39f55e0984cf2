//! Fixed-capacity key buffers that wipe themselves on drop.

use std::fmt;

use zeroize::Zeroize;

use crate::error::ConfigError;

/// Capacity of a [`KeyBytes`] buffer.
///
/// Large enough for AES-256 keys and HMAC keys up to one SHA-1 / Skein-512
/// block.
pub const MAX_KEY_LEN: usize = 64;

/// Owned key material of up to [`MAX_KEY_LEN`] bytes, zeroed on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyBytes {
    bytes: [u8; MAX_KEY_LEN],
    len: usize,
}

impl KeyBytes {
    pub fn new(key: &[u8]) -> Result<Self, ConfigError> {
        if key.len() > MAX_KEY_LEN {
            return Err(ConfigError::KeyTooLong(key.len()));
        }
        let mut bytes = [0u8; MAX_KEY_LEN];
        bytes[..key.len()].copy_from_slice(key);
        Ok(Self {
            bytes,
            len: key.len(),
        })
    }

    /// All-zero key of `len` bytes, used as an output buffer for derivation.
    pub fn zeroed(len: usize) -> Result<Self, ConfigError> {
        if len > MAX_KEY_LEN {
            return Err(ConfigError::KeyTooLong(len));
        }
        Ok(Self {
            bytes: [0u8; MAX_KEY_LEN],
            len,
        })
    }

    pub fn empty() -> Self {
        Self {
            bytes: [0u8; MAX_KEY_LEN],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes[..self.len]
    }
}

impl Zeroize for KeyBytes {
    fn zeroize(&mut self) {
        self.bytes.zeroize();
        self.len = 0;
    }
}

impl Drop for KeyBytes {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl fmt::Debug for KeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyBytes([redacted; {}])", self.len)
    }
}
