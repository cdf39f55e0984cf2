//! Single-block cipher primitive shared by the counter and F8 modes.
//!
//! AES is the RFC 3711 default; Twofish is the ZRTP alternative (`2FS`)
//! and runs through the same modes unchanged.

use std::fmt;

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes128, Aes256};
use serde::{Deserialize, Serialize};
use twofish::Twofish;

use crate::error::ConfigError;

/// Block size in bytes, 128 bits for both AES and Twofish.
pub const BLOCK_SIZE: usize = 16;

/// Largest supported cipher key (256 bits).
pub const MAX_CIPHER_KEY_LEN: usize = 32;

/// Block cipher underneath a payload transform and its key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CipherFamily {
    #[default]
    Aes,
    Twofish,
}

/// A block cipher with its key schedule already expanded.
#[derive(Clone)]
pub enum BlockCipher {
    Aes128(Aes128),
    Aes256(Aes256),
    Twofish128(Box<Twofish>),
    Twofish256(Box<Twofish>),
}

impl BlockCipher {
    /// AES keyed with `key`; only 128 and 256 bit keys are accepted.
    pub fn new(key: &[u8]) -> Result<Self, ConfigError> {
        Self::with_family(CipherFamily::Aes, key)
    }

    pub fn with_family(family: CipherFamily, key: &[u8]) -> Result<Self, ConfigError> {
        let rejected = |_| ConfigError::UnsupportedKeyLength(key.len());
        match (family, key.len()) {
            (CipherFamily::Aes, 16) => Aes128::new_from_slice(key).map(Self::Aes128).map_err(rejected),
            (CipherFamily::Aes, 32) => Aes256::new_from_slice(key).map(Self::Aes256).map_err(rejected),
            (CipherFamily::Twofish, 16) => Twofish::new_from_slice(key)
                .map(|tf| Self::Twofish128(Box::new(tf)))
                .map_err(rejected),
            (CipherFamily::Twofish, 32) => Twofish::new_from_slice(key)
                .map(|tf| Self::Twofish256(Box::new(tf)))
                .map_err(rejected),
            (_, n) => Err(ConfigError::UnsupportedKeyLength(n)),
        }
    }

    /// Encrypt one block in place.
    pub fn encrypt_block(&self, block: &mut [u8; BLOCK_SIZE]) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            Self::Aes128(aes) => aes.encrypt_block(block),
            Self::Aes256(aes) => aes.encrypt_block(block),
            Self::Twofish128(tf) | Self::Twofish256(tf) => tf.encrypt_block(block),
        }
    }

    pub fn key_len(&self) -> usize {
        match self {
            Self::Aes128(_) | Self::Twofish128(_) => 16,
            Self::Aes256(_) | Self::Twofish256(_) => 32,
        }
    }

    pub fn family(&self) -> CipherFamily {
        match self {
            Self::Aes128(_) | Self::Aes256(_) => CipherFamily::Aes,
            Self::Twofish128(_) | Self::Twofish256(_) => CipherFamily::Twofish,
        }
    }
}

impl fmt::Debug for BlockCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aes128(_) => f.write_str("BlockCipher::Aes128"),
            Self::Aes256(_) => f.write_str("BlockCipher::Aes256"),
            Self::Twofish128(_) => f.write_str("BlockCipher::Twofish128"),
            Self::Twofish256(_) => f.write_str("BlockCipher::Twofish256"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_aes192_and_odd_lengths() {
        for family in [CipherFamily::Aes, CipherFamily::Twofish] {
            for len in [0usize, 15, 24, 33] {
                let key = vec![0u8; len];
                assert_eq!(
                    BlockCipher::with_family(family, &key).unwrap_err(),
                    ConfigError::UnsupportedKeyLength(len)
                );
            }
        }
    }

    #[test]
    fn test_aes128_fips197_vector() {
        // FIPS-197 appendix C.1
        let key: Vec<u8> = (0u8..16).collect();
        let cipher = BlockCipher::new(&key).unwrap();
        let mut block = [
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd,
            0xee, 0xff,
        ];
        cipher.encrypt_block(&mut block);
        assert_eq!(
            block,
            [
                0x69, 0xc4, 0xe0, 0xd8, 0x6a, 0x7b, 0x04, 0x30, 0xd8, 0xcd, 0xb7, 0x80, 0x70, 0xb4,
                0xc5, 0x5a
            ]
        );
        assert_eq!(cipher.key_len(), 16);
        assert_eq!(cipher.family(), CipherFamily::Aes);
    }

    #[test]
    fn test_aes256_fips197_vector() {
        // FIPS-197 appendix C.3
        let key: Vec<u8> = (0u8..32).collect();
        let cipher = BlockCipher::new(&key).unwrap();
        let mut block = [
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd,
            0xee, 0xff,
        ];
        cipher.encrypt_block(&mut block);
        assert_eq!(
            block,
            [
                0x8e, 0xa2, 0xb7, 0xca, 0x51, 0x67, 0x45, 0xbf, 0xea, 0xfc, 0x49, 0x90, 0x4b, 0x49,
                0x60, 0x89
            ]
        );
    }

    #[test]
    fn test_twofish_zero_key_vectors() {
        // Twofish ECB_TBL, I=1 for 128 and 256 bit keys
        let cipher = BlockCipher::with_family(CipherFamily::Twofish, &[0u8; 16]).unwrap();
        let mut block = [0u8; BLOCK_SIZE];
        cipher.encrypt_block(&mut block);
        assert_eq!(
            block.to_vec(),
            hex::decode("9f589f5cf6122c32b6bfec2f2ae8c35a").unwrap()
        );
        assert_eq!(cipher.family(), CipherFamily::Twofish);

        let cipher = BlockCipher::with_family(CipherFamily::Twofish, &[0u8; 32]).unwrap();
        let mut block = [0u8; BLOCK_SIZE];
        cipher.encrypt_block(&mut block);
        assert_eq!(
            block.to_vec(),
            hex::decode("57ff739d4dc92c1bd7fc01700cc8216f").unwrap()
        );
        assert_eq!(cipher.key_len(), 32);
    }
}
