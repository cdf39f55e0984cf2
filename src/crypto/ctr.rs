//! Counter mode over AES or Twofish (RFC 3711 §4.1.1).
//!
//! The caller supplies the 14 byte IV prefix (salt, SSRC and index already
//! mixed in); the last two bytes of the counter block are the big-endian block
//! number, starting at zero:
//!
//! ```text
//! IV    XX XX XX XX XX XX XX XX XX XX XX XX XX XX 00 00
//!       |------------- caller prefix -----------| |ctr|
//! ```

use aes::cipher::consts::U16;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncryptMut, BlockSizeUser, InnerIvInit, StreamCipher};
use ctr::{flavors, Ctr128BE, CtrCore};
use zeroize::Zeroize;

use super::block::{BlockCipher, CipherFamily, BLOCK_SIZE};
use crate::error::ConfigError;

/// Length of the caller supplied part of the counter block.
pub const IV_PREFIX_LEN: usize = 14;

/// Keystream generator over a [`BlockCipher`].
///
/// Without a key every operation is a no-op, matching the "algorithm
/// disabled" state.
#[derive(Debug, Clone, Default)]
pub struct CounterModeCipher {
    cipher: Option<BlockCipher>,
}

impl CounterModeCipher {
    pub fn new(key: &[u8]) -> Result<Self, ConfigError> {
        Self::with_family(CipherFamily::Aes, key)
    }

    pub fn with_family(family: CipherFamily, key: &[u8]) -> Result<Self, ConfigError> {
        Ok(Self::from_block(BlockCipher::with_family(family, key)?))
    }

    pub fn from_block(cipher: BlockCipher) -> Self {
        Self {
            cipher: Some(cipher),
        }
    }

    /// Re-key the cipher within its family. A rejected key leaves the cipher
    /// unkeyed.
    pub fn set_key(&mut self, key: &[u8]) -> Result<(), ConfigError> {
        let family = self.cipher.as_ref().map_or(CipherFamily::Aes, BlockCipher::family);
        match BlockCipher::with_family(family, key) {
            Ok(cipher) => {
                self.cipher = Some(cipher);
                Ok(())
            }
            Err(e) => {
                self.cipher = None;
                Err(e)
            }
        }
    }

    pub fn is_keyed(&self) -> bool {
        self.cipher.is_some()
    }

    /// XOR the keystream for `iv` into `data`.
    ///
    /// The 16-bit block counter covers 1 MiB, well beyond any RTP datagram.
    pub fn apply(&self, data: &mut [u8], iv: &[u8; IV_PREFIX_LEN]) {
        let Some(cipher) = &self.cipher else {
            return;
        };
        if data.is_empty() {
            return;
        }

        let mut block = [0u8; BLOCK_SIZE];
        block[..IV_PREFIX_LEN].copy_from_slice(iv);

        match cipher {
            BlockCipher::Aes128(aes) => xor_keystream(aes, &block, data),
            BlockCipher::Aes256(aes) => xor_keystream(aes, &block, data),
            BlockCipher::Twofish128(tf) | BlockCipher::Twofish256(tf) => {
                xor_keystream(&**tf, &block, data)
            }
        }
        block.zeroize();
    }

    /// Raw keystream of `len` bytes (encryption of zeros).
    pub fn keystream(&self, iv: &[u8; IV_PREFIX_LEN], len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        self.apply(&mut out, iv);
        out
    }

    /// Fill `out` with keystream, used by key derivation.
    pub(crate) fn fill_keystream(&self, iv: &[u8; IV_PREFIX_LEN], out: &mut [u8]) {
        out.fill(0);
        self.apply(out, iv);
    }
}

fn xor_keystream<C>(cipher: &C, counter: &[u8; BLOCK_SIZE], data: &mut [u8])
where
    C: BlockEncryptMut + aes::cipher::BlockCipher + BlockSizeUser<BlockSize = U16> + Clone,
{
    let core = CtrCore::<C, flavors::Ctr128BE>::inner_iv_init(
        cipher.clone(),
        GenericArray::from_slice(counter),
    );
    Ctr128BE::<C>::from_core(core).apply_keystream(data);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unhex(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    fn rfc3711_b2() -> (CounterModeCipher, [u8; IV_PREFIX_LEN]) {
        let cipher = CounterModeCipher::new(&unhex("2B7E151628AED2A6ABF7158809CF4F3C")).unwrap();
        let mut iv = [0u8; IV_PREFIX_LEN];
        iv.copy_from_slice(&unhex("F0F1F2F3F4F5F6F7F8F9FAFBFCFD"));
        (cipher, iv)
    }

    #[test]
    fn test_rfc3711_b2_keystream() {
        let (cipher, iv) = rfc3711_b2();
        let ks = cipher.keystream(&iv, 48);
        assert_eq!(
            ks,
            unhex(concat!(
                "E03EAD0935C95E80E166B16DD92B4EB4",
                "D23513162B02D0F72A43A2FE4A5F97AB",
                "41E95B3BB0A2E8DD477901E4FCA894C0"
            ))
        );
    }

    #[test]
    fn test_partial_block_is_prefix_of_full_keystream() {
        let (cipher, iv) = rfc3711_b2();
        let full = cipher.keystream(&iv, 1024);
        for len in [1usize, 15, 16, 17, 31, 1023] {
            assert_eq!(cipher.keystream(&iv, len), full[..len], "len={}", len);
        }
    }

    #[test]
    fn test_independent_instances_agree() {
        let key = [0x42u8; 32];
        let iv = [0x17u8; IV_PREFIX_LEN];
        let a = CounterModeCipher::new(&key).unwrap();
        let b = CounterModeCipher::new(&key).unwrap();
        for len in [1usize, 15, 17, 1024] {
            assert_eq!(a.keystream(&iv, len), b.keystream(&iv, len));
        }
    }

    #[test]
    fn test_apply_twice_restores_plaintext() {
        let (cipher, iv) = rfc3711_b2();
        let plain: Vec<u8> = (0..300u32).map(|i| i as u8).collect();
        let mut data = plain.clone();
        cipher.apply(&mut data, &iv);
        assert_ne!(data, plain);
        cipher.apply(&mut data, &iv);
        assert_eq!(data, plain);
    }

    #[test]
    fn test_unkeyed_cipher_is_noop() {
        let cipher = CounterModeCipher::default();
        assert!(!cipher.is_keyed());
        let mut data = vec![1u8, 2, 3];
        cipher.apply(&mut data, &[0u8; IV_PREFIX_LEN]);
        assert_eq!(data, vec![1, 2, 3]);
        assert_eq!(cipher.keystream(&[0u8; IV_PREFIX_LEN], 4), vec![0u8; 4]);
    }

    #[test]
    fn test_twofish_keystream_is_encrypted_counter() {
        let key = [0x24u8; 16];
        let iv = [0x5Au8; IV_PREFIX_LEN];
        let cipher = CounterModeCipher::with_family(CipherFamily::Twofish, &key).unwrap();
        let ks = cipher.keystream(&iv, 40);

        let block = BlockCipher::with_family(CipherFamily::Twofish, &key).unwrap();
        for (j, chunk) in ks.chunks(BLOCK_SIZE).enumerate() {
            let mut counter = [0u8; BLOCK_SIZE];
            counter[..IV_PREFIX_LEN].copy_from_slice(&iv);
            counter[14..].copy_from_slice(&(j as u16).to_be_bytes());
            block.encrypt_block(&mut counter);
            assert_eq!(chunk, &counter[..chunk.len()], "block {}", j);
        }

        let aes = CounterModeCipher::new(&key).unwrap();
        assert_ne!(aes.keystream(&iv, 40), ks);
    }

    #[test]
    fn test_bad_key_unkeys_cipher() {
        let mut cipher = CounterModeCipher::new(&[1u8; 16]).unwrap();
        assert!(cipher.set_key(&[1u8; 20]).is_err());
        assert!(!cipher.is_keyed());
    }
}
