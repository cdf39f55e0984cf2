//! F8 mode (RFC 3711 §4.1.2) over AES or Twofish.
//!
//! ```text
//! IV'  = E(k_e XOR m, IV)        m = k_s || 0x55 0x55 ...
//! S(-1) = 0
//! S(j) = E(k_e, IV' XOR j XOR S(j-1))
//! C(j) = P(j) XOR S(j)
//! ```
//!
//! Every keystream block depends on the previous one, so a packet is always
//! processed front to back.

use zeroize::Zeroize;

use super::block::{BlockCipher, CipherFamily, BLOCK_SIZE, MAX_CIPHER_KEY_LEN};
use crate::error::ConfigError;

/// Padding byte used to extend the salt to the key length.
const SALT_PAD: u8 = 0x55;

/// F8 keystream generator keyed with a session key and salt.
#[derive(Debug, Clone)]
pub struct F8ModeCipher {
    cipher: BlockCipher,
    masked: BlockCipher,
}

impl F8ModeCipher {
    pub fn new(session_key: &[u8], session_salt: &[u8]) -> Result<Self, ConfigError> {
        Self::with_family(CipherFamily::Aes, session_key, session_salt)
    }

    pub fn with_family(
        family: CipherFamily,
        session_key: &[u8],
        session_salt: &[u8],
    ) -> Result<Self, ConfigError> {
        if session_key.len() > MAX_CIPHER_KEY_LEN {
            return Err(ConfigError::UnsupportedKeyLength(session_key.len()));
        }
        if session_salt.len() > session_key.len() {
            return Err(ConfigError::SaltLongerThanKey {
                salt: session_salt.len(),
                key: session_key.len(),
            });
        }

        let cipher = BlockCipher::with_family(family, session_key)?;

        let mut masked_key = [SALT_PAD; MAX_CIPHER_KEY_LEN];
        masked_key[..session_salt.len()].copy_from_slice(session_salt);
        for (m, k) in masked_key.iter_mut().zip(session_key) {
            *m ^= k;
        }
        let masked = BlockCipher::with_family(family, &masked_key[..session_key.len()]);
        masked_key.zeroize();

        Ok(Self {
            cipher,
            masked: masked?,
        })
    }

    /// Encrypt or decrypt `data` in place for the given 16 byte IV.
    pub fn apply(&self, data: &mut [u8], iv: &[u8; BLOCK_SIZE]) {
        let mut iv_accent = *iv;
        self.masked.encrypt_block(&mut iv_accent);

        let mut s = [0u8; BLOCK_SIZE];
        let mut j: u32 = 0;
        for chunk in data.chunks_mut(BLOCK_SIZE) {
            for (b, v) in s.iter_mut().zip(iv_accent.iter()) {
                *b ^= v;
            }
            for (b, c) in s[12..].iter_mut().zip(j.to_be_bytes()) {
                *b ^= c;
            }
            j = j.wrapping_add(1);
            self.cipher.encrypt_block(&mut s);

            for (d, k) in chunk.iter_mut().zip(s.iter()) {
                *d ^= k;
            }
        }

        iv_accent.zeroize();
        s.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unhex(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    fn rfc3711_b1() -> (F8ModeCipher, [u8; BLOCK_SIZE]) {
        let cipher = F8ModeCipher::new(
            &unhex("234829008467be186c3de14aae72d62c"),
            &unhex("32f2870d"),
        )
        .unwrap();
        let mut iv = [0u8; BLOCK_SIZE];
        iv.copy_from_slice(&unhex("006e5cba50681de55c621599d462564a"));
        (cipher, iv)
    }

    #[test]
    fn test_rfc3711_b1_vector() {
        let (cipher, iv) = rfc3711_b1();
        let mut data = b"pseudorandomness is the next best thing".to_vec();
        cipher.apply(&mut data, &iv);
        assert_eq!(
            data,
            unhex(concat!(
                "019ce7a26e7854014a6366aa95d4eefd",
                "1ad4172a14f9faf455b7f1d4b62bd08f",
                "562c0eef7c4802"
            ))
        );
    }

    #[test]
    fn test_round_trip_all_lengths() {
        let (cipher, iv) = rfc3711_b1();
        for len in 0..=2048usize {
            let plain: Vec<u8> = (0..len).map(|i| (i * 7) as u8).collect();
            let mut data = plain.clone();
            cipher.apply(&mut data, &iv);
            cipher.apply(&mut data, &iv);
            assert_eq!(data, plain, "len={}", len);
        }
    }

    #[test]
    fn test_keystream_is_chained() {
        // Changing the IV changes every block, not just the first.
        let (cipher, iv) = rfc3711_b1();
        let mut other_iv = iv;
        other_iv[15] ^= 1;
        let mut a = vec![0u8; 64];
        let mut b = vec![0u8; 64];
        cipher.apply(&mut a, &iv);
        cipher.apply(&mut b, &other_iv);
        for (x, y) in a.chunks(BLOCK_SIZE).zip(b.chunks(BLOCK_SIZE)) {
            assert_ne!(x, y);
        }
    }

    #[test]
    fn test_twofish_f8_round_trip() {
        let key = unhex("234829008467be186c3de14aae72d62c");
        let salt = unhex("32f2870d");
        let (aes, iv) = rfc3711_b1();
        let twofish = F8ModeCipher::with_family(CipherFamily::Twofish, &key, &salt).unwrap();

        let plain = b"pseudorandomness is the next best thing".to_vec();
        let mut data = plain.clone();
        twofish.apply(&mut data, &iv);
        assert_ne!(data, plain);

        let mut with_aes = plain.clone();
        aes.apply(&mut with_aes, &iv);
        assert_ne!(data, with_aes);

        twofish.apply(&mut data, &iv);
        assert_eq!(data, plain);
    }

    #[test]
    fn test_salt_longer_than_key_rejected() {
        assert_eq!(
            F8ModeCipher::new(&[0u8; 16], &[0u8; 17]).unwrap_err(),
            ConfigError::SaltLongerThanKey { salt: 17, key: 16 }
        );
    }

    #[test]
    fn test_key_longer_than_aes256_rejected() {
        assert_eq!(
            F8ModeCipher::new(&[0u8; 33], &[0u8; 14]).unwrap_err(),
            ConfigError::UnsupportedKeyLength(33)
        );
    }
}
