//! SRTP key derivation (RFC 3711 §4.3).
//!
//! The PRF is counter mode keyed with the master key, using the same block
//! cipher as the payload transform (AES, or Twofish for ZRTP `2FS`). The IV is the master
//! salt XORed with `key_id = label || r`, where `r = index DIV kdr`:
//!
//! ```text
//! key_id:                           XX XX XX XX XX XX XX
//! master_salt: XX XX XX XX XX XX XX XX XX XX XX XX XX XX
//! ------------------------------------------------------------ XOR
//! IV:          XX XX XX XX XX XX XX XX XX XX XX XX XX XX 00 00
//! ```

use zeroize::Zeroize;

use super::block::CipherFamily;
use super::ctr::{CounterModeCipher, IV_PREFIX_LEN};
use super::key::KeyBytes;
use crate::error::ConfigError;

/// SRTP key derivation labels (RFC 3711, section 4.3.1).
pub const LABEL_RTP_ENCRYPTION: u8 = 0x00;
pub const LABEL_RTP_AUTH: u8 = 0x01;
pub const LABEL_RTP_SALT: u8 = 0x02;

/// SRTCP key derivation labels (RFC 3711, section 4.3.2).
pub const LABEL_RTCP_ENCRYPTION: u8 = 0x03;
pub const LABEL_RTCP_AUTH: u8 = 0x04;
pub const LABEL_RTCP_SALT: u8 = 0x05;

/// Upper bound for the key derivation rate (RFC 3711 §4.3.1).
pub const MAX_KEY_DERIVATION_RATE: u64 = 1 << 24;

/// Label triple for one direction of key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Labels {
    pub encryption: u8,
    pub auth: u8,
    pub salt: u8,
}

impl Labels {
    pub const RTP: Labels = Labels {
        encryption: LABEL_RTP_ENCRYPTION,
        auth: LABEL_RTP_AUTH,
        salt: LABEL_RTP_SALT,
    };

    pub const RTCP: Labels = Labels {
        encryption: LABEL_RTCP_ENCRYPTION,
        auth: LABEL_RTCP_AUTH,
        salt: LABEL_RTCP_SALT,
    };
}

/// Check that `kdr` is zero or a power of two no larger than 2^24.
pub fn validate_key_derivation_rate(kdr: u64) -> Result<(), ConfigError> {
    if kdr == 0 || (kdr.is_power_of_two() && kdr <= MAX_KEY_DERIVATION_RATE) {
        Ok(())
    } else {
        Err(ConfigError::InvalidKeyDerivationRate(kdr))
    }
}

/// `index DIV kdr`, defined as zero when rekeying is disabled.
pub fn key_derivation_epoch(index: u64, kdr: u64) -> u64 {
    if kdr == 0 {
        0
    } else {
        index / kdr
    }
}

/// Build the PRF IV prefix for `label` at `index`.
pub fn prf_iv(
    master_salt: &[u8; IV_PREFIX_LEN],
    label: u8,
    index: u64,
    kdr: u64,
) -> [u8; IV_PREFIX_LEN] {
    let key_id = ((label as u64) << 48) | (key_derivation_epoch(index, kdr) & 0xFFFF_FFFF_FFFF);

    let mut iv = *master_salt;
    let id_bytes = key_id.to_be_bytes();
    // key_id is 56 bits wide and lands in bytes 7..14
    for (b, id) in iv[7..].iter_mut().zip(&id_bytes[1..]) {
        *b ^= id;
    }
    iv
}

/// The master key and salt, ready to produce session keys.
#[derive(Debug, Clone)]
pub struct KeyDerivation {
    prf: CounterModeCipher,
    master_salt: [u8; IV_PREFIX_LEN],
}

impl KeyDerivation {
    /// `master_salt` shorter than 14 bytes is zero padded on the right.
    pub fn new(master_key: &[u8], master_salt: &[u8]) -> Result<Self, ConfigError> {
        Self::with_family(CipherFamily::Aes, master_key, master_salt)
    }

    pub fn with_family(
        family: CipherFamily,
        master_key: &[u8],
        master_salt: &[u8],
    ) -> Result<Self, ConfigError> {
        if master_salt.len() > IV_PREFIX_LEN {
            return Err(ConfigError::MasterSaltTooLong(master_salt.len()));
        }
        let prf = CounterModeCipher::with_family(family, master_key)?;
        let mut salt = [0u8; IV_PREFIX_LEN];
        salt[..master_salt.len()].copy_from_slice(master_salt);
        Ok(Self {
            prf,
            master_salt: salt,
        })
    }

    /// Derive `out_len` bytes for `label` at packet `index`.
    pub fn derive(
        &self,
        label: u8,
        index: u64,
        kdr: u64,
        out_len: usize,
    ) -> Result<KeyBytes, ConfigError> {
        let mut out = KeyBytes::zeroed(out_len)?;
        let mut iv = prf_iv(&self.master_salt, label, index, kdr);
        self.prf.fill_keystream(&iv, out.as_mut_slice());
        iv.zeroize();
        Ok(out)
    }
}

impl Drop for KeyDerivation {
    fn drop(&mut self) {
        self.master_salt.zeroize();
    }
}
