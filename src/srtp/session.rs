//! Session key state shared by the SRTP and SRTCP contexts.

use crate::crypto::block::BLOCK_SIZE;
use crate::crypto::kdf::{key_derivation_epoch, Labels};
use crate::crypto::{
    AuthenticationAlgorithm, Authenticator, CipherEngine, EncryptionAlgorithm, KeyBytes,
    KeyDerivation, IV_PREFIX_LEN,
};
use crate::error::ConfigError;
use crate::rtp::{RTCP_HEADER_SIZE, RTP_HEADER_SIZE};

use super::params::CryptoParams;

/// Session keys derived from the master key for one key derivation epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKeys {
    pub cipher_key: KeyBytes,
    pub auth_key: KeyBytes,
    pub salt: KeyBytes,
}

#[derive(Debug, Clone)]
pub(crate) struct SessionCrypto {
    params: CryptoParams,
    labels: Labels,
    kdf: Option<KeyDerivation>,
    keys: Option<SessionKeys>,
    engine: CipherEngine,
    authenticator: Authenticator,
    epoch: Option<u64>,
}

impl SessionCrypto {
    pub(crate) fn new(
        params: CryptoParams,
        labels: Labels,
        master_key: &[u8],
        master_salt: &[u8],
    ) -> Result<Self, ConfigError> {
        params.validate()?;
        let params = params.normalized();
        let kdf = if params.is_null() {
            None
        } else {
            Some(KeyDerivation::with_family(
                params.encryption.family(),
                master_key,
                master_salt,
            )?)
        };
        Ok(Self {
            params,
            labels,
            kdf,
            keys: None,
            engine: CipherEngine::Disabled,
            authenticator: Authenticator::Null,
            epoch: None,
        })
    }

    pub(crate) fn disabled(labels: Labels) -> Self {
        Self {
            params: CryptoParams::null(),
            labels,
            kdf: None,
            keys: None,
            engine: CipherEngine::Disabled,
            authenticator: Authenticator::Null,
            epoch: None,
        }
    }

    /// Same algorithms and master key, no session keys yet.
    pub(crate) fn fresh_copy(&self, key_derivation_rate: u64) -> Self {
        let mut params = self.params;
        params.key_derivation_rate = key_derivation_rate;
        Self {
            params,
            labels: self.labels,
            kdf: self.kdf.clone(),
            keys: None,
            engine: CipherEngine::Disabled,
            authenticator: Authenticator::Null,
            epoch: None,
        }
    }

    /// Derive the three session keys for `index` and re-key cipher and MAC.
    pub(crate) fn derive(&mut self, index: u64) {
        let Some(kdf) = &self.kdf else {
            return;
        };
        let kdr = self.params.key_derivation_rate;
        let derived = derive_session_keys(kdf, &self.params, self.labels, index);

        let keys = match derived {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!("Session key derivation failed: {}", e);
                self.clear();
                return;
            }
        };

        self.engine = match CipherEngine::keyed(
            self.params.encryption,
            keys.cipher_key.as_slice(),
            keys.salt.as_slice(),
        ) {
            Ok(engine) => engine,
            Err(e) => {
                tracing::warn!("Cipher setup failed, encryption disabled: {}", e);
                CipherEngine::Disabled
            }
        };
        self.authenticator = Authenticator::new(self.params.authentication, keys.auth_key.as_slice());

        let epoch = key_derivation_epoch(index, kdr);
        tracing::debug!(
            label = self.labels.encryption,
            epoch,
            "Derived session keys"
        );
        self.epoch = Some(epoch);
        self.keys = Some(keys);
    }

    /// Re-derive when `index` entered a new key derivation epoch.
    pub(crate) fn refresh(&mut self, index: u64) {
        let kdr = self.params.key_derivation_rate;
        if kdr == 0 {
            return;
        }
        match self.epoch {
            Some(epoch) if epoch != key_derivation_epoch(index, kdr) => self.derive(index),
            _ => {}
        }
    }

    /// Write the truncated MAC of `chunks` into the first `tag_len` bytes of
    /// `tag`.
    pub(crate) fn authenticate(&self, chunks: &[&[u8]], tag: &mut [u8]) {
        if self.params.authentication == AuthenticationAlgorithm::Null {
            return;
        }
        if self.authenticator.is_null() {
            self.report_underived("authenticate");
            return;
        }
        let n = self.params.tag_len.min(tag.len());
        self.authenticator.compute(chunks, &mut tag[..n]);
    }

    /// `true` when the encryption algorithm is not null but no key is set.
    pub(crate) fn encryption_pending(&self) -> bool {
        self.params.encryption != EncryptionAlgorithm::Null && self.engine.is_disabled()
    }

    /// Encrypt or authenticate ran without session keys and did nothing.
    /// Debug builds assert that keys were derived at least once.
    pub(crate) fn report_underived(&self, operation: &str) {
        tracing::debug!(
            label = self.labels.encryption,
            "{} called before session keys were derived",
            operation
        );
        #[cfg(not(test))]
        debug_assert!(
            self.keys.is_some(),
            "{} called before session keys were derived",
            operation
        );
    }

    fn clear(&mut self) {
        self.keys = None;
        self.engine = CipherEngine::Disabled;
        self.authenticator = Authenticator::Null;
        self.epoch = None;
    }

    pub(crate) fn params(&self) -> &CryptoParams {
        &self.params
    }

    pub(crate) fn engine(&self) -> &CipherEngine {
        &self.engine
    }

    pub(crate) fn keys(&self) -> Option<&SessionKeys> {
        self.keys.as_ref()
    }

    pub(crate) fn salt(&self) -> &[u8] {
        self.keys.as_ref().map_or(&[], |k| k.salt.as_slice())
    }
}

fn derive_session_keys(
    kdf: &KeyDerivation,
    params: &CryptoParams,
    labels: Labels,
    index: u64,
) -> Result<SessionKeys, ConfigError> {
    let kdr = params.key_derivation_rate;
    Ok(SessionKeys {
        cipher_key: kdf.derive(labels.encryption, index, kdr, params.cipher_key_len)?,
        auth_key: kdf.derive(labels.auth, index, kdr, params.auth_key_len)?,
        salt: kdf.derive(labels.salt, index, kdr, params.salt_len)?,
    })
}

fn xor_into(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}

fn salted_iv(salt: &[u8]) -> [u8; IV_PREFIX_LEN] {
    let mut iv = [0u8; IV_PREFIX_LEN];
    let n = salt.len().min(IV_PREFIX_LEN);
    iv[..n].copy_from_slice(&salt[..n]);
    iv
}

/// SRTP counter mode IV (RFC 3711 §4.1.1).
///
/// ```text
/// k_s   XX XX XX XX XX XX XX XX XX XX XX XX XX XX
/// SSRC              XX XX XX XX
/// index                         XX XX XX XX XX XX
/// ------------------------------------------------------XOR
/// IV    XX XX XX XX XX XX XX XX XX XX XX XX XX XX 00 00
/// ```
pub(crate) fn rtp_counter_iv(salt: &[u8], ssrc: u32, index: u64) -> [u8; IV_PREFIX_LEN] {
    let mut iv = salted_iv(salt);
    xor_into(&mut iv[4..8], &ssrc.to_be_bytes());
    xor_into(&mut iv[8..14], &index.to_be_bytes()[2..]);
    iv
}

/// SRTP F8 IV: `0x00 || M|PT || SEQ || TS || SSRC || ROC`.
pub(crate) fn rtp_f8_iv(header: &[u8], roc: u32) -> Option<[u8; BLOCK_SIZE]> {
    let fixed = header.get(..RTP_HEADER_SIZE)?;
    let mut iv = [0u8; BLOCK_SIZE];
    iv[..RTP_HEADER_SIZE].copy_from_slice(fixed);
    iv[0] = 0;
    iv[12..].copy_from_slice(&roc.to_be_bytes());
    Some(iv)
}

/// SRTCP counter mode IV: SSRC at bytes 4..8, 31-bit index at bytes 10..14.
pub(crate) fn rtcp_counter_iv(salt: &[u8], ssrc: u32, index: u32) -> [u8; IV_PREFIX_LEN] {
    let mut iv = salted_iv(salt);
    xor_into(&mut iv[4..8], &ssrc.to_be_bytes());
    xor_into(&mut iv[10..14], &index.to_be_bytes());
    iv
}

/// SRTCP F8 IV: `0x00000000 || E || SRTCP index || V|P|RC || PT || length || SSRC`.
pub(crate) fn rtcp_f8_iv(header: &[u8], index: u32) -> Option<[u8; BLOCK_SIZE]> {
    let fixed = header.get(..RTCP_HEADER_SIZE)?;
    let mut iv = [0u8; BLOCK_SIZE];
    iv[4..8].copy_from_slice(&(index | 0x8000_0000).to_be_bytes());
    iv[8..].copy_from_slice(fixed);
    Some(iv)
}
