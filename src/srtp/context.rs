//! SRTP crypto context for one RTP data stream.

use crate::crypto::kdf::{validate_key_derivation_rate, Labels};
use crate::crypto::{AuthenticationAlgorithm, CipherEngine, EncryptionAlgorithm};
use crate::error::ConfigError;
use crate::rtp;

use super::params::{CryptoParams, TEMPLATE_SSRC};
use super::replay::RtpIndexState;
use super::session::{rtp_counter_iv, rtp_f8_iv, SessionCrypto, SessionKeys};

/// Per-SSRC SRTP state: session keys, ROC and replay window.
///
/// A context is not internally synchronized. Inbound processing must follow
/// `check_replay`, authenticate and decrypt, then `update`, in packet order.
#[derive(Debug, Clone)]
pub struct CryptoContext {
    ssrc: u32,
    index: RtpIndexState,
    session: SessionCrypto,
    mki: Vec<u8>,
    master_key_use_count: u64,
}

impl CryptoContext {
    /// Context without encryption or authentication. Every operation is a
    /// no-op and `check_replay` accepts everything.
    pub fn null(ssrc: u32) -> Self {
        Self {
            ssrc,
            index: RtpIndexState::new(0),
            session: SessionCrypto::disabled(Labels::RTP),
            mki: Vec::new(),
            master_key_use_count: 0,
        }
    }

    pub fn try_new(
        ssrc: u32,
        roc: u32,
        params: CryptoParams,
        master_key: &[u8],
        master_salt: &[u8],
    ) -> Result<Self, ConfigError> {
        let session = SessionCrypto::new(params, Labels::RTP, master_key, master_salt)?;
        Ok(Self {
            ssrc,
            index: RtpIndexState::new(roc),
            session,
            mki: Vec::new(),
            master_key_use_count: 0,
        })
    }

    /// Like [`try_new`](Self::try_new), but a rejected configuration yields a
    /// null context instead of an error.
    pub fn new(
        ssrc: u32,
        roc: u32,
        params: CryptoParams,
        master_key: &[u8],
        master_salt: &[u8],
    ) -> Self {
        match Self::try_new(ssrc, roc, params, master_key, master_salt) {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::warn!(ssrc, "SRTP context disabled: {}", e);
                let mut ctx = Self::null(ssrc);
                ctx.index.set_roc(roc);
                ctx
            }
        }
    }

    /// Derive session keys for the 48-bit packet `index`.
    pub fn derive_srtp_keys(&mut self, index: u64) {
        self.session.derive(index);
    }

    /// Encrypt or decrypt the payload of `packet` in place.
    ///
    /// `payload_offset` is the full RTP header length. Crossing a key
    /// derivation rate boundary re-derives the session keys first.
    pub fn srtp_encrypt(&mut self, packet: &mut [u8], payload_offset: usize, index: u64, ssrc: u32) {
        if self.session.params().encryption == EncryptionAlgorithm::Null {
            return;
        }
        self.session.refresh(index);
        if self.session.encryption_pending() {
            self.session.report_underived("srtp_encrypt");
            return;
        }
        if payload_offset > packet.len() {
            tracing::debug!(
                payload_offset,
                len = packet.len(),
                "Payload offset beyond packet end"
            );
            return;
        }

        let (header, payload) = packet.split_at_mut(payload_offset);
        match self.session.engine() {
            CipherEngine::Counter(cipher) => {
                let iv = rtp_counter_iv(self.session.salt(), ssrc, index);
                cipher.apply(payload, &iv);
            }
            CipherEngine::F8(cipher) => {
                let Some(iv) = rtp_f8_iv(header, (index >> 16) as u32) else {
                    tracing::debug!("RTP header too short for F8 IV");
                    return;
                };
                cipher.apply(payload, &iv);
            }
            CipherEngine::Disabled => return,
        }
        self.master_key_use_count += 1;
    }

    /// Compute the authentication tag over `packet || BE32(roc)`.
    ///
    /// Writes exactly `tag_len` bytes to the front of `tag`.
    pub fn srtp_authenticate(&mut self, packet: &[u8], roc: u32, tag: &mut [u8]) {
        if self.session.params().authentication == AuthenticationAlgorithm::Null {
            return;
        }
        if let Some(seq) = rtp::sequence_number(packet) {
            self.session
                .refresh((u64::from(roc) << 16) | u64::from(seq));
        }
        let roc_bytes = roc.to_be_bytes();
        self.session.authenticate(&[packet, &roc_bytes], tag);
    }

    /// Estimate the 48-bit index of an incoming packet.
    pub fn guess_index(&mut self, seq: u16) -> u64 {
        self.index.guess_index(seq)
    }

    /// `false` if `seq` was already received or is too old to track.
    pub fn check_replay(&mut self, seq: u16) -> bool {
        if self.session.params().is_null() {
            return true;
        }
        let accepted = self.index.check_replay(seq);
        if !accepted {
            tracing::trace!(ssrc = self.ssrc, seq, "SRTP replay rejected");
        }
        accepted
    }

    /// Commit `seq` to the replay window after successful authentication.
    pub fn update(&mut self, seq: u16) {
        self.index.update(seq);
    }

    /// Fresh context for `ssrc` with this context's algorithms and master key.
    ///
    /// Session keys are not copied; call
    /// [`derive_srtp_keys`](Self::derive_srtp_keys) before use.
    pub fn new_crypto_context_for_ssrc(&self, ssrc: u32, roc: u32, key_derivation_rate: u64) -> Self {
        if let Err(e) = validate_key_derivation_rate(key_derivation_rate) {
            tracing::warn!(ssrc, "SRTP context disabled: {}", e);
            let mut ctx = Self::null(ssrc);
            ctx.index.set_roc(roc);
            return ctx;
        }
        Self {
            ssrc,
            index: RtpIndexState::new(roc),
            session: self.session.fresh_copy(key_derivation_rate),
            mki: self.mki.clone(),
            master_key_use_count: 0,
        }
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    /// `true` for a template context that is only cloned per SSRC.
    pub fn is_template(&self) -> bool {
        self.ssrc == TEMPLATE_SSRC
    }

    pub fn roc(&self) -> u32 {
        self.index.roc()
    }

    pub fn set_roc(&mut self, roc: u32) {
        self.index.set_roc(roc);
    }

    /// Highest authenticated sequence number, if any packet was committed.
    pub fn highest_seq(&self) -> Option<u16> {
        self.index.highest_seq()
    }

    pub fn tag_len(&self) -> usize {
        self.session.params().tag_len
    }

    pub fn mki_len(&self) -> usize {
        self.mki.len()
    }

    /// Master key identifier appended before the tag. Empty disables MKI.
    pub fn set_mki(&mut self, mki: &[u8]) {
        self.mki = mki.to_vec();
    }

    pub fn mki(&self) -> Option<&[u8]> {
        (!self.mki.is_empty()).then_some(self.mki.as_slice())
    }

    pub fn encryption(&self) -> EncryptionAlgorithm {
        self.session.params().encryption
    }

    pub fn authentication(&self) -> AuthenticationAlgorithm {
        self.session.params().authentication
    }

    pub fn key_derivation_rate(&self) -> u64 {
        self.session.params().key_derivation_rate
    }

    pub fn params(&self) -> &CryptoParams {
        self.session.params()
    }

    /// Current session keys, `None` before the first derivation.
    pub fn session_keys(&self) -> Option<&SessionKeys> {
        self.session.keys()
    }

    /// Number of packets encrypted under the current master key. Advisory.
    pub fn master_key_use_count(&self) -> u64 {
        self.master_key_use_count
    }
}
