//! SRTCP crypto context for one RTCP control stream.

use crate::crypto::kdf::Labels;
use crate::crypto::{AuthenticationAlgorithm, CipherEngine, EncryptionAlgorithm};
use crate::error::ConfigError;
use crate::rtp::RTCP_HEADER_SIZE;

use super::params::{CryptoParams, TEMPLATE_SSRC};
use super::replay::RtcpIndexState;
use super::session::{rtcp_counter_iv, rtcp_f8_iv, SessionCrypto, SessionKeys};

/// Per-SSRC SRTCP state. The 31-bit SRTCP index travels in every packet, so
/// there is no ROC and keys are derived once.
#[derive(Debug, Clone)]
pub struct CryptoContextCtrl {
    ssrc: u32,
    index: RtcpIndexState,
    session: SessionCrypto,
    mki: Vec<u8>,
}

impl CryptoContextCtrl {
    pub fn null(ssrc: u32) -> Self {
        Self {
            ssrc,
            index: RtcpIndexState::new(),
            session: SessionCrypto::disabled(Labels::RTCP),
            mki: Vec::new(),
        }
    }

    pub fn try_new(
        ssrc: u32,
        params: CryptoParams,
        master_key: &[u8],
        master_salt: &[u8],
    ) -> Result<Self, ConfigError> {
        let params = params.with_key_derivation_rate(0);
        let session = SessionCrypto::new(params, Labels::RTCP, master_key, master_salt)?;
        Ok(Self {
            ssrc,
            index: RtcpIndexState::new(),
            session,
            mki: Vec::new(),
        })
    }

    /// Lenient constructor, falls back to [`null`](Self::null) on bad input.
    pub fn new(ssrc: u32, params: CryptoParams, master_key: &[u8], master_salt: &[u8]) -> Self {
        Self::try_new(ssrc, params, master_key, master_salt).unwrap_or_else(|e| {
            tracing::warn!(ssrc, "SRTCP context disabled: {}", e);
            Self::null(ssrc)
        })
    }

    pub fn derive_srtcp_keys(&mut self) {
        self.session.derive(0);
    }

    /// Encrypt or decrypt everything after the 8 byte RTCP header in place.
    pub fn srtcp_encrypt(&mut self, packet: &mut [u8], index: u32, ssrc: u32) {
        if self.session.params().encryption == EncryptionAlgorithm::Null {
            return;
        }
        if self.session.encryption_pending() {
            self.session.report_underived("srtcp_encrypt");
            return;
        }
        if packet.len() < RTCP_HEADER_SIZE {
            tracing::debug!(len = packet.len(), "RTCP packet shorter than its header");
            return;
        }

        let index = index & 0x7FFF_FFFF;
        let (header, payload) = packet.split_at_mut(RTCP_HEADER_SIZE);
        match self.session.engine() {
            CipherEngine::Counter(cipher) => {
                let iv = rtcp_counter_iv(self.session.salt(), ssrc, index);
                cipher.apply(payload, &iv);
            }
            CipherEngine::F8(cipher) => {
                if let Some(iv) = rtcp_f8_iv(header, index) {
                    cipher.apply(payload, &iv);
                }
            }
            CipherEngine::Disabled => {}
        }
    }

    /// Tag over `packet || BE32(index)`; `index` is the `E || SRTCP index`
    /// trailer word as sent on the wire.
    pub fn srtcp_authenticate(&self, packet: &[u8], index: u32, tag: &mut [u8]) {
        let index_bytes = index.to_be_bytes();
        self.session.authenticate(&[packet, &index_bytes], tag);
    }

    pub fn check_replay(&self, index: u32) -> bool {
        if self.session.params().is_null() {
            return true;
        }
        let accepted = self.index.check_replay(index);
        if !accepted {
            tracing::trace!(ssrc = self.ssrc, index, "SRTCP replay rejected");
        }
        accepted
    }

    pub fn update(&mut self, index: u32) {
        self.index.update(index);
    }

    /// Fresh control context for `ssrc` sharing algorithms and master key.
    pub fn new_crypto_context_for_ssrc(&self, ssrc: u32) -> Self {
        Self {
            ssrc,
            index: RtcpIndexState::new(),
            session: self.session.fresh_copy(0),
            mki: self.mki.clone(),
        }
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn is_template(&self) -> bool {
        self.ssrc == TEMPLATE_SSRC
    }

    /// Highest SRTCP index committed by [`update`](Self::update).
    pub fn highest_index(&self) -> u32 {
        self.index.highest_index()
    }

    pub fn tag_len(&self) -> usize {
        self.session.params().tag_len
    }

    pub fn mki_len(&self) -> usize {
        self.mki.len()
    }

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

    pub fn session_keys(&self) -> Option<&SessionKeys> {
        self.session.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::srtp::CryptoContext;

    const SSRC: u32 = 0x0102_0304;

    fn sender_report() -> Vec<u8> {
        let mut pkt = vec![0x80, 200, 0x00, 0x06];
        pkt.extend_from_slice(&SSRC.to_be_bytes());
        pkt.extend((0u8..20).collect::<Vec<_>>());
        pkt
    }

    fn ctrl(params: CryptoParams) -> CryptoContextCtrl {
        let mut ctx = CryptoContextCtrl::try_new(SSRC, params, &[0x11; 16], &[0x22; 14]).unwrap();
        ctx.derive_srtcp_keys();
        ctx
    }

    #[test]
    fn test_rtcp_keys_differ_from_rtp_keys() {
        let rtcp = ctrl(CryptoParams::default());
        let mut rtp =
            CryptoContext::try_new(SSRC, 0, CryptoParams::default(), &[0x11; 16], &[0x22; 14])
                .unwrap();
        rtp.derive_srtp_keys(0);
        let a = rtcp.session_keys().unwrap();
        let b = rtp.session_keys().unwrap();
        assert_ne!(a.cipher_key, b.cipher_key);
        assert_ne!(a.auth_key, b.auth_key);
        assert_ne!(a.salt, b.salt);
    }

    #[test]
    fn test_header_stays_in_clear() {
        for params in [
            CryptoParams::aes_cm_128_hmac_sha1_80(),
            CryptoParams::aes_f8_128_hmac_sha1_80(),
        ] {
            let mut ctx = ctrl(params);
            let plain = sender_report();
            let mut pkt = plain.clone();
            ctx.srtcp_encrypt(&mut pkt, 7, SSRC);
            assert_eq!(&pkt[..RTCP_HEADER_SIZE], &plain[..RTCP_HEADER_SIZE]);
            assert_ne!(&pkt[RTCP_HEADER_SIZE..], &plain[RTCP_HEADER_SIZE..]);
            ctx.srtcp_encrypt(&mut pkt, 7, SSRC);
            assert_eq!(pkt, plain);
        }
    }

    #[test]
    fn test_index_changes_keystream() {
        let mut ctx = ctrl(CryptoParams::default());
        let mut a = sender_report();
        let mut b = sender_report();
        ctx.srtcp_encrypt(&mut a, 1, SSRC);
        ctx.srtcp_encrypt(&mut b, 2, SSRC);
        assert_ne!(a, b);
    }

    #[test]
    fn test_tag_covers_index_word() {
        let ctx = ctrl(CryptoParams::default());
        let pkt = sender_report();
        let mut t1 = [0u8; 10];
        let mut t2 = [0u8; 10];
        ctx.srtcp_authenticate(&pkt, 0x8000_0001, &mut t1);
        ctx.srtcp_authenticate(&pkt, 0x8000_0002, &mut t2);
        assert_ne!(t1, t2);
    }

    #[test]
    fn test_short_packet_is_left_alone() {
        let mut ctx = ctrl(CryptoParams::default());
        let mut pkt = vec![0x80, 200, 0, 1];
        ctx.srtcp_encrypt(&mut pkt, 1, SSRC);
        assert_eq!(pkt, vec![0x80, 200, 0, 1]);
    }

    #[test]
    fn test_replay_window() {
        let mut ctx = ctrl(CryptoParams::default());
        assert!(ctx.check_replay(1));
        ctx.update(1);
        assert!(!ctx.check_replay(1));
        ctx.update(100);
        assert!(!ctx.check_replay(36));
        assert!(ctx.check_replay(37));
        assert_eq!(ctx.highest_index(), 100);
    }

    #[test]
    fn test_null_ctrl_accepts_everything() {
        let mut ctx = CryptoContextCtrl::null(SSRC);
        ctx.update(5);
        assert!(ctx.check_replay(5));
        let mut tag = [0u8; 4];
        ctx.srtcp_authenticate(&sender_report(), 5, &mut tag);
        assert_eq!(tag, [0u8; 4]);
    }

    #[test]
    fn test_lenient_constructor_and_clone() {
        let bad = CryptoContextCtrl::new(SSRC, CryptoParams::default(), &[0u8; 5], &[]);
        assert_eq!(bad.encryption(), EncryptionAlgorithm::Null);

        let mut template =
            CryptoContextCtrl::try_new(TEMPLATE_SSRC, CryptoParams::default(), &[0x11; 16], &[0x22; 14])
                .unwrap();
        template.set_mki(&[9]);
        template.derive_srtcp_keys();
        template.update(40);
        assert!(template.is_template());

        let mut clone = template.new_crypto_context_for_ssrc(SSRC);
        assert_eq!(clone.ssrc(), SSRC);
        assert_eq!(clone.highest_index(), 0);
        assert_eq!(clone.mki_len(), 1);
        assert!(clone.session_keys().is_none());
        clone.derive_srtcp_keys();
        assert_eq!(clone.session_keys(), template.session_keys());
    }
}
