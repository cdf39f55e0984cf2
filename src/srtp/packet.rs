//! Whole-packet SRTP/SRTCP protection (RFC 3711 §3.1, §3.3, §3.4).
//!
//! ```text
//! SRTP:   | RTP header | encrypted payload | MKI (opt) | tag |
//! SRTCP:  | RTCP header | encrypted payload | E | SRTCP index | MKI (opt) | tag |
//! ```
//!
//! The authenticated portion is the header and encrypted payload (plus the
//! `E || index` word for SRTCP). The MKI is never authenticated.

use subtle::ConstantTimeEq;

use crate::crypto::EncryptionAlgorithm;
use crate::error::SrtpError;
use crate::rtp::{self, RTCP_HEADER_SIZE, RTP_HEADER_SIZE};

use super::context::CryptoContext;
use super::control::CryptoContextCtrl;

/// Size of the `E || SRTCP index` trailer word.
pub const SRTCP_INDEX_SIZE: usize = 4;

const SRTCP_E_FLAG: u32 = 0x8000_0000;

/// Turn an RTP packet into an SRTP packet in place.
///
/// The packet index is `roc << 16 | seq`; the sender's ROC advances after
/// sequence number 0xFFFF.
pub fn protect_rtp(ctx: &mut CryptoContext, packet: &mut Vec<u8>) -> Result<(), SrtpError> {
    let header_len = rtp_header_len(packet)?;
    let seq = rtp::sequence_number(packet).ok_or(SrtpError::MalformedHeader)?;
    let ssrc = rtp::rtp_ssrc(packet).ok_or(SrtpError::MalformedHeader)?;
    let roc = ctx.roc();
    let index = (u64::from(roc) << 16) | u64::from(seq);

    ctx.srtp_encrypt(packet, header_len, index, ssrc);

    let mut tag = vec![0u8; ctx.tag_len()];
    ctx.srtp_authenticate(packet, roc, &mut tag);
    if let Some(mki) = ctx.mki() {
        packet.extend_from_slice(mki);
    }
    packet.extend_from_slice(&tag);

    if seq == u16::MAX {
        ctx.set_roc(roc.wrapping_add(1));
    }
    Ok(())
}

/// Verify and decrypt an SRTP packet in place, returning its 48-bit index.
///
/// On success the MKI and tag are stripped and the replay window advanced.
/// On failure the packet is left untouched.
pub fn unprotect_rtp(ctx: &mut CryptoContext, packet: &mut Vec<u8>) -> Result<u64, SrtpError> {
    let trailer = ctx.tag_len() + ctx.mki_len();
    let need = RTP_HEADER_SIZE + trailer;
    if packet.len() < need {
        return Err(SrtpError::PacketTooShort {
            len: packet.len(),
            need,
        });
    }
    let auth_len = packet.len() - trailer;
    let header_len = rtp_header_len(&packet[..auth_len])?;
    let seq = rtp::sequence_number(packet).ok_or(SrtpError::MalformedHeader)?;
    let ssrc = rtp::rtp_ssrc(packet).ok_or(SrtpError::MalformedHeader)?;

    if !ctx.check_replay(seq) {
        return Err(SrtpError::Replay(ctx.guess_index(seq)));
    }
    let index = ctx.guess_index(seq);
    let roc = (index >> 16) as u32;

    let tag_len = ctx.tag_len();
    if tag_len > 0 {
        let mut expected = vec![0u8; tag_len];
        ctx.srtp_authenticate(&packet[..auth_len], roc, &mut expected);
        let received = &packet[packet.len() - tag_len..];
        if !bool::from(expected.ct_eq(received)) {
            tracing::debug!(ssrc, seq, "SRTP authentication failed");
            return Err(SrtpError::AuthenticationFailed);
        }
    }

    packet.truncate(auth_len);
    ctx.srtp_encrypt(packet, header_len, index, ssrc);
    ctx.update(seq);
    Ok(index)
}

/// Turn an RTCP compound packet into an SRTCP packet in place.
pub fn protect_rtcp(
    ctx: &mut CryptoContextCtrl,
    packet: &mut Vec<u8>,
    index: u32,
) -> Result<(), SrtpError> {
    let ssrc = rtp::rtcp_ssrc(packet).ok_or(SrtpError::PacketTooShort {
        len: packet.len(),
        need: RTCP_HEADER_SIZE,
    })?;
    let index = index & !SRTCP_E_FLAG;

    ctx.srtcp_encrypt(packet, index, ssrc);
    let word = if ctx.encryption() == EncryptionAlgorithm::Null {
        index
    } else {
        index | SRTCP_E_FLAG
    };

    let mut tag = vec![0u8; ctx.tag_len()];
    ctx.srtcp_authenticate(packet, word, &mut tag);
    packet.extend_from_slice(&word.to_be_bytes());
    if let Some(mki) = ctx.mki() {
        packet.extend_from_slice(mki);
    }
    packet.extend_from_slice(&tag);
    Ok(())
}

/// Verify and decrypt an SRTCP packet in place, returning its SRTCP index.
pub fn unprotect_rtcp(ctx: &mut CryptoContextCtrl, packet: &mut Vec<u8>) -> Result<u32, SrtpError> {
    let tag_len = ctx.tag_len();
    let trailer = SRTCP_INDEX_SIZE + ctx.mki_len() + tag_len;
    let need = RTCP_HEADER_SIZE + trailer;
    if packet.len() < need {
        return Err(SrtpError::PacketTooShort {
            len: packet.len(),
            need,
        });
    }
    let body_len = packet.len() - trailer;
    let word = u32::from_be_bytes([
        packet[body_len],
        packet[body_len + 1],
        packet[body_len + 2],
        packet[body_len + 3],
    ]);
    let index = word & !SRTCP_E_FLAG;
    let encrypted = word & SRTCP_E_FLAG != 0;
    let ssrc = rtp::rtcp_ssrc(packet).ok_or(SrtpError::MalformedHeader)?;

    if !ctx.check_replay(index) {
        return Err(SrtpError::Replay(u64::from(index)));
    }

    if tag_len > 0 {
        let mut expected = vec![0u8; tag_len];
        ctx.srtcp_authenticate(&packet[..body_len], word, &mut expected);
        let received = &packet[packet.len() - tag_len..];
        if !bool::from(expected.ct_eq(received)) {
            tracing::debug!(ssrc, index, "SRTCP authentication failed");
            return Err(SrtpError::AuthenticationFailed);
        }
    }

    packet.truncate(body_len);
    if encrypted {
        ctx.srtcp_encrypt(packet, index, ssrc);
    }
    ctx.update(index);
    Ok(index)
}

fn rtp_header_len(packet: &[u8]) -> Result<usize, SrtpError> {
    if packet.len() < RTP_HEADER_SIZE {
        return Err(SrtpError::PacketTooShort {
            len: packet.len(),
            need: RTP_HEADER_SIZE,
        });
    }
    if packet[0] >> 6 != 2 {
        return Err(SrtpError::MalformedHeader);
    }
    rtp::full_header_len(packet).ok_or(SrtpError::MalformedHeader)
}
