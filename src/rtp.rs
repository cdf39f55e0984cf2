//! Minimal RTP/RTCP header access needed to protect packets.
//!
//! RTP header format (RFC 3550):
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |V=2|P|X|  CC   |M|     PT      |       sequence number         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                           timestamp                           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |           synchronization source (SSRC) identifier            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use crate::error::SrtpError;

/// Minimum RTP header size in bytes (no CSRC, no extension).
pub const RTP_HEADER_SIZE: usize = 12;

/// RTCP header: V/P/RC(1) + PT(1) + length(2) + SSRC(4).
pub const RTCP_HEADER_SIZE: usize = 8;

/// Compute the full RTP header length from raw packet bytes.
///
/// Accounts for CSRC entries and header extensions (RFC 3550 §5.3.1).
/// Returns `None` if the packet is too short.
pub fn full_header_len(data: &[u8]) -> Option<usize> {
    if data.len() < RTP_HEADER_SIZE {
        return None;
    }
    let csrc_count = (data[0] & 0x0F) as usize;
    let has_extension = (data[0] >> 4) & 0x01 != 0;
    let mut len = RTP_HEADER_SIZE + csrc_count * 4;
    if data.len() < len {
        return None;
    }
    if has_extension {
        // Extension header: 2 bytes profile + 2 bytes length (in 32-bit words)
        if data.len() < len + 4 {
            return None;
        }
        let ext_words = u16::from_be_bytes([data[len + 2], data[len + 3]]) as usize;
        len += 4 + ext_words * 4;
        if data.len() < len {
            return None;
        }
    }
    Some(len)
}

/// Sequence number of an RTP packet (bytes 2-3).
pub fn sequence_number(data: &[u8]) -> Option<u16> {
    (data.len() >= 4).then(|| u16::from_be_bytes([data[2], data[3]]))
}

/// SSRC of an RTP packet (bytes 8-11).
pub fn rtp_ssrc(data: &[u8]) -> Option<u32> {
    (data.len() >= RTP_HEADER_SIZE)
        .then(|| u32::from_be_bytes([data[8], data[9], data[10], data[11]]))
}

/// Sender SSRC of an RTCP packet (bytes 4-7).
pub fn rtcp_ssrc(data: &[u8]) -> Option<u32> {
    (data.len() >= RTCP_HEADER_SIZE)
        .then(|| u32::from_be_bytes([data[4], data[5], data[6], data[7]]))
}

/// Parsed RTP packet.
#[derive(Debug, Clone)]
pub struct RtpPacket {
    pub marker: bool,
    pub payload_type: u8,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    pub payload: Vec<u8>,
}

/// Encode an RTP packet into bytes.
pub fn encode(payload_type: u8, seq: u16, timestamp: u32, ssrc: u32, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(RTP_HEADER_SIZE + payload.len());

    // Byte 0: V=2, P=0, X=0, CC=0 -> 0x80
    buf.push(0x80);
    // Byte 1: M=0, PT
    buf.push(payload_type & 0x7F);
    buf.extend_from_slice(&seq.to_be_bytes());
    buf.extend_from_slice(&timestamp.to_be_bytes());
    buf.extend_from_slice(&ssrc.to_be_bytes());
    buf.extend_from_slice(payload);

    buf
}

/// Decode bytes into an RTP packet.
pub fn decode(data: &[u8]) -> Result<RtpPacket, SrtpError> {
    if data.len() < RTP_HEADER_SIZE {
        return Err(SrtpError::PacketTooShort {
            len: data.len(),
            need: RTP_HEADER_SIZE,
        });
    }
    if (data[0] >> 6) & 0x03 != 2 {
        return Err(SrtpError::MalformedHeader);
    }
    let header_len = full_header_len(data).ok_or(SrtpError::MalformedHeader)?;

    Ok(RtpPacket {
        marker: (data[1] >> 7) & 0x01 != 0,
        payload_type: data[1] & 0x7F,
        sequence_number: u16::from_be_bytes([data[2], data[3]]),
        timestamp: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
        ssrc: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
        payload: data[header_len..].to_vec(),
    })
}
