//! Using a context before its session keys exist is a caller bug that debug
//! builds catch. The library's own unit tests compile the check out, so it is
//! exercised from here.

use srtp_context::{rtp, CryptoContext, CryptoContextCtrl, CryptoParams};

const SSRC: u32 = 0x1234_5678;

fn rtp_context() -> CryptoContext {
    CryptoContext::try_new(SSRC, 0, CryptoParams::default(), &[0x42; 16], &[0x24; 14]).unwrap()
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "srtp_encrypt called before session keys were derived")]
fn test_encrypt_before_derive_asserts() {
    let mut ctx = rtp_context();
    let mut packet = rtp::encode(0, 1, 0, SSRC, b"payload");
    ctx.srtp_encrypt(&mut packet, rtp::RTP_HEADER_SIZE, 1, SSRC);
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "authenticate called before session keys were derived")]
fn test_authenticate_before_derive_asserts() {
    let mut ctx = rtp_context();
    let packet = rtp::encode(0, 1, 0, SSRC, b"payload");
    let mut tag = [0u8; 10];
    ctx.srtp_authenticate(&packet, 0, &mut tag);
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "srtcp_encrypt called before session keys were derived")]
fn test_srtcp_encrypt_before_derive_asserts() {
    let mut ctx =
        CryptoContextCtrl::try_new(SSRC, CryptoParams::default(), &[0x42; 16], &[0x24; 14])
            .unwrap();
    let mut packet = vec![0x80, 200, 0x00, 0x01];
    packet.extend_from_slice(&SSRC.to_be_bytes());
    packet.extend_from_slice(&[0u8; 16]);
    ctx.srtcp_encrypt(&mut packet, 1, SSRC);
}

#[test]
fn test_derived_and_null_contexts_do_not_assert() {
    let mut ctx = rtp_context();
    ctx.derive_srtp_keys(1);
    let plain = rtp::encode(0, 1, 0, SSRC, b"payload");
    let mut packet = plain.clone();
    ctx.srtp_encrypt(&mut packet, rtp::RTP_HEADER_SIZE, 1, SSRC);
    assert_ne!(packet, plain);

    let mut null = CryptoContext::null(SSRC);
    let mut clear = plain.clone();
    null.srtp_encrypt(&mut clear, rtp::RTP_HEADER_SIZE, 1, SSRC);
    let mut tag = [0u8; 4];
    null.srtp_authenticate(&clear, 0, &mut tag);
    assert_eq!(clear, plain);
}
