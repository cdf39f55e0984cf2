//! Message authentication for SRTP/SRTCP (RFC 3711 §4.2).

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac, SimpleHmac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use skein::Skein512;
use zeroize::Zeroize;

use super::key::KeyBytes;

type HmacSha1 = Hmac<Sha1>;
type HmacSkein = SimpleHmac<Skein512>;

/// HMAC-SHA1 output length.
pub const SHA1_MAC_LEN: usize = 20;

/// HMAC over Skein-512 output length.
pub const SKEIN_MAC_LEN: usize = 64;

/// Authentication transform applied to protected packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticationAlgorithm {
    #[default]
    Null,
    HmacSha1,
    HmacSkein,
}

impl AuthenticationAlgorithm {
    /// Full MAC output length; tags are truncated from this.
    pub fn mac_len(self) -> usize {
        match self {
            Self::Null => 0,
            Self::HmacSha1 => SHA1_MAC_LEN,
            Self::HmacSkein => SKEIN_MAC_LEN,
        }
    }
}

/// A MAC bound to the session authentication key.
///
/// Only the raw key is kept, in a [`KeyBytes`] that is wiped on drop. The
/// HMAC pad states are key equivalent and the `hmac` types cannot be zeroized,
/// so they are rebuilt for every tag and never outlive [`compute`](Self::compute).
#[derive(Clone, Default)]
pub enum Authenticator {
    #[default]
    Null,
    HmacSha1(KeyBytes),
    HmacSkein(KeyBytes),
}

impl Authenticator {
    /// A key longer than [`MAX_KEY_LEN`](super::key::MAX_KEY_LEN) leaves the
    /// authenticator null.
    pub fn new(algorithm: AuthenticationAlgorithm, key: &[u8]) -> Self {
        if algorithm == AuthenticationAlgorithm::Null {
            return Self::Null;
        }
        let key = match KeyBytes::new(key) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!("Authentication key rejected: {}", e);
                return Self::Null;
            }
        };
        match algorithm {
            AuthenticationAlgorithm::Null => Self::Null,
            AuthenticationAlgorithm::HmacSha1 => Self::HmacSha1(key),
            AuthenticationAlgorithm::HmacSkein => Self::HmacSkein(key),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// MAC the concatenation of `chunks` and write the first `tag.len()` bytes
    /// of the result into `tag`.
    pub fn compute(&self, chunks: &[&[u8]], tag: &mut [u8]) {
        match self {
            Self::Null => {}
            Self::HmacSha1(key) => mac_into::<HmacSha1>(key, chunks, tag),
            Self::HmacSkein(key) => mac_into::<HmacSkein>(key, chunks, tag),
        }
    }
}

fn mac_into<M: Mac + KeyInit>(key: &KeyBytes, chunks: &[&[u8]], tag: &mut [u8]) {
    // HMAC accepts keys of any length
    let Ok(mut mac) = <M as KeyInit>::new_from_slice(key.as_slice()) else {
        return;
    };
    for chunk in chunks {
        mac.update(chunk);
    }
    let mut full = mac.finalize().into_bytes();
    let n = tag.len().min(full.len());
    tag[..n].copy_from_slice(&full[..n]);
    full.as_mut_slice().zeroize();
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("Authenticator::Null"),
            Self::HmacSha1(_) => f.write_str("Authenticator::HmacSha1"),
            Self::HmacSkein(_) => f.write_str("Authenticator::HmacSkein"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc2202_hmac_sha1_truncated() {
        let auth = Authenticator::new(AuthenticationAlgorithm::HmacSha1, &[0x0b; 20]);
        let mut tag = [0u8; 10];
        auth.compute(&[b"Hi ", b"There"], &mut tag);
        assert_eq!(tag.to_vec(), hex::decode("b617318655057264e28b").unwrap());
    }

    #[test]
    fn test_tag_is_prefix_of_full_mac_and_stable() {
        let auth = Authenticator::new(AuthenticationAlgorithm::HmacSha1, b"session-auth-key");
        let mut full = [0u8; SHA1_MAC_LEN];
        auth.compute(&[b"packet bytes"], &mut full);
        for len in [4usize, 10, 20] {
            let mut tag = vec![0u8; len];
            auth.compute(&[b"packet bytes"], &mut tag);
            assert_eq!(tag, full[..len]);
            let mut again = vec![0u8; len];
            auth.compute(&[b"packet bytes"], &mut again);
            assert_eq!(tag, again);
        }
    }

    #[test]
    fn test_skein_mac_differs_from_sha1() {
        let key = [0x11u8; 32];
        let sha1 = Authenticator::new(AuthenticationAlgorithm::HmacSha1, &key);
        let skein = Authenticator::new(AuthenticationAlgorithm::HmacSkein, &key);
        let mut a = [0u8; 10];
        let mut b = [0u8; 10];
        sha1.compute(&[b"data"], &mut a);
        skein.compute(&[b"data"], &mut b);
        assert_ne!(a, b);
        assert!(!skein.is_null());
    }

    #[test]
    fn test_null_authenticator_writes_nothing() {
        let auth = Authenticator::new(AuthenticationAlgorithm::Null, &[1u8; 20]);
        let mut tag = [0xEEu8; 10];
        auth.compute(&[b"data"], &mut tag);
        assert_eq!(tag, [0xEE; 10]);
        assert!(auth.is_null());
    }

    #[test]
    fn test_only_raw_key_is_held() {
        let auth = Authenticator::new(AuthenticationAlgorithm::HmacSha1, &[0x0b; 20]);
        match &auth {
            Authenticator::HmacSha1(key) => assert_eq!(key.as_slice(), &[0x0b; 20]),
            other => panic!("unexpected {:?}", other),
        }
        let copy = auth.clone();
        drop(auth);
        let mut tag = [0u8; 10];
        copy.compute(&[b"Hi There"], &mut tag);
        assert_eq!(tag.to_vec(), hex::decode("b617318655057264e28b").unwrap());
    }

    #[test]
    fn test_oversized_key_leaves_authenticator_null() {
        let auth = Authenticator::new(AuthenticationAlgorithm::HmacSkein, &[1u8; 65]);
        assert!(auth.is_null());
    }

    #[test]
    fn test_mac_lengths() {
        assert_eq!(AuthenticationAlgorithm::Null.mac_len(), 0);
        assert_eq!(AuthenticationAlgorithm::HmacSha1.mac_len(), 20);
        assert_eq!(AuthenticationAlgorithm::HmacSkein.mac_len(), 64);
    }
}
