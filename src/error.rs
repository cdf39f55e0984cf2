//! Error types for context construction and packet protection.

use thiserror::Error;

/// Rejected crypto context parameters.
///
/// Returned by the `try_new` constructors. The lenient constructors log the
/// error and fall back to the null policy instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unsupported cipher key length: {0} bytes (expected 16 or 32)")]
    UnsupportedKeyLength(usize),

    #[error("master salt too long: {0} bytes (at most 14)")]
    MasterSaltTooLong(usize),

    #[error("session salt length {0} out of range (1..=14)")]
    SessionSaltLength(usize),

    #[error("F8 salt ({salt} bytes) longer than session key ({key} bytes)")]
    SaltLongerThanKey { salt: usize, key: usize },

    #[error("authentication key must not be empty")]
    EmptyAuthKey,

    #[error("key of {0} bytes exceeds key buffer capacity")]
    KeyTooLong(usize),

    #[error("tag length {tag} exceeds MAC output of {max} bytes")]
    TagTooLong { tag: usize, max: usize },

    #[error("key derivation rate {0} is not 0 or a power of two <= 2^24")]
    InvalidKeyDerivationRate(u64),
}

/// Failure of the packet-level protect/unprotect helpers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SrtpError {
    #[error("packet too short: {len} bytes (need {need})")]
    PacketTooShort { len: usize, need: usize },

    #[error("malformed RTP header")]
    MalformedHeader,

    #[error("replayed or too old packet (index {0})")]
    Replay(u64),

    #[error("authentication tag mismatch")]
    AuthenticationFailed,
}
