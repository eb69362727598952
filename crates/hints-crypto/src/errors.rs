//! Crypto error types.
//!
//! This is the *Crypto-failure* kind. Callers treat every variant
//! identically (task result absent); variants exist for logging
//! fidelity, not for branching.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Invalid public key encoding.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// Invalid private key encoding.
    #[error("invalid private key")]
    InvalidPrivateKey,

    /// Invalid signature encoding.
    #[error("invalid signature")]
    InvalidSignature,

    /// Hint bytes could not be parsed or did not match the expected length
    /// for the given party size.
    #[error("invalid hint bytes for N={n}")]
    InvalidHints { n: u64 },

    /// Key or signature generation failed.
    #[error("key generation failed: {0}")]
    KeyGenerationFailed(String),

    /// BLS aggregation failed (empty input or a malformed element).
    #[error("aggregation failed")]
    AggregationFailed,

    /// Invalid input for a cryptographic operation (wrong arity, empty list
    /// where one is required, mismatched lengths).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
