//! Keystore error types.

use thiserror::Error;

/// Failures from durable key persistence. Unlike [`hints_crypto::CryptoError`],
/// these are operational faults (disk I/O, corrupt records) rather than
/// protocol-level crypto failures, and propagate to the caller instead of
/// being silently absorbed (SPEC_FULL.md Section 10.2).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error persisting key for construction {construction_id}: {source}")]
    Io {
        construction_id: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt key record for construction {construction_id}: expected {expected} bytes, got {actual}")]
    CorruptRecord {
        construction_id: u64,
        expected: usize,
        actual: usize,
    },

    #[error("key generation failed: {0}")]
    KeyGeneration(#[from] hints_crypto::CryptoError),
}
