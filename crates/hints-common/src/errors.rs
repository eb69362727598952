//! Error vocabulary shared across the hinTS construction crates.
//!
//! These are the *fatal* kinds - `Missing-roster` and `Oversize-party` -
//! that prevent a controller from ever being created. Every other error
//! kind (invalid-hint, crypto-failure, duplicate-admission, ...) is
//! recoverable and handled locally by the component that observes it; it
//! never propagates as an error type.

use thiserror::Error;

/// A configuration error fatal to one construction.
///
/// These never fault the consensus thread: the registry logs the error and
/// simply does not create a controller for that construction.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    /// `rosterStore.get(hash)` returned none for source or target.
    #[error("missing roster for hash {hash:02x?}")]
    MissingRoster { hash: [u8; 32] },

    /// Target roster node count exceeds `2^maxPartySizeLog2`.
    #[error("target roster has {node_count} nodes, exceeding 2^{max_k} = {max_n}")]
    OversizeParty {
        node_count: usize,
        max_k: u32,
        max_n: u64,
    },

    /// Total target weight is zero; the super-majority threshold is
    /// undefined.
    #[error("target roster total weight is zero")]
    ZeroTotalWeight,
}
