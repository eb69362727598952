//! Hints store record types (Section 3, Section 4.1).

use hints_common::{ConsensusTime, ConstructionId, Hash, NodeId};
use hints_crypto::BlsPublicKey;

/// A HintKey publication: one node's BLS public key and hint bytes at a
/// given party-size-log2 `k`, timestamped with its consensus-adoption
/// time. The store keeps only the earliest-adopted publication per
/// (node-id, k) (Section 3).
#[derive(Clone, Debug)]
pub struct PublicationRecord {
    pub node_id: NodeId,
    pub k: u32,
    pub public_key: BlsPublicKey,
    pub hint_bytes: Vec<u8>,
    pub adopted_at: ConsensusTime,
}

/// The construction's coarse, durable lifecycle state (Section 3). This is
/// store-level bookkeeping, distinct from the controller's richer in-memory
/// `Phase` (`hints-controller`), which also tracks admissible weight,
/// validation caches, and pending tasks that have no durable counterpart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstructionState {
    Gathering,
    Aggregating,
    Complete { preprocessed_keys_hash: Hash },
}

/// A construction record (Section 3).
#[derive(Clone, Debug)]
pub struct ConstructionRecord {
    pub id: ConstructionId,
    pub source_hash: Hash,
    pub target_hash: Hash,
    pub state: ConstructionState,
    /// Consensus time the gathering phase began: the adoption time passed
    /// to `newConstructionFor` (Section 3, "grace-period-start").
    pub grace_period_start: ConsensusTime,
    /// Consensus time `setAggregationTime` recorded the GATHERING ->
    /// AGGREGATING transition, if it has happened yet.
    pub aggregation_started_at: Option<ConsensusTime>,
    /// The next consensus time at which a stalled GATHERING construction
    /// should be re-examined (Section 4.3, "Rescheduling"). Advisory only.
    pub next_checkpoint: Option<ConsensusTime>,
}

impl ConstructionRecord {
    pub fn is_complete(&self) -> bool {
        matches!(self.state, ConstructionState::Complete { .. })
    }
}
