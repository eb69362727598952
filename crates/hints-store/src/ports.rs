//! The readable/writable hints-store capability split (Section 4.1,
//! Section 9 "Polymorphism over storage" - expressed as two separate
//! capability sets rather than one monolithic trait, so a caller that only
//! needs to read (e.g. a read-only operational query) is not coupled to
//! the mutation surface).

use std::collections::BTreeMap;

use hints_common::{ConfigurationError, ConsensusTime, ConstructionId, Hash, NodeId, RosterStore};
use hints_crypto::{BlsPublicKey, PreprocessedKeys};

use crate::domain::{ConstructionRecord, PublicationRecord};

/// The read surface of the hints store (Section 4.1).
pub trait HintsStoreReader: Send + Sync {
    /// For each of `node_ids` with an adopted publication at party-size-log2
    /// `k`, the publication record. Missing nodes are simply absent.
    fn publications_for_size_log2(
        &self,
        k: u32,
        node_ids: &[NodeId],
    ) -> BTreeMap<NodeId, PublicationRecord>;

    /// Mapping voter-node-id -> preprocessed-keys-hash, filtered to the
    /// given voters.
    fn votes_for(
        &self,
        construction_id: ConstructionId,
        voter_node_ids: &[NodeId],
    ) -> BTreeMap<NodeId, Hash>;

    /// The active (non-purged) construction record, if any.
    fn get_active_construction(&self) -> Option<ConstructionRecord>;
}

/// The write surface of the hints store; extends the read surface (Section
/// 4.1: "Write surface (writable view extends readable)").
pub trait HintsStoreWriter: HintsStoreReader {
    /// Idempotent on `(node_id, k)`: the first call wins, later ones
    /// (even if they disagree in content) are a no-op.
    fn record_publication(
        &self,
        node_id: NodeId,
        k: u32,
        public_key: BlsPublicKey,
        hint_bytes: Vec<u8>,
        consensus_now: ConsensusTime,
    );

    /// Idempotent on `(voter_node_id, construction_id)`: first wins.
    fn record_vote(
        &self,
        voter_node_id: NodeId,
        construction_id: ConstructionId,
        preprocessed_keys_hash: Hash,
    );

    /// Allocates the next construction-id in state GATHERING, records
    /// consensus-time adoption, and purges any prior non-active
    /// construction to respect the "at most two" invariant (Section 3).
    ///
    /// Fails with [`ConfigurationError::MissingRoster`] if either hash
    /// does not resolve via `roster_store` (Section 7, *Missing-roster*).
    fn new_construction_for(
        &self,
        source_hash: Hash,
        target_hash: Hash,
        roster_store: &dyn RosterStore,
        now: ConsensusTime,
    ) -> Result<ConstructionRecord, ConfigurationError>;

    /// Records the GATHERING -> AGGREGATING transition time.
    fn set_aggregation_time(&self, construction_id: ConstructionId, now: ConsensusTime);

    /// Advances grace-period re-examination bookkeeping (Section 4.3,
    /// advisory only - never forces a state change).
    fn reschedule_aggregation_checkpoint(&self, construction_id: ConstructionId, then: ConsensusTime);

    /// Transitions GATHERING/AGGREGATING -> COMPLETE, stores the
    /// preprocessed keys, and freezes the record.
    fn complete_aggregation(&self, construction_id: ConstructionId, keys: PreprocessedKeys);

    /// Retains only the construction whose target matches `target_hash`.
    fn purge_constructions_not_for(&self, target_hash: Hash);
}
