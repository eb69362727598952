//! An in-memory [`HintsStoreWriter`] implementation.
//!
//! Mirrors `qc-09-finality::state::FinalityServiceState`: one owned state
//! struct behind a `parking_lot::RwLock`, with plain methods implementing
//! the append-only / first-wins invariants directly rather than through a
//! generic transactional layer - this subsystem's actual consensus
//! replication substrate is an external collaborator (Section 1, out of
//! scope), so this adapter stands in for "whatever the surrounding node's
//! consensus state happens to be" in tests and the demonstration binary.

use std::collections::{BTreeMap, HashMap};

use hints_common::{ConfigurationError, ConsensusTime, ConstructionId, Hash, NodeId, RosterStore};
use hints_crypto::{BlsPublicKey, PreprocessedKeys};
use parking_lot::RwLock;

use crate::domain::{ConstructionRecord, ConstructionState, PublicationRecord};
use crate::ports::{HintsStoreReader, HintsStoreWriter};

#[derive(Default)]
struct State {
    next_construction_id: ConstructionId,
    constructions: BTreeMap<ConstructionId, ConstructionRecord>,
    active_id: Option<ConstructionId>,
    publications: HashMap<(NodeId, u32), PublicationRecord>,
    votes: HashMap<ConstructionId, BTreeMap<NodeId, Hash>>,
    completed_keys: HashMap<ConstructionId, PreprocessedKeys>,
}

/// An in-memory hints store.
#[derive(Default)]
pub struct InMemoryHintsStore {
    state: RwLock<State>,
}

impl InMemoryHintsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The preprocessed keys completed for `construction_id`, if any.
    /// Not part of the spec's store ports (which only expose the hash
    /// through the construction record); exposed here for the signing
    /// context consumers that need the full object after COMPLETE.
    pub fn completed_keys(&self, construction_id: ConstructionId) -> Option<PreprocessedKeys> {
        self.state.read().completed_keys.get(&construction_id).cloned()
    }
}

impl HintsStoreReader for InMemoryHintsStore {
    fn publications_for_size_log2(
        &self,
        k: u32,
        node_ids: &[NodeId],
    ) -> BTreeMap<NodeId, PublicationRecord> {
        let state = self.state.read();
        node_ids
            .iter()
            .filter_map(|node_id| {
                state
                    .publications
                    .get(&(*node_id, k))
                    .map(|record| (*node_id, record.clone()))
            })
            .collect()
    }

    fn votes_for(
        &self,
        construction_id: ConstructionId,
        voter_node_ids: &[NodeId],
    ) -> BTreeMap<NodeId, Hash> {
        let state = self.state.read();
        let Some(votes) = state.votes.get(&construction_id) else {
            return BTreeMap::new();
        };
        voter_node_ids
            .iter()
            .filter_map(|node_id| votes.get(node_id).map(|hash| (*node_id, *hash)))
            .collect()
    }

    fn get_active_construction(&self) -> Option<ConstructionRecord> {
        let state = self.state.read();
        state
            .active_id
            .and_then(|id| state.constructions.get(&id).cloned())
    }
}

impl HintsStoreWriter for InMemoryHintsStore {
    fn record_publication(
        &self,
        node_id: NodeId,
        k: u32,
        public_key: BlsPublicKey,
        hint_bytes: Vec<u8>,
        consensus_now: ConsensusTime,
    ) {
        let mut state = self.state.write();
        state.publications.entry((node_id, k)).or_insert_with(|| {
            tracing::debug!(%node_id, k, "recorded new hint publication");
            PublicationRecord {
                node_id,
                k,
                public_key,
                hint_bytes,
                adopted_at: consensus_now,
            }
        });
    }

    fn record_vote(
        &self,
        voter_node_id: NodeId,
        construction_id: ConstructionId,
        preprocessed_keys_hash: Hash,
    ) {
        let mut state = self.state.write();
        let votes = state.votes.entry(construction_id).or_default();
        votes.entry(voter_node_id).or_insert_with(|| {
            tracing::debug!(%voter_node_id, construction_id, "recorded new vote");
            preprocessed_keys_hash
        });
    }

    fn new_construction_for(
        &self,
        source_hash: Hash,
        target_hash: Hash,
        roster_store: &dyn RosterStore,
        now: ConsensusTime,
    ) -> Result<ConstructionRecord, ConfigurationError> {
        roster_store
            .get(source_hash)
            .ok_or(ConfigurationError::MissingRoster { hash: source_hash })?;
        roster_store
            .get(target_hash)
            .ok_or(ConfigurationError::MissingRoster { hash: target_hash })?;

        let mut state = self.state.write();
        let id = state.next_construction_id;
        state.next_construction_id += 1;

        // "at most two constructions coexist": drop every non-COMPLETE
        // record (the superseded active one), then keep only the most
        // recent COMPLETE record as history.
        state
            .constructions
            .retain(|_, record| record.is_complete());
        if let Some(&keep) = state.constructions.keys().max() {
            state.constructions.retain(|id, _| *id == keep);
        }

        let record = ConstructionRecord {
            id,
            source_hash,
            target_hash,
            state: ConstructionState::Gathering,
            grace_period_start: now,
            aggregation_started_at: None,
            next_checkpoint: None,
        };
        state.constructions.insert(id, record.clone());
        state.active_id = Some(id);
        tracing::info!(construction_id = id, "new construction allocated");
        Ok(record)
    }

    fn set_aggregation_time(&self, construction_id: ConstructionId, now: ConsensusTime) {
        let mut state = self.state.write();
        if let Some(record) = state.constructions.get_mut(&construction_id) {
            record.aggregation_started_at = Some(now);
            record.state = ConstructionState::Aggregating;
        }
    }

    fn reschedule_aggregation_checkpoint(&self, construction_id: ConstructionId, then: ConsensusTime) {
        let mut state = self.state.write();
        if let Some(record) = state.constructions.get_mut(&construction_id) {
            record.next_checkpoint = Some(then);
        }
    }

    fn complete_aggregation(&self, construction_id: ConstructionId, keys: PreprocessedKeys) {
        let mut state = self.state.write();
        let hash = keys.hash;
        state.completed_keys.insert(construction_id, keys);
        if let Some(record) = state.constructions.get_mut(&construction_id) {
            record.state = ConstructionState::Complete {
                preprocessed_keys_hash: hash,
            };
            tracing::info!(construction_id, "construction complete");
        }
    }

    fn purge_constructions_not_for(&self, target_hash: Hash) {
        let mut state = self.state.write();
        state.constructions.retain(|_, r| r.target_hash == target_hash);
        if let Some(active_id) = state.active_id {
            if !state.constructions.contains_key(&active_id) {
                state.active_id = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hints_common::Roster;

    fn roster_store_with(hash: Hash, roster: Roster) -> hints_common::InMemoryRosterStore {
        let mut store = hints_common::InMemoryRosterStore::new();
        store.insert(hash, roster);
        store
    }

    #[test]
    fn publication_first_wins() {
        let store = InMemoryHintsStore::new();
        let node = NodeId(1);
        let (_, pk1) = hints_crypto::BlstHintsCrypto.generate_key_pair();
        let (_, pk2) = hints_crypto::BlstHintsCrypto.generate_key_pair();
        use hints_crypto::HintsCrypto;

        store.record_publication(node, 2, pk1.clone(), vec![1], 10);
        store.record_publication(node, 2, pk2, vec![2], 20);

        let result = store.publications_for_size_log2(2, &[node]);
        assert_eq!(result[&node].public_key, pk1);
        assert_eq!(result[&node].adopted_at, 10);
    }

    #[test]
    fn vote_first_wins() {
        let store = InMemoryHintsStore::new();
        let node = NodeId(1);
        store.record_vote(node, 5, [1u8; 32]);
        store.record_vote(node, 5, [2u8; 32]);
        let votes = store.votes_for(5, &[node]);
        assert_eq!(votes[&node], [1u8; 32]);
    }

    #[test]
    fn new_construction_requires_both_rosters() {
        let store = InMemoryHintsStore::new();
        let mut roster = Roster::new();
        roster.insert(NodeId(1), 1);
        let roster_store = roster_store_with([1u8; 32], roster);

        let result = store.new_construction_for([1u8; 32], [2u8; 32], &roster_store, 0);
        assert!(matches!(
            result,
            Err(ConfigurationError::MissingRoster { hash }) if hash == [2u8; 32]
        ));
    }

    #[test]
    fn new_construction_supersedes_prior_gathering() {
        let store = InMemoryHintsStore::new();
        let mut roster = Roster::new();
        roster.insert(NodeId(1), 1);
        let roster_store = roster_store_with([1u8; 32], roster);

        let first = store
            .new_construction_for([1u8; 32], [1u8; 32], &roster_store, 0)
            .unwrap();
        let second = store
            .new_construction_for([1u8; 32], [1u8; 32], &roster_store, 1)
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(store.get_active_construction().unwrap().id, second.id);
    }
}
