//! End-to-end scenarios driving the controller, registry, store, and
//! gateway together (SPEC_FULL.md Section 8, "End-to-end scenarios (seed
//! the test suite)"). A dedicated `publish = false` crate, grounded on the
//! teacher's `integration-tests` crate, rather than smearing cross-crate
//! scenario tests across each component's own unit tests.
//!
//! Every scenario uses a single shared [`InMemoryHintsStore`] standing in
//! for the consensus substrate: each simulated node's gateway records its
//! own submissions, which the harness replays into the shared store
//! between ticks, exactly the way `hints-node`'s demonstration wiring
//! does (there is no real network in this crate either).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use hints_common::{ConsensusTime, ConstructionId, Hash, InMemoryRosterStore, NodeId, Roster};
use hints_controller::{
    ConstructionController, ConstructionControllerParams, HintsConfig, InMemorySigningContextSink,
};
use hints_crypto::{BlsPublicKey, BlsSecretKey, BlstHintsCrypto, CryptoError, HintEntry, HintsCrypto, PreprocessedKeys};
use hints_gateway::InMemorySubmissionsGateway;
use hints_keystore::InMemoryKeyPairStore;
use hints_registry::{ControllerRegistry, ControllerRegistryParams};
use hints_store::InMemoryHintsStore;

/// Build a roster from `(node-id, weight)` pairs.
pub fn roster(weights: &[(u64, u64)]) -> Roster {
    let mut roster = Roster::new();
    for (id, weight) in weights {
        roster.insert(NodeId(*id), *weight);
    }
    roster
}

/// A [`HintsCrypto`] wrapper that sleeps before `compute_hints`, used by
/// Scenario F to force the off-thread task for one node to finish after
/// the other's - without it, the two tasks would race on real wall-clock
/// scheduling and the test would not reliably exercise either ordering.
#[derive(Clone)]
pub struct DelayedCrypto {
    inner: BlstHintsCrypto,
    delay: Duration,
}

impl DelayedCrypto {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: BlstHintsCrypto,
            delay,
        }
    }
}

impl HintsCrypto for DelayedCrypto {
    fn generate_key_pair(&self) -> (BlsSecretKey, BlsPublicKey) {
        self.inner.generate_key_pair()
    }

    fn compute_hints(&self, private_key: &BlsSecretKey, n: u64) -> Result<Vec<u8>, CryptoError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.inner.compute_hints(private_key, n)
    }

    fn validate_hints(&self, public_key: &BlsPublicKey, hint_bytes: &[u8], n: u64) -> bool {
        self.inner.validate_hints(public_key, hint_bytes, n)
    }

    fn aggregate(
        &self,
        entries: &[HintEntry],
        weights: &[u64],
        n: u64,
    ) -> Result<PreprocessedKeys, CryptoError> {
        self.inner.aggregate(entries, weights, n)
    }

    fn sign_partial(
        &self,
        message: &[u8],
        private_key: &BlsSecretKey,
    ) -> hints_crypto::PartialSignature {
        self.inner.sign_partial(message, private_key)
    }

    fn verify_partial(
        &self,
        message: &[u8],
        partial: &hints_crypto::PartialSignature,
        public_key: &BlsPublicKey,
    ) -> bool {
        self.inner.verify_partial(message, partial, public_key)
    }

    fn aggregate_signatures(
        &self,
        aggregation_key: &hints_crypto::AggregationKey,
        partials: &[hints_crypto::PartialSignature],
    ) -> Result<hints_crypto::BlsSignature, CryptoError> {
        self.inner.aggregate_signatures(aggregation_key, partials)
    }

    fn extract_public_key(
        &self,
        aggregation_key: &hints_crypto::AggregationKey,
        party_id: u32,
    ) -> Option<BlsPublicKey> {
        self.inner.extract_public_key(aggregation_key, party_id)
    }
}

/// One simulated network participant, generic over the crypto capability
/// so Scenario F can give different nodes different (artificially
/// delayed) implementations while every other scenario uses the plain
/// `BlstHintsCrypto`.
pub struct SimNode<C: HintsCrypto + 'static> {
    pub node_id: NodeId,
    pub gateway: Arc<InMemorySubmissionsGateway>,
    pub sink: Arc<InMemorySigningContextSink>,
    pub controller: ConstructionController<C, InMemorySubmissionsGateway, InMemorySigningContextSink>,
}

impl<C: HintsCrypto + 'static> SimNode<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        node_id: NodeId,
        construction_id: ConstructionId,
        source_hash: Hash,
        target_hash: Hash,
        source_roster: Roster,
        target_roster: Roster,
        crypto: Arc<C>,
        config: HintsConfig,
        store: Arc<InMemoryHintsStore>,
    ) -> Self {
        let (secret, public) = crypto.generate_key_pair();
        let gateway = Arc::new(InMemorySubmissionsGateway::new());
        let sink = Arc::new(InMemorySigningContextSink::new());
        let controller = ConstructionController::new(ConstructionControllerParams {
            node_id,
            construction_id,
            source_hash,
            target_hash,
            source_roster,
            target_roster,
            secret_key: secret,
            public_key: public,
            crypto,
            gateway: gateway.clone(),
            signing_sink: sink.clone(),
            store,
            config,
            now: 0,
        })
        .expect("scenario rosters are well-formed");
        Self {
            node_id,
            gateway,
            sink,
            controller,
        }
    }

    /// Replay this node's pending submissions into the shared store,
    /// standing in for the surrounding consensus layer (Section 9).
    pub fn replay(&self, store: &InMemoryHintsStore, now: ConsensusTime) {
        for publication in self.gateway.publications() {
            store.record_publication(
                self.node_id,
                publication.k,
                publication.public_key.clone(),
                publication.hint_bytes.clone(),
                now,
            );
        }
        for vote in self.gateway.votes() {
            store.record_vote(self.node_id, vote.construction_id, vote.preprocessed_keys_hash);
        }
    }
}

/// Drive every node's controller for up to `max_ticks` consensus ticks,
/// replaying submissions into `store` after each tick, stopping early if
/// every node has left `isStillInProgress`.
pub async fn run_until_complete<C: HintsCrypto + 'static>(
    nodes: &mut [SimNode<C>],
    store: &InMemoryHintsStore,
    max_ticks: u64,
) {
    for now in 0..max_ticks {
        for node in nodes.iter_mut() {
            node.controller.tick(now).await;
            node.replay(store, now);
        }
        if nodes.iter().all(|n| !n.controller.is_still_in_progress()) {
            break;
        }
        // Give any in-flight `spawn_blocking` task (notably `DelayedCrypto`
        // in Scenario F) a slice of real wall-clock time to finish, the
        // same way the controller's own unit tests pace their tick loop.
        tokio::time::sleep(Duration::from_millis(3)).await;
    }
}

#[cfg(test)]
mod scenarios {
    use super::*;

    fn config(grace: ConsensusTime) -> HintsConfig {
        HintsConfig {
            urgent_hints_keys_wait_period: grace,
            relaxed_hints_keys_wait_period: grace,
            ..HintsConfig::default()
        }
    }

    fn weights(roster: &Roster) -> BTreeMap<NodeId, u64> {
        roster.iter().collect()
    }

    /// Scenario A (Section 8): happy path, 4 equal-weight nodes, HIGH
    /// urgency. Every node publishes, crosses the super-majority weight
    /// threshold, aggregates deterministically, and votes/completes with
    /// an identical hash.
    #[tokio::test]
    async fn scenario_a_happy_path_four_equal_weight_nodes() {
        let roster = roster(&[(0, 1), (1, 1), (2, 1), (3, 1)]);
        let hash = [1u8; 32];
        let store = Arc::new(InMemoryHintsStore::new());
        let crypto = Arc::new(BlstHintsCrypto);

        let mut nodes: Vec<SimNode<BlstHintsCrypto>> = weights(&roster)
            .keys()
            .map(|node_id| {
                SimNode::new(
                    *node_id,
                    1,
                    hash,
                    hash,
                    roster.clone(),
                    roster.clone(),
                    crypto.clone(),
                    config(0),
                    store.clone(),
                )
            })
            .collect();

        run_until_complete(&mut nodes, &store, 20).await;

        let hashes: Vec<Hash> = nodes
            .iter()
            .map(|n| {
                let completions = n.sink.completions();
                assert_eq!(completions.len(), 1, "node {} did not complete", n.node_id);
                completions[0].1.hash
            })
            .collect();
        assert!(hashes.windows(2).all(|w| w[0] == w[1]), "hashes diverged");
    }

    /// Scenario B (Section 8): a laggard. N3 never publishes; admissible
    /// weight of 3 never crosses the threshold of 4 for a total weight of
    /// 4. No controller reaches COMPLETE.
    #[tokio::test]
    async fn scenario_b_laggard_never_crosses_threshold() {
        let roster = roster(&[(0, 1), (1, 1), (2, 1), (3, 1)]);
        let hash = [2u8; 32];
        let store = Arc::new(InMemoryHintsStore::new());
        let crypto = Arc::new(BlstHintsCrypto);

        // Only nodes 0-2 run controllers; node 3 never publishes.
        let mut nodes: Vec<SimNode<BlstHintsCrypto>> = [0u64, 1, 2]
            .into_iter()
            .map(|id| {
                SimNode::new(
                    NodeId(id),
                    1,
                    hash,
                    hash,
                    roster.clone(),
                    roster.clone(),
                    crypto.clone(),
                    config(0),
                    store.clone(),
                )
            })
            .collect();

        run_until_complete(&mut nodes, &store, 20).await;

        for node in &nodes {
            assert!(node.sink.completions().is_empty(), "node {} should not complete", node.node_id);
            assert!(node.controller.is_still_in_progress());
        }
    }

    /// Scenario C (Section 8): a bad hint. N2's publication never
    /// validates; admissible weight is permanently 3 of a threshold-4
    /// total, and a "resubmission" under first-wins does not help.
    #[tokio::test]
    async fn scenario_c_bad_hint_stalls_and_resubmission_does_not_help() {
        let roster = roster(&[(0, 1), (1, 1), (2, 1), (3, 1)]);
        let hash = [3u8; 32];
        let store = Arc::new(InMemoryHintsStore::new());
        let crypto = Arc::new(BlstHintsCrypto);

        // Pre-publish an invalid hint for node 2 before its controller
        // ever ticks, so `tick_init` sees "already published" and never
        // overwrites it (Section 4.1, first-wins).
        let (_, bad_public_key) = crypto.generate_key_pair();
        store.record_publication(NodeId(2), 2, bad_public_key.clone(), vec![0xFF; 32], 0);

        let mut nodes: Vec<SimNode<BlstHintsCrypto>> = [0u64, 1, 2, 3]
            .into_iter()
            .map(|id| {
                SimNode::new(
                    NodeId(id),
                    1,
                    hash,
                    hash,
                    roster.clone(),
                    roster.clone(),
                    crypto.clone(),
                    config(0),
                    store.clone(),
                )
            })
            .collect();

        run_until_complete(&mut nodes, &store, 20).await;

        for node in &nodes {
            assert!(node.sink.completions().is_empty());
        }

        // A later, validly-hinted resubmission for (node 2, k=2) is
        // ignored: first-wins means the admissible set can never include
        // node 2's weight for this construction.
        let (secret, good_public_key) = crypto.generate_key_pair();
        let good_hints = crypto.compute_hints(&secret, 4).unwrap();
        store.record_publication(NodeId(2), 2, good_public_key, good_hints, 5);

        let mut nodes2 = nodes;
        run_until_complete(&mut nodes2, &store, 20).await;
        for node in &nodes2 {
            assert!(node.sink.completions().is_empty(), "resubmission should not unstick the construction");
        }
    }

    /// Scenario D (Section 8): weighted super-majority. Target =
    /// {N0:5, N1:3, N2:1, N3:1}, total 10, threshold 8. N0 and N1 alone
    /// (weight 8) cross the threshold and complete without N2 or N3 ever
    /// publishing or voting.
    #[tokio::test]
    async fn scenario_d_weighted_super_majority_without_all_participants() {
        let roster = roster(&[(0, 5), (1, 3), (2, 1), (3, 1)]);
        let hash = [4u8; 32];
        let store = Arc::new(InMemoryHintsStore::new());
        let crypto = Arc::new(BlstHintsCrypto);

        let mut nodes: Vec<SimNode<BlstHintsCrypto>> = [0u64, 1]
            .into_iter()
            .map(|id| {
                SimNode::new(
                    NodeId(id),
                    1,
                    hash,
                    hash,
                    roster.clone(),
                    roster.clone(),
                    crypto.clone(),
                    config(0),
                    store.clone(),
                )
            })
            .collect();

        run_until_complete(&mut nodes, &store, 20).await;

        for node in &nodes {
            assert_eq!(node.sink.completions().len(), 1, "node {} should complete", node.node_id);
        }
    }

    /// Scenario E (Section 8): supersession. A new construction (target
    /// roster B) arrives while the registry is still midway through an
    /// older one (target roster A); the registry drops and cancels the
    /// old controller in favor of the new one, satisfying invariant 3
    /// ("at any instant, the registry holds at most one controller") -
    /// exercised here through the real [`ControllerRegistry`] and
    /// [`InMemoryHintsStore::new_construction_for`], the way a node's own
    /// driving loop would call it, rather than poking a bare controller.
    #[tokio::test]
    async fn scenario_e_supersession_drops_old_construction() {
        let hash_a = [5u8; 32]; // HIGH urgency: source == target == hash_a.
        let hash_b = [6u8; 32]; // LOW urgency once B supersedes A.

        let roster_a = roster(&[(0, 1), (1, 1)]);
        let roster_b = roster(&[(0, 1), (1, 1), (2, 1)]);

        let mut roster_store = InMemoryRosterStore::new();
        roster_store.insert(hash_a, roster_a);
        roster_store.insert(hash_b, roster_b);

        let store = Arc::new(InMemoryHintsStore::new());
        let gateway = Arc::new(InMemorySubmissionsGateway::new());
        let sink = Arc::new(InMemorySigningContextSink::new());
        let registry = ControllerRegistry::new(ControllerRegistryParams {
            node_id: NodeId(0),
            crypto: Arc::new(BlstHintsCrypto),
            gateway: gateway.clone(),
            signing_sink: sink.clone(),
            store: store.clone(),
            key_store: Arc::new(InMemoryKeyPairStore::new()),
            config: config(0),
        });

        let construction_a = store
            .new_construction_for(hash_a, hash_a, &roster_store, 0)
            .unwrap();
        registry
            .get_or_create_controller_for(&construction_a, &roster_store, 0)
            .unwrap();
        registry.tick_current(0).await;
        for publication in gateway.publications() {
            store.record_publication(
                NodeId(0),
                publication.k,
                publication.public_key.clone(),
                publication.hint_bytes.clone(),
                0,
            );
        }
        assert!(registry.get_in_progress_by_id(construction_a.id).is_some());
        let votes_before_supersession = gateway.votes().len();

        // Construction B (a fresh target roster) supersedes A.
        let construction_b = store
            .new_construction_for(hash_a, hash_b, &roster_store, 5)
            .unwrap();
        registry
            .get_or_create_controller_for(&construction_b, &roster_store, 5)
            .unwrap();

        assert!(
            registry.get_in_progress_by_id(construction_a.id).is_none(),
            "the superseded construction must no longer be held"
        );
        assert!(registry.get_in_progress_by_id(construction_b.id).is_some());

        for now in 6..20u64 {
            registry.tick_current(now).await;
            for vote in gateway.votes() {
                store.record_vote(NodeId(0), vote.construction_id, vote.preprocessed_keys_hash);
            }
        }

        assert!(
            gateway
                .votes()
                .iter()
                .skip(votes_before_supersession)
                .all(|v| v.construction_id != construction_a.id),
            "the cancelled construction must never vote after supersession"
        );
    }

    /// Scenario F (Section 8): determinism under reordering of in-flight
    /// tasks. Two nodes' `computeHints` executor tasks finish in opposite
    /// orders across two runs (forced via [`DelayedCrypto`]); both runs
    /// must converge on the same final preprocessed-keys hash.
    #[tokio::test]
    async fn scenario_f_deterministic_under_task_reordering() {
        async fn run_with_slow_node(slow_node: u64) -> Hash {
            let roster = roster(&[(0, 1), (1, 1)]);
            let hash = [7u8; 32];
            let store = Arc::new(InMemoryHintsStore::new());

            let crypto_for = |id: u64| {
                let delay = if id == slow_node {
                    Duration::from_millis(30)
                } else {
                    Duration::ZERO
                };
                Arc::new(DelayedCrypto::new(delay))
            };

            let mut nodes: Vec<SimNode<DelayedCrypto>> = [0u64, 1]
                .into_iter()
                .map(|id| {
                    SimNode::new(
                        NodeId(id),
                        1,
                        hash,
                        hash,
                        roster.clone(),
                        roster.clone(),
                        crypto_for(id),
                        config(0),
                        store.clone(),
                    )
                })
                .collect();

            run_until_complete(&mut nodes, &store, 100).await;

            let mut result = None;
            for node in &nodes {
                let completions = node.sink.completions();
                assert_eq!(completions.len(), 1, "node {} should complete", node.node_id);
                let h = completions[0].1.hash;
                if let Some(prev) = result {
                    assert_eq!(prev, h, "nodes within one run must agree");
                }
                result = Some(h);
            }
            result.unwrap()
        }

        let hash_slow_0 = run_with_slow_node(0).await;
        let hash_slow_1 = run_with_slow_node(1).await;
        assert_eq!(
            hash_slow_0, hash_slow_1,
            "reordering which node's computeHints finishes last must not change the result"
        );
    }
}
