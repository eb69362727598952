//! The construction controller - the core per-construction state machine.
//!
//! Shaped as a service struct generic over its outbound ports, driving a
//! tagged-enum phase through a pure transition function, the same way the
//! rest of this workspace structures its long-lived stateful services.
//! This controller is explicitly **not** thread-safe - only the consensus
//! thread mutates it - so callers take `&mut self`, there is no internal
//! lock, and the registry is the only thing permitted to hold one.

use std::collections::BTreeMap;
use std::sync::Arc;

use hints_common::{
    super_majority_threshold, ConfigurationError, ConsensusTime, ConstructionId, Hash, NodeId,
    Roster, Urgency, Weight,
};
use hints_crypto::{BlsPublicKey, BlsSecretKey, HintEntry, HintsCrypto, PreprocessedKeys};
use hints_gateway::SubmissionsGateway;
use hints_store::HintsStoreWriter;
use tokio::task::JoinHandle;

use crate::config::HintsConfig;
use crate::domain::{ControllerSnapshot, Phase, PhaseKind, RejectionReason};
use crate::metrics;
use crate::ports::SigningContextSink;

/// A task this controller has dispatched off the consensus thread, kept
/// in a single "pending task" slot rather than a general task queue: each
/// controller tick consults this slot instead of registering a callback.
/// At most one task is ever in flight: `computeHints` while in `Init`,
/// `aggregate` while in `Aggregating`.
enum PendingTask {
    ComputeHints(JoinHandle<Result<Vec<u8>, hints_crypto::CryptoError>>),
    Aggregate(JoinHandle<Result<PreprocessedKeys, hints_crypto::CryptoError>>),
}

/// Everything the controller needs to construct: this node's id, urgency,
/// the BLS key pair, source/target roster weights, the construction
/// record, and handles to the crypto capability, the submissions gateway,
/// and the signing-context sink.
pub struct ConstructionControllerParams<C, G, S> {
    pub node_id: NodeId,
    pub construction_id: ConstructionId,
    pub source_hash: Hash,
    pub target_hash: Hash,
    pub source_roster: Roster,
    pub target_roster: Roster,
    pub secret_key: BlsSecretKey,
    pub public_key: BlsPublicKey,
    pub crypto: Arc<C>,
    pub gateway: Arc<G>,
    pub signing_sink: Arc<S>,
    pub store: Arc<dyn HintsStoreWriter>,
    pub config: HintsConfig,
    pub now: ConsensusTime,
}

/// The construction controller: owns one construction's progress from
/// `Init` through `Complete`.
pub struct ConstructionController<C, G, S>
where
    C: HintsCrypto + 'static,
    G: SubmissionsGateway + 'static,
    S: SigningContextSink + 'static,
{
    node_id: NodeId,
    construction_id: ConstructionId,
    urgency: Urgency,
    k: u32,
    n: u64,
    source_roster: Roster,
    target_roster: Roster,
    source_total_weight: Weight,
    target_total_weight: Weight,
    source_threshold: Weight,
    target_threshold: Weight,

    secret_key: BlsSecretKey,
    public_key: BlsPublicKey,
    crypto: Arc<C>,
    gateway: Arc<G>,
    signing_sink: Arc<S>,
    store: Arc<dyn HintsStoreWriter>,
    config: HintsConfig,

    phase: Phase,
    cancelled: bool,

    /// Validation outcomes, cached so each publication is validated at
    /// most once per controller lifetime.
    validated: BTreeMap<(NodeId, u32), bool>,
    /// Rejection reasons recorded once per (node-id, k).
    rejections: BTreeMap<(NodeId, u32), RejectionReason>,
    /// Admissible publications, keyed by party id so iteration order is
    /// automatically the party-id order `aggregate` requires.
    admissible: BTreeMap<u32, HintEntry>,
    admissible_weight: Weight,
    earliest_admissible_adopted_at: Option<ConsensusTime>,
    last_progress_at: ConsensusTime,

    pending: Option<PendingTask>,
}

impl<C, G, S> ConstructionController<C, G, S>
where
    C: HintsCrypto + 'static,
    G: SubmissionsGateway + 'static,
    S: SigningContextSink + 'static,
{
    /// Build a new controller. Fails with a fatal [`ConfigurationError`]
    /// if the target roster's weight total is zero or its party-size-log2
    /// exceeds `config.max_party_size_log2`; the registry does not create
    /// a controller when this returns `Err`.
    pub fn new(params: ConstructionControllerParams<C, G, S>) -> Result<Self, ConfigurationError> {
        let target_party_size = params.target_roster.party_size();
        let k = target_party_size.k();
        let n = target_party_size.n();

        if k > params.config.max_party_size_log2 {
            return Err(ConfigurationError::OversizeParty {
                node_count: params.target_roster.len(),
                max_k: params.config.max_party_size_log2,
                max_n: 1u64 << params.config.max_party_size_log2,
            });
        }

        let target_total_weight = params.target_roster.total_weight();
        let source_total_weight = params.source_roster.total_weight();
        if target_total_weight == 0 || source_total_weight == 0 {
            return Err(ConfigurationError::ZeroTotalWeight);
        }

        let urgency = Urgency::from_roster_hashes(params.source_hash, params.target_hash);

        Ok(Self {
            node_id: params.node_id,
            construction_id: params.construction_id,
            urgency,
            k,
            n,
            source_roster: params.source_roster,
            target_roster: params.target_roster,
            source_total_weight,
            target_total_weight,
            source_threshold: super_majority_threshold(source_total_weight),
            target_threshold: super_majority_threshold(target_total_weight),
            secret_key: params.secret_key,
            public_key: params.public_key,
            crypto: params.crypto,
            gateway: params.gateway,
            signing_sink: params.signing_sink,
            store: params.store,
            config: params.config,
            phase: Phase::Init,
            cancelled: false,
            validated: BTreeMap::new(),
            rejections: BTreeMap::new(),
            admissible: BTreeMap::new(),
            admissible_weight: 0,
            earliest_admissible_adopted_at: None,
            last_progress_at: params.now,
            pending: None,
        })
    }

    pub fn construction_id(&self) -> ConstructionId {
        self.construction_id
    }

    /// `isStillInProgress()`: true while `phase` is one of `Init`,
    /// `Gathering`, `Aggregating`.
    pub fn is_still_in_progress(&self) -> bool {
        !matches!(self.phase, Phase::Complete { .. })
    }

    /// `hasLog2UniverseSize(k')`.
    pub fn has_log2_universe_size(&self, k_prime: u32) -> bool {
        self.k == k_prime
    }

    /// A read-only snapshot for operational tooling.
    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            construction_id: self.construction_id,
            phase: PhaseKind::from(&self.phase),
            admissible_weight: self.admissible_weight,
            target_threshold: self.target_threshold,
            cancelled: self.cancelled,
        }
    }

    /// Rejections recorded so far, for diagnostics.
    pub fn rejections(&self) -> &BTreeMap<(NodeId, u32), RejectionReason> {
        &self.rejections
    }

    /// `cancelPendingWork()`. Idempotent and non-blocking: in-flight tasks
    /// are left running but their results are discarded on arrival
    /// (`drain_pending_task`), and no further submissions are ever issued.
    pub fn cancel_pending_work(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Advance the controller by one consensus tick. Never blocks: the
    /// only work performed inline is cache lookups, weight arithmetic,
    /// and store reads; `computeHints`/`aggregate` run on
    /// `tokio::task::spawn_blocking` and are only ever polled, never
    /// awaited-to-completion, unless already finished.
    pub async fn tick(&mut self, now: ConsensusTime) {
        if self.cancelled {
            return;
        }
        self.drain_pending_task().await;
        if self.cancelled {
            return;
        }
        match self.phase {
            Phase::Init => self.tick_init().await,
            Phase::Gathering => self.tick_gathering(now).await,
            Phase::Aggregating { .. } => self.tick_aggregating().await,
            Phase::Complete { .. } => {}
        }
    }

    async fn drain_pending_task(&mut self) {
        let Some(task) = self.pending.take() else {
            return;
        };
        match task {
            PendingTask::ComputeHints(handle) => {
                if !handle.is_finished() {
                    self.pending = Some(PendingTask::ComputeHints(handle));
                    return;
                }
                match handle.await {
                    Ok(Ok(hint_bytes)) => {
                        if self.cancelled {
                            return;
                        }
                        self.gateway
                            .submit_publication(self.k, self.public_key.clone(), hint_bytes)
                            .await;
                        tracing::info!(
                            construction_id = self.construction_id,
                            k = self.k,
                            "published own hint key, advancing to GATHERING"
                        );
                        self.phase = Phase::Gathering;
                    }
                    Ok(Err(error)) => {
                        // Crypto failure: the controller reschedules.
                        // Leaving `pending` empty causes
                        // `tick_init` to retry on the next tick.
                        tracing::warn!(
                            construction_id = self.construction_id,
                            %error,
                            "computeHints failed, will retry"
                        );
                    }
                    Err(join_error) => {
                        tracing::warn!(
                            construction_id = self.construction_id,
                            %join_error,
                            "computeHints task did not complete, will retry"
                        );
                    }
                }
            }
            PendingTask::Aggregate(handle) => {
                if !handle.is_finished() {
                    self.pending = Some(PendingTask::Aggregate(handle));
                    return;
                }
                match handle.await {
                    Ok(Ok(keys)) => {
                        if self.cancelled {
                            return;
                        }
                        let hash = keys.hash;
                        self.gateway.submit_vote(self.construction_id, hash).await;
                        tracing::info!(
                            construction_id = self.construction_id,
                            hash = ?hash,
                            "aggregated preprocessed keys, voted"
                        );
                        if let Phase::Aggregating { own_candidate } = &mut self.phase {
                            *own_candidate = Some((hash, keys));
                        }
                    }
                    Ok(Err(error)) => {
                        tracing::warn!(
                            construction_id = self.construction_id,
                            %error,
                            "aggregate failed, will retry"
                        );
                    }
                    Err(join_error) => {
                        tracing::warn!(
                            construction_id = self.construction_id,
                            %join_error,
                            "aggregate task did not complete, will retry"
                        );
                    }
                }
            }
        }
    }

    async fn tick_init(&mut self) {
        if !self.target_roster.contains(&self.node_id) {
            // This node is not a member of the target roster: it has
            // nothing to publish, only to observe.
            self.phase = Phase::Gathering;
            return;
        }

        let already_published = self
            .store
            .publications_for_size_log2(self.k, &[self.node_id])
            .contains_key(&self.node_id);
        if already_published {
            self.phase = Phase::Gathering;
            return;
        }

        if self.pending.is_some() {
            return;
        }
        let crypto = self.crypto.clone();
        let secret = self.secret_key.clone();
        let n = self.n;
        let handle = tokio::task::spawn_blocking(move || crypto.compute_hints(&secret, n));
        self.pending = Some(PendingTask::ComputeHints(handle));
    }

    async fn tick_gathering(&mut self, now: ConsensusTime) {
        let target_ids: Vec<NodeId> = self.target_roster.node_ids().collect();
        let publications = self
            .store
            .publications_for_size_log2(self.k, &target_ids);

        let mut progressed = false;
        for (node_id, record) in &publications {
            let cache_key = (*node_id, self.k);
            if self.validated.contains_key(&cache_key) {
                continue;
            }
            let valid = self
                .crypto
                .validate_hints(&record.public_key, &record.hint_bytes, self.n);
            self.validated.insert(cache_key, valid);

            if !valid {
                self.rejections.insert(cache_key, RejectionReason::InvalidHint);
                metrics::record_rejection("invalid_hint");
                tracing::warn!(%node_id, k = self.k, "publication rejected: invalid hint");
                continue;
            }

            let Some(party_id) = self.target_roster.party_id_of(node_id) else {
                continue;
            };
            let weight = self.target_roster.get(node_id).unwrap_or(0);
            self.admissible.insert(
                party_id,
                HintEntry {
                    party_id,
                    public_key: record.public_key.clone(),
                    hint_bytes: record.hint_bytes.clone(),
                },
            );
            self.admissible_weight += weight;
            self.earliest_admissible_adopted_at = Some(
                self.earliest_admissible_adopted_at
                    .map_or(record.adopted_at, |t| t.min(record.adopted_at)),
            );
            progressed = true;
        }

        if progressed {
            self.last_progress_at = now;
        } else if now.saturating_sub(self.last_progress_at) >= self.config.aggregation_checkpoint_interval
        {
            self.store.reschedule_aggregation_checkpoint(
                self.construction_id,
                now + self.config.aggregation_checkpoint_interval,
            );
            self.last_progress_at = now;
        }

        let weight_ok = self.admissible_weight >= self.target_threshold;
        let fast_path = self.admissible_weight >= self.target_total_weight;
        let grace = self.config.grace_period(self.urgency);
        let grace_elapsed = self
            .earliest_admissible_adopted_at
            .is_some_and(|t0| now >= t0 + grace);

        if fast_path || (grace_elapsed && weight_ok) {
            self.store.set_aggregation_time(self.construction_id, now);
            tracing::info!(
                construction_id = self.construction_id,
                admissible_weight = self.admissible_weight,
                threshold = self.target_threshold,
                "GATHERING complete, advancing to AGGREGATING"
            );
            metrics::record_aggregating_transition();
            self.phase = Phase::Aggregating { own_candidate: None };
        }
    }

    async fn tick_aggregating(&mut self) {
        let has_candidate = matches!(
            &self.phase,
            Phase::Aggregating { own_candidate: Some(_) }
        );
        if self.pending.is_none() && !has_candidate {
            let crypto = self.crypto.clone();
            let entries: Vec<HintEntry> = self.admissible.values().cloned().collect();
            let weights = self.target_roster.weights_by_party();
            let n = self.n;
            let handle =
                tokio::task::spawn_blocking(move || crypto.aggregate(&entries, &weights, n));
            self.pending = Some(PendingTask::Aggregate(handle));
        }

        let Phase::Aggregating { own_candidate } = &self.phase else {
            return;
        };
        let Some((candidate_hash, candidate_keys)) = own_candidate.clone() else {
            return;
        };

        let source_ids: Vec<NodeId> = self.source_roster.node_ids().collect();
        let votes = self.store.votes_for(self.construction_id, &source_ids);
        let weight_for_candidate: Weight = votes
            .iter()
            .filter(|(_, hash)| **hash == candidate_hash)
            .map(|(voter, _)| self.source_roster.get(voter).unwrap_or(0))
            .sum();

        if weight_for_candidate >= self.source_threshold {
            self.store
                .complete_aggregation(self.construction_id, candidate_keys.clone());
            self.signing_sink
                .on_aggregation_complete(self.construction_id, candidate_keys.clone())
                .await;
            tracing::info!(
                construction_id = self.construction_id,
                hash = ?candidate_hash,
                "AGGREGATING complete, construction COMPLETE"
            );
            metrics::record_completion();
            self.phase = Phase::Complete {
                hash: candidate_hash,
                keys: candidate_keys,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hints_gateway::InMemorySubmissionsGateway;
    use hints_store::InMemoryHintsStore;
    use hints_crypto::BlstHintsCrypto;

    use crate::ports::InMemorySigningContextSink;

    fn roster(weights: &[(u64, u64)]) -> Roster {
        let mut roster = Roster::new();
        for (id, weight) in weights {
            roster.insert(NodeId(*id), *weight);
        }
        roster
    }

    fn make_controller(
        node_id: u64,
        source_hash: Hash,
        target_hash: Hash,
        source_roster: Roster,
        target_roster: Roster,
        config: HintsConfig,
        store: Arc<InMemoryHintsStore>,
        gateway: Arc<InMemorySubmissionsGateway>,
        sink: Arc<InMemorySigningContextSink>,
    ) -> ConstructionController<BlstHintsCrypto, InMemorySubmissionsGateway, InMemorySigningContextSink>
    {
        let crypto = Arc::new(BlstHintsCrypto);
        let (secret, public) = {
            use hints_crypto::HintsCrypto;
            crypto.generate_key_pair()
        };
        ConstructionController::new(ConstructionControllerParams {
            node_id: NodeId(node_id),
            construction_id: 1,
            source_hash,
            target_hash,
            source_roster,
            target_roster,
            secret_key: secret,
            public_key: public,
            crypto,
            gateway,
            signing_sink: sink,
            store,
            config,
            now: 0,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn single_node_completes_in_few_ticks_with_high_urgency() {
        // Weight 2 so this node's own vote alone can cross the
        // super-majority threshold (threshold(2) == 2); weight 1 never
        // could (threshold(1) == 2 > 1).
        let roster = roster(&[(1, 2)]);
        let store = Arc::new(InMemoryHintsStore::new());
        let gateway = Arc::new(InMemorySubmissionsGateway::new());
        let sink = Arc::new(InMemorySigningContextSink::new());
        let hash = [1u8; 32];

        let mut controller = make_controller(
            1,
            hash,
            hash,
            roster.clone(),
            roster,
            HintsConfig {
                urgent_hints_keys_wait_period: 0,
                ..HintsConfig::default()
            },
            store.clone(),
            gateway.clone(),
            sink.clone(),
        );

        // There is no consensus engine in this test, so submissions are
        // replayed into the store by hand between ticks - standing in for
        // the surrounding consensus layer applying this node's own
        // submissions back into its store.
        for t in 0..20u64 {
            controller.tick(t).await;
            for publication in gateway.publications() {
                store.record_publication(
                    NodeId(1),
                    publication.k,
                    publication.public_key.clone(),
                    publication.hint_bytes.clone(),
                    t,
                );
            }
            for vote in gateway.votes() {
                store.record_vote(NodeId(1), vote.construction_id, vote.preprocessed_keys_hash);
            }
            if !controller.is_still_in_progress() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        assert!(!controller.is_still_in_progress());
        assert_eq!(sink.completions().len(), 1);
        assert_eq!(gateway.publications().len(), 1);
        assert_eq!(gateway.votes().len(), 1);
    }

    #[tokio::test]
    async fn cancellation_prevents_further_submissions() {
        let roster = roster(&[(1, 1)]);
        let store = Arc::new(InMemoryHintsStore::new());
        let gateway = Arc::new(InMemorySubmissionsGateway::new());
        let sink = Arc::new(InMemorySigningContextSink::new());
        let hash = [1u8; 32];

        let mut controller = make_controller(
            1, hash, hash, roster.clone(), roster,
            HintsConfig::default(), store, gateway.clone(), sink.clone(),
        );

        controller.cancel_pending_work();
        controller.cancel_pending_work(); // idempotent
        for t in 0..5u64 {
            controller.tick(t).await;
        }

        assert!(gateway.publications().is_empty());
        assert!(sink.completions().is_empty());
    }

    #[test]
    fn zero_target_weight_is_a_configuration_error() {
        let empty = Roster::new();
        let crypto = Arc::new(BlstHintsCrypto);
        let (secret, public) = {
            use hints_crypto::HintsCrypto;
            crypto.generate_key_pair()
        };
        let store = Arc::new(InMemoryHintsStore::new());
        let gateway = Arc::new(InMemorySubmissionsGateway::new());
        let sink = Arc::new(InMemorySigningContextSink::new());

        let result = ConstructionController::new(ConstructionControllerParams {
            node_id: NodeId(1),
            construction_id: 1,
            source_hash: [0u8; 32],
            target_hash: [0u8; 32],
            source_roster: roster(&[(1, 1)]),
            target_roster: empty,
            secret_key: secret,
            public_key: public,
            crypto,
            gateway,
            signing_sink: sink,
            store,
            config: HintsConfig::default(),
            now: 0,
        });
        assert!(matches!(result, Err(ConfigurationError::ZeroTotalWeight)));
    }

    #[test]
    fn oversize_party_is_a_configuration_error() {
        let mut target = Roster::new();
        for id in 0..10u64 {
            target.insert(NodeId(id), 1);
        }
        let crypto = Arc::new(BlstHintsCrypto);
        let (secret, public) = {
            use hints_crypto::HintsCrypto;
            crypto.generate_key_pair()
        };
        let store = Arc::new(InMemoryHintsStore::new());
        let gateway = Arc::new(InMemorySubmissionsGateway::new());
        let sink = Arc::new(InMemorySigningContextSink::new());

        let result = ConstructionController::new(ConstructionControllerParams {
            node_id: NodeId(1),
            construction_id: 1,
            source_hash: [0u8; 32],
            target_hash: [0u8; 32],
            source_roster: roster(&[(1, 1)]),
            target_roster: target,
            secret_key: secret,
            public_key: public,
            crypto,
            gateway,
            signing_sink: sink,
            store,
            config: HintsConfig {
                max_party_size_log2: 2, // N=4, but 10 nodes -> k=4
                ..HintsConfig::default()
            },
            now: 0,
        });
        assert!(matches!(
            result,
            Err(ConfigurationError::OversizeParty { .. })
        ));
    }
}
