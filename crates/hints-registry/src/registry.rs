//! The controller registry (Section 4.6): a long-lived, process-wide
//! object holding at most one in-memory [`ConstructionController`].
//!
//! Grounded on `node-runtime::registry::SubsystemRegistry` (a single struct
//! owning long-lived subsystem handles behind a lock, looked up by id) and
//! Section 9's explicit re-architecture note: "the registry exclusively
//! owns the controller; the controller receives submission and
//! signing-context handles by value at construction and never refers back
//! to the registry" - so unlike the teacher's registry, nothing here is a
//! back-reference.

use std::sync::Arc;

use hints_common::{ConfigurationError, ConsensusTime, ConstructionId, NodeId, RosterStore};
use hints_controller::{
    ConstructionController, ConstructionControllerParams, ControllerSnapshot, HintsConfig,
    SigningContextSink,
};
use hints_crypto::{BlsSecretKey, HintsCrypto};
use hints_gateway::SubmissionsGateway;
use hints_keystore::KeyPairStore;
use hints_store::{ConstructionRecord, HintsStoreWriter};
use parking_lot::RwLock;

use crate::errors::RegistryError;
use crate::metrics;

/// Everything the registry needs to create controllers on demand.
pub struct ControllerRegistryParams<C, G, S> {
    pub node_id: NodeId,
    pub crypto: Arc<C>,
    pub gateway: Arc<G>,
    pub signing_sink: Arc<S>,
    pub store: Arc<dyn HintsStoreWriter>,
    pub key_store: Arc<dyn KeyPairStore>,
    pub config: HintsConfig,
}

/// Holds at most one [`ConstructionController`], enforcing the
/// at-most-one-active-controller policy of Section 4.6.
///
/// `single-writer, multi-reader` (Section 4.6): reads (the snapshot
/// queries) take a read lock; `get_or_create_controller_for` and
/// `tick_current` - the only mutators - are expected to be called from a
/// single consensus-driving thread, same as the controller itself
/// (Section 5).
pub struct ControllerRegistry<C, G, S>
where
    C: HintsCrypto + 'static,
    G: SubmissionsGateway + 'static,
    S: SigningContextSink + 'static,
{
    node_id: NodeId,
    crypto: Arc<C>,
    gateway: Arc<G>,
    signing_sink: Arc<S>,
    store: Arc<dyn HintsStoreWriter>,
    key_store: Arc<dyn KeyPairStore>,
    config: HintsConfig,
    current: RwLock<Option<ConstructionController<C, G, S>>>,
}

impl<C, G, S> ControllerRegistry<C, G, S>
where
    C: HintsCrypto + 'static,
    G: SubmissionsGateway + 'static,
    S: SigningContextSink + 'static,
{
    pub fn new(params: ControllerRegistryParams<C, G, S>) -> Self {
        Self {
            node_id: params.node_id,
            crypto: params.crypto,
            gateway: params.gateway,
            signing_sink: params.signing_sink,
            store: params.store,
            key_store: params.key_store,
            config: params.config,
            current: RwLock::new(None),
        }
    }

    /// `getOrCreateControllerFor(construction, hintsStore, rosterStore)`
    /// (Section 4.6). A no-op if the held controller already matches
    /// `construction.id`; otherwise cancels and replaces it.
    pub fn get_or_create_controller_for(
        &self,
        construction: &ConstructionRecord,
        roster_store: &dyn RosterStore,
        now: ConsensusTime,
    ) -> Result<(), RegistryError> {
        {
            let guard = self.current.read();
            if let Some(existing) = guard.as_ref() {
                if existing.construction_id() == construction.id {
                    return Ok(());
                }
            }
        }

        let source_roster = roster_store
            .get(construction.source_hash)
            .ok_or(ConfigurationError::MissingRoster {
                hash: construction.source_hash,
            })?;
        let target_roster = roster_store
            .get(construction.target_hash)
            .ok_or(ConfigurationError::MissingRoster {
                hash: construction.target_hash,
            })?;

        let key_pair = self
            .key_store
            .get_or_create_bls_key_pair(construction.id, self.crypto.as_ref())?;
        let public_key = key_pair.public_key();
        let secret_key = BlsSecretKey::from_bytes(&key_pair.secret_bytes());

        let controller = ConstructionController::new(ConstructionControllerParams {
            node_id: self.node_id,
            construction_id: construction.id,
            source_hash: construction.source_hash,
            target_hash: construction.target_hash,
            source_roster,
            target_roster,
            secret_key,
            public_key,
            crypto: self.crypto.clone(),
            gateway: self.gateway.clone(),
            signing_sink: self.signing_sink.clone(),
            store: self.store.clone(),
            config: self.config.clone(),
            now,
        })?;

        let mut guard = self.current.write();
        if let Some(mut old) = guard.take() {
            old.cancel_pending_work();
            tracing::info!(
                old_construction_id = old.construction_id(),
                new_construction_id = construction.id,
                "controller superseded"
            );
            metrics::record_supersession();
            if matches!(old.snapshot().phase, hints_controller::PhaseKind::Complete) {
                self.key_store.forget(old.construction_id());
            }
        }
        tracing::info!(construction_id = construction.id, "controller created");
        metrics::record_controller_created();
        *guard = Some(controller);
        Ok(())
    }

    /// `getInProgressById(constructionId)` (Section 4.6): a snapshot of
    /// the held controller if its id matches and it is still in
    /// progress.
    pub fn get_in_progress_by_id(&self, construction_id: ConstructionId) -> Option<ControllerSnapshot> {
        let guard = self.current.read();
        let controller = guard.as_ref()?;
        if controller.construction_id() == construction_id && controller.is_still_in_progress() {
            Some(controller.snapshot())
        } else {
            None
        }
    }

    /// `getInProgressByUniverseSizeLog2(k)` (Section 4.6).
    pub fn get_in_progress_by_universe_size_log2(&self, k: u32) -> Option<ControllerSnapshot> {
        let guard = self.current.read();
        let controller = guard.as_ref()?;
        if controller.has_log2_universe_size(k) {
            Some(controller.snapshot())
        } else {
            None
        }
    }

    /// A read-only snapshot of whichever controller is currently held, for
    /// operational tooling (Section 10.6).
    pub fn current_snapshot(&self) -> Option<ControllerSnapshot> {
        self.current.read().as_ref().map(|c| c.snapshot())
    }

    /// Advance the held controller by one consensus tick, if any.
    pub async fn tick_current(&self, now: ConsensusTime) {
        // The write lock is held only long enough to take the controller
        // out, tick it without holding the lock across the `.await`, and
        // put it back - `tick` drives `tokio::task::spawn_blocking` work
        // that should never execute while blocking other registry readers.
        let controller = self.current.write().take();
        let Some(mut controller) = controller else {
            return;
        };
        controller.tick(now).await;
        *self.current.write() = Some(controller);
    }
}
