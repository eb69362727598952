//! # hinTS Construction Demonstration Node
//!
//! A small in-process simulation that drives a handful of simulated nodes
//! through Scenario A of SPEC_FULL.md Section 8 (the happy path): every
//! member of a four-node, equal-weight, HIGH-urgency target roster
//! publishes its hint key, the resulting publications cross the
//! super-majority weight threshold, every node aggregates the same
//! `PreprocessedKeys`, and all four vote and complete with an identical
//! hash.
//!
//! This is demonstration wiring, not a full node: there is no real
//! network, no real consensus substrate, and no gRPC ingress (Section 1
//! places all of that out of scope). Each simulated node gets its own
//! [`hints_registry::ControllerRegistry`] and
//! [`hints_gateway::InMemorySubmissionsGateway`]; a single shared
//! [`hints_store::InMemoryHintsStore`] stands in for the consensus
//! substrate that would otherwise replicate publications and votes to
//! every honest node identically.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use hints_common::{ConsensusTime, InMemoryRosterStore, NodeId, Roster};
use hints_controller::{HintsConfig, InMemorySigningContextSink};
use hints_crypto::BlstHintsCrypto;
use hints_gateway::InMemorySubmissionsGateway;
use hints_keystore::InMemoryKeyPairStore;
use hints_registry::{ControllerRegistry, ControllerRegistryParams};
use hints_store::InMemoryHintsStore;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

type DemoRegistry = ControllerRegistry<BlstHintsCrypto, InMemorySubmissionsGateway, InMemorySigningContextSink>;

/// One simulated network participant: its own registry, gateway, and
/// signing-context sink, all fed from the shared store.
struct SimulatedNode {
    node_id: NodeId,
    registry: DemoRegistry,
    gateway: Arc<InMemorySubmissionsGateway>,
    sink: Arc<InMemorySigningContextSink>,
}

impl SimulatedNode {
    fn new(node_id: NodeId, store: Arc<InMemoryHintsStore>, config: HintsConfig) -> Self {
        let gateway = Arc::new(InMemorySubmissionsGateway::new());
        let sink = Arc::new(InMemorySigningContextSink::new());
        let registry = ControllerRegistry::new(ControllerRegistryParams {
            node_id,
            crypto: Arc::new(BlstHintsCrypto),
            gateway: gateway.clone(),
            signing_sink: sink.clone(),
            store,
            key_store: Arc::new(InMemoryKeyPairStore::new()),
            config,
        });
        Self {
            node_id,
            registry,
            gateway,
            sink,
        }
    }

    /// Replay this node's own pending submissions into the shared store,
    /// standing in for the surrounding consensus layer ordering and
    /// replicating this node's transactions back to every honest node
    /// (Section 9: submissions are consumed only once admitted by
    /// consensus, never applied directly by the submitter).
    fn replay_submissions(&self, store: &InMemoryHintsStore, now: ConsensusTime) {
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

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("=============================================");
    info!("  hinTS Construction Controller - Demo Node");
    info!("=============================================");

    let mut weights = BTreeMap::new();
    for id in 0..4u64 {
        weights.insert(NodeId(id), 1u64);
    }
    let roster = Roster::from_weights(weights);
    let roster_hash = [7u8; 32]; // source == target -> HIGH urgency, Scenario A.

    let mut roster_store = InMemoryRosterStore::new();
    roster_store.insert(roster_hash, roster.clone());

    let store = Arc::new(InMemoryHintsStore::new());
    let config = HintsConfig {
        // Scenario A fixes the grace period to zero so the demo completes
        // in a handful of ticks instead of waiting on a realistic period.
        urgent_hints_keys_wait_period: 0,
        ..HintsConfig::default()
    };

    let construction = store.new_construction_for(roster_hash, roster_hash, &roster_store, 0)?;
    info!(construction_id = construction.id, "allocated construction");

    let nodes: Vec<SimulatedNode> = roster
        .node_ids()
        .map(|node_id| SimulatedNode::new(node_id, store.clone(), config.clone()))
        .collect();

    for node in &nodes {
        node.registry
            .get_or_create_controller_for(&construction, &roster_store, 0)?;
    }

    for now in 0..10u64 {
        for node in &nodes {
            node.registry.tick_current(now).await;
            node.replay_submissions(&store, now);
        }

        if nodes
            .iter()
            .all(|node| node.registry.get_in_progress_by_id(construction.id).is_none())
        {
            info!(tick = now, "every simulated node has completed");
            break;
        }
    }

    let mut hashes = Vec::new();
    for node in &nodes {
        let completions = node.sink.completions();
        match completions.as_slice() {
            [(id, keys)] => {
                info!(node_id = %node.node_id, construction_id = *id, hash = ?keys.hash, "completed");
                hashes.push(keys.hash);
            }
            _ => {
                info!(node_id = %node.node_id, "did not complete within the demo's tick budget");
            }
        }
    }

    if !hashes.is_empty() && hashes.iter().all(|h| *h == hashes[0]) {
        info!("all completed nodes agree on the preprocessed-keys hash");
    } else if hashes.len() > 1 {
        anyhow::bail!("completed nodes disagree on the preprocessed-keys hash");
    }

    Ok(())
}
