//! Controller configuration.
//!
//! A plain `Default`-implementing struct per the workspace's convention
//! (`FinalityConfig`, `NodeConfig`) rather than a generic config-file
//! loader - every field has a realistic default and none is mandatory to
//! construct a working controller in tests.

use hints_common::ConsensusTime;

/// Configuration consumed by [`crate::controller::ConstructionController`].
#[derive(Debug, Clone)]
pub struct HintsConfig {
    /// Grace period for HIGH-urgency constructions (source == target
    /// roster hash, the genesis self-transition).
    pub urgent_hints_keys_wait_period: ConsensusTime,
    /// Grace period for LOW-urgency constructions.
    pub relaxed_hints_keys_wait_period: ConsensusTime,
    /// Advisory re-examination cadence for a stalled GATHERING phase.
    pub aggregation_checkpoint_interval: ConsensusTime,
    /// Upper bound on the target party-size-log2 `k`; enforced once at
    /// controller construction as an oversize-party configuration error.
    pub max_party_size_log2: u32,
}

impl Default for HintsConfig {
    fn default() -> Self {
        Self {
            urgent_hints_keys_wait_period: 1,
            relaxed_hints_keys_wait_period: 10,
            aggregation_checkpoint_interval: 5,
            max_party_size_log2: 20,
        }
    }
}

impl HintsConfig {
    /// The grace period for the given urgency.
    pub fn grace_period(&self, urgency: hints_common::Urgency) -> ConsensusTime {
        match urgency {
            hints_common::Urgency::High => self.urgent_hints_keys_wait_period,
            hints_common::Urgency::Low => self.relaxed_hints_keys_wait_period,
        }
    }
}
