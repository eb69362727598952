//! Controller-internal state types.

use hints_common::Hash;
use hints_crypto::PreprocessedKeys;

/// The controller's phase, as a tagged variant rather than a shared
/// mutable record with nullable fields.
///
/// `Init` and `Gathering` carry no payload of their own - the admissible
/// set, validation cache, and grace-period bookkeeping live on the
/// controller struct because they are built up incrementally across many
/// ticks rather than produced atomically at a transition. `Aggregating`
/// carries this controller's own candidate once its local `aggregate()`
/// call completes (`None` until then); `Complete` is terminal and
/// immutable.
#[derive(Debug, Clone)]
pub enum Phase {
    /// No publication exists yet for this node; hint computation may be
    /// in flight.
    Init,
    /// Observing publications at the target party-size, tallying
    /// admissible weight.
    Gathering,
    /// Aggregation has been (or is being) computed; voting and tallying
    /// source-roster votes for the winning hash.
    Aggregating { own_candidate: Option<(Hash, PreprocessedKeys)> },
    /// Terminal: the preprocessed key set has been produced and adopted.
    Complete { hash: Hash, keys: PreprocessedKeys },
}

/// A lightweight, clonable summary of [`Phase`] for external observers that
/// should not need to clone the (potentially large) `PreprocessedKeys`
/// payload just to ask "what phase are we in".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Init,
    Gathering,
    Aggregating,
    Complete,
}

impl From<&Phase> for PhaseKind {
    fn from(phase: &Phase) -> Self {
        match phase {
            Phase::Init => PhaseKind::Init,
            Phase::Gathering => PhaseKind::Gathering,
            Phase::Aggregating { .. } => PhaseKind::Aggregating,
            Phase::Complete { .. } => PhaseKind::Complete,
        }
    }
}

/// Why a publication was rejected from the admissible set: recorded once
/// per (node-id, k), not just logged, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    /// `validateHints` returned false for this (publicKey, hintBytes, N).
    InvalidHint,
}

/// A snapshot of a controller's progress, for operational/test
/// observability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub construction_id: hints_common::ConstructionId,
    pub phase: PhaseKind,
    pub admissible_weight: hints_common::Weight,
    pub target_threshold: hints_common::Weight,
    pub cancelled: bool,
}
