//! # Controller Metrics
//!
//! Prometheus metrics for the construction controller.
//!
//! Enable with the `metrics` feature:
//! ```toml
//! hints-controller = { path = "...", features = ["metrics"] }
//! ```
//!
//! Disabled by default; compiling this module in never changes observable
//! protocol behavior.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Total GATHERING -> AGGREGATING transitions observed.
    pub static ref AGGREGATING_TRANSITIONS: IntCounter = register_int_counter!(
        "hints_controller_aggregating_transitions_total",
        "Total number of controllers that reached AGGREGATING"
    )
    .expect("failed to register AGGREGATING_TRANSITIONS metric");

    /// Total completions (AGGREGATING -> COMPLETE).
    pub static ref COMPLETIONS: IntCounter = register_int_counter!(
        "hints_controller_completions_total",
        "Total number of constructions completed"
    )
    .expect("failed to register COMPLETIONS metric");

    /// Rejected publications, labeled by reason.
    pub static ref REJECTIONS: IntCounterVec = register_int_counter_vec!(
        "hints_controller_rejected_publications_total",
        "Total number of publications rejected from the admissible set",
        &["reason"]
    )
    .expect("failed to register REJECTIONS metric");
}

#[cfg(not(feature = "metrics"))]
pub fn record_aggregating_transition() {}

#[cfg(feature = "metrics")]
pub fn record_aggregating_transition() {
    AGGREGATING_TRANSITIONS.inc();
}

#[cfg(not(feature = "metrics"))]
pub fn record_completion() {}

#[cfg(feature = "metrics")]
pub fn record_completion() {
    COMPLETIONS.inc();
}

#[cfg(not(feature = "metrics"))]
pub fn record_rejection(_reason: &str) {}

#[cfg(feature = "metrics")]
pub fn record_rejection(reason: &str) {
    REJECTIONS.with_label_values(&[reason]).inc();
}
