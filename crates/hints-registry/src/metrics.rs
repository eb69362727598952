//! # Registry Metrics
//!
//! Prometheus metrics for the controller registry (Section 10.4): the
//! registry-wide "how many constructions have we ever handled" counter
//! alongside the per-controller metrics `hints-controller` exposes.
//!
//! Disabled by default; compiling this module in never changes observable
//! protocol behavior (Section 8, invariant 6).

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, IntCounter};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Total controllers created by this registry, including superseded
    /// ones.
    pub static ref CONTROLLERS_CREATED: IntCounter = register_int_counter!(
        "hints_registry_controllers_created_total",
        "Total number of construction controllers created"
    )
    .expect("failed to register CONTROLLERS_CREATED metric");

    /// Total times an existing controller was cancelled because a new
    /// construction superseded it.
    pub static ref SUPERSESSIONS: IntCounter = register_int_counter!(
        "hints_registry_supersessions_total",
        "Total number of controller supersessions"
    )
    .expect("failed to register SUPERSESSIONS metric");
}

#[cfg(not(feature = "metrics"))]
pub fn record_controller_created() {}

#[cfg(feature = "metrics")]
pub fn record_controller_created() {
    CONTROLLERS_CREATED.inc();
}

#[cfg(not(feature = "metrics"))]
pub fn record_supersession() {}

#[cfg(feature = "metrics")]
pub fn record_supersession() {
    SUPERSESSIONS.inc();
}
