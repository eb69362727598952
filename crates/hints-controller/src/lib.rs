//! # Hints Controller
//!
//! The per-construction state machine: the controller that takes one
//! construction from `INIT` through `GATHERING` and `AGGREGATING` to
//! `COMPLETE`, dispatching crypto work off the consensus thread and
//! driving the submissions gateway and signing-context sink.
//!
//! ## Components
//!
//! | Module | Contents |
//! |--------|----------|
//! | `config` | [`HintsConfig`], the enumerated configuration options |
//! | `domain` | [`Phase`], [`PhaseKind`], [`RejectionReason`], [`ControllerSnapshot`] |
//! | `ports` | [`SigningContextSink`] and its in-memory adapter |
//! | `controller` | [`ConstructionController`], the state machine itself |
//! | `metrics` | optional Prometheus counters (feature `metrics`) |

pub mod config;
pub mod controller;
pub mod domain;
pub mod metrics;
pub mod ports;

pub use config::HintsConfig;
pub use controller::{ConstructionController, ConstructionControllerParams};
pub use domain::{ControllerSnapshot, Phase, PhaseKind, RejectionReason};
pub use ports::{InMemorySigningContextSink, SigningContextSink};
