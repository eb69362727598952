//! # Hints Common
//!
//! Domain types shared by every crate that makes up the hinTS construction
//! subsystem: node identity, weighted rosters, party-size arithmetic, and the
//! error vocabulary used across the crypto, store, controller and registry
//! layers.
//!
//! ## Design Principles
//!
//! - **Single source of truth**: roster and party-id arithmetic lives here so
//!   every crate computes `N`, `k`, and the node-id to party-id mapping the
//!   same way. Two crates disagreeing on this mapping would break the
//!   network-wide determinism the construction protocol depends on.

pub mod entities;
pub mod errors;
pub mod ports;

pub use entities::*;
pub use errors::*;
pub use ports::{InMemoryRosterStore, RosterStore};
