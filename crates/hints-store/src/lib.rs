//! # Hints Store
//!
//! The consensus-replicated record of publications, votes, and
//! in-progress constructions (Section 4.1), split into a read-only
//! capability ([`HintsStoreReader`]) and a writable one
//! ([`HintsStoreWriter`]) so callers that only need to observe state are
//! not coupled to the mutation surface (Section 9).

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::InMemoryHintsStore;
pub use domain::{ConstructionRecord, ConstructionState, PublicationRecord};
pub use ports::{HintsStoreReader, HintsStoreWriter};
