//! # Hints Keystore
//!
//! The key accessor (Section 4.2): `get_or_create_bls_key_pair` returns a
//! node's BLS private key for a given construction, generating it on first
//! use and persisting it durably so it survives restart.

pub mod adapters;
pub mod error;
pub mod ports;

pub use adapters::{FileKeyPairStore, InMemoryKeyPairStore};
pub use error::StoreError;
pub use ports::KeyPairStore;
