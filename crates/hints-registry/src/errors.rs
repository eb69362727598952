//! Registry error vocabulary.
//!
//! `get_or_create_controller_for` can fail two distinct ways (SPEC_FULL.md
//! Section 10.2): a [`ConfigurationError`] (missing roster, oversize
//! party, zero total weight - fatal for that one construction, logged and
//! absorbed by the caller) or a [`StoreError`] from the key accessor (an
//! operational I/O fault that propagates rather than being silently
//! absorbed). This enum keeps the two distinguishable rather than
//! collapsing them into one bucket.

use hints_common::ConfigurationError;
use hints_keystore::StoreError;
use thiserror::Error;

/// Errors the registry can surface while creating a controller.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    KeyStore(#[from] StoreError),
}
