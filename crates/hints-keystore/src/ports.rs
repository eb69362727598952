//! The key accessor port (Section 4.2).

use hints_common::ConstructionId;
use hints_crypto::{BlsKeyPair, HintsCrypto};

use crate::error::StoreError;

/// Durable per-construction BLS key material.
///
/// `get_or_create_bls_key_pair` MUST return the same key on every call for
/// a given `construction_id` on the same node, including across restarts
/// (Section 4.2: "the key MUST NOT differ across restarts for the same
/// construction-id on the same node").
pub trait KeyPairStore: Send + Sync {
    /// First call for a `construction_id` generates a fresh key pair via
    /// the given capability and persists it; subsequent calls return the
    /// same key pair.
    fn get_or_create_bls_key_pair(
        &self,
        construction_id: ConstructionId,
        crypto: &dyn HintsCrypto,
    ) -> Result<BlsKeyPair, StoreError>;

    /// Release any key material retained for `construction_id`. Safe to
    /// call once no in-progress construction may consume the key (Section
    /// 4.2, open question resolved in DESIGN.md); the registry is
    /// responsible for deciding when that holds, not this store.
    fn forget(&self, construction_id: ConstructionId);
}
