//! The submissions gateway port.

use async_trait::async_trait;
use hints_common::{ConstructionId, Hash};
use hints_crypto::BlsPublicKey;

/// Fire-and-forget submission of this node's hint-key publication and
/// aggregation votes.
///
/// The submissions layer must retry on transient failure until
/// acknowledgement or controller cancellation, and must not deliver
/// twice - idempotence via the store's first-wins rule is acceptable.
/// Neither method returns a `Result` - failure handling is the adapter's
/// job, not the caller's; the controller fires a submission and moves on,
/// the gateway never blocks the caller.
#[async_trait]
pub trait SubmissionsGateway: Send + Sync {
    /// Submit this node's hint-key publication at party-size-log2 `k`.
    async fn submit_publication(&self, k: u32, public_key: BlsPublicKey, hint_bytes: Vec<u8>);

    /// Submit a vote for `construction_id` endorsing `preprocessed_keys_hash`.
    async fn submit_vote(&self, construction_id: ConstructionId, preprocessed_keys_hash: Hash);
}
