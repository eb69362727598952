//! The signing-context sink - external code notified once a construction
//! completes so it may begin producing partial signatures over the
//! preprocessed keys.

use async_trait::async_trait;
use hints_common::ConstructionId;
use hints_crypto::PreprocessedKeys;
use parking_lot::Mutex;

/// Notified when a construction's preprocessed key set has been adopted.
#[async_trait]
pub trait SigningContextSink: Send + Sync {
    /// `onAggregationComplete(constructionId, preprocessedKeys)`.
    async fn on_aggregation_complete(
        &self,
        construction_id: ConstructionId,
        preprocessed_keys: PreprocessedKeys,
    );
}

/// An in-memory [`SigningContextSink`] that records every notification it
/// receives, in order - for tests and the demonstration binary.
#[derive(Default)]
pub struct InMemorySigningContextSink {
    completions: Mutex<Vec<(ConstructionId, PreprocessedKeys)>>,
}

impl InMemorySigningContextSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completions(&self) -> Vec<(ConstructionId, PreprocessedKeys)> {
        self.completions.lock().clone()
    }
}

#[async_trait]
impl SigningContextSink for InMemorySigningContextSink {
    async fn on_aggregation_complete(
        &self,
        construction_id: ConstructionId,
        preprocessed_keys: PreprocessedKeys,
    ) {
        tracing::info!(construction_id, "signing context sink notified of completion");
        self.completions.lock().push((construction_id, preprocessed_keys));
    }
}
