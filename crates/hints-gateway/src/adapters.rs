//! [`SubmissionsGateway`] adapters: an in-memory one that records every
//! call it receives, in order (end-to-end scenario tests assert on the
//! *sequence* of submitted publications/votes, not just final state, so
//! tests need more than a "was this called" boolean), and a
//! retry-until-ack adapter shaped around a pluggable [`SubmissionTransport`]
//! since the concrete wire transport is out of scope.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use hints_common::{ConstructionId, Hash};
use hints_crypto::BlsPublicKey;
use parking_lot::Mutex;

use crate::ports::SubmissionsGateway;

/// A publication submission observed by [`InMemorySubmissionsGateway`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmittedPublication {
    pub k: u32,
    pub public_key: BlsPublicKey,
    pub hint_bytes: Vec<u8>,
}

/// A vote submission observed by [`InMemorySubmissionsGateway`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmittedVote {
    pub construction_id: ConstructionId,
    pub preprocessed_keys_hash: Hash,
}

/// Records every submission it receives, in arrival order.
#[derive(Default)]
pub struct InMemorySubmissionsGateway {
    publications: Mutex<Vec<SubmittedPublication>>,
    votes: Mutex<Vec<SubmittedVote>>,
}

impl InMemorySubmissionsGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publications(&self) -> Vec<SubmittedPublication> {
        self.publications.lock().clone()
    }

    pub fn votes(&self) -> Vec<SubmittedVote> {
        self.votes.lock().clone()
    }
}

#[async_trait]
impl SubmissionsGateway for InMemorySubmissionsGateway {
    async fn submit_publication(&self, k: u32, public_key: BlsPublicKey, hint_bytes: Vec<u8>) {
        tracing::debug!(k, "submitting hint-key publication");
        self.publications.lock().push(SubmittedPublication {
            k,
            public_key,
            hint_bytes,
        });
    }

    async fn submit_vote(&self, construction_id: ConstructionId, preprocessed_keys_hash: Hash) {
        tracing::debug!(construction_id, "submitting aggregation vote");
        self.votes.lock().push(SubmittedVote {
            construction_id,
            preprocessed_keys_hash,
        });
    }
}

/// A transient failure from the concrete wire transport a
/// [`RetryingSubmissionsGateway`] is built over. The transport itself is
/// out of scope (Section 1): implementations might wrap a gRPC client, a
/// local mempool handle, or anything else that can submit a signed
/// transaction and occasionally fail.
#[derive(Debug, Clone, thiserror::Error)]
#[error("submission transport error: {0}")]
pub struct TransportError(pub String);

/// The fallible, single-attempt send operations [`RetryingSubmissionsGateway`]
/// retries on top of. Kept separate from [`SubmissionsGateway`] itself so
/// the retry loop, backoff, and cancellation plumbing live in one place
/// regardless of which concrete transport is plugged in.
#[async_trait]
pub trait SubmissionTransport: Send + Sync {
    async fn send_publication(
        &self,
        k: u32,
        public_key: BlsPublicKey,
        hint_bytes: Vec<u8>,
    ) -> Result<(), TransportError>;

    async fn send_vote(
        &self,
        construction_id: ConstructionId,
        preprocessed_keys_hash: Hash,
    ) -> Result<(), TransportError>;
}

/// A [`SubmissionsGateway`] that retries a [`SubmissionTransport`] send
/// with exponential backoff until it succeeds or the gateway is
/// cancelled (Section 4.4: "the submissions layer must retry on
/// transient failure until acknowledgement or controller cancellation").
///
/// Grounded on `qc-02-block-storage::adapters::lock::flock::DatabaseLock::acquire`'s
/// retry-with-exponential-backoff loop, capped at a maximum delay rather
/// than a wall-clock deadline - Section 4.4 specifies no timeout, only
/// "retry... until... controller cancellation", so this loop runs
/// indefinitely unless [`RetryingSubmissionsGateway::cancel`] is called.
pub struct RetryingSubmissionsGateway<T> {
    transport: T,
    cancelled: AtomicBool,
    initial_delay: Duration,
    max_delay: Duration,
}

impl<T: SubmissionTransport> RetryingSubmissionsGateway<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            cancelled: AtomicBool::new(false),
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(2000),
        }
    }

    /// Stop retrying any submission still in flight. Idempotent (Section
    /// 5, "cancellation semantics"); a submission already queued before
    /// this call may still complete one in-flight attempt, but no further
    /// retries are scheduled afterward.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: SubmissionTransport> SubmissionsGateway for RetryingSubmissionsGateway<T> {
    async fn submit_publication(&self, k: u32, public_key: BlsPublicKey, hint_bytes: Vec<u8>) {
        let mut delay = self.initial_delay;
        loop {
            if self.is_cancelled() {
                tracing::debug!(k, "publication submission dropped: gateway cancelled");
                return;
            }
            match self
                .transport
                .send_publication(k, public_key.clone(), hint_bytes.clone())
                .await
            {
                Ok(()) => return,
                Err(error) => {
                    tracing::warn!(k, %error, "publication submission failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.max_delay);
                }
            }
        }
    }

    async fn submit_vote(&self, construction_id: ConstructionId, preprocessed_keys_hash: Hash) {
        let mut delay = self.initial_delay;
        loop {
            if self.is_cancelled() {
                tracing::debug!(construction_id, "vote submission dropped: gateway cancelled");
                return;
            }
            match self
                .transport
                .send_vote(construction_id, preprocessed_keys_hash)
                .await
            {
                Ok(()) => return,
                Err(error) => {
                    tracing::warn!(construction_id, %error, "vote submission failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.max_delay);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_submissions_in_order() {
        let gateway = InMemorySubmissionsGateway::new();
        let (_, pk) = {
            use hints_crypto::HintsCrypto;
            hints_crypto::BlstHintsCrypto.generate_key_pair()
        };

        gateway.submit_publication(2, pk.clone(), vec![1, 2, 3]).await;
        gateway.submit_vote(7, [9u8; 32]).await;
        gateway.submit_vote(8, [1u8; 32]).await;

        assert_eq!(gateway.publications().len(), 1);
        assert_eq!(gateway.publications()[0].k, 2);
        assert_eq!(
            gateway.votes(),
            vec![
                SubmittedVote {
                    construction_id: 7,
                    preprocessed_keys_hash: [9u8; 32]
                },
                SubmittedVote {
                    construction_id: 8,
                    preprocessed_keys_hash: [1u8; 32]
                },
            ]
        );
    }

    /// A transport that fails a fixed number of times before succeeding,
    /// recording every attempt it observed.
    struct FlakyTransport {
        fail_remaining: Mutex<u32>,
        attempts: Mutex<u32>,
    }

    #[async_trait]
    impl SubmissionTransport for FlakyTransport {
        async fn send_publication(
            &self,
            _k: u32,
            _public_key: BlsPublicKey,
            _hint_bytes: Vec<u8>,
        ) -> Result<(), TransportError> {
            *self.attempts.lock() += 1;
            let mut remaining = self.fail_remaining.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(TransportError("transient failure".into()));
            }
            Ok(())
        }

        async fn send_vote(
            &self,
            _construction_id: ConstructionId,
            _preprocessed_keys_hash: Hash,
        ) -> Result<(), TransportError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn retrying_gateway_succeeds_after_transient_failures() {
        let transport = FlakyTransport {
            fail_remaining: Mutex::new(2),
            attempts: Mutex::new(0),
        };
        let gateway = RetryingSubmissionsGateway::new(transport);
        let (_, pk) = {
            use hints_crypto::HintsCrypto;
            hints_crypto::BlstHintsCrypto.generate_key_pair()
        };

        gateway.submit_publication(3, pk, vec![1]).await;

        assert_eq!(*gateway.transport.attempts.lock(), 3);
    }

    struct AlwaysFailingTransport;

    #[async_trait]
    impl SubmissionTransport for AlwaysFailingTransport {
        async fn send_publication(
            &self,
            _k: u32,
            _public_key: BlsPublicKey,
            _hint_bytes: Vec<u8>,
        ) -> Result<(), TransportError> {
            Err(TransportError("always fails".into()))
        }

        async fn send_vote(
            &self,
            _construction_id: ConstructionId,
            _preprocessed_keys_hash: Hash,
        ) -> Result<(), TransportError> {
            Err(TransportError("always fails".into()))
        }
    }

    #[tokio::test]
    async fn cancellation_stops_retrying() {
        let gateway = std::sync::Arc::new(RetryingSubmissionsGateway::new(AlwaysFailingTransport));
        let (_, pk) = {
            use hints_crypto::HintsCrypto;
            hints_crypto::BlstHintsCrypto.generate_key_pair()
        };

        let gateway_clone = gateway.clone();
        let handle = tokio::spawn(async move {
            gateway_clone.submit_publication(1, pk, vec![1]).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        gateway.cancel();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("submission should stop retrying promptly after cancellation")
            .unwrap();
    }
}
