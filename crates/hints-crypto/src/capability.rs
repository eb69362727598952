//! The crypto capability trait and its BLS12-381 implementation.
//!
//! `hints-controller` depends only on [`HintsCrypto`], never on `blst`
//! directly, so a different curve or hinting scheme can be swapped in by
//! implementing this trait as a pluggable capability.

use hints_common::Weight;

use crate::bls::{BlsKeyPair, BlsPublicKey, BlsSecretKey, BlsSignature};
use crate::hints::{self, HintEntry, PreprocessedKeys};
use crate::CryptoError;

/// A BLS partial signature contributed by one party toward a threshold
/// aggregate.
pub type PartialSignature = BlsSignature;

/// The aggregation key produced by `aggregate`: the preprocessed keys a
/// later signing round authenticates partial signatures against.
pub type AggregationKey = PreprocessedKeys;

/// The pluggable crypto capability: key generation, hint
/// computation/validation, aggregation, and partial-signature handling.
///
/// Every method is deterministic for the same inputs across
/// implementations - the same inputs MUST yield byte-identical outputs.
/// This is a hard contract, not an implementation detail: callers (the
/// controller) rely on it for cross-node agreement.
pub trait HintsCrypto: Send + Sync {
    /// `generateKeyPair() -> (privateKey, publicKey)`.
    fn generate_key_pair(&self) -> (BlsSecretKey, BlsPublicKey);

    /// `computeHints(privateKey, N) -> hintBytes`.
    fn compute_hints(&self, private_key: &BlsSecretKey, n: u64) -> Result<Vec<u8>, CryptoError>;

    /// `validateHints(publicKey, hintBytes, N) -> bool`.
    fn validate_hints(&self, public_key: &BlsPublicKey, hint_bytes: &[u8], n: u64) -> bool;

    /// `aggregate(entries, weights, N) -> PreprocessedKeys`.
    fn aggregate(
        &self,
        entries: &[HintEntry],
        weights: &[Weight],
        n: u64,
    ) -> Result<PreprocessedKeys, CryptoError>;

    /// `signPartial(message, privateKey) -> partialSignature`.
    fn sign_partial(&self, message: &[u8], private_key: &BlsSecretKey) -> PartialSignature;

    /// `verifyPartial(message, partialSignature, publicKey) -> bool`.
    fn verify_partial(
        &self,
        message: &[u8],
        partial: &PartialSignature,
        public_key: &BlsPublicKey,
    ) -> bool;

    /// `aggregateSignatures(aggregationKey, partials) -> aggregateSignature`.
    ///
    /// `aggregationKey` is accepted for interface symmetry even though
    /// this BLS implementation does not need it to aggregate;
    /// a scheme with per-party weighting baked into the aggregation key
    /// would consult it here.
    fn aggregate_signatures(
        &self,
        aggregation_key: &AggregationKey,
        partials: &[PartialSignature],
    ) -> Result<BlsSignature, CryptoError>;

    /// `extractPublicKey(aggregationKey, partyId) -> publicKey`.
    fn extract_public_key(
        &self,
        aggregation_key: &AggregationKey,
        party_id: u32,
    ) -> Option<BlsPublicKey>;
}

/// The BLS12-381 implementation of [`HintsCrypto`], backed by `blst` and
/// the SHA-256 hint commitment in [`crate::hints`].
#[derive(Debug, Default, Clone, Copy)]
pub struct BlstHintsCrypto;

impl HintsCrypto for BlstHintsCrypto {
    fn generate_key_pair(&self) -> (BlsSecretKey, BlsPublicKey) {
        let key_pair = BlsKeyPair::generate();
        let secret = BlsSecretKey::from_bytes(&key_pair.secret_bytes());
        (secret, key_pair.public_key())
    }

    fn compute_hints(&self, private_key: &BlsSecretKey, n: u64) -> Result<Vec<u8>, CryptoError> {
        hints::compute_hints(private_key, n)
    }

    fn validate_hints(&self, public_key: &BlsPublicKey, hint_bytes: &[u8], n: u64) -> bool {
        hints::validate_hints(public_key, hint_bytes, n)
    }

    fn aggregate(
        &self,
        entries: &[HintEntry],
        weights: &[Weight],
        n: u64,
    ) -> Result<PreprocessedKeys, CryptoError> {
        hints::aggregate(entries, weights, n)
    }

    fn sign_partial(&self, message: &[u8], private_key: &BlsSecretKey) -> PartialSignature {
        let key_pair = BlsKeyPair::from_secret_bytes(private_key.as_bytes())
            .expect("private key was constructed by this capability");
        key_pair.sign(message)
    }

    fn verify_partial(
        &self,
        message: &[u8],
        partial: &PartialSignature,
        public_key: &BlsPublicKey,
    ) -> bool {
        public_key.verify(message, partial)
    }

    fn aggregate_signatures(
        &self,
        _aggregation_key: &AggregationKey,
        partials: &[PartialSignature],
    ) -> Result<BlsSignature, CryptoError> {
        BlsSignature::aggregate(partials)
    }

    fn extract_public_key(
        &self,
        aggregation_key: &AggregationKey,
        party_id: u32,
    ) -> Option<BlsPublicKey> {
        aggregation_key.public_key_for_party(party_id)
    }
}
