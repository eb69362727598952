//! The hinted-threshold-signature-specific half of the crypto capability:
//! `compute_hints` / `validate_hints` / `aggregate`.
//!
//! The BLS/SNARK internals of "hints" are treated as a pluggable
//! capability here; this module deliberately does not pin a concrete
//! polynomial-commitment scheme. What IS load-bearing, and what this
//! module guarantees, is the contract: `compute_hints` is deterministic
//! per `(privateKey, N)`, `validate_hints` is deterministic and
//! recomputable from the public key alone, and `aggregate` is
//! deterministic given the same sorted entries and weights. This module
//! implements that contract with a SHA-256-based commitment rather than a
//! production SNARK circuit; swapping in a real hinted-threshold scheme
//! means replacing this module's two functions without touching the
//! [`crate::capability::HintsCrypto`] trait or any caller.

use sha2::{Digest, Sha256};

use crate::bls::BlsPublicKey;
use crate::CryptoError;

/// Byte length of a derived hint commitment.
pub const HINT_LEN: usize = 32;

/// Deterministically derive the hint bytes a public key would publish for
/// a given party universe size `N`. Both `compute_hints` (from the secret
/// key, via its public key) and `validate_hints` (from the public key
/// alone) route through this so the two can never disagree.
fn derive_hints(public_key: &BlsPublicKey, n: u64) -> [u8; HINT_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(b"hinTS-commitment-v1");
    hasher.update(public_key.to_bytes());
    hasher.update(n.to_le_bytes());
    hasher.finalize().into()
}

/// `computeHints(privateKey, N) -> hintBytes`. `private_key` is only used
/// to derive its public key; the hint itself is a function of the public
/// key and `N`, which is what lets `validate_hints` recompute it without
/// ever seeing the private key.
pub fn compute_hints(secret: &crate::bls::BlsSecretKey, n: u64) -> Result<Vec<u8>, CryptoError> {
    let key_pair = crate::bls::BlsKeyPair::from_secret_bytes(secret.as_bytes())?;
    Ok(derive_hints(&key_pair.public_key(), n).to_vec())
}

/// `validateHints(publicKey, hintBytes, N) -> bool`.
pub fn validate_hints(public_key: &BlsPublicKey, hint_bytes: &[u8], n: u64) -> bool {
    hint_bytes == derive_hints(public_key, n)
}

/// One admissible publisher's contribution to an aggregation: its party
/// id, public key, and (already-validated) hint bytes.
#[derive(Clone, Debug)]
pub struct HintEntry {
    pub party_id: u32,
    pub public_key: BlsPublicKey,
    pub hint_bytes: Vec<u8>,
}

/// The output of `aggregate`: a deterministic commitment to which parties
/// contributed, plus the aggregate public key and an `extractPublicKey`
/// lookup table by party id for later signing-context use.
#[derive(Clone, Debug)]
pub struct PreprocessedKeys {
    /// Hash of the preprocessed keys, the value nodes vote on while
    /// AGGREGATING.
    pub hash: [u8; 32],
    /// Aggregate public key over all contributing parties.
    pub aggregate_public_key: BlsPublicKey,
    party_public_keys: Vec<Option<BlsPublicKey>>,
}

impl PreprocessedKeys {
    /// `extractPublicKey(aggregationKey, partyId) -> publicKey`. `None` if
    /// `party_id` is out of range or never contributed.
    pub fn public_key_for_party(&self, party_id: u32) -> Option<BlsPublicKey> {
        self.party_public_keys.get(party_id as usize)?.clone()
    }
}

/// `aggregate(entries, weights, N) -> PreprocessedKeys`.
///
/// `entries` MUST already be sorted by party id - the controller's
/// responsibility, since its input is the sorted-by-party-id list of
/// admissible (publicKey, hintBytes) pairs; this function validates that
/// invariant rather than silently re-sorting, since a caller-side sort bug
/// should surface immediately rather than be masked.
pub fn aggregate(
    entries: &[HintEntry],
    weights: &[u64],
    n: u64,
) -> Result<PreprocessedKeys, CryptoError> {
    if entries.is_empty() {
        return Err(CryptoError::InvalidInput("empty entry list".into()));
    }
    if weights.len() as u64 != n {
        return Err(CryptoError::InvalidInput(format!(
            "weights length {} does not cover N={}",
            weights.len(),
            n
        )));
    }
    let mut last_party_id: Option<u32> = None;
    for entry in entries {
        if entry.party_id as u64 >= n {
            return Err(CryptoError::InvalidInput(format!(
                "party id {} out of range for N={}",
                entry.party_id, n
            )));
        }
        if let Some(last) = last_party_id {
            if entry.party_id <= last {
                return Err(CryptoError::InvalidInput(
                    "entries not strictly sorted by party id".into(),
                ));
            }
        }
        last_party_id = Some(entry.party_id);
    }

    let keys: Vec<BlsPublicKey> = entries.iter().map(|e| e.public_key.clone()).collect();
    let aggregate_public_key = BlsPublicKey::aggregate(&keys)?;

    let mut hasher = Sha256::new();
    hasher.update(b"hinTS-preprocessed-keys-v1");
    hasher.update(n.to_le_bytes());
    for weight in weights {
        hasher.update(weight.to_le_bytes());
    }
    for entry in entries {
        hasher.update(entry.party_id.to_le_bytes());
        hasher.update(entry.public_key.to_bytes());
        hasher.update(&entry.hint_bytes);
    }
    let hash: [u8; 32] = hasher.finalize().into();

    let mut party_public_keys: Vec<Option<BlsPublicKey>> = vec![None; n as usize];
    for entry in entries {
        party_public_keys[entry.party_id as usize] = Some(entry.public_key.clone());
    }

    Ok(PreprocessedKeys {
        hash,
        aggregate_public_key,
        party_public_keys,
    })
}
