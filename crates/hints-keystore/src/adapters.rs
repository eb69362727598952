//! Concrete [`KeyPairStore`] adapters: an in-memory one for tests and a
//! filesystem-backed one for durable, restart-surviving persistence.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use hints_common::ConstructionId;
use hints_crypto::{BlsKeyPair, HintsCrypto};
use parking_lot::RwLock;

use crate::error::StoreError;
use crate::ports::KeyPairStore;

/// An in-memory key store. Keys do not survive process restart; intended
/// for tests and the demonstration binary, never for a real deployment.
#[derive(Default)]
pub struct InMemoryKeyPairStore {
    secrets: RwLock<HashMap<ConstructionId, [u8; 32]>>,
}

impl InMemoryKeyPairStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyPairStore for InMemoryKeyPairStore {
    fn get_or_create_bls_key_pair(
        &self,
        construction_id: ConstructionId,
        crypto: &dyn HintsCrypto,
    ) -> Result<BlsKeyPair, StoreError> {
        if let Some(bytes) = self.secrets.read().get(&construction_id).copied() {
            return Ok(BlsKeyPair::from_secret_bytes(&bytes)?);
        }
        let (secret, _public) = crypto.generate_key_pair();
        let bytes = *secret.as_bytes();
        self.secrets.write().insert(construction_id, bytes);
        Ok(BlsKeyPair::from_secret_bytes(&bytes)?)
    }

    fn forget(&self, construction_id: ConstructionId) {
        self.secrets.write().remove(&construction_id);
    }
}

/// A filesystem-backed key store: one 32-byte secret-key file per
/// construction-id under `base_dir`, named `<construction_id>.key`.
///
/// Mirrors the surrounding workspace's convention of a trait-based port
/// with a swappable durable backing store (`node-runtime`'s storage
/// adapters), rather than any specific database dependency - the spec
/// requires only that the key "survive restart" (Section 4.2), not a
/// particular storage engine.
pub struct FileKeyPairStore {
    base_dir: PathBuf,
}

impl FileKeyPairStore {
    /// Create a store rooted at `base_dir`, creating the directory if it
    /// does not already exist.
    pub fn new(base_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn path_for(&self, construction_id: ConstructionId) -> PathBuf {
        self.base_dir.join(format!("{construction_id}.key"))
    }
}

impl KeyPairStore for FileKeyPairStore {
    fn get_or_create_bls_key_pair(
        &self,
        construction_id: ConstructionId,
        crypto: &dyn HintsCrypto,
    ) -> Result<BlsKeyPair, StoreError> {
        let path = self.path_for(construction_id);
        if path_exists(&path) {
            let bytes = fs::read(&path).map_err(|source| StoreError::Io {
                construction_id,
                source,
            })?;
            let array: [u8; 32] =
                bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| StoreError::CorruptRecord {
                        construction_id,
                        expected: 32,
                        actual: bytes.len(),
                    })?;
            return Ok(BlsKeyPair::from_secret_bytes(&array)?);
        }

        let (secret, _public) = crypto.generate_key_pair();
        let bytes = *secret.as_bytes();
        fs::write(&path, bytes).map_err(|source| StoreError::Io {
            construction_id,
            source,
        })?;
        tracing::debug!(construction_id, "generated and persisted new BLS key pair");
        Ok(BlsKeyPair::from_secret_bytes(&bytes)?)
    }

    fn forget(&self, construction_id: ConstructionId) {
        let path = self.path_for(construction_id);
        if let Err(error) = fs::remove_file(&path) {
            if error.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(construction_id, %error, "failed to remove key file");
            }
        }
    }
}

fn path_exists(path: &Path) -> bool {
    path.exists()
}
