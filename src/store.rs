//! Transactional record storage for the vault.
//!
//! All three vault records live in a single JSON document (`vault.json`).
//! Every write serializes the full document to a temp file and renames it
//! over the original, so a multi-record update is either fully visible or
//! not at all, even across a process crash. There is no partial-write state
//! in which `pin` and `payload` could desynchronize from `meta`.
//!
//! The store handle is explicitly owned by the vault instance — no hidden
//! module global — so tests can construct isolated stores in temp dirs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::{Result, VaultError};

/// File name of the store document inside the data directory.
pub const STORE_FILE_NAME: &str = "vault.json";

/// Identifiers of the three vault records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordId {
    /// Salted one-way digest of the PIN.
    Pin,
    /// Encrypted session payload (IV + ciphertext).
    Payload,
    /// Failure counter and lockout expiry.
    Meta,
}

impl RecordId {
    fn as_str(self) -> &'static str {
        match self {
            RecordId::Pin => "pin",
            RecordId::Payload => "payload",
            RecordId::Meta => "meta",
        }
    }
}

/// Durable key-value access to the vault records.
pub struct SecureStore {
    path: PathBuf,
}

impl SecureStore {
    /// Create a store handle rooted in the given data directory.
    ///
    /// Cheap: the directory is created lazily on first write, and a missing
    /// document simply means every record is absent.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(STORE_FILE_NAME),
        }
    }

    /// Path of the store document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<BTreeMap<String, Value>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(VaultError::Io(e)),
        };

        serde_json::from_slice(&bytes)
            .map_err(|e| VaultError::Store(format!("Store document unreadable: {}", e)))
    }

    async fn write_document(&self, document: &BTreeMap<String, Value>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let bytes = serde_json::to_vec(document)?;

        // Write atomically (write to temp file, then rename)
        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &bytes).await?;

        // Set restrictive permissions on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&temp_path, perms).await?;
        }

        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }

    /// Read one record. Absence is a valid result, never an error.
    pub(crate) async fn get(&self, id: RecordId) -> Result<Option<Value>> {
        let document = self.read_document().await?;
        Ok(document.get(id.as_str()).cloned())
    }

    /// Write one record, leaving the others untouched.
    pub(crate) async fn put(&self, id: RecordId, record: Value) -> Result<()> {
        let mut document = self.read_document().await?;
        document.insert(id.as_str().to_string(), record);
        self.write_document(&document).await
    }

    /// Write several records in one transaction — all visible or none.
    pub(crate) async fn put_many(&self, records: Vec<(RecordId, Value)>) -> Result<()> {
        let mut document = self.read_document().await?;
        for (id, record) in records {
            document.insert(id.as_str().to_string(), record);
        }
        self.write_document(&document).await
    }

    /// Remove every record. Idempotent: a missing document is not an error.
    pub(crate) async fn clear_all(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!("Store document removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VaultError::Io(e)),
        }
    }
}
