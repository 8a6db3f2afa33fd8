//! JSON file state store
//!
//! Layout: `{directory}/{scope}/{encoded key}.json`, each file holding a
//! serialized [`StoredRecord`]. Keys are encoded so that any channel or
//! conversation id maps to a single, distinct file name that fits the usual
//! 255-byte limit. Files are replaced via write-to-temp + rename.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use campus_bot_core::{CoreError, StateKey, StateStore, StoredRecord};

use crate::PersistenceError;

/// File-backed store for single-instance deployments
pub struct FileStateStore {
    directory: PathBuf,
    // Serializes read-compare-write within this process
    write_lock: Mutex<()>,
}

impl FileStateStore {
    /// Create a store rooted at `directory`, creating it if needed
    pub fn new(directory: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let directory = directory.as_ref().to_path_buf();
        if directory.as_os_str().is_empty() {
            return Err(PersistenceError::Configuration(
                "state directory must not be empty".to_string(),
            ));
        }
        std::fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            write_lock: Mutex::new(()),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, key: &StateKey) -> PathBuf {
        self.directory
            .join(key.scope.as_str())
            .join(format!("{}.json", encode_key(&key.key)))
    }

    async fn read_record(&self, path: &Path) -> Result<Option<StoredRecord>, PersistenceError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Longest escaped stem kept verbatim; leaves room for `~{digest}.json.tmp`
const MAX_PLAIN_STEM: usize = 160;

/// Encode a key as a file stem: `[A-Za-z0-9_-]` pass through, every other
/// byte becomes `~XX`. Stems longer than [`MAX_PLAIN_STEM`] are cut and get
/// the SHA-256 of the whole key appended.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("~{:02X}", byte));
        }
    }

    if encoded.len() > MAX_PLAIN_STEM {
        // The escaped stem is ASCII, so any byte index is a char boundary
        encoded.truncate(MAX_PLAIN_STEM);
        encoded.push('~');
        encoded.push_str(&hex::encode(Sha256::digest(key.as_bytes())));
    }
    encoded
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn read(&self, key: &StateKey) -> Result<Option<StoredRecord>, CoreError> {
        Ok(self.read_record(&self.path_for(key)).await?)
    }

    async fn write(
        &self,
        key: &StateKey,
        data: serde_json::Value,
        expected_version: Option<u64>,
    ) -> Result<u64, CoreError> {
        let path = self.path_for(key);
        let _guard = self.write_lock.lock().await;

        let found = self.read_record(&path).await?.map(|r| r.version);
        if found != expected_version {
            return Err(PersistenceError::Conflict {
                key: key.to_string(),
                expected: expected_version,
                found,
            }
            .into());
        }

        let version = found.unwrap_or(0) + 1;
        let bytes = serde_json::to_vec_pretty(&StoredRecord::new(version, data))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(PersistenceError::from)?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(PersistenceError::from)?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(PersistenceError::from)?;

        tracing::trace!(key = %key, version, "State record written");
        Ok(version)
    }

    async fn delete(&self, key: &StateKey) -> Result<(), CoreError> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistenceError::from(e).into()),
        }
    }
}
