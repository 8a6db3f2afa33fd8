//! Versioned state storage trait

use async_trait::async_trait;

use crate::error::Result;
use crate::state::{StateKey, StoredRecord};

/// Durable key/value store for conversation and user state
///
/// Writes use optimistic concurrency: the caller passes the version it read
/// (`None` when the record did not exist) and the store rejects the write
/// with `CoreError::Conflict` if the record has moved on since.
#[async_trait]
pub trait StateStore: Send + Sync + 'static {
    /// Read a record, `None` if absent
    async fn read(&self, key: &StateKey) -> Result<Option<StoredRecord>>;

    /// Write a record, returning the new version
    async fn write(
        &self,
        key: &StateKey,
        data: serde_json::Value,
        expected_version: Option<u64>,
    ) -> Result<u64>;

    /// Delete a record; deleting a missing record is not an error
    async fn delete(&self, key: &StateKey) -> Result<()>;
}
