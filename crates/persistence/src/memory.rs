//! In-memory state store

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use campus_bot_core::{CoreError, StateKey, StateStore, StoredRecord};

use crate::PersistenceError;

/// HashMap-backed store; state does not survive a restart
#[derive(Default)]
pub struct InMemoryStateStore {
    records: RwLock<HashMap<StateKey, StoredRecord>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn read(&self, key: &StateKey) -> Result<Option<StoredRecord>, CoreError> {
        Ok(self.records.read().get(key).cloned())
    }

    async fn write(
        &self,
        key: &StateKey,
        data: serde_json::Value,
        expected_version: Option<u64>,
    ) -> Result<u64, CoreError> {
        let mut records = self.records.write();
        let found = records.get(key).map(|r| r.version);
        if found != expected_version {
            return Err(PersistenceError::Conflict {
                key: key.to_string(),
                expected: expected_version,
                found,
            }
            .into());
        }

        let version = found.unwrap_or(0) + 1;
        records.insert(key.clone(), StoredRecord::new(version, data));
        Ok(version)
    }

    async fn delete(&self, key: &StateKey) -> Result<(), CoreError> {
        self.records.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_bot_core::StateScope;
    use serde_json::json;

    fn key() -> StateKey {
        StateKey::new(StateScope::Conversation, "test/conversations/c1")
    }

    #[tokio::test]
    async fn test_versions_increase() {
        let store = InMemoryStateStore::new();
        assert!(store.read(&key()).await.unwrap().is_none());

        assert_eq!(store.write(&key(), json!({"a": 1}), None).await.unwrap(), 1);
        assert_eq!(store.write(&key(), json!({"a": 2}), Some(1)).await.unwrap(), 2);

        let record = store.read(&key()).await.unwrap().unwrap();
        assert_eq!(record.version, 2);
        assert_eq!(record.data, json!({"a": 2}));
    }

    #[tokio::test]
    async fn test_stale_write_conflicts() {
        let store = InMemoryStateStore::new();
        store.write(&key(), json!({}), None).await.unwrap();

        let err = store.write(&key(), json!({}), None).await.unwrap_err();
        assert_eq!(
            err,
            CoreError::Conflict {
                key: key().to_string(),
                expected: None,
                found: Some(1),
            }
        );
        assert!(store.write(&key(), json!({}), Some(7)).await.is_err());
    }

    #[tokio::test]
    async fn test_scopes_are_distinct() {
        let store = InMemoryStateStore::new();
        let user = StateKey::new(StateScope::User, "test/conversations/c1");
        store.write(&key(), json!({"flow": 1}), None).await.unwrap();
        store.write(&user, json!({"slots": 1}), None).await.unwrap();
        assert_eq!(store.len(), 2);

        store.delete(&key()).await.unwrap();
        store.delete(&key()).await.unwrap();
        assert!(store.read(&key()).await.unwrap().is_none());
        assert!(store.read(&user).await.unwrap().is_some());
    }
}
