//! Per-turn view of one state record

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use campus_bot_core::{CoreError, StateKey, StateStore};

/// One scope's record loaded for the duration of a turn
///
/// Properties are read and written in memory; nothing reaches the store
/// until [`ScopedState::save_changes`], and only if something changed.
pub struct ScopedState {
    store: Arc<dyn StateStore>,
    key: StateKey,
    version: Option<u64>,
    properties: Map<String, Value>,
    dirty: bool,
    /// Properties as last read from or written to the store, `None` if absent
    stored: Option<Map<String, Value>>,
    /// What the last save overwrote
    replaced: Option<Option<Map<String, Value>>>,
}

impl ScopedState {
    /// Load the record for `key` (empty if absent)
    pub async fn load(store: Arc<dyn StateStore>, key: StateKey) -> Result<Self, CoreError> {
        let (version, properties) = match store.read(&key).await? {
            Some(record) => {
                let properties = match record.data {
                    Value::Object(map) => map,
                    Value::Null => Map::new(),
                    other => {
                        return Err(CoreError::Serialization(format!(
                            "state record {} is not an object: {}",
                            key, other
                        )))
                    },
                };
                (Some(record.version), properties)
            },
            None => (None, Map::new()),
        };

        let stored = version.map(|_| properties.clone());
        Ok(Self {
            store,
            key,
            version,
            properties,
            dirty: false,
            stored,
            replaced: None,
        })
    }

    pub fn key(&self) -> &StateKey {
        &self.key
    }

    /// Version read at load time (or after the last save)
    pub fn version(&self) -> Option<u64> {
        self.version
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Typed property, falling back to `default` when absent or unreadable
    pub fn get<T: DeserializeOwned>(&self, property: &str, default: T) -> T {
        match self.properties.get(property) {
            Some(value) => match serde_json::from_value(value.clone()) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!(
                        key = %self.key,
                        property,
                        error = %e,
                        "Unreadable state property, using default"
                    );
                    default
                },
            },
            None => default,
        }
    }

    /// Set a property
    pub fn set<T: Serialize>(&mut self, property: &str, value: &T) -> Result<(), CoreError> {
        let value = serde_json::to_value(value)?;
        if self.properties.get(property) != Some(&value) {
            self.properties.insert(property.to_string(), value);
            self.dirty = true;
        }
        Ok(())
    }

    /// Remove a property
    pub fn remove(&mut self, property: &str) {
        if self.properties.remove(property).is_some() {
            self.dirty = true;
        }
    }

    /// Remove every property
    pub fn clear(&mut self) {
        if !self.properties.is_empty() {
            self.properties.clear();
            self.dirty = true;
        }
    }

    /// Write the record if it changed; returns whether a write happened
    pub async fn save_changes(&mut self) -> Result<bool, CoreError> {
        if !self.dirty {
            return Ok(false);
        }

        let version = self
            .store
            .write(
                &self.key,
                Value::Object(self.properties.clone()),
                self.version,
            )
            .await?;
        tracing::debug!(key = %self.key, version, "State saved");

        self.version = Some(version);
        self.dirty = false;
        self.replaced = Some(self.stored.replace(self.properties.clone()));
        Ok(true)
    }

    /// Put back what the last [`ScopedState::save_changes`] overwrote
    ///
    /// Returns whether anything was written. A record that did not exist
    /// before that save is deleted.
    pub async fn undo_save(&mut self) -> Result<bool, CoreError> {
        let Some(previous) = self.replaced.take() else {
            return Ok(false);
        };

        match previous {
            Some(properties) => {
                let version = self
                    .store
                    .write(&self.key, Value::Object(properties.clone()), self.version)
                    .await?;
                self.version = Some(version);
                self.properties = properties.clone();
                self.stored = Some(properties);
            },
            None => {
                self.store.delete(&self.key).await?;
                self.version = None;
                self.properties = Map::new();
                self.stored = None;
            },
        }
        self.dirty = false;
        tracing::debug!(key = %self.key, "State save undone");
        Ok(true)
    }
}
