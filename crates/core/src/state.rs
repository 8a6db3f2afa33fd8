//! State scopes and versioned records

use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage scope of a state record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateScope {
    /// One record per conversation (flow state)
    Conversation,
    /// One record per user (collected slots)
    User,
}

impl StateScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conversation => "conversation",
            Self::User => "user",
        }
    }
}

impl fmt::Display for StateScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully qualified record key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateKey {
    pub scope: StateScope,
    pub key: String,
}

impl StateKey {
    pub fn new(scope: StateScope, key: impl Into<String>) -> Self {
        Self {
            scope,
            key: key.into(),
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.key)
    }
}

/// Opaque, versioned state blob
///
/// The data is a JSON object of named properties; the core never interprets it
/// beyond property get/set. `version` starts at 1 on first write and grows by
/// one per write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub version: u64,
    pub data: serde_json::Value,
}

impl StoredRecord {
    pub fn new(version: u64, data: serde_json::Value) -> Self {
        Self { version, data }
    }
}
