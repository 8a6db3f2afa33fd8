//! State persistence for the campus bot
//!
//! Provides the state store backends behind [`StateStore`]:
//! - `InMemoryStateStore` - Default, uses HashMap (lost on restart)
//! - `FileStateStore` - One JSON file per record under a directory
//!
//! Every record carries a version. Writes pass the version they read and a
//! stale write is rejected as a conflict instead of overwriting.
//!
//! [`ScopedState`] is the per-turn view of one record: load once, typed
//! property get/set, and a single `save_changes` at the end of the turn.

pub mod error;
pub mod file;
pub mod memory;
pub mod scoped;

pub use error::PersistenceError;
pub use file::FileStateStore;
pub use memory::InMemoryStateStore;
pub use scoped::ScopedState;

use std::sync::Arc;

use campus_bot_config::{PersistenceConfig, PersistenceProvider};
use campus_bot_core::StateStore;

/// Create the state store selected by `config.provider`
pub fn create_state_store(
    config: &PersistenceConfig,
) -> Result<Arc<dyn StateStore>, PersistenceError> {
    match config.provider {
        PersistenceProvider::Memory => {
            tracing::info!("Using in-memory state store");
            Ok(Arc::new(InMemoryStateStore::new()))
        },
        PersistenceProvider::File => {
            let store = FileStateStore::new(&config.directory)?;
            tracing::info!(directory = %config.directory, "Using file state store");
            Ok(Arc::new(store))
        },
    }
}
