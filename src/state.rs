//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::db::Store;
use crate::migrate::MigrationSource;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Single-connection store (required)
    pub store: Store,

    /// Where migration units come from, for pending reports
    pub migrations: Box<dyn MigrationSource>,
}

impl AppState {
    pub fn new(store: Store, migrations: Box<dyn MigrationSource>) -> Self {
        Self { store, migrations }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
