//! Application state.
//!
//! `AppState` aggregates the shared services every handler needs: the parsed
//! configuration, the quota store, the storage backend, and the pending
//! presigned-upload slots. It is injected as `Arc<AppState>` via axum's
//! `State` extractor rather than living in process-global statics, so tests
//! can build isolated instances.

use crate::services::upload::PendingUploadStore;
use pixport_core::{Config, DailyQuota};
use pixport_storage::Storage;
use std::sync::Arc;

/// Main application state.
pub struct AppState {
    pub config: Config,
    pub quota: Arc<DailyQuota>,
    pub storage: Arc<dyn Storage>,
    pub pending_uploads: PendingUploadStore,
    pub is_production: bool,
}

impl AppState {
    pub fn new(config: Config, quota: Arc<DailyQuota>, storage: Arc<dyn Storage>) -> Self {
        let is_production = config.is_production();
        Self {
            config,
            quota,
            storage,
            pending_uploads: PendingUploadStore::default(),
            is_production,
        }
    }
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
