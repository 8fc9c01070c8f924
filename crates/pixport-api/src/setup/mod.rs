//! Application setup and initialization
//!
//! All application initialization logic lives here, extracted from main.rs
//! for better organization and testability.

pub mod routes;
pub mod server;

use crate::services::upload::purge_expired_slots;
use crate::state::AppState;
use anyhow::{Context, Result};
use pixport_core::{Config, DailyQuota};
use std::sync::Arc;
use std::time::Duration;

/// Interval between housekeeping sweeps (quota eviction, expired slots).
const MAINTENANCE_INTERVAL_SECS: u64 = 600;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    crate::telemetry::init_tracing();
    tracing::info!("Configuration loaded and validated successfully");

    let storage = pixport_storage::create_storage(&config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize storage backend: {}", e))?;

    let quota = Arc::new(DailyQuota::new(
        config.daily_image_limit(),
        config.quota_window(),
    ));

    let state = Arc::new(AppState::new(config.clone(), quota, storage));

    spawn_maintenance_task(state.clone());

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}

/// Periodic housekeeping: evict stale quota entries and release quota held
/// by expired presigned slots, so both in-memory maps stay bounded.
fn spawn_maintenance_task(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(MAINTENANCE_INTERVAL_SECS));
        // The first tick completes immediately; skip it
        interval.tick().await;
        loop {
            interval.tick().await;
            let quota_removed = state.quota.cleanup_expired();
            let slots_purged = purge_expired_slots(&state);
            if quota_removed > 0 || slots_purged > 0 {
                tracing::debug!(quota_removed, slots_purged, "Maintenance sweep finished");
            }
        }
    });
}
