//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p pixport-api --test upload_test` or
//! `cargo test -p pixport-api`. Tests run against tempdir-backed local
//! storage; no external services required.

use axum_test::TestServer;
use pixport_api::constants;
use pixport_api::setup::routes;
use pixport_api::state::AppState;
use pixport_core::{Config, DailyQuota, StorageBackend, UploadPolicy};
use pixport_storage::{LocalStorage, Storage};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Shared gallery password for tests.
pub const TEST_PASSWORD: &str = "test-gallery-password";

/// API path prefix for tests (e.g. `/api/v0`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Test application: server, state, and owned storage directory.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub storage_dir: PathBuf,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

/// Baseline config: local storage, default image policies.
pub fn test_config() -> Config {
    Config {
        server_port: 0,
        cors_origins: vec!["*".to_string()],
        environment: "test".to_string(),
        gallery_password: TEST_PASSWORD.to_string(),
        trusted_proxy_count: 0,
        storage_backend: Some(StorageBackend::Local),
        s3_bucket: None,
        s3_region: None,
        s3_endpoint: None,
        aws_region: None,
        local_storage_path: None,
        local_storage_base_url: None,
        daily_image_limit: 300,
        direct_upload: UploadPolicy {
            max_files: 150,
            max_file_size_bytes: 10 * 1024 * 1024,
        },
        presign_upload: UploadPolicy {
            max_files: 10,
            max_file_size_bytes: 5 * 1024 * 1024,
        },
        allowed_extensions: ["jpg", "jpeg", "png", "gif", "webp"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        allowed_content_types: [
            "image/jpeg",
            "image/jpg",
            "image/png",
            "image/gif",
            "image/webp",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
        download_url_expiry_secs: 900,
        presign_url_expiry_secs: 600,
    }
}

/// Setup a test app with the baseline config.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(test_config()).await
}

/// Setup a test app with a custom config (e.g. a small daily limit).
pub async fn setup_test_app_with(config: Config) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let storage_dir = temp_dir.path().to_path_buf();

    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(
            storage_dir.clone(),
            "http://localhost:3000/files".to_string(),
        )
        .await
        .expect("Failed to create local storage"),
    );

    let quota = Arc::new(DailyQuota::new(
        config.daily_image_limit(),
        config.quota_window(),
    ));

    let state = Arc::new(AppState::new(config.clone(), quota, storage));
    let router = routes::setup_routes(&config, state.clone()).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp {
        server,
        state,
        storage_dir,
        _temp_dir: temp_dir,
    }
}
