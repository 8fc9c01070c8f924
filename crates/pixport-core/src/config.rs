//! Configuration module
//!
//! Environment-driven configuration for the API and services: server,
//! authentication, storage backend selection, upload policies, and the
//! daily quota ceiling.

use std::env;
use std::str::FromStr;

use crate::storage_types::StorageBackend;

// Common constants
const SERVER_PORT: u16 = 3000;
const MAX_IMAGES_PER_DAY: u32 = 300;
const MAX_IMAGES_PER_UPLOAD: usize = 150;
const MAX_FILE_SIZE_MB: usize = 10;
const PRESIGN_MAX_IMAGES_PER_UPLOAD: usize = 10;
const PRESIGN_MAX_FILE_SIZE_MB: usize = 5;
const DOWNLOAD_URL_EXPIRY_SECS: u64 = 900;
const PRESIGN_URL_EXPIRY_SECS: u64 = 600;
const TRUSTED_PROXY_COUNT: usize = 1;

/// The quota window is fixed: counts reset 24 hours after a client's first
/// upload check in the window.
pub const QUOTA_WINDOW_HOURS: i64 = 24;

/// Per-route upload limits (batch ceiling and per-file byte ceiling).
#[derive(Clone, Debug)]
pub struct UploadPolicy {
    pub max_files: usize,
    pub max_file_size_bytes: usize,
}

impl UploadPolicy {
    /// Upper bound for a whole request body under this policy.
    pub fn max_batch_bytes(&self) -> usize {
        self.max_files.saturating_mul(self.max_file_size_bytes)
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub gallery_password: String,
    pub trusted_proxy_count: usize,
    // Storage configuration
    pub storage_backend: Option<StorageBackend>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Quota and upload policies
    pub daily_image_limit: u32,
    pub direct_upload: UploadPolicy,
    pub presign_upload: UploadPolicy,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
    // Signed URL lifetimes
    pub download_url_expiry_secs: u64,
    pub presign_url_expiry_secs: u64,
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_list(name: &str, default: &str) -> Vec<String> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let storage_backend = env::var("STORAGE_BACKEND")
            .ok()
            .map(|s| StorageBackend::from_str(&s))
            .transpose()
            .map_err(|e| anyhow::anyhow!(e))?;

        let direct_upload = UploadPolicy {
            max_files: env_parse("MAX_IMAGES_PER_UPLOAD", MAX_IMAGES_PER_UPLOAD),
            max_file_size_bytes: env_parse("MAX_FILE_SIZE_MB", MAX_FILE_SIZE_MB) * 1024 * 1024,
        };
        let presign_upload = UploadPolicy {
            max_files: env_parse(
                "PRESIGN_MAX_IMAGES_PER_UPLOAD",
                PRESIGN_MAX_IMAGES_PER_UPLOAD,
            ),
            max_file_size_bytes: env_parse("PRESIGN_MAX_FILE_SIZE_MB", PRESIGN_MAX_FILE_SIZE_MB)
                * 1024
                * 1024,
        };

        Ok(Config {
            server_port: env_parse("SERVER_PORT", SERVER_PORT),
            cors_origins,
            environment,
            gallery_password: env::var("GALLERY_PASSWORD").unwrap_or_default(),
            trusted_proxy_count: env_parse("TRUSTED_PROXY_COUNT", TRUSTED_PROXY_COUNT),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            aws_region: env::var("AWS_REGION").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            daily_image_limit: env_parse("MAX_IMAGES_PER_DAY", MAX_IMAGES_PER_DAY),
            direct_upload,
            presign_upload,
            allowed_extensions: env_list("ALLOWED_EXTENSIONS", "jpg,jpeg,png,gif,webp"),
            allowed_content_types: env_list(
                "ALLOWED_CONTENT_TYPES",
                "image/jpeg,image/jpg,image/png,image/gif,image/webp",
            ),
            download_url_expiry_secs: env_parse("DOWNLOAD_URL_EXPIRY_SECS", DOWNLOAD_URL_EXPIRY_SECS),
            presign_url_expiry_secs: env_parse("PRESIGN_URL_EXPIRY_SECS", PRESIGN_URL_EXPIRY_SECS),
        })
    }

    /// Fail fast on misconfiguration before the server starts.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.is_production() {
            if self.cors_origins.iter().any(|o| o == "*") {
                return Err(anyhow::anyhow!(
                    "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
                ));
            }
            if self.gallery_password.is_empty() {
                return Err(anyhow::anyhow!(
                    "GALLERY_PASSWORD must be set in production."
                ));
            }
        }
        if self.daily_image_limit == 0 {
            return Err(anyhow::anyhow!("MAX_IMAGES_PER_DAY must be at least 1"));
        }
        if self.direct_upload.max_files == 0 || self.presign_upload.max_files == 0 {
            return Err(anyhow::anyhow!("Upload batch ceilings must be at least 1"));
        }
        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    // Convenience getters for common fields

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn gallery_password(&self) -> &str {
        &self.gallery_password
    }

    pub fn trusted_proxy_count(&self) -> usize {
        self.trusted_proxy_count
    }

    pub fn storage_backend(&self) -> Option<StorageBackend> {
        self.storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.aws_region.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.local_storage_base_url.as_deref()
    }

    pub fn daily_image_limit(&self) -> u32 {
        self.daily_image_limit
    }

    pub fn quota_window(&self) -> chrono::Duration {
        chrono::Duration::hours(QUOTA_WINDOW_HOURS)
    }

    pub fn direct_upload(&self) -> &UploadPolicy {
        &self.direct_upload
    }

    pub fn presign_upload(&self) -> &UploadPolicy {
        &self.presign_upload
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.allowed_content_types
    }

    pub fn download_url_expiry_secs(&self) -> u64 {
        self.download_url_expiry_secs
    }

    pub fn presign_url_expiry_secs(&self) -> u64 {
        self.presign_url_expiry_secs
    }

    /// Request body ceiling for the direct multipart route.
    pub fn max_request_body_bytes(&self) -> usize {
        self.direct_upload.max_batch_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            server_port: 3000,
            cors_origins: vec!["*".to_string()],
            environment: "development".to_string(),
            gallery_password: String::new(),
            trusted_proxy_count: 1,
            storage_backend: Some(StorageBackend::Local),
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            aws_region: None,
            local_storage_path: Some("/tmp/pixport".to_string()),
            local_storage_base_url: Some("http://localhost:3000/media".to_string()),
            daily_image_limit: 300,
            direct_upload: UploadPolicy {
                max_files: 150,
                max_file_size_bytes: 10 * 1024 * 1024,
            },
            presign_upload: UploadPolicy {
                max_files: 10,
                max_file_size_bytes: 5 * 1024 * 1024,
            },
            allowed_extensions: vec!["jpg".into(), "png".into()],
            allowed_content_types: vec!["image/jpeg".into(), "image/png".into()],
            download_url_expiry_secs: 900,
            presign_url_expiry_secs: 600,
        }
    }

    #[test]
    fn test_validate_development_defaults() {
        let config = test_config();
        assert!(config.validate().is_ok());
        assert!(!config.is_production());
    }

    #[test]
    fn test_validate_rejects_wildcard_cors_in_production() {
        let mut config = test_config();
        config.environment = "production".to_string();
        config.gallery_password = "secret".to_string();
        assert!(config.validate().is_err());

        config.cors_origins = vec!["https://gallery.example.com".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_password_in_production() {
        let mut config = test_config();
        config.environment = "prod".to_string();
        config.cors_origins = vec!["https://gallery.example.com".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_batch_bytes() {
        let policy = UploadPolicy {
            max_files: 10,
            max_file_size_bytes: 5 * 1024 * 1024,
        };
        assert_eq!(policy.max_batch_bytes(), 50 * 1024 * 1024);
    }
}
