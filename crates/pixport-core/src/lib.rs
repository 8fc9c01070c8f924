//! Pixport Core Library
//!
//! This crate provides the domain core shared across all Pixport components:
//! configuration, error types, the per-client daily upload quota, and
//! per-file upload validation. It performs no I/O.

pub mod config;
pub mod error;
pub mod models;
pub mod quota;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::{Config, UploadPolicy};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use quota::{AdmissionDenied, DailyQuota, QuotaReservation, QuotaSnapshot};
pub use storage_types::StorageBackend;
pub use validation::{ImageValidator, ValidationError};
