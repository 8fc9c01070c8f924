//! Direct batch upload pipeline.
//!
//! Sequences one incoming multipart batch through admission, per-file
//! validation, concurrent storage writes, and quota settlement. Admission is
//! all-or-nothing for the whole batch; everything after admission is
//! best-effort per file, and the quota only keeps what was actually stored.

use std::sync::Arc;

use futures::future::join_all;
use pixport_core::models::{BatchUploadResponse, RateLimitInfo, StoredImage};
use pixport_core::{AdmissionDenied, AppError, ImageValidator};
use pixport_storage::{Storage, UploadKeyBuilder};

use super::types::IncomingFile;
use crate::state::AppState;

/// Per-file work item after validation.
enum Plan {
    Store {
        name: String,
        content_type: String,
        key: String,
        data: Vec<u8>,
    },
    Reject(String),
}

pub struct BatchUploadService {
    state: Arc<AppState>,
}

impl BatchUploadService {
    pub fn new(state: &Arc<AppState>) -> Self {
        Self {
            state: state.clone(),
        }
    }

    /// Upload one batch for one client.
    ///
    /// Pipeline: batch-shape checks → quota reservation → per-file
    /// validation and key derivation (in batch order) → concurrent storage
    /// puts → release of the unused reservation → response assembly.
    ///
    /// Only batch-shape and admission failures abort the request. Per-file
    /// validation and storage failures are collected into the response's
    /// error list and never block sibling files.
    #[tracing::instrument(skip(self, files), fields(client = %client_id, batch_size = files.len()))]
    pub async fn upload_batch(
        &self,
        client_id: &str,
        files: Vec<IncomingFile>,
    ) -> Result<BatchUploadResponse, AppError> {
        let config = &self.state.config;
        let policy = config.direct_upload();
        check_batch_shape(files.len(), policy.max_files)?;

        let total = files.len();
        let reservation = self
            .state
            .quota
            .try_reserve(client_id, total as u32)
            .map_err(admission_denied_to_error)?;

        let validator = ImageValidator::new(
            policy.max_file_size_bytes,
            config.allowed_extensions().to_vec(),
            config.allowed_content_types().to_vec(),
        );
        let key_builder = UploadKeyBuilder::new();

        // Validate in batch order and derive keys for accepted files
        let mut plans = Vec::with_capacity(total);
        for file in files {
            let planned = validator
                .validate_all(&file.name, &file.content_type, file.data.len())
                .map_err(|e| format!("{}: {}", file.name, e))
                .and_then(|extension| {
                    key_builder
                        .build(&file.name, &extension)
                        .map_err(|e| format!("{}: {}", file.name, e))
                });
            plans.push(match planned {
                Ok(key) => Plan::Store {
                    name: file.name,
                    content_type: file.content_type,
                    key,
                    data: file.data,
                },
                Err(error) => Plan::Reject(error),
            });
        }

        // Fan out storage writes; files are independent. join_all returns
        // results in input order, so reporting stays in batch order no
        // matter the completion order.
        let outcomes = join_all(plans.into_iter().map(|plan| {
            let storage = self.state.storage.clone();
            async move {
                match plan {
                    Plan::Reject(error) => Err(error),
                    Plan::Store {
                        name,
                        content_type,
                        key,
                        data,
                    } => {
                        let size = data.len() as u64;
                        match storage.put(&key, data, &content_type).await {
                            Ok(_url) => Ok(StoredImage {
                                original_name: name,
                                key,
                                size,
                                content_type,
                            }),
                            Err(e) => {
                                tracing::warn!(error = %e, file = %name, key = %key, "Storage put failed");
                                Err(format!("{}: storage upload failed", name))
                            }
                        }
                    }
                }
            }
        }))
        .await;

        let mut results = Vec::new();
        let mut errors = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(stored) => results.push(stored),
                Err(error) => errors.push(error),
            }
        }

        // Quota keeps only what actually landed in storage
        let uploaded = results.len();
        let unused = reservation.reserved.saturating_sub(uploaded as u32);
        if unused > 0 {
            self.state.quota.release(client_id, unused);
        }

        let rate_limit = RateLimitInfo {
            remaining: reservation.remaining + unused,
            reset_time: reservation.reset_at,
        };

        tracing::info!(
            uploaded,
            total,
            remaining = rate_limit.remaining,
            "Batch upload finished"
        );

        Ok(BatchUploadResponse {
            success: errors.is_empty(),
            uploaded,
            total,
            results,
            errors: if errors.is_empty() { None } else { Some(errors) },
            rate_limit,
        })
    }
}

/// Batch-shape gate, applied before the quota check.
pub(crate) fn check_batch_shape(batch_len: usize, max_files: usize) -> Result<(), AppError> {
    if batch_len == 0 {
        return Err(AppError::BadRequest("No files in upload batch".to_string()));
    }
    if batch_len > max_files {
        return Err(AppError::BadRequest(format!(
            "Too many files: {} (max {} per upload)",
            batch_len, max_files
        )));
    }
    Ok(())
}

pub(crate) fn admission_denied_to_error(denied: AdmissionDenied) -> AppError {
    match denied {
        AdmissionDenied::Exhausted { reset_at } => AppError::RateLimitExceeded {
            remaining: 0,
            reset_at,
        },
        AdmissionDenied::InsufficientRemaining {
            remaining,
            reset_at,
        } => AppError::RateLimitWouldBeExceeded {
            remaining,
            reset_at,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_check_batch_shape() {
        assert!(check_batch_shape(1, 10).is_ok());
        assert!(check_batch_shape(10, 10).is_ok());
        assert!(matches!(
            check_batch_shape(0, 10),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            check_batch_shape(11, 10),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_admission_denied_mapping() {
        let reset_at = Utc::now();
        match admission_denied_to_error(AdmissionDenied::Exhausted { reset_at }) {
            AppError::RateLimitExceeded { remaining, .. } => assert_eq!(remaining, 0),
            other => panic!("Expected RateLimitExceeded, got {:?}", other),
        }
        match admission_denied_to_error(AdmissionDenied::InsufficientRemaining {
            remaining: 2,
            reset_at,
        }) {
            AppError::RateLimitWouldBeExceeded { remaining, .. } => assert_eq!(remaining, 2),
            other => panic!("Expected RateLimitWouldBeExceeded, got {:?}", other),
        }
    }
}
