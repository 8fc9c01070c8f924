//! Presigned-slot upload flow.
//!
//! The client declares a batch of files, receives one time-boxed presigned
//! PUT URL per accepted file, uploads the bytes itself, then confirms with
//! the slot ids. Quota follows a reserve/confirm/release lifecycle: slots
//! reserve quota when issued, confirmed slots keep it, and slots that expire
//! or were never fulfilled give it back.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use pixport_core::models::{
    CompleteUploadRequest, CompleteUploadResponse, PresignBatchRequest, PresignBatchResponse,
    PresignedSlot, RateLimitInfo, StoredImage,
};
use pixport_core::{AppError, ImageValidator};
use pixport_storage::{Storage, StorageError, UploadKeyBuilder};
use uuid::Uuid;
use validator::Validate;

use super::service::{admission_denied_to_error, check_batch_shape};
use crate::state::AppState;

/// A slot that was issued but not yet confirmed.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub client_id: String,
    pub original_name: String,
    pub key: String,
    pub content_type: String,
    pub declared_size: u64,
    pub expires_at: DateTime<Utc>,
}

/// In-memory store of issued, unconfirmed slots keyed by upload id.
#[derive(Clone, Default)]
pub struct PendingUploadStore {
    inner: Arc<Mutex<HashMap<Uuid, PendingUpload>>>,
}

impl PendingUploadStore {
    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, PendingUpload>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn insert(&self, upload_id: Uuid, pending: PendingUpload) {
        self.lock().insert(upload_id, pending);
    }

    /// Remove and return a slot, but only for the client that owns it.
    /// Another client's id behaves as if the slot did not exist.
    pub fn take_for_client(&self, upload_id: &Uuid, client_id: &str) -> Option<PendingUpload> {
        let mut inner = self.lock();
        if inner.get(upload_id)?.client_id == client_id {
            inner.remove(upload_id)
        } else {
            None
        }
    }

    /// Remove and return every slot whose expiry has passed.
    pub fn drain_expired(&self, now: DateTime<Utc>) -> Vec<PendingUpload> {
        let mut inner = self.lock();
        let expired_ids: Vec<Uuid> = inner
            .iter()
            .filter(|(_, pending)| now > pending.expires_at)
            .map(|(id, _)| *id)
            .collect();
        expired_ids
            .iter()
            .filter_map(|id| inner.remove(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

pub struct PresignService {
    state: Arc<AppState>,
}

impl PresignService {
    pub fn new(state: &Arc<AppState>) -> Self {
        Self {
            state: state.clone(),
        }
    }

    /// Issue presigned upload slots for a declared batch.
    ///
    /// Admission reserves quota for the whole batch; slots that fail
    /// validation or URL minting release their share immediately, issued
    /// slots keep theirs until completion or expiry.
    #[tracing::instrument(skip(self, request), fields(client = %client_id, batch_size = request.files.len()))]
    pub async fn issue_slots(
        &self,
        client_id: &str,
        request: PresignBatchRequest,
    ) -> Result<PresignBatchResponse, AppError> {
        request.validate()?;

        let config = &self.state.config;
        let policy = config.presign_upload();
        check_batch_shape(request.files.len(), policy.max_files)?;

        let total = request.files.len();
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
        let url_expiry = std::time::Duration::from_secs(config.presign_url_expiry_secs());
        let expires_at = Utc::now() + Duration::seconds(config.presign_url_expiry_secs() as i64);

        let mut slots = Vec::new();
        let mut errors = Vec::new();
        for file in &request.files {
            let planned = validator
                .validate_all(&file.name, &file.content_type, file.size as usize)
                .map_err(|e| format!("{}: {}", file.name, e))
                .and_then(|extension| {
                    key_builder
                        .build(&file.name, &extension)
                        .map_err(|e| format!("{}: {}", file.name, e))
                });
            let key = match planned {
                Ok(key) => key,
                Err(error) => {
                    errors.push(error);
                    continue;
                }
            };

            match self
                .state
                .storage
                .presigned_put_url(&key, &file.content_type, url_expiry)
                .await
            {
                Ok(url) => {
                    let upload_id = Uuid::new_v4();
                    self.state.pending_uploads.insert(
                        upload_id,
                        PendingUpload {
                            client_id: client_id.to_string(),
                            original_name: file.name.clone(),
                            key: key.clone(),
                            content_type: file.content_type.clone(),
                            declared_size: file.size,
                            expires_at,
                        },
                    );
                    slots.push(PresignedSlot {
                        upload_id,
                        original_name: file.name.clone(),
                        key,
                        url,
                        expires_at,
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, file = %file.name, key = %key, "Presigned URL minting failed");
                    errors.push(format!("{}: failed to create upload URL", file.name));
                }
            }
        }

        let issued = slots.len();
        let unused = reservation.reserved.saturating_sub(issued as u32);
        if unused > 0 {
            self.state.quota.release(client_id, unused);
        }

        tracing::info!(issued, total, "Presigned slots issued");

        Ok(PresignBatchResponse {
            success: errors.is_empty(),
            issued,
            total,
            slots,
            errors: if errors.is_empty() { None } else { Some(errors) },
            rate_limit: RateLimitInfo {
                remaining: reservation.remaining + unused,
                reset_time: reservation.reset_at,
            },
        })
    }

    /// Confirm presigned uploads after the client PUT the bytes.
    ///
    /// Each slot is verified against storage: confirmed slots keep their
    /// reserved quota, slots whose object never arrived (or that expired)
    /// release it.
    #[tracing::instrument(skip(self, request), fields(client = %client_id, slot_count = request.upload_ids.len()))]
    pub async fn complete(
        &self,
        client_id: &str,
        request: CompleteUploadRequest,
    ) -> Result<CompleteUploadResponse, AppError> {
        request.validate()?;

        let policy = self.state.config.presign_upload();
        if request.upload_ids.len() > policy.max_files {
            return Err(AppError::BadRequest(format!(
                "Too many upload ids: {} (max {} per request)",
                request.upload_ids.len(),
                policy.max_files
            )));
        }

        let now = Utc::now();
        let mut results = Vec::new();
        let mut errors = Vec::new();

        for upload_id in &request.upload_ids {
            let Some(pending) = self
                .state
                .pending_uploads
                .take_for_client(upload_id, client_id)
            else {
                errors.push(format!("{}: unknown or already completed upload", upload_id));
                continue;
            };

            if now > pending.expires_at {
                self.state.quota.release(client_id, 1);
                errors.push(format!("{}: upload slot expired", pending.original_name));
                continue;
            }

            match self.state.storage.content_length(&pending.key).await {
                Ok(size) => results.push(StoredImage {
                    original_name: pending.original_name,
                    key: pending.key,
                    size,
                    content_type: pending.content_type,
                }),
                Err(StorageError::NotFound(_)) => {
                    self.state.quota.release(client_id, 1);
                    errors.push(format!(
                        "{}: no uploaded object found in storage",
                        pending.original_name
                    ));
                }
                Err(e) => {
                    // Transient verification failure: keep the slot so the
                    // client can retry completion
                    tracing::warn!(error = %e, key = %pending.key, "Storage verification failed");
                    errors.push(format!(
                        "{}: storage verification failed, retry completion",
                        pending.original_name
                    ));
                    self.state.pending_uploads.insert(*upload_id, pending);
                }
            }
        }

        let snapshot = self.state.quota.peek(client_id);

        tracing::info!(
            confirmed = results.len(),
            total = request.upload_ids.len(),
            "Presigned uploads completed"
        );

        Ok(CompleteUploadResponse {
            success: errors.is_empty(),
            uploaded: results.len(),
            total: request.upload_ids.len(),
            results,
            errors: if errors.is_empty() { None } else { Some(errors) },
            rate_limit: RateLimitInfo {
                remaining: snapshot.remaining,
                reset_time: snapshot.reset_at,
            },
        })
    }
}

/// Release quota held by expired presigned slots. Driven by the periodic
/// maintenance task.
pub fn purge_expired_slots(state: &AppState) -> usize {
    let expired = state.pending_uploads.drain_expired(Utc::now());
    for pending in &expired {
        state.quota.release(&pending.client_id, 1);
    }
    if !expired.is_empty() {
        tracing::debug!(
            slots_purged = expired.len(),
            "Released quota for expired presigned slots"
        );
    }
    expired.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(client_id: &str, expires_at: DateTime<Utc>) -> PendingUpload {
        PendingUpload {
            client_id: client_id.to_string(),
            original_name: "photo.png".to_string(),
            key: "uploads/x.png".to_string(),
            content_type: "image/png".to_string(),
            declared_size: 10,
            expires_at,
        }
    }

    #[test]
    fn test_take_for_client_enforces_ownership() {
        let store = PendingUploadStore::default();
        let id = Uuid::new_v4();
        store.insert(id, pending("client-a", Utc::now() + Duration::minutes(10)));

        assert!(store.take_for_client(&id, "client-b").is_none());
        assert_eq!(store.len(), 1);
        assert!(store.take_for_client(&id, "client-a").is_some());
        assert!(store.is_empty());
        // Second take: the slot is gone
        assert!(store.take_for_client(&id, "client-a").is_none());
    }

    #[test]
    fn test_drain_expired() {
        let store = PendingUploadStore::default();
        let now = Utc::now();
        store.insert(Uuid::new_v4(), pending("client-a", now - Duration::minutes(1)));
        store.insert(Uuid::new_v4(), pending("client-a", now + Duration::minutes(10)));

        let expired = store.drain_expired(now);
        assert_eq!(expired.len(), 1);
        assert_eq!(store.len(), 1);
    }
}
