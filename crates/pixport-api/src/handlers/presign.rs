//! Presigned-slot upload handlers.

use std::sync::Arc;

use axum::{extract::State, Json};
use pixport_core::models::{
    CompleteUploadRequest, CompleteUploadResponse, PresignBatchRequest, PresignBatchResponse,
};

use crate::error::{ErrorResponse, HttpAppError, RateLimitErrorResponse, ValidatedJson};
use crate::services::upload::PresignService;
use crate::state::AppState;
use crate::utils::client_ip::ClientIp;

/// Request presigned upload slots for a declared batch of images.
///
/// The declared batch is admitted against the caller's daily quota; each
/// accepted file gets a time-boxed presigned PUT URL. Upload the bytes with
/// HTTP PUT, then confirm with the complete endpoint.
#[utoipa::path(
    post,
    path = "/api/v0/images/presign",
    tag = "images",
    request_body = PresignBatchRequest,
    responses(
        (status = 200, description = "Slots issued (check per-file results)", body = PresignBatchResponse),
        (status = 400, description = "Empty batch or too many files", body = ErrorResponse),
        (status = 401, description = "Missing or invalid gallery password", body = ErrorResponse),
        (status = 429, description = "Daily quota denied", body = RateLimitErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "presign_batch"))]
pub async fn presign_images(
    State(state): State<Arc<AppState>>,
    ClientIp(client_ip): ClientIp,
    ValidatedJson(request): ValidatedJson<PresignBatchRequest>,
) -> Result<Json<PresignBatchResponse>, HttpAppError> {
    let service = PresignService::new(&state);
    let response = service
        .issue_slots(&client_ip, request)
        .await
        .map_err(HttpAppError::from)?;
    Ok(Json(response))
}

/// Confirm presigned uploads after the bytes were PUT to storage.
///
/// Verifies each slot's object exists; slots whose object never arrived
/// release their reserved quota.
#[utoipa::path(
    post,
    path = "/api/v0/images/presign/complete",
    tag = "images",
    request_body = CompleteUploadRequest,
    responses(
        (status = 200, description = "Completion processed (check per-slot results)", body = CompleteUploadResponse),
        (status = 400, description = "Invalid request body", body = ErrorResponse),
        (status = 401, description = "Missing or invalid gallery password", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "presign_complete"))]
pub async fn complete_presigned(
    State(state): State<Arc<AppState>>,
    ClientIp(client_ip): ClientIp,
    ValidatedJson(request): ValidatedJson<CompleteUploadRequest>,
) -> Result<Json<CompleteUploadResponse>, HttpAppError> {
    let service = PresignService::new(&state);
    let response = service
        .complete(&client_ip, request)
        .await
        .map_err(HttpAppError::from)?;
    Ok(Json(response))
}
