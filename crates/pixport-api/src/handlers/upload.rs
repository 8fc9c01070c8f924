//! Direct multipart batch upload handler.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use pixport_core::models::BatchUploadResponse;
use pixport_core::AppError;

use crate::error::{ErrorResponse, HttpAppError, RateLimitErrorResponse};
use crate::services::upload::{BatchUploadService, IncomingFile};
use crate::state::AppState;
use crate::utils::client_ip::ClientIp;

/// Upload a batch of images as multipart form data.
///
/// Each part with a filename is treated as one file; the filename may carry
/// a folder path ("album/photo.png") which is preserved in the storage key.
/// The batch is admitted against the caller's daily quota as a whole, then
/// processed best-effort per file.
#[utoipa::path(
    post,
    path = "/api/v0/images",
    tag = "images",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Batch processed (check per-file results)", body = BatchUploadResponse),
        (status = 400, description = "Empty batch or too many files", body = ErrorResponse),
        (status = 401, description = "Missing or invalid gallery password", body = ErrorResponse),
        (status = 429, description = "Daily quota denied", body = RateLimitErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_batch"))]
pub async fn upload_images(
    State(state): State<Arc<AppState>>,
    ClientIp(client_ip): ClientIp,
    mut multipart: Multipart,
) -> Result<Json<BatchUploadResponse>, HttpAppError> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        HttpAppError(AppError::BadRequest(format!(
            "Invalid multipart body: {}",
            e
        )))
    })? {
        // Parts without a filename (plain form fields) are not files
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| {
                HttpAppError(AppError::BadRequest(format!(
                    "Failed to read file '{}': {}",
                    file_name, e
                )))
            })?
            .to_vec();

        files.push(IncomingFile {
            name: file_name,
            content_type,
            data,
        });
    }

    let service = BatchUploadService::new(&state);
    let response = service
        .upload_batch(&client_ip, files)
        .await
        .map_err(HttpAppError::from)?;

    Ok(Json(response))
}
