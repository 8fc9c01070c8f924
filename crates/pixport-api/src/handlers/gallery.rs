//! Gallery listing and download-URL handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use futures::future::join_all;
use pixport_core::models::{DownloadUrlResponse, GalleryImage, GalleryResponse};
use pixport_core::AppError;
use pixport_storage::{Storage, UPLOADS_PREFIX};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// List uploaded images with time-boxed fetch URLs.
#[utoipa::path(
    get,
    path = "/api/v0/images",
    tag = "images",
    responses(
        (status = 200, description = "Gallery listing", body = GalleryResponse),
        (status = 401, description = "Missing or invalid gallery password", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "gallery_list"))]
pub async fn list_images(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GalleryResponse>, HttpAppError> {
    let objects = state
        .storage
        .list(UPLOADS_PREFIX)
        .await
        .map_err(HttpAppError::from)?;

    let expiry = Duration::from_secs(state.config.download_url_expiry_secs());
    let urls = join_all(objects.iter().map(|object| {
        let storage = state.storage.clone();
        let key = object.key.clone();
        async move { storage.presigned_get_url(&key, expiry).await }
    }))
    .await;

    let mut images = Vec::with_capacity(objects.len());
    for (object, url) in objects.into_iter().zip(urls) {
        let url = url.map_err(HttpAppError::from)?;
        images.push(GalleryImage {
            key: object.key,
            size: object.size,
            last_modified: object.last_modified,
            url,
        });
    }

    Ok(Json(GalleryResponse {
        count: images.len(),
        images,
    }))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DownloadUrlQuery {
    /// Storage key of the image ("uploads/...")
    pub key: String,
}

/// Mint a time-boxed download URL for one stored image.
#[utoipa::path(
    get,
    path = "/api/v0/images/download-url",
    tag = "images",
    params(DownloadUrlQuery),
    responses(
        (status = 200, description = "Signed download URL", body = DownloadUrlResponse),
        (status = 400, description = "Key outside the uploads prefix", body = ErrorResponse),
        (status = 404, description = "No object stored under the key", body = ErrorResponse),
        (status = 401, description = "Missing or invalid gallery password", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "download_url", key = %query.key))]
pub async fn download_url(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DownloadUrlQuery>,
) -> Result<Json<DownloadUrlResponse>, HttpAppError> {
    let key = query.key;

    // Only uploaded images are downloadable through the gallery
    if !key.starts_with(&format!("{}/", UPLOADS_PREFIX)) || key.contains("..") {
        return Err(HttpAppError(AppError::InvalidInput(
            "Key must reference an uploaded image".to_string(),
        )));
    }

    if !state
        .storage
        .exists(&key)
        .await
        .map_err(HttpAppError::from)?
    {
        return Err(HttpAppError(AppError::NotFound(format!(
            "No stored image at {}",
            key
        ))));
    }

    let expiry_secs = state.config.download_url_expiry_secs();
    let url = state
        .storage
        .presigned_get_url(&key, Duration::from_secs(expiry_secs))
        .await
        .map_err(HttpAppError::from)?;

    Ok(Json(DownloadUrlResponse {
        key,
        url,
        expires_at: Utc::now() + chrono::Duration::seconds(expiry_secs as i64),
    }))
}
