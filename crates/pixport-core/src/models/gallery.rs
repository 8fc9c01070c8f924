//! Gallery and quota-status response models.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// One stored image in a gallery listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImage {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    /// Time-boxed read-only fetch URL
    pub url: String,
}

/// Gallery listing.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GalleryResponse {
    pub images: Vec<GalleryImage>,
    pub count: usize,
}

/// A freshly minted download URL for a single stored image.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadUrlResponse {
    pub key: String,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// The caller's current quota state.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatusResponse {
    pub remaining: u32,
    pub reset_time: DateTime<Utc>,
    pub limit: u32,
}
