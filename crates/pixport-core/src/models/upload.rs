//! Upload request/response models for both transports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Quota snapshot reported alongside every upload-path response.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitInfo {
    /// Uploads left in the current window
    pub remaining: u32,
    /// When the window resets
    pub reset_time: DateTime<Utc>,
}

/// One successfully stored image.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    /// Name the client declared for the file (may include a folder path)
    pub original_name: String,
    /// Storage key the bytes were written under
    pub key: String,
    /// Size in bytes
    pub size: u64,
    /// Declared MIME type
    #[serde(rename = "type")]
    pub content_type: String,
}

/// Result of a direct multipart batch upload.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchUploadResponse {
    /// True when every file in the batch was stored
    pub success: bool,
    /// Number of files actually stored
    pub uploaded: usize,
    /// Number of files in the request
    pub total: usize,
    pub results: Vec<StoredImage>,
    /// Per-file error strings, keyed by original filename; absent when empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    pub rate_limit: RateLimitInfo,
}

/// One file descriptor in a presign request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PresignFileRequest {
    /// Original filename, optionally with a folder path ("album/photo.png")
    #[validate(length(
        min = 1,
        max = 255,
        message = "Filename must be between 1 and 255 characters"
    ))]
    pub name: String,
    /// Declared MIME type
    #[validate(length(
        min = 1,
        max = 255,
        message = "Content type must be between 1 and 255 characters"
    ))]
    pub content_type: String,
    /// Declared size in bytes
    #[validate(range(min = 1, message = "File size must be at least 1 byte"))]
    pub size: u64,
}

/// Request for a batch of presigned upload slots.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PresignBatchRequest {
    #[validate(nested)]
    pub files: Vec<PresignFileRequest>,
}

/// A presigned upload slot for one accepted file.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PresignedSlot {
    /// Id to pass back when completing the upload
    pub upload_id: Uuid,
    pub original_name: String,
    /// Storage key the client must PUT to
    pub key: String,
    /// Presigned PUT URL
    pub url: String,
    /// When the slot (and its URL) expires
    pub expires_at: DateTime<Utc>,
}

/// Result of a presign request.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PresignBatchResponse {
    /// True when every requested file received a slot
    pub success: bool,
    /// Number of slots issued
    pub issued: usize,
    /// Number of files in the request
    pub total: usize,
    pub slots: Vec<PresignedSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    pub rate_limit: RateLimitInfo,
}

/// Request to confirm presigned uploads after the client PUT the bytes.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteUploadRequest {
    #[validate(length(min = 1, message = "At least one upload id is required"))]
    pub upload_ids: Vec<Uuid>,
}

/// Result of completing presigned uploads.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteUploadResponse {
    /// True when every slot was confirmed
    pub success: bool,
    /// Number of uploads confirmed in storage
    pub uploaded: usize,
    /// Number of slots submitted for completion
    pub total: usize,
    pub results: Vec<StoredImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    pub rate_limit: RateLimitInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Wire contract: camelCase fields, "type" for the MIME type, errors
    /// omitted when absent.
    #[test]
    fn test_batch_upload_response_shape() {
        let response = BatchUploadResponse {
            success: true,
            uploaded: 1,
            total: 1,
            results: vec![StoredImage {
                original_name: "album/photo.png".to_string(),
                key: "uploads/album-a1b2c3/1700000000000-x.png".to_string(),
                size: 1024,
                content_type: "image/png".to_string(),
            }],
            errors: None,
            rate_limit: RateLimitInfo {
                remaining: 299,
                reset_time: Utc::now(),
            },
        };
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json["uploaded"], 1);
        assert_eq!(json["results"][0]["originalName"], "album/photo.png");
        assert_eq!(json["results"][0]["type"], "image/png");
        assert!(json.get("errors").is_none());
        assert_eq!(json["rateLimit"]["remaining"], 299);
        assert!(json["rateLimit"].get("resetTime").is_some());
    }

    #[test]
    fn test_presign_request_validation() {
        let request = PresignBatchRequest {
            files: vec![PresignFileRequest {
                name: "photo.png".to_string(),
                content_type: "image/png".to_string(),
                size: 1024,
            }],
        };
        assert!(request.validate().is_ok());

        let request = PresignBatchRequest {
            files: vec![PresignFileRequest {
                name: String::new(),
                content_type: "image/png".to_string(),
                size: 0,
            }],
        };
        assert!(request.validate().is_err());
    }
}
