//! Wire models shared between the API surface and services.

pub mod gallery;
pub mod upload;

pub use gallery::{DownloadUrlResponse, GalleryImage, GalleryResponse, QuotaStatusResponse};
pub use upload::{
    BatchUploadResponse, CompleteUploadRequest, CompleteUploadResponse, PresignBatchRequest,
    PresignBatchResponse, PresignFileRequest, PresignedSlot, RateLimitInfo, StoredImage,
};
