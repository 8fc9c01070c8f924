//! OpenAPI document assembly.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health,
        crate::handlers::upload::upload_images,
        crate::handlers::presign::presign_images,
        crate::handlers::presign::complete_presigned,
        crate::handlers::gallery::list_images,
        crate::handlers::gallery::download_url,
        crate::handlers::quota::quota_status,
    ),
    components(schemas(
        crate::error::ErrorResponse,
        crate::error::RateLimitErrorResponse,
        pixport_core::models::BatchUploadResponse,
        pixport_core::models::StoredImage,
        pixport_core::models::RateLimitInfo,
        pixport_core::models::PresignBatchRequest,
        pixport_core::models::PresignFileRequest,
        pixport_core::models::PresignBatchResponse,
        pixport_core::models::PresignedSlot,
        pixport_core::models::CompleteUploadRequest,
        pixport_core::models::CompleteUploadResponse,
        pixport_core::models::GalleryResponse,
        pixport_core::models::GalleryImage,
        pixport_core::models::DownloadUrlResponse,
        pixport_core::models::QuotaStatusResponse,
    )),
    tags(
        (name = "images", description = "Image upload and gallery"),
        (name = "quota", description = "Daily upload quota"),
        (name = "health", description = "Service health")
    ),
    info(
        title = "Pixport API",
        description = "Authenticated image upload and gallery service"
    )
)]
pub struct ApiDoc;
