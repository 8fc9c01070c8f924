//! Upload orchestration.
//!
//! One admission/validation/quota core, two transports: the direct multipart
//! batch pipeline (`BatchUploadService`) and the presigned-slot flow
//! (`PresignService`).

pub mod presign;
pub mod service;
pub mod types;

pub use presign::{purge_expired_slots, PendingUpload, PendingUploadStore, PresignService};
pub use service::BatchUploadService;
pub use types::IncomingFile;
