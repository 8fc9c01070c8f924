//! Upload key derivation.
//!
//! Keys must be collision-resistant across concurrent uploads and preserve
//! any folder structure the client declared. The stored filename is always
//! `{millis}-{uuid}.{ext}`, and the first folder component carries a random
//! per-batch tag so two batches uploading the same folder name land in
//! distinct folders.

use crate::traits::StorageError;
use chrono::Utc;
use uuid::Uuid;

/// Prefix all uploaded images are stored under.
pub const UPLOADS_PREFIX: &str = "uploads";

/// Strip any path and unsafe characters from a client-declared filename.
pub fn sanitize_filename(name: &str) -> String {
    let basename = name
        .replace('\\', "/")
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();
    basename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn sanitize_component(component: &str) -> String {
    component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Derives storage keys for one upload batch.
///
/// All keys built by the same builder share one random batch tag; separate
/// batches get separate tags.
pub struct UploadKeyBuilder {
    batch_tag: String,
}

impl UploadKeyBuilder {
    pub fn new() -> Self {
        let tag = Uuid::new_v4().simple().to_string();
        Self {
            batch_tag: tag[..6].to_string(),
        }
    }

    pub fn batch_tag(&self) -> &str {
        &self.batch_tag
    }

    /// Build a storage key for a client-declared name (optionally carrying a
    /// folder path, e.g. "album/photo.png") and its validated extension.
    ///
    /// Format: `uploads/[{folder}-{tag}/[{rest}/...]]{millis}-{uuid}.{ext}`
    pub fn build(&self, declared_name: &str, extension: &str) -> Result<String, StorageError> {
        let normalized = declared_name.replace('\\', "/");
        let components: Vec<&str> = normalized
            .split('/')
            .filter(|c| !c.is_empty() && *c != ".")
            .collect();

        if components.is_empty() {
            return Err(StorageError::InvalidKey(format!(
                "Empty filename: {}",
                declared_name
            )));
        }
        if components.iter().any(|c| *c == "..") {
            return Err(StorageError::InvalidKey(format!(
                "Path traversal in filename: {}",
                declared_name
            )));
        }

        let filename = format!(
            "{}-{}.{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4(),
            extension
        );

        let folder_components = &components[..components.len() - 1];
        let mut segments = Vec::with_capacity(folder_components.len() + 2);
        segments.push(UPLOADS_PREFIX.to_string());
        for (i, component) in folder_components.iter().enumerate() {
            let sanitized = sanitize_component(component);
            if sanitized.is_empty() {
                return Err(StorageError::InvalidKey(format!(
                    "Invalid folder component in filename: {}",
                    declared_name
                )));
            }
            if i == 0 {
                segments.push(format!("{}-{}", sanitized, self.batch_tag));
            } else {
                segments.push(sanitized);
            }
        }
        segments.push(filename);

        Ok(segments.join("/"))
    }
}

impl Default for UploadKeyBuilder {
    fn default() -> Self {
        Self::new()
    }
}
