//! Internal upload pipeline types.

/// One file extracted from a multipart batch, before validation.
#[derive(Debug)]
pub struct IncomingFile {
    /// Client-declared name; may carry a folder path ("album/photo.png")
    pub name: String,
    /// Declared MIME type
    pub content_type: String,
    pub data: Vec<u8>,
}
