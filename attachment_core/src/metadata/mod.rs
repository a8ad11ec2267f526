//! Normalized file metadata and the extractors that produce it

pub mod content_type;
pub mod extractor;
pub mod media;

pub use content_type::{normalize_content_type, sniff_content_type, OCTET_STREAM};
pub use extractor::FileMetadataExtractor;

use crate::attachment::Attachment;
use crate::error::ExtractionError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// How the sniffed content type was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    MagicBytes,
    Extension,
    Declared,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachedFileMetadata {
    pub filename: String,
    pub byte_size: u64,
    pub declared_content_type: String,
    pub sniffed_content_type: String,
    pub detected_by: DetectionSource,
    pub dimensions: Option<Dimensions>,
    pub duration: Option<f64>,
}

impl AttachedFileMetadata {
    /// Metadata with no probing results, mostly useful to hosts that already know their file facts.
    pub fn new(filename: impl Into<String>, byte_size: u64, content_type: impl Into<String>) -> Self {
        let content_type = normalize_content_type(&content_type.into());
        Self {
            filename: filename.into(),
            byte_size,
            declared_content_type: content_type.clone(),
            sniffed_content_type: content_type,
            detected_by: DetectionSource::Declared,
            dimensions: None,
            duration: None,
        }
    }

    pub fn with_sniffed_type(mut self, content_type: impl Into<String>, detected_by: DetectionSource) -> Self {
        self.sniffed_content_type = normalize_content_type(&content_type.into());
        self.detected_by = detected_by;
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some(Dimensions::new(width, height));
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn is_image(&self) -> bool {
        self.sniffed_content_type.starts_with("image/")
    }
}

/// Turns an attachment into metadata. May perform blocking I/O.
pub trait MetadataExtractor {
    fn extract(&self, attachment: &Attachment) -> Result<AttachedFileMetadata, ExtractionError>;
}

impl<T: MetadataExtractor + ?Sized> MetadataExtractor for &T {
    fn extract(&self, attachment: &Attachment) -> Result<AttachedFileMetadata, ExtractionError> {
        (**self).extract(attachment)
    }
}

impl<T: MetadataExtractor + ?Sized> MetadataExtractor for Box<T> {
    fn extract(&self, attachment: &Attachment) -> Result<AttachedFileMetadata, ExtractionError> {
        (**self).extract(attachment)
    }
}
