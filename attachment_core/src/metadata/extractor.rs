use std::fs;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};

use image::{ImageError, ImageReader};
use tracing::debug;

use super::content_type::{content_type_for_filename, normalize_content_type, sniff_content_type, OCTET_STREAM};
use super::media::probe_duration;
use super::{AttachedFileMetadata, DetectionSource, Dimensions, MetadataExtractor};
use crate::attachment::{Attachment, AttachmentSource};
use crate::config::ExtractionConfig;
use crate::error::ExtractionError;

/// Reads headers from in-memory or on-disk attachments.
#[derive(Debug, Clone, Default)]
pub struct FileMetadataExtractor {
    config: ExtractionConfig,
}

impl FileMetadataExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    fn probe<R: Read + Seek>(
        &self,
        attachment: &Attachment,
        reader: &mut R,
        byte_size: u64,
    ) -> Result<AttachedFileMetadata, ExtractionError> {
        let mut header = Vec::with_capacity(self.config.sniff_bytes.min(byte_size as usize));
        reader
            .by_ref()
            .take(self.config.sniff_bytes as u64)
            .read_to_end(&mut header)?;

        let declared = attachment.declared_content_type();
        let (sniffed, detected_by) = sniff_content_type(&header, attachment.filename(), declared);

        let declared_content_type = declared
            .map(normalize_content_type)
            .filter(|ct| !ct.is_empty())
            .or_else(|| content_type_for_filename(attachment.filename()))
            .unwrap_or_else(|| OCTET_STREAM.to_string());

        let dimensions = if self.config.probe_dimensions && sniffed.starts_with("image/") {
            reader.seek(SeekFrom::Start(0))?;
            probe_dimensions(reader, &sniffed)?
        } else {
            None
        };

        // An extension alone says nothing about the container layout.
        let duration = if self.config.probe_duration && detected_by == DetectionSource::MagicBytes {
            probe_duration(reader, &sniffed)?
        } else {
            None
        };

        debug!(
            filename = attachment.filename(),
            byte_size,
            sniffed = %sniffed,
            ?detected_by,
            ?dimensions,
            ?duration,
            "Extracted attachment metadata"
        );

        Ok(AttachedFileMetadata {
            filename: attachment.filename().to_string(),
            byte_size,
            declared_content_type,
            sniffed_content_type: sniffed,
            detected_by,
            dimensions,
            duration,
        })
    }
}

impl MetadataExtractor for FileMetadataExtractor {
    fn extract(&self, attachment: &Attachment) -> Result<AttachedFileMetadata, ExtractionError> {
        match attachment.source() {
            AttachmentSource::Bytes(data) => {
                let mut cursor = Cursor::new(&data[..]);
                self.probe(attachment, &mut cursor, data.len() as u64)
            }
            AttachmentSource::Path(path) => {
                let unreadable = |source| ExtractionError::Unreadable {
                    path: path.clone(),
                    source,
                };
                let file = fs::File::open(path).map_err(unreadable)?;
                let byte_size = file.metadata().map_err(unreadable)?.len();
                let mut reader = BufReader::new(file);
                self.probe(attachment, &mut reader, byte_size)
            }
        }
    }
}

/// Reads width and height from an image header without decoding pixels.
///
/// Formats the decoder does not know (SVG, HEIC, ...) report no dimensions;
/// a known format with a broken header is an extraction error.
fn probe_dimensions<R: Read + Seek>(reader: &mut R, content_type: &str) -> Result<Option<Dimensions>, ExtractionError> {
    let image_reader = ImageReader::new(BufReader::new(reader)).with_guessed_format()?;

    if image_reader.format().is_none() {
        return Ok(None);
    }

    match image_reader.into_dimensions() {
        Ok((width, height)) => Ok(Some(Dimensions::new(width, height))),
        Err(ImageError::Unsupported(_)) => Ok(None),
        Err(ImageError::IoError(e)) if e.kind() != std::io::ErrorKind::UnexpectedEof => Err(ExtractionError::Io(e)),
        Err(e) => Err(ExtractionError::corrupt(content_type, e.to_string())),
    }
}
