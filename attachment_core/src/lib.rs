//! Declarative validation of file attachments: size, content type, image
//! dimensions and aspect ratio, media duration, count and total size.
//!
//! A host describes its rules as a [`ValidationSchema`], hands a record's
//! [`Attachment`]s to a [`Validator`] and gets back an ordered
//! [`ValidationReport`] of localized failures.

pub mod attachment;
pub mod config;
pub mod error;
pub mod messages;
pub mod metadata;
pub mod orchestrator;
pub mod report;
pub mod rules;
pub mod units;

pub use attachment::{Attachment, AttachmentId, AttachmentRecord, AttachmentSource, Record};
pub use config::AppConfig;
pub use error::{AppError, ConfigurationError, ExtractionError, Result};
pub use messages::{ErrorReporter, MessageCatalog, Violation};
pub use metadata::{AttachedFileMetadata, DetectionSource, Dimensions, FileMetadataExtractor, MetadataExtractor};
pub use orchestrator::Validator;
pub use report::{FailureKind, ValidationFailure, ValidationReport};
pub use rules::{AspectRatio, RuleSpec, SchemaBuilder, ValidationSchema};
pub use units::ByteSize;
