//! Attachments and the records that own them

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentId(Uuid);

impl AttachmentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AttachmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for AttachmentId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Where an attachment's bytes live.
#[derive(Debug, Clone)]
pub enum AttachmentSource {
    Bytes(Arc<[u8]>),
    Path(PathBuf),
}

/// A reference to a file associated with a record.
#[derive(Debug, Clone)]
pub struct Attachment {
    id: AttachmentId,
    filename: String,
    declared_content_type: Option<String>,
    source: AttachmentSource,
}

impl Attachment {
    pub fn from_bytes(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: AttachmentId::new(),
            filename: filename.into(),
            declared_content_type: None,
            source: AttachmentSource::Bytes(Arc::from(data.into())),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        Self {
            id: AttachmentId::new(),
            filename,
            declared_content_type: None,
            source: AttachmentSource::Path(path.to_path_buf()),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.declared_content_type = Some(content_type.into());
        self
    }

    pub fn with_id(mut self, id: AttachmentId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> AttachmentId {
        self.id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn declared_content_type(&self) -> Option<&str> {
        self.declared_content_type.as_deref()
    }

    pub fn source(&self) -> &AttachmentSource {
        &self.source
    }
}

/// Anything that can hand out the attachments bound to an attribute.
pub trait AttachmentRecord {
    fn attachments(&self, attribute: &str) -> &[Attachment];
}

/// A map-backed record for hosts without their own model type.
#[derive(Debug, Clone, Default)]
pub struct Record {
    attachments: HashMap<String, Vec<Attachment>>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(mut self, attribute: impl Into<String>, attachment: Attachment) -> Self {
        self.push(attribute, attachment);
        self
    }

    pub fn push(&mut self, attribute: impl Into<String>, attachment: Attachment) {
        self.attachments
            .entry(attribute.into())
            .or_default()
            .push(attachment);
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attachments.keys().map(String::as_str)
    }
}

impl AttachmentRecord for Record {
    fn attachments(&self, attribute: &str) -> &[Attachment] {
        self.attachments
            .get(attribute)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
