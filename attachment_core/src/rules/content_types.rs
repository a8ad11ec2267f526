//! Content type patterns accepted in rule declarations

use std::fmt;

use crate::metadata::normalize_content_type;

/// One entry of an allowed or forbidden content type list.
///
/// Accepts full types (`image/png`), wildcards (`image/*`, `*/*`) and
/// extension shorthands (`png`, `.pdf`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentTypePattern {
    Exact(String),
    AnySubtype(String),
    Any,
}

impl ContentTypePattern {
    pub fn parse(entry: &str) -> Result<Self, String> {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err("empty content type entry".to_string());
        }

        if !entry.contains('/') {
            let extension = entry.trim_start_matches('.');
            return mime_guess::from_ext(extension)
                .first()
                .map(|mime| ContentTypePattern::Exact(normalize_content_type(mime.essence_str())))
                .ok_or_else(|| format!("unknown file extension '{}'", entry));
        }

        let mime: mime::Mime = entry
            .parse()
            .map_err(|e| format!("invalid content type '{}': {}", entry, e))?;

        Ok(if mime.type_() == mime::STAR {
            ContentTypePattern::Any
        } else if mime.subtype() == mime::STAR {
            ContentTypePattern::AnySubtype(mime.type_().as_str().to_ascii_lowercase())
        } else {
            ContentTypePattern::Exact(normalize_content_type(mime.essence_str()))
        })
    }

    /// `content_type` is expected to be normalized already.
    pub fn matches(&self, content_type: &str) -> bool {
        match self {
            ContentTypePattern::Exact(expected) => expected == content_type,
            ContentTypePattern::AnySubtype(top_level) => content_type
                .split_once('/')
                .map(|(ty, _)| ty == top_level)
                .unwrap_or(false),
            ContentTypePattern::Any => true,
        }
    }
}

impl fmt::Display for ContentTypePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentTypePattern::Exact(ct) => f.write_str(ct),
            ContentTypePattern::AnySubtype(ty) => write!(f, "{}/*", ty),
            ContentTypePattern::Any => f.write_str("*/*"),
        }
    }
}

/// Parses every entry, failing on the first bad one.
pub fn parse_patterns<S: AsRef<str>>(entries: &[S]) -> Result<Vec<ContentTypePattern>, String> {
    entries
        .iter()
        .map(|entry| ContentTypePattern::parse(entry.as_ref()))
        .collect()
}

pub fn human_list(patterns: &[ContentTypePattern]) -> String {
    patterns
        .iter()
        .map(ContentTypePattern::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
