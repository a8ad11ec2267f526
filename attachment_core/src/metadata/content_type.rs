//! Content type sniffing and normalization

use lazy_static::lazy_static;
use std::collections::HashMap;

use super::DetectionSource;

pub const OCTET_STREAM: &str = "application/octet-stream";

lazy_static! {
    static ref ALIASES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        map.insert("image/jpg", "image/jpeg");
        map.insert("image/pjpeg", "image/jpeg");
        map.insert("image/x-png", "image/png");
        map.insert("image/x-ms-bmp", "image/bmp");
        map.insert("image/x-icon", "image/vnd.microsoft.icon");
        map.insert("audio/x-wav", "audio/wav");
        map.insert("audio/wave", "audio/wav");
        map.insert("audio/vnd.wave", "audio/wav");
        map.insert("audio/mp3", "audio/mpeg");
        map.insert("audio/x-m4a", "audio/mp4");
        map.insert("audio/m4a", "audio/mp4");
        map.insert("video/x-m4v", "video/mp4");
        map.insert("application/x-zip-compressed", "application/zip");
        map.insert("application/x-pdf", "application/pdf");
        map.insert("text/xml", "application/xml");
        map
    };
}

/// Lowercases, strips parameters and folds common aliases onto one essence.
pub fn normalize_content_type(content_type: &str) -> String {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match ALIASES.get(essence.as_str()) {
        Some(canonical) => canonical.to_string(),
        None => essence,
    }
}

/// Guesses a content type from a filename's extension.
pub fn content_type_for_filename(filename: &str) -> Option<String> {
    mime_guess::from_path(filename)
        .first()
        .map(|mime| normalize_content_type(mime.essence_str()))
}

/// Determines the content type of a file from its leading bytes, falling back
/// to the filename extension and then to whatever the client declared.
pub fn sniff_content_type(header: &[u8], filename: &str, declared: Option<&str>) -> (String, DetectionSource) {
    if let Some(kind) = infer::get(header) {
        return (normalize_content_type(kind.mime_type()), DetectionSource::MagicBytes);
    }

    if let Some(guessed) = content_type_for_filename(filename) {
        return (guessed, DetectionSource::Extension);
    }

    match declared.map(normalize_content_type) {
        Some(declared) if !declared.is_empty() => (declared, DetectionSource::Declared),
        _ => (OCTET_STREAM.to_string(), DetectionSource::Unknown),
    }
}
