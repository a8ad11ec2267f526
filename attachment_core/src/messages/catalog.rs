//! Message templates keyed by locale

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::error::Result;

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"%\{([a-z_]+)\}").unwrap();
}

const BUNDLED_LOCALES: &[(&str, &str)] = &[
    ("fr", include_str!("../../locales/fr.yml")),
    ("de", include_str!("../../locales/de.yml")),
];

/// Built-in English template for a message key.
pub fn default_template(key: &str) -> Option<&'static str> {
    let template = match key {
        "file_size_too_small" => "file size must be greater than or equal to %{min} (current size is %{file_size})",
        "file_size_too_large" => "file size must be less than or equal to %{max} (current size is %{file_size})",
        "content_type_invalid" => "has an invalid content type %{content_type} (authorized content types are %{authorized_types})",
        "content_type_excluded" => "has a forbidden content type %{content_type}",
        "content_type_spoofed" => "has a content type that does not match its contents (declared %{content_type}, detected %{detected_content_type})",
        "dimension_width_too_small" => "width must be greater than or equal to %{length} pixels (current width is %{width})",
        "dimension_width_too_large" => "width must be less than or equal to %{length} pixels (current width is %{width})",
        "dimension_height_too_small" => "height must be greater than or equal to %{length} pixels (current height is %{height})",
        "dimension_height_too_large" => "height must be less than or equal to %{length} pixels (current height is %{height})",
        "duration_too_short" => "duration must be greater than or equal to %{min} (current duration is %{duration})",
        "duration_too_long" => "duration must be less than or equal to %{max} (current duration is %{duration})",
        "aspect_ratio_not_square" => "must be square (current file is %{width}x%{height}px)",
        "aspect_ratio_not_portrait" => "must be portrait (current file is %{width}x%{height}px)",
        "aspect_ratio_not_landscape" => "must be landscape (current file is %{width}x%{height}px)",
        "aspect_ratio_is_not" => "must have an aspect ratio of %{aspect_ratio} (current file is %{width}x%{height}px)",
        "limit_min_not_reached" => "must have at least %{min} files (there are %{count})",
        "limit_max_exceeded" => "must have at most %{max} files (there are %{count})",
        "total_size_too_small" => "total file size must be greater than or equal to %{min} (current total is %{total_size})",
        "total_size_too_large" => "total file size must be less than or equal to %{max} (current total is %{total_size})",
        "blank" => "can't be blank",
        _ => return None,
    };
    Some(template)
}

/// Templates per locale. English is always available through [`default_template`].
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    locales: HashMap<String, HashMap<String, String>>,
}

impl MessageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog holding the locales shipped with the crate.
    pub fn bundled() -> Self {
        let mut catalog = Self::new();
        for (locale, source) in BUNDLED_LOCALES {
            if let Err(e) = catalog.merge_yaml(source) {
                tracing::error!("Bundled locale '{}' failed to parse: {}", locale, e);
            }
        }
        catalog
    }

    pub fn insert(&mut self, locale: &str, key: &str, template: impl Into<String>) {
        self.locales
            .entry(normalize_locale(locale))
            .or_default()
            .insert(key.to_string(), template.into());
    }

    /// Merges a document of the form `<locale>: { <key>: <template> }`.
    pub fn merge_yaml(&mut self, source: &str) -> Result<()> {
        let document: HashMap<String, HashMap<String, String>> = serde_yaml::from_str(source)?;
        for (locale, templates) in document {
            for (key, template) in templates {
                self.insert(&locale, &key, template);
            }
        }
        Ok(())
    }

    /// Merges every `*.yml` / `*.yaml` file in a directory.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        let mut loaded = 0;
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_yaml = matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("yml") | Some("yaml")
            );
            if !is_yaml {
                continue;
            }
            let source = fs::read_to_string(&path)?;
            self.merge_yaml(&source)?;
            debug!("Loaded locale file {}", path.display());
            loaded += 1;
        }
        Ok(loaded)
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.locales.keys().map(String::as_str)
    }

    pub fn lookup(&self, locale: &str, key: &str) -> Option<&str> {
        self.locales
            .get(&normalize_locale(locale))
            .and_then(|templates| templates.get(key))
            .map(String::as_str)
    }
}

/// `fr_CA` and `fr-ca` both become `fr-CA`.
pub fn normalize_locale(locale: &str) -> String {
    let mut parts = locale.trim().split(['-', '_']);
    let language = parts.next().unwrap_or("").to_ascii_lowercase();
    let rest: Vec<String> = parts
        .map(|part| {
            if part.len() == 2 {
                part.to_ascii_uppercase()
            } else {
                part.to_string()
            }
        })
        .collect();

    if rest.is_empty() {
        language
    } else {
        format!("{}-{}", language, rest.join("-"))
    }
}

/// Replaces `%{name}` placeholders. Unknown names are left as they are.
pub fn interpolate(template: &str, params: &HashMap<&'static str, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match params.get(&caps[1]) {
            Some(value) => value.clone(),
            None => {
                warn!("Missing interpolation value for '{}' in message template", &caps[1]);
                caps[0].to_string()
            }
        })
        .into_owned()
}
