//! Rendering of rule violations into localized failure messages

pub mod catalog;

pub use catalog::{default_template, interpolate, normalize_locale, MessageCatalog};

use std::collections::HashMap;

use crate::config::LocaleConfig;
use crate::error::Result;
use crate::report::{FailureKind, ValidationFailure};

pub type MessageParams = HashMap<&'static str, String>;

/// A rule violation before it has been given words.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub kind: FailureKind,
    pub key: &'static str,
    pub params: MessageParams,
    pub filename: Option<String>,
}

impl Violation {
    pub fn new(kind: FailureKind, key: &'static str) -> Self {
        Self {
            kind,
            key,
            params: MessageParams::new(),
            filename: None,
        }
    }

    pub fn param(mut self, name: &'static str, value: impl ToString) -> Self {
        self.params.insert(name, value.to_string());
        self
    }

    pub fn for_file(mut self, filename: &str) -> Self {
        self.params.insert("filename", filename.to_string());
        self.filename = Some(filename.to_string());
        self
    }
}

/// Turns violations into [`ValidationFailure`]s using a catalog and a fallback chain.
#[derive(Debug, Clone)]
pub struct ErrorReporter {
    catalog: MessageCatalog,
    fallback_locales: Vec<String>,
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(MessageCatalog::bundled())
    }
}

impl ErrorReporter {
    pub fn new(catalog: MessageCatalog) -> Self {
        Self {
            catalog,
            fallback_locales: Vec::new(),
        }
    }

    pub fn from_config(config: &LocaleConfig) -> Result<Self> {
        let mut catalog = MessageCatalog::bundled();
        if let Some(dir) = &config.locale_dir {
            let loaded = catalog.load_dir(dir)?;
            tracing::info!("Loaded {} locale file(s) from {}", loaded, dir.display());
        }
        Ok(Self::new(catalog).with_fallbacks(config.fallback_locales.clone()))
    }

    pub fn with_fallbacks(mut self, fallback_locales: Vec<String>) -> Self {
        self.fallback_locales = fallback_locales;
        self
    }

    pub fn catalog_mut(&mut self) -> &mut MessageCatalog {
        &mut self.catalog
    }

    /// Finds the template for `key`: the locale itself, its base language,
    /// the fallback locales in order, then the built-in English text.
    pub fn template(&self, key: &str, locale: &str) -> String {
        let locale = normalize_locale(locale);
        let base = locale.split('-').next().unwrap_or("").to_string();

        let mut chain: Vec<&str> = vec![locale.as_str()];
        if base != locale {
            chain.push(base.as_str());
        }
        chain.extend(self.fallback_locales.iter().map(String::as_str));

        chain
            .into_iter()
            .find_map(|candidate| self.catalog.lookup(candidate, key))
            .or_else(|| default_template(key))
            .map(str::to_string)
            .unwrap_or_else(|| key.replace('_', " "))
    }

    pub fn report(
        &self,
        attribute: &str,
        violation: Violation,
        message_override: Option<&str>,
        locale: &str,
    ) -> ValidationFailure {
        let template = match message_override {
            Some(custom) => custom.to_string(),
            None => self.template(violation.key, locale),
        };

        ValidationFailure {
            attribute: attribute.to_string(),
            kind: violation.kind,
            message: interpolate(&template, &violation.params),
            filename: violation.filename,
        }
    }
}
