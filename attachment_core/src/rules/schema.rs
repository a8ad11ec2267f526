//! Per-attribute rule declarations

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::{AspectRatio, RuleSpec};
use crate::error::{AppError, ConfigurationError, Result};
use crate::units::ByteSize;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRules {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

/// The rules a record type declares, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSchema {
    #[serde(default)]
    pub attributes: Vec<AttributeRules>,
}

impl ValidationSchema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_yaml_str(source: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Loads a schema file, picking the format from its extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "toml" => Self::from_toml_str(&source),
            "yml" | "yaml" => Self::from_yaml_str(&source),
            "json" => Self::from_json_str(&source),
            other => Err(AppError::UnsupportedSchemaFormat(format!(
                "{} (expected .toml, .yaml or .json, got '{}')",
                path.display(),
                other
            ))),
        }
    }

    pub fn rules_for<'a>(&'a self, attribute: &'a str) -> impl Iterator<Item = &'a RuleSpec> + 'a {
        self.attributes
            .iter()
            .filter(move |a| a.name == attribute)
            .flat_map(|a| a.rules.iter())
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }

    /// Returns the first misconfigured rule, if any.
    pub fn check(&self) -> std::result::Result<(), ConfigurationError> {
        for attribute in &self.attributes {
            for (index, rule) in attribute.rules.iter().enumerate() {
                rule.check().map_err(|reason| ConfigurationError {
                    attribute: attribute.name.clone(),
                    index,
                    rule: rule.name(),
                    reason,
                })?;
            }
        }
        Ok(())
    }
}

/// Fluent construction of a [`ValidationSchema`].
///
/// ```
/// use attachment_core::{units::MB, ValidationSchema};
///
/// let schema = ValidationSchema::builder()
///     .attribute("avatar", |a| a.attached().max_size(5 * MB).content_types(["png", "jpg"]))
///     .attribute("photos", |a| a.max_files(10).min_width(800))
///     .build()
///     .unwrap();
///
/// assert_eq!(schema.attributes.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    attributes: Vec<AttributeRules>,
}

impl SchemaBuilder {
    pub fn attribute<F>(mut self, name: impl Into<String>, declare: F) -> Self
    where
        F: FnOnce(AttributeRulesBuilder) -> AttributeRulesBuilder,
    {
        let built = declare(AttributeRulesBuilder::default());
        let name = name.into();

        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.rules.extend(built.rules),
            None => self.attributes.push(AttributeRules { name, rules: built.rules }),
        }
        self
    }

    /// Builds the schema, failing fast on misconfigured rules.
    pub fn build(self) -> std::result::Result<ValidationSchema, ConfigurationError> {
        let schema = ValidationSchema { attributes: self.attributes };
        schema.check()?;
        Ok(schema)
    }

    /// Builds without checking; misconfigurations surface when validation runs.
    pub fn build_unchecked(self) -> ValidationSchema {
        ValidationSchema { attributes: self.attributes }
    }
}

/// Rules for one attribute. Bound setters fold into the latest rule of the
/// same kind, so `min_width(10).max_height(20)` declares one dimension rule.
#[derive(Debug, Default)]
pub struct AttributeRulesBuilder {
    rules: Vec<RuleSpec>,
}

impl AttributeRulesBuilder {
    pub fn rule(mut self, rule: RuleSpec) -> Self {
        self.rules.push(rule);
        self
    }

    fn latest(&mut self, name: &str, make: impl FnOnce() -> RuleSpec) -> &mut RuleSpec {
        let index = match self.rules.iter().rposition(|r| r.name() == name) {
            Some(index) => index,
            None => {
                self.rules.push(make());
                self.rules.len() - 1
            }
        };
        &mut self.rules[index]
    }

    fn size_rule(&mut self) -> &mut RuleSpec {
        self.latest("size", || RuleSpec::Size { min: None, max: None, message: None })
    }

    fn dimension_rule(&mut self) -> &mut RuleSpec {
        self.latest("dimension", || RuleSpec::Dimension {
            min_width: None,
            max_width: None,
            min_height: None,
            max_height: None,
            message: None,
        })
    }

    fn duration_rule(&mut self) -> &mut RuleSpec {
        self.latest("duration", || RuleSpec::Duration { min: None, max: None, message: None })
    }

    fn limit_rule(&mut self) -> &mut RuleSpec {
        self.latest("limit", || RuleSpec::Limit { min: None, max: None, message: None })
    }

    fn total_size_rule(&mut self) -> &mut RuleSpec {
        self.latest("total_size", || RuleSpec::TotalSize { min: None, max: None, message: None })
    }

    pub fn attached(self) -> Self {
        self.rule(RuleSpec::Attached { message: None })
    }

    pub fn min_size(mut self, bytes: u64) -> Self {
        if let RuleSpec::Size { min, .. } = self.size_rule() {
            *min = Some(ByteSize(bytes));
        }
        self
    }

    pub fn max_size(mut self, bytes: u64) -> Self {
        if let RuleSpec::Size { max, .. } = self.size_rule() {
            *max = Some(ByteSize(bytes));
        }
        self
    }

    pub fn size_between(self, min: u64, max: u64) -> Self {
        self.min_size(min).max_size(max)
    }

    pub fn content_types<I, S>(self, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rule(RuleSpec::ContentType {
            allowed: allowed.into_iter().map(Into::into).collect(),
            detect_spoofing: false,
            message: None,
        })
    }

    /// Like [`content_types`](Self::content_types), but also rejects files whose
    /// declared type disagrees with their contents.
    pub fn strict_content_types<I, S>(self, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rule(RuleSpec::ContentType {
            allowed: allowed.into_iter().map(Into::into).collect(),
            detect_spoofing: true,
            message: None,
        })
    }

    pub fn excluded_content_types<I, S>(self, forbidden: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rule(RuleSpec::ExcludedContentType {
            forbidden: forbidden.into_iter().map(Into::into).collect(),
            message: None,
        })
    }

    pub fn min_width(mut self, px: u32) -> Self {
        if let RuleSpec::Dimension { min_width, .. } = self.dimension_rule() {
            *min_width = Some(px);
        }
        self
    }

    pub fn max_width(mut self, px: u32) -> Self {
        if let RuleSpec::Dimension { max_width, .. } = self.dimension_rule() {
            *max_width = Some(px);
        }
        self
    }

    pub fn min_height(mut self, px: u32) -> Self {
        if let RuleSpec::Dimension { min_height, .. } = self.dimension_rule() {
            *min_height = Some(px);
        }
        self
    }

    pub fn max_height(mut self, px: u32) -> Self {
        if let RuleSpec::Dimension { max_height, .. } = self.dimension_rule() {
            *max_height = Some(px);
        }
        self
    }

    pub fn min_duration(mut self, seconds: f64) -> Self {
        if let RuleSpec::Duration { min, .. } = self.duration_rule() {
            *min = Some(seconds);
        }
        self
    }

    pub fn max_duration(mut self, seconds: f64) -> Self {
        if let RuleSpec::Duration { max, .. } = self.duration_rule() {
            *max = Some(seconds);
        }
        self
    }

    pub fn aspect_ratio(self, ratio: AspectRatio) -> Self {
        self.rule(RuleSpec::AspectRatio { ratio, message: None })
    }

    pub fn min_files(mut self, count: usize) -> Self {
        if let RuleSpec::Limit { min, .. } = self.limit_rule() {
            *min = Some(count);
        }
        self
    }

    pub fn max_files(mut self, count: usize) -> Self {
        if let RuleSpec::Limit { max, .. } = self.limit_rule() {
            *max = Some(count);
        }
        self
    }

    pub fn min_total_size(mut self, bytes: u64) -> Self {
        if let RuleSpec::TotalSize { min, .. } = self.total_size_rule() {
            *min = Some(ByteSize(bytes));
        }
        self
    }

    pub fn max_total_size(mut self, bytes: u64) -> Self {
        if let RuleSpec::TotalSize { max, .. } = self.total_size_rule() {
            *max = Some(ByteSize(bytes));
        }
        self
    }

    /// Overrides the message of the most recently declared rule.
    pub fn message(mut self, text: impl Into<String>) -> Self {
        if let Some(last) = self.rules.last_mut() {
            last.set_message(text.into());
        }
        self
    }
}
