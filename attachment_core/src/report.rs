//! Validation failures and the per-run report

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    TooSmall,
    TooLarge,
    NotAllowed,
    Spoofed,
    WidthTooSmall,
    WidthTooLarge,
    HeightTooSmall,
    HeightTooLarge,
    DurationTooShort,
    DurationTooLong,
    AspectRatioMismatch,
    TooFewFiles,
    TooManyFiles,
    TotalSizeTooSmall,
    TotalSizeTooLarge,
    Blank,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::TooSmall => "too_small",
            FailureKind::TooLarge => "too_large",
            FailureKind::NotAllowed => "not_allowed",
            FailureKind::Spoofed => "spoofed",
            FailureKind::WidthTooSmall => "width_too_small",
            FailureKind::WidthTooLarge => "width_too_large",
            FailureKind::HeightTooSmall => "height_too_small",
            FailureKind::HeightTooLarge => "height_too_large",
            FailureKind::DurationTooShort => "duration_too_short",
            FailureKind::DurationTooLong => "duration_too_long",
            FailureKind::AspectRatioMismatch => "aspect_ratio_mismatch",
            FailureKind::TooFewFiles => "too_few_files",
            FailureKind::TooManyFiles => "too_many_files",
            FailureKind::TotalSizeTooSmall => "total_size_too_small",
            FailureKind::TotalSizeTooLarge => "total_size_too_large",
            FailureKind::Blank => "blank",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One violated rule, with its message already rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub attribute: String,
    pub kind: FailureKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl ValidationFailure {
    /// The message prefixed with the humanized attribute name, e.g. "Avatar image has an invalid content type".
    pub fn full_message(&self) -> String {
        format!("{} {}", humanize(&self.attribute), self.message)
    }
}

fn humanize(attribute: &str) -> String {
    let spaced = attribute.trim_end_matches("_id").replace('_', " ");
    let mut chars = spaced.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Ordered failures from one validation run. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    failures: Vec<ValidationFailure>,
}

impl ValidationReport {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn push(&mut self, failure: ValidationFailure) {
        self.failures.push(failure);
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.failures.extend(other.failures);
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<ValidationFailure> {
        self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn for_attribute<'a>(&'a self, attribute: &'a str) -> impl Iterator<Item = &'a ValidationFailure> + 'a {
        self.failures.iter().filter(move |f| f.attribute == attribute)
    }

    pub fn kinds(&self) -> Vec<FailureKind> {
        self.failures.iter().map(|f| f.kind).collect()
    }

    /// Messages grouped by attribute, in the shape form renderers usually want.
    pub fn errors(&self) -> HashMap<String, Vec<String>> {
        let mut errors: HashMap<String, Vec<String>> = HashMap::new();
        for failure in &self.failures {
            errors
                .entry(failure.attribute.clone())
                .or_default()
                .push(failure.message.clone());
        }
        errors
    }

    pub fn full_messages(&self) -> Vec<String> {
        self.failures.iter().map(ValidationFailure::full_message).collect()
    }
}

impl IntoIterator for ValidationReport {
    type Item = ValidationFailure;
    type IntoIter = std::vec::IntoIter<ValidationFailure>;

    fn into_iter(self) -> Self::IntoIter {
        self.failures.into_iter()
    }
}
