//! Declarative attachment rules

pub mod content_types;
pub mod evaluators;
pub mod schema;

pub use content_types::ContentTypePattern;
pub use schema::{AttributeRules, AttributeRulesBuilder, SchemaBuilder, ValidationSchema};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::units::ByteSize;

/// A single constraint declared on an attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleSpec {
    Size {
        min: Option<ByteSize>,
        max: Option<ByteSize>,
        message: Option<String>,
    },
    ContentType {
        allowed: Vec<String>,
        #[serde(default)]
        detect_spoofing: bool,
        message: Option<String>,
    },
    ExcludedContentType {
        forbidden: Vec<String>,
        message: Option<String>,
    },
    Dimension {
        min_width: Option<u32>,
        max_width: Option<u32>,
        min_height: Option<u32>,
        max_height: Option<u32>,
        message: Option<String>,
    },
    Duration {
        min: Option<f64>,
        max: Option<f64>,
        message: Option<String>,
    },
    AspectRatio {
        ratio: AspectRatio,
        message: Option<String>,
    },
    Limit {
        min: Option<usize>,
        max: Option<usize>,
        message: Option<String>,
    },
    TotalSize {
        min: Option<ByteSize>,
        max: Option<ByteSize>,
        message: Option<String>,
    },
    Attached {
        message: Option<String>,
    },
}

/// Whether a rule looks at each file or at the attribute's attachments as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    PerFile,
    PerAttribute,
}

impl RuleSpec {
    pub fn name(&self) -> &'static str {
        match self {
            RuleSpec::Size { .. } => "size",
            RuleSpec::ContentType { .. } => "content_type",
            RuleSpec::ExcludedContentType { .. } => "excluded_content_type",
            RuleSpec::Dimension { .. } => "dimension",
            RuleSpec::Duration { .. } => "duration",
            RuleSpec::AspectRatio { .. } => "aspect_ratio",
            RuleSpec::Limit { .. } => "limit",
            RuleSpec::TotalSize { .. } => "total_size",
            RuleSpec::Attached { .. } => "attached",
        }
    }

    pub fn scope(&self) -> RuleScope {
        match self {
            RuleSpec::Limit { .. } | RuleSpec::TotalSize { .. } | RuleSpec::Attached { .. } => RuleScope::PerAttribute,
            _ => RuleScope::PerFile,
        }
    }

    /// Whether evaluating this rule requires extracted file metadata.
    pub fn needs_metadata(&self) -> bool {
        !matches!(self, RuleSpec::Limit { .. } | RuleSpec::Attached { .. })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            RuleSpec::Size { message, .. }
            | RuleSpec::ContentType { message, .. }
            | RuleSpec::ExcludedContentType { message, .. }
            | RuleSpec::Dimension { message, .. }
            | RuleSpec::Duration { message, .. }
            | RuleSpec::AspectRatio { message, .. }
            | RuleSpec::Limit { message, .. }
            | RuleSpec::TotalSize { message, .. }
            | RuleSpec::Attached { message } => message.as_deref(),
        }
    }

    pub fn with_message(mut self, text: impl Into<String>) -> Self {
        self.set_message(text.into());
        self
    }

    pub(crate) fn set_message(&mut self, text: String) {
        match self {
            RuleSpec::Size { message, .. }
            | RuleSpec::ContentType { message, .. }
            | RuleSpec::ExcludedContentType { message, .. }
            | RuleSpec::Dimension { message, .. }
            | RuleSpec::Duration { message, .. }
            | RuleSpec::AspectRatio { message, .. }
            | RuleSpec::Limit { message, .. }
            | RuleSpec::TotalSize { message, .. }
            | RuleSpec::Attached { message } => *message = Some(text),
        }
    }

    /// Reports why the rule cannot be evaluated, if it cannot.
    pub fn check(&self) -> Result<(), String> {
        match self {
            RuleSpec::Size { min, max, .. } | RuleSpec::TotalSize { min, max, .. } => check_range(*min, *max),
            RuleSpec::ContentType { allowed, .. } => {
                if allowed.is_empty() {
                    return Err("allowed content type set is empty".to_string());
                }
                content_types::parse_patterns(allowed).map(|_| ())
            }
            RuleSpec::ExcludedContentType { forbidden, .. } => {
                if forbidden.is_empty() {
                    return Err("forbidden content type set is empty".to_string());
                }
                content_types::parse_patterns(forbidden).map(|_| ())
            }
            RuleSpec::Dimension {
                min_width,
                max_width,
                min_height,
                max_height,
                ..
            } => {
                if min_width.is_none() && max_width.is_none() && min_height.is_none() && max_height.is_none() {
                    return Err("no dimension bound given".to_string());
                }
                check_bounds("width", *min_width, *max_width)?;
                check_bounds("height", *min_height, *max_height)
            }
            RuleSpec::Duration { min, max, .. } => {
                for bound in [min, max].into_iter().flatten() {
                    if !bound.is_finite() || *bound < 0.0 {
                        return Err(format!("duration bound {} must be a finite, non-negative number of seconds", bound));
                    }
                }
                check_range(*min, *max)
            }
            RuleSpec::AspectRatio { ratio, .. } => match ratio {
                AspectRatio::Ratio { width: 0, .. } | AspectRatio::Ratio { height: 0, .. } => {
                    Err(format!("aspect ratio {} has a zero term", ratio))
                }
                _ => Ok(()),
            },
            RuleSpec::Limit { min, max, .. } => check_range(*min, *max),
            RuleSpec::Attached { .. } => Ok(()),
        }
    }
}

fn check_range<T: PartialOrd + fmt::Debug>(min: Option<T>, max: Option<T>) -> Result<(), String> {
    match (min, max) {
        (None, None) => Err("neither min nor max is given".to_string()),
        (Some(min), Some(max)) if min > max => Err(format!("min {:?} is greater than max {:?}", min, max)),
        _ => Ok(()),
    }
}

fn check_bounds(axis: &str, min: Option<u32>, max: Option<u32>) -> Result<(), String> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => Err(format!("min {} {} is greater than max {} {}", axis, min, axis, max)),
        _ => Ok(()),
    }
}

/// Required image shape. Parsed from `square`, `portrait`, `landscape` or `is_W_H`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    Square,
    Portrait,
    Landscape,
    Ratio { width: u32, height: u32 },
}

impl AspectRatio {
    pub fn matches(&self, width: u32, height: u32) -> bool {
        match self {
            AspectRatio::Square => width == height,
            AspectRatio::Portrait => height > width,
            AspectRatio::Landscape => width > height,
            AspectRatio::Ratio { width: w, height: h } => {
                u64::from(width) * u64::from(*h) == u64::from(height) * u64::from(*w)
            }
        }
    }

    pub fn message_key(&self) -> &'static str {
        match self {
            AspectRatio::Square => "aspect_ratio_not_square",
            AspectRatio::Portrait => "aspect_ratio_not_portrait",
            AspectRatio::Landscape => "aspect_ratio_not_landscape",
            AspectRatio::Ratio { .. } => "aspect_ratio_is_not",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AspectRatio::Square => f.write_str("square"),
            AspectRatio::Portrait => f.write_str("portrait"),
            AspectRatio::Landscape => f.write_str("landscape"),
            AspectRatio::Ratio { width, height } => write!(f, "is_{}_{}", width, height),
        }
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "square" => Ok(AspectRatio::Square),
            "portrait" => Ok(AspectRatio::Portrait),
            "landscape" => Ok(AspectRatio::Landscape),
            other => {
                let terms = other
                    .strip_prefix("is_")
                    .and_then(|rest| rest.split_once('_'))
                    .or_else(|| other.split_once(':'));
                match terms {
                    Some((w, h)) => match (w.parse(), h.parse()) {
                        (Ok(width), Ok(height)) => Ok(AspectRatio::Ratio { width, height }),
                        _ => Err(format!("invalid aspect ratio '{}'", s)),
                    },
                    None => Err(format!("invalid aspect ratio '{}'", s)),
                }
            }
        }
    }
}

impl Serialize for AspectRatio {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AspectRatio {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
