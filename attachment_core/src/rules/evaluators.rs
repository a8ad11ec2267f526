//! One evaluator per rule kind.
//!
//! Evaluators are pure: they compare metadata against a rule and return the
//! violations found, without rendering messages. An empty result means the
//! rule passed or does not apply.

use super::content_types::{human_list, parse_patterns, ContentTypePattern};
use super::{AspectRatio, RuleSpec};
use crate::messages::Violation;
use crate::metadata::{AttachedFileMetadata, DetectionSource, OCTET_STREAM};
use crate::report::FailureKind;
use crate::units::{human_duration, human_size, ByteSize};

/// A per-file rule with its content type entries parsed, ready to run
/// against any number of files.
#[derive(Debug, Clone)]
pub struct FileEvaluator<'r> {
    rule: &'r RuleSpec,
    patterns: Vec<ContentTypePattern>,
}

impl<'r> FileEvaluator<'r> {
    /// Fails with the reason when the rule is misconfigured.
    pub fn new(rule: &'r RuleSpec) -> Result<Self, String> {
        rule.check()?;
        let patterns = match rule {
            RuleSpec::ContentType { allowed: entries, .. } | RuleSpec::ExcludedContentType { forbidden: entries, .. } => {
                parse_patterns(entries.as_slice())?
            }
            _ => Vec::new(),
        };
        Ok(Self { rule, patterns })
    }

    pub fn rule(&self) -> &RuleSpec {
        self.rule
    }

    /// Per-attribute rules yield nothing here.
    pub fn evaluate(&self, metadata: &AttachedFileMetadata) -> Vec<Violation> {
        match self.rule {
            RuleSpec::Size { min, max, .. } => check_size(metadata, *min, *max).into_iter().collect(),
            RuleSpec::ContentType { detect_spoofing, .. } => {
                check_content_type(metadata, &self.patterns, *detect_spoofing)
            }
            RuleSpec::ExcludedContentType { .. } => {
                check_excluded_content_type(metadata, &self.patterns).into_iter().collect()
            }
            RuleSpec::Dimension {
                min_width,
                max_width,
                min_height,
                max_height,
                ..
            } => check_dimensions(metadata, *min_width, *max_width, *min_height, *max_height),
            RuleSpec::Duration { min, max, .. } => check_duration(metadata, *min, *max).into_iter().collect(),
            RuleSpec::AspectRatio { ratio, .. } => check_aspect_ratio(metadata, ratio).into_iter().collect(),
            RuleSpec::Limit { .. } | RuleSpec::TotalSize { .. } | RuleSpec::Attached { .. } => Vec::new(),
        }
    }
}

/// Evaluates a per-file rule against one file.
pub fn evaluate_file(rule: &RuleSpec, metadata: &AttachedFileMetadata) -> Result<Vec<Violation>, String> {
    Ok(FileEvaluator::new(rule)?.evaluate(metadata))
}

pub fn check_size(metadata: &AttachedFileMetadata, min: Option<ByteSize>, max: Option<ByteSize>) -> Option<Violation> {
    let size = metadata.byte_size;

    if let Some(min) = min.filter(|min| size < min.0) {
        return Some(
            Violation::new(FailureKind::TooSmall, "file_size_too_small")
                .param("min", human_size(min.0))
                .param("file_size", human_size(size))
                .for_file(&metadata.filename),
        );
    }

    if let Some(max) = max.filter(|max| size > max.0) {
        return Some(
            Violation::new(FailureKind::TooLarge, "file_size_too_large")
                .param("max", human_size(max.0))
                .param("file_size", human_size(size))
                .for_file(&metadata.filename),
        );
    }

    None
}

pub fn check_content_type(
    metadata: &AttachedFileMetadata,
    patterns: &[ContentTypePattern],
    detect_spoofing: bool,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let content_type = metadata.sniffed_content_type.as_str();

    if !patterns.iter().any(|p| p.matches(content_type)) {
        violations.push(
            Violation::new(FailureKind::NotAllowed, "content_type_invalid")
                .param("content_type", content_type)
                .param("authorized_types", human_list(patterns))
                .for_file(&metadata.filename),
        );
    }

    if detect_spoofing && is_spoofed(metadata) {
        violations.push(
            Violation::new(FailureKind::Spoofed, "content_type_spoofed")
                .param("content_type", &metadata.declared_content_type)
                .param("detected_content_type", content_type)
                .for_file(&metadata.filename),
        );
    }

    violations
}

/// Declared type disagrees with what the magic bytes say.
fn is_spoofed(metadata: &AttachedFileMetadata) -> bool {
    metadata.detected_by == DetectionSource::MagicBytes
        && metadata.declared_content_type != OCTET_STREAM
        && metadata.declared_content_type != metadata.sniffed_content_type
}

pub fn check_excluded_content_type(metadata: &AttachedFileMetadata, patterns: &[ContentTypePattern]) -> Option<Violation> {
    let content_type = metadata.sniffed_content_type.as_str();

    patterns.iter().any(|p| p.matches(content_type)).then(|| {
        Violation::new(FailureKind::NotAllowed, "content_type_excluded")
            .param("content_type", content_type)
            .param("forbidden_types", human_list(patterns))
            .for_file(&metadata.filename)
    })
}

pub fn check_dimensions(
    metadata: &AttachedFileMetadata,
    min_width: Option<u32>,
    max_width: Option<u32>,
    min_height: Option<u32>,
    max_height: Option<u32>,
) -> Vec<Violation> {
    let Some(dimensions) = metadata.dimensions else {
        return Vec::new();
    };

    let axis = |actual: u32, min: Option<u32>, max: Option<u32>, kinds: [(FailureKind, &'static str); 2], name: &'static str| {
        let (kind, key, bound) = match (min, max) {
            (Some(min), _) if actual < min => (kinds[0].0, kinds[0].1, min),
            (_, Some(max)) if actual > max => (kinds[1].0, kinds[1].1, max),
            _ => return None,
        };
        Some(
            Violation::new(kind, key)
                .param("length", bound)
                .param(name, actual)
                .param("width", dimensions.width)
                .param("height", dimensions.height)
                .for_file(&metadata.filename),
        )
    };

    let width = axis(
        dimensions.width,
        min_width,
        max_width,
        [
            (FailureKind::WidthTooSmall, "dimension_width_too_small"),
            (FailureKind::WidthTooLarge, "dimension_width_too_large"),
        ],
        "width",
    );
    let height = axis(
        dimensions.height,
        min_height,
        max_height,
        [
            (FailureKind::HeightTooSmall, "dimension_height_too_small"),
            (FailureKind::HeightTooLarge, "dimension_height_too_large"),
        ],
        "height",
    );

    width.into_iter().chain(height).collect()
}

pub fn check_duration(metadata: &AttachedFileMetadata, min: Option<f64>, max: Option<f64>) -> Option<Violation> {
    let duration = metadata.duration?;

    if let Some(min) = min.filter(|min| duration < *min) {
        return Some(
            Violation::new(FailureKind::DurationTooShort, "duration_too_short")
                .param("min", human_duration(min))
                .param("duration", human_duration(duration))
                .for_file(&metadata.filename),
        );
    }

    if let Some(max) = max.filter(|max| duration > *max) {
        return Some(
            Violation::new(FailureKind::DurationTooLong, "duration_too_long")
                .param("max", human_duration(max))
                .param("duration", human_duration(duration))
                .for_file(&metadata.filename),
        );
    }

    None
}

pub fn check_aspect_ratio(metadata: &AttachedFileMetadata, ratio: &AspectRatio) -> Option<Violation> {
    let dimensions = metadata.dimensions?;

    if ratio.matches(dimensions.width, dimensions.height) {
        return None;
    }

    let shown = match ratio {
        AspectRatio::Ratio { width, height } => format!("{}:{}", width, height),
        other => other.to_string(),
    };

    Some(
        Violation::new(FailureKind::AspectRatioMismatch, ratio.message_key())
            .param("aspect_ratio", shown)
            .param("width", dimensions.width)
            .param("height", dimensions.height)
            .for_file(&metadata.filename),
    )
}

/// Evaluates a rule over the number of attachments on an attribute.
pub fn check_count(rule: &RuleSpec, count: usize) -> Option<Violation> {
    match rule {
        RuleSpec::Attached { .. } if count == 0 => Some(Violation::new(FailureKind::Blank, "blank")),
        RuleSpec::Limit { min, max, .. } => {
            if let Some(min) = min.filter(|min| count < *min) {
                return Some(
                    Violation::new(FailureKind::TooFewFiles, "limit_min_not_reached")
                        .param("min", min)
                        .param("count", count),
                );
            }
            max.filter(|max| count > *max).map(|max| {
                Violation::new(FailureKind::TooManyFiles, "limit_max_exceeded")
                    .param("max", max)
                    .param("count", count)
            })
        }
        _ => None,
    }
}

/// Evaluates a total-size rule over the summed byte size of an attribute's attachments.
pub fn check_total_size(rule: &RuleSpec, total: u64) -> Option<Violation> {
    let RuleSpec::TotalSize { min, max, .. } = rule else {
        return None;
    };

    if let Some(min) = min.filter(|min| total < min.0) {
        return Some(
            Violation::new(FailureKind::TotalSizeTooSmall, "total_size_too_small")
                .param("min", human_size(min.0))
                .param("total_size", human_size(total)),
        );
    }

    max.filter(|max| total > max.0).map(|max| {
        Violation::new(FailureKind::TotalSizeTooLarge, "total_size_too_large")
            .param("max", human_size(max.0))
            .param("total_size", human_size(total))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::MB;

    fn png(size: u64) -> AttachedFileMetadata {
        AttachedFileMetadata::new("photo.png", size, "image/png").with_sniffed_type("image/png", DetectionSource::MagicBytes)
    }

    fn kinds(violations: &[Violation]) -> Vec<FailureKind> {
        violations.iter().map(|v| v.kind).collect()
    }

    #[test]
    fn test_size_range_bounds_are_inclusive() {
        let min = Some(ByteSize(100));
        let max = Some(ByteSize(200));

        for size in [100, 150, 200] {
            assert!(check_size(&png(size), min, max).is_none(), "size {}", size);
        }
        assert_eq!(check_size(&png(99), min, max).unwrap().kind, FailureKind::TooSmall);
        assert_eq!(check_size(&png(201), min, max).unwrap().kind, FailureKind::TooLarge);
    }

    #[test]
    fn test_size_too_large_example() {
        let rule = RuleSpec::Size { min: Some(ByteSize(0)), max: Some(ByteSize(10 * MB)), message: None };
        let violations = evaluate_file(&rule, &png(15 * MB)).unwrap();

        assert_eq!(kinds(&violations), vec![FailureKind::TooLarge]);
        assert_eq!(violations[0].params["max"], "10 MB");
        assert_eq!(violations[0].params["file_size"], "15 MB");
        assert_eq!(violations[0].filename.as_deref(), Some("photo.png"));
    }

    #[test]
    fn test_content_type_not_allowed_example() {
        let gif = AttachedFileMetadata::new("anim.gif", 10, "image/gif");
        let rule = RuleSpec::ContentType {
            allowed: vec!["image/png".to_string(), "image/jpeg".to_string()],
            detect_spoofing: false,
            message: None,
        };

        let violations = evaluate_file(&rule, &gif).unwrap();
        assert_eq!(kinds(&violations), vec![FailureKind::NotAllowed]);
        assert_eq!(violations[0].params["authorized_types"], "image/png, image/jpeg");

        for allowed in ["image/png", "image/jpeg"] {
            let ok = AttachedFileMetadata::new("x", 10, allowed);
            assert!(evaluate_file(&rule, &ok).unwrap().is_empty());
        }
    }

    #[test]
    fn test_content_type_uses_sniffed_type() {
        let disguised = AttachedFileMetadata::new("evil.png", 10, "image/png")
            .with_sniffed_type("application/x-msdownload", DetectionSource::MagicBytes);

        let allow_png = RuleSpec::ContentType { allowed: vec!["png".to_string()], detect_spoofing: false, message: None };
        assert_eq!(kinds(&evaluate_file(&allow_png, &disguised).unwrap()), vec![FailureKind::NotAllowed]);

        let strict = RuleSpec::ContentType {
            allowed: vec!["image/*".to_string(), "application/*".to_string()],
            detect_spoofing: true,
            message: None,
        };
        assert_eq!(kinds(&evaluate_file(&strict, &disguised).unwrap()), vec![FailureKind::Spoofed]);
    }

    #[test]
    fn test_spoofing_ignores_extension_based_detection() {
        let guessed = AttachedFileMetadata::new("notes.txt", 10, "text/markdown")
            .with_sniffed_type("text/plain", DetectionSource::Extension);
        let text = parse_patterns(&["text/*"]).unwrap();
        assert!(check_content_type(&guessed, &text, true).is_empty());
    }

    #[test]
    fn test_excluded_content_type() {
        let forbidden = parse_patterns(&["video/*"]).unwrap();
        let movie = AttachedFileMetadata::new("a.mp4", 10, "video/mp4");
        assert_eq!(check_excluded_content_type(&movie, &forbidden).unwrap().kind, FailureKind::NotAllowed);
        assert!(check_excluded_content_type(&png(10), &forbidden).is_none());
    }

    #[test]
    fn test_dimension_example() {
        let metadata = png(10).with_dimensions(800, 600);
        let violations = check_dimensions(&metadata, Some(1000), None, None, None);
        assert_eq!(kinds(&violations), vec![FailureKind::WidthTooSmall]);
        assert_eq!(violations[0].params["length"], "1000");
        assert_eq!(violations[0].params["width"], "800");

        let duration_rule = RuleSpec::Duration { min: Some(1.0), max: None, message: None };
        assert!(evaluate_file(&duration_rule, &metadata).unwrap().is_empty());
    }

    #[test]
    fn test_dimensions_report_each_axis() {
        let metadata = png(10).with_dimensions(5000, 100);
        let violations = check_dimensions(&metadata, None, Some(4000), Some(200), None);
        assert_eq!(kinds(&violations), vec![FailureKind::WidthTooLarge, FailureKind::HeightTooSmall]);

        let violations = check_dimensions(&png(10).with_dimensions(10, 9000), None, None, None, Some(8000));
        assert_eq!(kinds(&violations), vec![FailureKind::HeightTooLarge]);
    }

    #[test]
    fn test_absent_fields_make_rules_inapplicable() {
        let bare = png(10);
        let rules = [
            RuleSpec::Dimension { min_width: Some(1), max_width: Some(1), min_height: Some(1), max_height: Some(1), message: None },
            RuleSpec::Duration { min: Some(100.0), max: Some(100.0), message: None },
            RuleSpec::AspectRatio { ratio: AspectRatio::Square, message: None },
        ];
        for rule in &rules {
            assert!(evaluate_file(rule, &bare).unwrap().is_empty(), "{} should not apply", rule.name());
        }
    }

    #[test]
    fn test_duration_bounds() {
        let clip = AttachedFileMetadata::new("a.wav", 10, "audio/wav").with_duration(2.5);
        assert!(check_duration(&clip, Some(2.5), Some(2.5)).is_none());
        assert_eq!(check_duration(&clip, Some(3.0), None).unwrap().kind, FailureKind::DurationTooShort);
        let long = check_duration(&clip, None, Some(2.0)).unwrap();
        assert_eq!(long.kind, FailureKind::DurationTooLong);
        assert_eq!(long.params["duration"], "2.5 sec");
    }

    #[test]
    fn test_aspect_ratio() {
        let wide = png(10).with_dimensions(1920, 1080);
        assert!(check_aspect_ratio(&wide, &AspectRatio::Ratio { width: 16, height: 9 }).is_none());

        let violation = check_aspect_ratio(&wide, &AspectRatio::Square).unwrap();
        assert_eq!(violation.kind, FailureKind::AspectRatioMismatch);
        assert_eq!(violation.key, "aspect_ratio_not_square");

        let violation = check_aspect_ratio(&wide, &AspectRatio::Ratio { width: 4, height: 3 }).unwrap();
        assert_eq!(violation.params["aspect_ratio"], "4:3");
    }

    #[test]
    fn test_count_rules() {
        let attached = RuleSpec::Attached { message: None };
        assert_eq!(check_count(&attached, 0).unwrap().kind, FailureKind::Blank);
        assert!(check_count(&attached, 1).is_none());

        let limit = RuleSpec::Limit { min: Some(1), max: Some(3), message: None };
        assert_eq!(check_count(&limit, 0).unwrap().kind, FailureKind::TooFewFiles);
        assert!(check_count(&limit, 3).is_none());
        assert_eq!(check_count(&limit, 4).unwrap().kind, FailureKind::TooManyFiles);
    }

    #[test]
    fn test_total_size() {
        let at_most = RuleSpec::TotalSize { min: None, max: Some(ByteSize(100)), message: None };
        assert!(check_total_size(&at_most, 100).is_none());
        assert_eq!(check_total_size(&at_most, 101).unwrap().kind, FailureKind::TotalSizeTooLarge);

        let at_least = RuleSpec::TotalSize { min: Some(ByteSize(50)), max: None, message: None };
        assert_eq!(check_total_size(&at_least, 10).unwrap().kind, FailureKind::TotalSizeTooSmall);

        let not_total = RuleSpec::Limit { min: Some(5), max: None, message: None };
        assert!(check_total_size(&not_total, 0).is_none());
    }

    #[test]
    fn test_misconfigured_rule_is_an_error_not_a_violation() {
        let unknown = RuleSpec::ContentType {
            allowed: vec!["notarealext".to_string()],
            detect_spoofing: false,
            message: None,
        };
        let err = evaluate_file(&unknown, &png(10)).unwrap_err();
        assert!(err.contains("notarealext"), "{}", err);

        let empty = RuleSpec::ExcludedContentType { forbidden: vec![], message: None };
        assert!(evaluate_file(&empty, &png(10)).is_err());

        let inverted = RuleSpec::Size { min: Some(ByteSize(10)), max: Some(ByteSize(1)), message: None };
        assert!(FileEvaluator::new(&inverted).is_err());
    }

    #[test]
    fn test_file_evaluator_is_reusable() {
        let rule = RuleSpec::ContentType {
            allowed: vec!["png".to_string(), "image/jpeg".to_string()],
            detect_spoofing: false,
            message: None,
        };
        let evaluator = FileEvaluator::new(&rule).unwrap();

        assert!(evaluator.evaluate(&png(10)).is_empty());
        let gif = AttachedFileMetadata::new("anim.gif", 10, "image/gif");
        assert_eq!(kinds(&evaluator.evaluate(&gif)), vec![FailureKind::NotAllowed]);
        assert_eq!(evaluator.rule().name(), "content_type");
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let metadata = png(15 * MB).with_dimensions(10, 10);
        let rule = RuleSpec::Dimension { min_width: Some(100), max_width: None, min_height: Some(100), max_height: None, message: None };
        assert_eq!(evaluate_file(&rule, &metadata).unwrap(), evaluate_file(&rule, &metadata).unwrap());
    }
}
