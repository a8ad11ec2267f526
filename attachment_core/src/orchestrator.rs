//! Runs a schema's rules against a record's attachments

use std::collections::HashMap;

use tracing::{debug, info};

use crate::attachment::{Attachment, AttachmentId, AttachmentRecord};
use crate::config::AppConfig;
use crate::error::{AppError, ConfigurationError, Result};
use crate::messages::{ErrorReporter, Violation};
use crate::metadata::{AttachedFileMetadata, FileMetadataExtractor, MetadataExtractor};
use crate::report::ValidationReport;
use crate::rules::evaluators::{check_count, check_total_size, FileEvaluator};
use crate::rules::{RuleScope, RuleSpec, ValidationSchema};

/// Metadata extracted during one validation run, keyed by attachment identity.
struct MetadataCache<'e, E: ?Sized> {
    extractor: &'e E,
    entries: HashMap<AttachmentId, AttachedFileMetadata>,
}

impl<'e, E: MetadataExtractor + ?Sized> MetadataCache<'e, E> {
    fn new(extractor: &'e E) -> Self {
        Self {
            extractor,
            entries: HashMap::new(),
        }
    }

    fn get(&mut self, attachment: &Attachment) -> Result<&AttachedFileMetadata> {
        if !self.entries.contains_key(&attachment.id()) {
            let metadata = self.extractor.extract(attachment).map_err(|source| AppError::Extraction {
                filename: attachment.filename().to_string(),
                source,
            })?;
            self.entries.insert(attachment.id(), metadata);
        }
        // Present: inserted above if it was missing.
        Ok(&self.entries[&attachment.id()])
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

pub struct Validator<E = FileMetadataExtractor> {
    extractor: E,
    reporter: ErrorReporter,
    locale: String,
}

impl Default for Validator<FileMetadataExtractor> {
    fn default() -> Self {
        Self::new(FileMetadataExtractor::default())
    }
}

impl Validator<FileMetadataExtractor> {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let reporter = ErrorReporter::from_config(&config.locale)?;
        Ok(Self::new(FileMetadataExtractor::new(config.extraction.clone()))
            .with_reporter(reporter)
            .with_locale(config.locale.default_locale.clone()))
    }
}

impl<E: MetadataExtractor> Validator<E> {
    pub fn new(extractor: E) -> Self {
        Self {
            extractor,
            reporter: ErrorReporter::default(),
            locale: "en".to_string(),
        }
    }

    pub fn with_reporter(mut self, reporter: ErrorReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Validates `record` against `schema` in the configured locale.
    pub fn validate<R: AttachmentRecord + ?Sized>(&self, record: &R, schema: &ValidationSchema) -> Result<ValidationReport> {
        self.validate_in_locale(record, schema, &self.locale)
    }

    /// Evaluates every rule in declaration order and collects all failures.
    ///
    /// Returns `Err` only for misconfigured rules or files whose metadata
    /// could not be read; rule violations are part of the report.
    pub fn validate_in_locale<R: AttachmentRecord + ?Sized>(
        &self,
        record: &R,
        schema: &ValidationSchema,
        locale: &str,
    ) -> Result<ValidationReport> {
        schema.check()?;

        let mut cache = MetadataCache::new(&self.extractor);
        let mut report = ValidationReport::success();

        for attribute in &schema.attributes {
            let attachments = record.attachments(&attribute.name);

            for (index, rule) in attribute.rules.iter().enumerate() {
                debug!(
                    attribute = %attribute.name,
                    rule = rule.name(),
                    attachments = attachments.len(),
                    "Evaluating rule"
                );

                let violations = self.evaluate(&attribute.name, index, rule, attachments, &mut cache)?;
                for violation in violations {
                    report.push(self.reporter.report(&attribute.name, violation, rule.message(), locale));
                }
            }
        }

        info!(
            attributes = schema.attributes.len(),
            extracted = cache.len(),
            failures = report.len(),
            "Validation finished"
        );

        Ok(report)
    }

    fn evaluate(
        &self,
        attribute: &str,
        index: usize,
        rule: &RuleSpec,
        attachments: &[Attachment],
        cache: &mut MetadataCache<'_, E>,
    ) -> Result<Vec<Violation>> {
        match (rule.scope(), rule.needs_metadata()) {
            (RuleScope::PerAttribute, false) => Ok(check_count(rule, attachments.len()).into_iter().collect()),
            (RuleScope::PerAttribute, true) => {
                let mut total: u64 = 0;
                for attachment in attachments {
                    total = total.saturating_add(cache.get(attachment)?.byte_size);
                }
                Ok(check_total_size(rule, total).into_iter().collect())
            }
            (RuleScope::PerFile, _) => {
                let evaluator = FileEvaluator::new(rule).map_err(|reason| ConfigurationError {
                    attribute: attribute.to_string(),
                    index,
                    rule: rule.name(),
                    reason,
                })?;
                let mut violations = Vec::new();
                for attachment in attachments {
                    violations.extend(evaluator.evaluate(cache.get(attachment)?));
                }
                Ok(violations)
            }
        }
    }
}
