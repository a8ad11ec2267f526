//! Command-line front end: validates files on disk against a rules file

use anyhow::{Context, Result};
use attachment_core::config::LoggingConfig;
use attachment_core::{AppConfig, Attachment, Record, ValidationReport, ValidationSchema, Validator};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "attachment-check")]
#[command(about = "Validate file attachments against declarative rules", long_about = None)]
struct Cli {
    /// Rules file (.toml, .yaml/.yml or .json)
    #[arg(short, long)]
    rules: PathBuf,

    /// Attachment as `<attribute>=<path>`; repeat for several files
    #[arg(short, long = "attach", value_name = "ATTRIBUTE=PATH", value_parser = parse_attachment)]
    attachments: Vec<(String, PathBuf)>,

    /// Locale for messages, overriding the configured default
    #[arg(short, long)]
    locale: Option<String>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Configuration file; defaults to ./config.toml when present
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_attachment(value: &str) -> Result<(String, PathBuf), String> {
    match value.split_once('=') {
        Some((attribute, path)) if !attribute.is_empty() && !path.is_empty() => {
            Ok((attribute.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected <attribute>=<path>, got '{}'", value)),
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    init_tracing(&config.logging);

    let schema = ValidationSchema::from_path(&cli.rules)
        .with_context(|| format!("Failed to load rules from {}", cli.rules.display()))?;

    let mut record = Record::new();
    for (attribute, path) in &cli.attachments {
        record.push(attribute.clone(), Attachment::from_path(path));
    }

    let mut validator = Validator::from_config(&config).context("Failed to initialize validator")?;
    if let Some(locale) = &cli.locale {
        validator = validator.with_locale(locale.clone());
    }

    info!(
        rules = %cli.rules.display(),
        attachments = cli.attachments.len(),
        locale = validator.locale(),
        "Validating attachments"
    );

    let report = validator.validate(&record, &schema).context("Validation could not complete")?;
    print_report(&report, cli.format)?;

    Ok(if report.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_report(report: &ValidationReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let body = serde_json::json!({
                "valid": report.is_valid(),
                "failures": report.failures(),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Text if report.is_valid() => println!("All attachments are valid"),
        OutputFormat::Text => {
            for failure in report.failures() {
                match &failure.filename {
                    Some(filename) => println!("{} ({})", failure.full_message(), filename),
                    None => println!("{}", failure.full_message()),
                }
            }
        }
    }
    Ok(())
}

/// Logs go to stderr so that the report on stdout stays machine-readable.
fn init_tracing(logging: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("attachment_check={0},attachment_core={0}", logging.level).into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let is_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(logging.format == "json");

    if is_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.pretty())
            .init();
    }
}
