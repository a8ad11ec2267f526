use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub locale: LocaleConfig,
    #[validate(nested)]
    pub extraction: ExtractionConfig,
    #[validate(nested)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LocaleConfig {
    #[validate(length(min = 2, max = 35, message = "Default locale must be a language tag"))]
    pub default_locale: String,
    pub fallback_locales: Vec<String>,
    pub locale_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExtractionConfig {
    #[validate(range(min = 16, max = 1048576, message = "Sniff buffer must be between 16 bytes and 1 MiB"))]
    pub sniff_bytes: usize,
    pub probe_dimensions: bool,
    pub probe_duration: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoggingConfig {
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub level: String,
    #[validate(custom(function = "validate_log_format"))]
    pub format: String,
}

fn validate_log_format(format: &str) -> Result<(), validator::ValidationError> {
    match format {
        "pretty" | "json" => Ok(()),
        _ => Err(validator::ValidationError::new("Log format must be 'pretty' or 'json'")),
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            locale: LocaleConfig::default(),
            extraction: ExtractionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            default_locale: "en".to_string(),
            fallback_locales: vec!["en".to_string()],
            locale_dir: None,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            sniff_bytes: 8192,
            probe_dimensions: true,
            probe_duration: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults, then `config.toml` in the working directory, then `APP_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?);

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path));
            }
            None if Path::new("config.toml").exists() => {
                builder = builder.add_source(File::with_name("config"));
            }
            None => {}
        }

        builder = builder.add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("locale.fallback_locales")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        app_config.check()?;

        Ok(app_config)
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()
            .map_err(|errors| ConfigError::Message(errors.to_string()))?;

        if let Some(dir) = &self.locale.locale_dir {
            if !dir.is_dir() {
                return Err(ConfigError::Message(format!(
                    "Locale directory {} does not exist",
                    dir.display()
                )));
            }
        }

        if !self.extraction.probe_dimensions && !self.extraction.probe_duration {
            tracing::warn!("Dimension and duration probing are both disabled - dimension, aspect ratio and duration rules will never fail");
        }

        Ok(())
    }
}
