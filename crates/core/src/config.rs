use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::status::QuoteRequestStatus;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub quote_request: QuoteRequestConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Status sets and reference settings that gate the quote request lifecycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuoteRequestConfig {
    pub initial_status: QuoteRequestStatus,
    pub cancelable_statuses: Vec<QuoteRequestStatus>,
    pub user_cancelable_statuses: Vec<QuoteRequestStatus>,
    pub user_revisable_statuses: Vec<QuoteRequestStatus>,
    pub sequence_name: String,
    pub reference_separator: String,
    pub default_currency: String,
}

impl Default for QuoteRequestConfig {
    fn default() -> Self {
        use QuoteRequestStatus::{Draft, InProgress, Ready, Waiting};

        Self {
            initial_status: Waiting,
            cancelable_statuses: vec![Draft, Waiting, Ready],
            user_cancelable_statuses: vec![Draft, Waiting, InProgress, Ready],
            user_revisable_statuses: vec![Waiting],
            sequence_name: "QuoteRequestReference".to_string(),
            reference_separator: "-".to_string(),
            default_currency: "EUR".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub initial_status: Option<QuoteRequestStatus>,
    pub default_currency: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://quote-request.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            quote_request: QuoteRequestConfig::default(),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("quote-request.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(quote_request) = patch.quote_request {
            let target = &mut self.quote_request;
            if let Some(initial_status) = quote_request.initial_status {
                target.initial_status =
                    parse_status("quote_request.initial_status", &initial_status)?;
            }
            if let Some(statuses) = quote_request.cancelable_statuses {
                target.cancelable_statuses =
                    parse_statuses("quote_request.cancelable_statuses", &statuses)?;
            }
            if let Some(statuses) = quote_request.user_cancelable_statuses {
                target.user_cancelable_statuses =
                    parse_statuses("quote_request.user_cancelable_statuses", &statuses)?;
            }
            if let Some(statuses) = quote_request.user_revisable_statuses {
                target.user_revisable_statuses =
                    parse_statuses("quote_request.user_revisable_statuses", &statuses)?;
            }
            if let Some(sequence_name) = quote_request.sequence_name {
                target.sequence_name = sequence_name;
            }
            if let Some(reference_separator) = quote_request.reference_separator {
                target.reference_separator = reference_separator;
            }
            if let Some(default_currency) = quote_request.default_currency {
                target.default_currency = default_currency;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("QUOTE_REQUEST_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("QUOTE_REQUEST_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("QUOTE_REQUEST_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("QUOTE_REQUEST_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("QUOTE_REQUEST_DATABASE_TIMEOUT_SECS", &value)?;
        }

        let log_level =
            read_env("QUOTE_REQUEST_LOGGING_LEVEL").or_else(|| read_env("QUOTE_REQUEST_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("QUOTE_REQUEST_LOGGING_FORMAT")
            .or_else(|| read_env("QUOTE_REQUEST_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        if let Some(value) = read_env("QUOTE_REQUEST_INITIAL_STATUS") {
            self.quote_request.initial_status =
                QuoteRequestStatus::parse(&value).ok_or_else(|| ConfigError::InvalidEnvOverride {
                    key: "QUOTE_REQUEST_INITIAL_STATUS".to_string(),
                    value: value.clone(),
                })?;
        }
        if let Some(value) = read_env("QUOTE_REQUEST_CANCELABLE_STATUSES") {
            self.quote_request.cancelable_statuses =
                parse_status_list("QUOTE_REQUEST_CANCELABLE_STATUSES", &value)?;
        }
        if let Some(value) = read_env("QUOTE_REQUEST_USER_CANCELABLE_STATUSES") {
            self.quote_request.user_cancelable_statuses =
                parse_status_list("QUOTE_REQUEST_USER_CANCELABLE_STATUSES", &value)?;
        }
        if let Some(value) = read_env("QUOTE_REQUEST_USER_REVISABLE_STATUSES") {
            self.quote_request.user_revisable_statuses =
                parse_status_list("QUOTE_REQUEST_USER_REVISABLE_STATUSES", &value)?;
        }
        if let Some(value) = read_env("QUOTE_REQUEST_SEQUENCE_NAME") {
            self.quote_request.sequence_name = value;
        }
        if let Some(value) = read_env("QUOTE_REQUEST_REFERENCE_SEPARATOR") {
            self.quote_request.reference_separator = value;
        }
        if let Some(value) = read_env("QUOTE_REQUEST_DEFAULT_CURRENCY") {
            self.quote_request.default_currency = value;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(initial_status) = overrides.initial_status {
            self.quote_request.initial_status = initial_status;
        }
        if let Some(default_currency) = overrides.default_currency {
            self.quote_request.default_currency = default_currency;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_logging(&self.logging)?;
        validate_quote_request(&self.quote_request)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("quote-request.toml"), PathBuf::from("config/quote-request.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_quote_request(config: &QuoteRequestConfig) -> Result<(), ConfigError> {
    if config.initial_status.is_terminal() {
        return Err(ConfigError::Validation(
            "quote_request.initial_status must not be a terminal status".to_string(),
        ));
    }

    let sets = [
        ("quote_request.cancelable_statuses", &config.cancelable_statuses),
        ("quote_request.user_cancelable_statuses", &config.user_cancelable_statuses),
        ("quote_request.user_revisable_statuses", &config.user_revisable_statuses),
    ];
    for (key, statuses) in sets {
        if statuses.iter().any(QuoteRequestStatus::is_terminal) {
            return Err(ConfigError::Validation(format!(
                "{key} must not contain a terminal status"
            )));
        }
    }

    let uncovered: Vec<&str> = config
        .cancelable_statuses
        .iter()
        .filter(|status| !config.user_cancelable_statuses.contains(status))
        .map(QuoteRequestStatus::as_str)
        .collect();
    if !uncovered.is_empty() {
        return Err(ConfigError::Validation(format!(
            "quote_request.user_cancelable_statuses must include every customer cancelable status (missing: {})",
            uncovered.join(", ")
        )));
    }

    if config.reference_separator.is_empty() {
        return Err(ConfigError::Validation(
            "quote_request.reference_separator must not be empty".to_string(),
        ));
    }

    if config.sequence_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "quote_request.sequence_name must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_status(key: &str, value: &str) -> Result<QuoteRequestStatus, ConfigError> {
    QuoteRequestStatus::parse(value).ok_or_else(|| {
        ConfigError::Validation(format!(
            "{key} contains unknown status `{value}` (expected draft|waiting|in-progress|ready|canceled)"
        ))
    })
}

fn parse_statuses(key: &str, values: &[String]) -> Result<Vec<QuoteRequestStatus>, ConfigError> {
    values.iter().map(|value| parse_status(key, value)).collect()
}

fn parse_status_list(key: &str, value: &str) -> Result<Vec<QuoteRequestStatus>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            QuoteRequestStatus::parse(item).ok_or_else(|| ConfigError::InvalidEnvOverride {
                key: key.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    logging: Option<LoggingPatch>,
    quote_request: Option<QuoteRequestPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteRequestPatch {
    initial_status: Option<String>,
    cancelable_statuses: Option<Vec<String>>,
    user_cancelable_statuses: Option<Vec<String>>,
    user_revisable_statuses: Option<Vec<String>>,
    sequence_name: Option<String>,
    reference_separator: Option<String>,
    default_currency: Option<String>,
}
