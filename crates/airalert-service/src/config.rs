//! Daemon configuration.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use airalert_core::{AlertPolicy, MessageTemplates, QualityLabels, Renderer};

/// Longest accepted poll period and cooldown, in minutes (one day).
const MAX_MINUTES: u64 = 24 * 60;

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// AQI strictly above this value raises an alert.
    pub report_threshold: f64,
    /// Minutes between polls.
    pub update_period: u64,
    /// Minutes a recovery notice is held back after readings drop.
    pub cooldown_time: u64,
    /// Local hour (0-23) at which the daily digest goes out.
    pub status_email_hour: u8,
    /// Alert state snapshot file.
    pub state_file: PathBuf,
    /// PurpleAir sensor ids, in report order.
    pub sensors: Vec<String>,
    /// Sensor API settings.
    pub source: SourceConfig,
    /// Mail settings.
    pub email: EmailConfig,
    /// Message body templates.
    pub messages: MessageTemplates,
    /// Labels substituted for `$LEVEL_STRING`.
    pub qualities: QualityLabels,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            report_threshold: 150.0,
            update_period: 60,
            cooldown_time: 15,
            status_email_hour: 6,
            state_file: airalert_store::default_state_path(),
            sensors: Vec::new(),
            source: SourceConfig::default(),
            email: EmailConfig::default(),
            messages: MessageTemplates::default(),
            qualities: QualityLabels::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for real mail delivery.
    ///
    /// All problems are collected and reported together.
    ///
    /// # Example
    ///
    /// ```
    /// use airalert_service::Config;
    ///
    /// let mut config = Config::default();
    /// assert!(config.validate().is_err());
    ///
    /// config.sensors = vec!["61605".to_string()];
    /// config.email.smtp_addr = "smtp.example.com".to_string();
    /// config.email.sender_email = "air-alert@example.com".to_string();
    /// config.email.addresses = vec!["ops@example.com".to_string()];
    /// config.validate().expect("filled-in config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.check(true)
    }

    /// Validate the configuration for a dry run, where no SMTP server is used.
    pub fn validate_dry_run(&self) -> Result<(), ConfigError> {
        self.check(false)
    }

    fn check(&self, require_transport: bool) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if !self.report_threshold.is_finite() || self.report_threshold < 0.0 {
            errors.push(ValidationError::new(
                "report_threshold",
                format!(
                    "threshold {} must be a non-negative number",
                    self.report_threshold
                ),
            ));
        }

        if self.update_period == 0 || self.update_period > MAX_MINUTES {
            errors.push(ValidationError::new(
                "update_period",
                format!(
                    "update period {} must be between 1 and {} minutes",
                    self.update_period, MAX_MINUTES
                ),
            ));
        }

        if self.cooldown_time > MAX_MINUTES {
            errors.push(ValidationError::new(
                "cooldown_time",
                format!(
                    "cooldown {} is too long (maximum {} minutes)",
                    self.cooldown_time, MAX_MINUTES
                ),
            ));
        }

        if self.status_email_hour > 23 {
            errors.push(ValidationError::new(
                "status_email_hour",
                format!("hour {} must be between 0 and 23", self.status_email_hour),
            ));
        }

        if self.state_file.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "state_file",
                "state file path cannot be empty",
            ));
        }

        if self.sensors.is_empty() {
            errors.push(ValidationError::new(
                "sensors",
                "at least one sensor must be configured",
            ));
        }
        let mut seen = HashSet::new();
        for (i, sensor) in self.sensors.iter().enumerate() {
            let field = format!("sensors[{}]", i);
            if sensor.trim().is_empty() {
                errors.push(ValidationError::new(field, "sensor id cannot be empty"));
            } else if !seen.insert(sensor.trim()) {
                errors.push(ValidationError::new(
                    field,
                    format!("duplicate sensor id '{}'", sensor),
                ));
            }
        }

        errors.extend(self.source.validate());
        errors.extend(self.email.validate(require_transport));

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Threshold and cooldown for the alert engine.
    pub fn policy(&self) -> AlertPolicy {
        AlertPolicy::new(
            self.report_threshold,
            Duration::from_secs(self.cooldown_time * 60),
        )
    }

    /// Time between regular polls.
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_period * 60)
    }

    /// Message renderer for the configured templates and recipients.
    pub fn renderer(&self) -> Renderer {
        Renderer::new(
            self.messages.clone(),
            self.qualities.clone(),
            self.email.sender_email.clone(),
            self.email.addresses.clone(),
        )
    }
}

/// PurpleAir API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// JSON endpoint; the sensor id is passed as the `show` query parameter.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.purpleair.com/json".to_string(),
            timeout_secs: 30,
        }
    }
}

impl SourceConfig {
    /// Validate source settings.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            errors.push(ValidationError::new(
                "source.base_url",
                format!(
                    "invalid URL '{}': must start with http:// or https://",
                    self.base_url
                ),
            ));
        }

        if self.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "source.timeout_secs",
                "timeout must be at least 1 second",
            ));
        }

        errors
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Mail settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// SMTP server host.
    pub smtp_addr: String,
    /// SMTP server port.
    pub smtp_port: u16,
    /// Upgrade the connection with STARTTLS.
    pub use_tls: bool,
    /// Authenticate with `email_addr` / `email_pw`.
    pub login_required: bool,
    /// SMTP login.
    pub email_addr: String,
    /// SMTP password.
    pub email_pw: String,
    /// `From:` address.
    pub sender_email: String,
    /// Recipients of every message.
    pub addresses: Vec<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_addr: String::new(),
            smtp_port: 587,
            use_tls: true,
            login_required: false,
            email_addr: String::new(),
            email_pw: String::new(),
            sender_email: String::new(),
            addresses: Vec::new(),
        }
    }
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_addr", &self.smtp_addr)
            .field("smtp_port", &self.smtp_port)
            .field("use_tls", &self.use_tls)
            .field("login_required", &self.login_required)
            .field("email_addr", &self.email_addr)
            .field("email_pw", &"[redacted]")
            .field("sender_email", &self.sender_email)
            .field("addresses", &self.addresses)
            .finish()
    }
}

impl EmailConfig {
    /// Validate mail settings. Server settings are only checked when
    /// `require_transport` is set.
    pub fn validate(&self, require_transport: bool) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.sender_email.trim().is_empty() {
            errors.push(ValidationError::new(
                "email.sender_email",
                "sender address cannot be empty",
            ));
        }

        if self.addresses.is_empty() {
            errors.push(ValidationError::new(
                "email.addresses",
                "at least one recipient must be configured",
            ));
        }
        for (i, address) in self.addresses.iter().enumerate() {
            if address.trim().is_empty() {
                errors.push(ValidationError::new(
                    format!("email.addresses[{}]", i),
                    "recipient cannot be empty",
                ));
            }
        }

        if require_transport {
            if self.smtp_addr.trim().is_empty() {
                errors.push(ValidationError::new(
                    "email.smtp_addr",
                    "SMTP server cannot be empty",
                ));
            }
            if self.smtp_port == 0 {
                errors.push(ValidationError::new(
                    "email.smtp_port",
                    "port cannot be 0",
                ));
            }
            if self.login_required {
                if self.email_addr.is_empty() {
                    errors.push(ValidationError::new(
                        "email.email_addr",
                        "login is required but no login was given",
                    ));
                }
                if self.email_pw.is_empty() {
                    errors.push(ValidationError::new(
                        "email.email_pw",
                        "login is required but no password was given",
                    ));
                }
            }
        }

        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `email.smtp_port` or `sensors[1]`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("airalert")
        .join("config.toml")
}
