//! Background poller and email alerter for PurpleAir air-quality sensors.
//!
//! This crate provides the AirAlert daemon:
//! - Polls the configured PurpleAir sensors on a schedule
//! - Runs the alert engine from `airalert-core` on every batch
//! - Emails an alert when the AQI crosses the threshold and a recovery notice
//!   once it has stayed back down for the cooldown
//! - Sends a daily status digest at a fixed local hour
//! - Persists the alert state so restarts do not repeat notifications
//!
//! # Configuration
//!
//! The daemon reads configuration from `~/.config/airalert/config.toml`:
//!
//! ```toml
//! report_threshold = 150.0
//! update_period = 60
//! cooldown_time = 15
//! status_email_hour = 6
//! state_file = "/srv/air-alert-statefile.json"
//! sensors = ["61605", "38085", "60059"]
//!
//! [email]
//! smtp_addr = "smtp.example.com"
//! smtp_port = 587
//! use_tls = true
//! sender_email = "air-alert@example.com"
//! addresses = ["ops@example.com"]
//! ```
//!
//! `[source]`, `[messages]` and `[qualities]` are optional; see [`Config`].

pub mod config;
pub mod mailer;
pub mod notifier;
pub mod scheduler;
pub mod source;

pub use config::{Config, ConfigError, EmailConfig, SourceConfig, ValidationError, default_config_path};
pub use mailer::{Mailer, MailerHandle};
pub use notifier::{LogNotifier, SmtpNotifier};
pub use scheduler::{AlertLoop, DigestLoop, acquire, next_digest_at};
pub use source::PurpleAirSource;
