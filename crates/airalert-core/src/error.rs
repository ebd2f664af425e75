//! Error types for the collaborator seams.
//!
//! The core never talks to the network itself, so these errors carry the
//! underlying cause as text. Implementations in `airalert-service` convert
//! their `reqwest` and `lettre` errors into these variants.
//!
//! Both kinds are recoverable: a [`SourceError`] drops one sensor from the
//! current batch, and a [`NotifyError`] abandons one message. Neither is
//! retried.

use thiserror::Error;

use airalert_types::ParseError;

/// Failure to obtain a reading from one sensor.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The request could not be completed (DNS, connect, timeout...).
    #[error("Request for sensor {sensor} failed: {message}")]
    Request { sensor: String, message: String },

    /// The server answered with a non-success status.
    #[error("Sensor {sensor} returned HTTP {status}")]
    Status { sensor: String, status: u16 },

    /// The response body was not a readable payload.
    #[error("Sensor {sensor} sent an unreadable payload: {source}")]
    Decode {
        sensor: String,
        #[source]
        source: ParseError,
    },

    /// No reading is available for this sensor (used by test sources).
    #[error("Sensor {0} is unavailable")]
    Unavailable(String),
}

impl SourceError {
    /// The sensor the error refers to.
    pub fn sensor(&self) -> &str {
        match self {
            SourceError::Request { sensor, .. }
            | SourceError::Status { sensor, .. }
            | SourceError::Decode { sensor, .. }
            | SourceError::Unavailable(sensor) => sensor,
        }
    }
}

/// Failure to deliver a message.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// A sender or recipient address could not be parsed.
    #[error("Invalid address {address:?}: {message}")]
    Address { address: String, message: String },

    /// The message could not be assembled.
    #[error("Failed to build message: {0}")]
    Build(String),

    /// The transport rejected or failed to deliver the message.
    #[error("Mail transport failed: {0}")]
    Transport(String),
}
