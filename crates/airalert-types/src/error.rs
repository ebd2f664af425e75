//! Error types for payload parsing in airalert-types.

use thiserror::Error;

/// Errors that can occur when turning raw sensor payloads into readings.
///
/// Missing fields are not errors; they fall back to defaults and mark the
/// reading invalid. Only a payload that is not JSON at all is rejected.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The payload was not valid JSON.
    #[error("Invalid sensor payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using airalert-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
