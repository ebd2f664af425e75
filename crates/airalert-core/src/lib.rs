//! AQI computation and alert decision engine for AirAlert.
//!
//! This crate contains everything that decides *whether* to notify, with no
//! network or mail code of its own:
//!
//! - [`aqi`]: PM2.5 to AQI conversion using the EPA breakpoint table
//! - [`engine`]: the alert state machine (raise, hold, clear)
//! - [`message`]: rendering of alert, recovery and digest emails
//! - [`traits`]: seams for the sensor source, notifier and clock
//! - [`mock`]: in-memory implementations of those seams for tests
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use airalert_core::{AlertDecision, AlertEngine, AlertPolicy};
//! use airalert_types::{AlertState, SensorReading};
//! use time::OffsetDateTime;
//!
//! let policy = AlertPolicy::new(150.0, Duration::from_secs(15 * 60));
//! let mut engine = AlertEngine::new(policy, AlertState::default());
//!
//! // 150.5 µg/m³ sits on the lower edge of the 201-300 bracket.
//! let batch = vec![SensorReading::new("61605", "Roof", 150.5, 0)];
//! let evaluation = engine.evaluate(&batch, OffsetDateTime::UNIX_EPOCH);
//! assert_eq!(evaluation.decision, AlertDecision::RaiseAlert(201.0));
//! assert!(engine.state().was_high);
//! ```

pub mod aqi;
pub mod engine;
pub mod error;
pub mod message;
pub mod mock;
pub mod traits;

pub use aqi::{AqiCategory, calc_aqi};
pub use engine::{
    AlertDecision, AlertEngine, AlertPolicy, EMPTY_BATCH_AQI, Evaluation, evaluate,
    representative_aqi,
};
pub use error::{NotifyError, SourceError};
pub use message::{MessageTemplates, OutgoingMessage, QualityLabels, Renderer};
pub use mock::{ManualClock, MockNotifier, MockSource};
pub use traits::{Clock, Notifier, SensorSource, SystemClock};

// Re-export types for convenience
pub use airalert_types as types;
