//! Shared types for the AirAlert daemon.
//!
//! This crate holds the plain data that flows between the other AirAlert
//! crates: sensor readings extracted from PurpleAir payloads and the
//! persisted alert-state snapshot.
//!
//! # Example
//!
//! ```
//! use airalert_types::{AlertState, SensorReading};
//!
//! let payload = br#"{"results":[{"Label":"Roof","temp_f":71,"LastSeen":1600000000,"PM2_5Value":"8.4"}]}"#;
//! let reading = SensorReading::from_slice("61605", payload).unwrap();
//! assert!(reading.valid);
//! assert_eq!(reading.label, "Roof");
//!
//! let state = AlertState::default();
//! assert!(!state.was_high);
//! ```

pub mod error;
pub mod reading;
pub mod state;

pub use error::{ParseError, ParseResult};
pub use reading::{SensorReading, UNKNOWN_LABEL};
pub use state::{AlertPhase, AlertState};
