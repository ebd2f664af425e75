//! Seams between the decision logic and the outside world.
//!
//! The scheduler only depends on these traits, so it can run against the
//! PurpleAir client and an SMTP mailer in production and against
//! [`crate::mock`] implementations in tests.

use async_trait::async_trait;
use time::{OffsetDateTime, UtcOffset};

use airalert_types::SensorReading;

use crate::error::{NotifyError, SourceError};
use crate::message::OutgoingMessage;

/// Something that can produce a reading for a sensor id.
///
/// # Example
///
/// ```ignore
/// use airalert_core::SensorSource;
///
/// async fn show<S: SensorSource>(source: &S) {
///     match source.fetch("61605").await {
///         Ok(reading) => println!("{}: {} µg/m³", reading.label, reading.pm25),
///         Err(e) => eprintln!("{e}"),
///     }
/// }
/// ```
#[async_trait]
pub trait SensorSource: Send + Sync {
    /// Fetch the latest reading for one sensor.
    async fn fetch(&self, sensor_id: &str) -> Result<SensorReading, SourceError>;
}

/// Something that can deliver a rendered message.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Attempt delivery once. Failures are reported, never retried.
    async fn send(&self, message: &OutgoingMessage) -> Result<(), NotifyError>;
}

/// Wall-clock time source.
pub trait Clock: Send + Sync {
    /// Current time, in the clock's local offset.
    fn now(&self) -> OffsetDateTime;

    /// Offset used for local wall-clock decisions and rendering.
    fn offset(&self) -> UtcOffset {
        self.now().offset()
    }
}

/// The real clock, in the machine's local time zone.
///
/// The UTC offset is looked up on every call, so a daemon running across a
/// daylight-saving change follows the new offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a clock in local time.
    pub fn new() -> Self {
        Self
    }
}

/// The local UTC offset in effect right now, or UTC if it is out of range.
fn local_offset() -> UtcOffset {
    let seconds = chrono::Local::now().offset().local_minus_utc();
    UtcOffset::from_whole_seconds(seconds).unwrap_or(UtcOffset::UTC)
}

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(local_offset())
    }

    fn offset(&self) -> UtcOffset {
        local_offset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_matches_local_zone() {
        let clock = SystemClock::new();
        let expected = chrono::Local::now().offset().local_minus_utc();
        assert_eq!(clock.offset().whole_seconds(), expected);
        assert_eq!(clock.now().offset(), clock.offset());
    }

    #[test]
    fn test_system_clock_tracks_utc() {
        let before = OffsetDateTime::now_utc();
        let now = SystemClock::new().now();
        assert!(now >= before);
        assert!(now - before < time::Duration::seconds(5));
    }
}
