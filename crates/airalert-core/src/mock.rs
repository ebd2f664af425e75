//! In-memory collaborators for testing.
//!
//! - [`MockSource`] serves readings from a table and can be told to fail for
//!   individual sensors.
//! - [`MockNotifier`] records every message it is asked to send and can be
//!   told to fail.
//! - [`ManualClock`] is a clock that only moves when told to.
//!
//! # Example
//!
//! ```
//! use airalert_core::{MockSource, SensorSource};
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = MockSource::new();
//!     source.set_pm25("61605", "Roof", 35.5).await;
//!     source.fail("38085").await;
//!
//!     assert_eq!(source.fetch("61605").await.unwrap().pm25, 35.5);
//!     assert!(source.fetch("38085").await.is_err());
//! }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, AtomicU32, Ordering};

use async_trait::async_trait;
use time::{OffsetDateTime, UtcOffset};
use tokio::sync::RwLock;

use airalert_types::SensorReading;

use crate::error::{NotifyError, SourceError};
use crate::message::OutgoingMessage;
use crate::traits::{Clock, Notifier, SensorSource};

/// A sensor source backed by a map of readings.
///
/// Sensors with no entry, or marked with [`MockSource::fail`], return
/// [`SourceError::Unavailable`].
#[derive(Debug, Default)]
pub struct MockSource {
    readings: RwLock<HashMap<String, SensorReading>>,
    failing: RwLock<Vec<String>>,
    fetch_count: AtomicU32,
}

impl MockSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve this reading for its sensor id.
    pub async fn set_reading(&self, reading: SensorReading) {
        self.failing.write().await.retain(|id| id != &reading.sensor_id);
        self.readings
            .write()
            .await
            .insert(reading.sensor_id.clone(), reading);
    }

    /// Serve a valid reading with the given PM2.5 concentration.
    pub async fn set_pm25(&self, sensor_id: &str, label: &str, pm25: f64) {
        self.set_reading(SensorReading::new(sensor_id, label, pm25, 1_600_000_000))
            .await;
    }

    /// Make every fetch for this sensor fail.
    pub async fn fail(&self, sensor_id: &str) {
        self.failing.write().await.push(sensor_id.to_string());
    }

    /// Number of fetches attempted so far.
    pub fn fetch_count(&self) -> u32 {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SensorSource for MockSource {
    async fn fetch(&self, sensor_id: &str) -> Result<SensorReading, SourceError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        if self.failing.read().await.iter().any(|id| id == sensor_id) {
            return Err(SourceError::Unavailable(sensor_id.to_string()));
        }

        self.readings
            .read()
            .await
            .get(sensor_id)
            .cloned()
            .ok_or_else(|| SourceError::Unavailable(sensor_id.to_string()))
    }
}

/// A notifier that records messages instead of sending them.
#[derive(Debug, Default)]
pub struct MockNotifier {
    sent: RwLock<Vec<OutgoingMessage>>,
    should_fail: AtomicBool,
    attempts: AtomicU32,
}

impl MockNotifier {
    /// Create a notifier that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail (or succeed again).
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Messages delivered so far.
    pub async fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.read().await.clone()
    }

    /// Send attempts so far, including failed ones.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport("mock transport failure".to_string()));
        }
        self.sent.write().await.push(message.clone());
        Ok(())
    }
}

/// A clock that stands still until moved.
#[derive(Debug)]
pub struct ManualClock {
    unix_secs: AtomicI64,
    offset_secs: AtomicI32,
}

impl ManualClock {
    /// A clock at the given time, reporting in that time's offset.
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            unix_secs: AtomicI64::new(start.unix_timestamp()),
            offset_secs: AtomicI32::new(start.offset().whole_seconds()),
        }
    }

    /// Move the clock to an absolute time.
    pub fn set(&self, now: OffsetDateTime) {
        self.unix_secs.store(now.unix_timestamp(), Ordering::SeqCst);
    }

    /// Move the clock forward.
    pub fn advance(&self, by: std::time::Duration) {
        let secs = i64::try_from(by.as_secs()).unwrap_or(i64::MAX);
        self.unix_secs.fetch_add(secs, Ordering::SeqCst);
    }

    /// Change the local offset, as a daylight-saving switch would.
    pub fn set_offset(&self, offset: UtcOffset) {
        self.offset_secs.store(offset.whole_seconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(self.unix_secs.load(Ordering::SeqCst))
            .unwrap_or(OffsetDateTime::UNIX_EPOCH)
            .to_offset(self.offset())
    }

    fn offset(&self) -> UtcOffset {
        UtcOffset::from_whole_seconds(self.offset_secs.load(Ordering::SeqCst))
            .unwrap_or(UtcOffset::UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_mock_source_serves_and_fails() {
        let source = MockSource::new();
        source.set_pm25("a", "A", 10.0).await;
        source.fail("b").await;

        assert_eq!(source.fetch("a").await.unwrap().label, "A");
        assert!(matches!(
            source.fetch("b").await,
            Err(SourceError::Unavailable(id)) if id == "b"
        ));
        assert!(source.fetch("missing").await.is_err());
        assert_eq!(source.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_set_reading_clears_failure() {
        let source = MockSource::new();
        source.fail("a").await;
        source.set_pm25("a", "A", 1.0).await;
        assert!(source.fetch("a").await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_notifier_records() {
        let notifier = MockNotifier::new();
        let message = OutgoingMessage {
            to: vec!["a@example.com".to_string()],
            from: "b@example.com".to_string(),
            subject: "s".to_string(),
            body: "b".to_string(),
        };

        notifier.send(&message).await.unwrap();
        notifier.set_should_fail(true);
        assert!(notifier.send(&message).await.is_err());

        assert_eq!(notifier.sent().await, vec![message]);
        assert_eq!(notifier.attempts(), 2);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(OffsetDateTime::UNIX_EPOCH);
        assert_eq!(clock.now().unix_timestamp(), 0);
        clock.advance(Duration::from_secs(90));
        assert_eq!(clock.now().unix_timestamp(), 90);
        clock.set(OffsetDateTime::from_unix_timestamp(5).unwrap());
        assert_eq!(clock.now().unix_timestamp(), 5);
    }

    #[test]
    fn test_manual_clock_offset_change_keeps_instant() {
        let start = OffsetDateTime::UNIX_EPOCH.to_offset(time::macros::offset!(-7));
        let clock = ManualClock::new(start);
        let before = clock.now();
        clock.set_offset(time::macros::offset!(-8));
        let after = clock.now();
        assert_eq!(before, after);
        assert_eq!(after.offset(), time::macros::offset!(-8));
        assert_eq!(after.hour() + 1, before.hour());
    }
}
