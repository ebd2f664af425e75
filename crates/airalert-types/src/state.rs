//! Persisted alert state.

use serde::{Deserialize, Deserializer, Serialize};

/// Snapshot of the alerting state machine.
///
/// This is the only state that survives a restart. It is written as a flat
/// JSON object:
///
/// ```json
/// {"was_high": true, "last_high_aqi": 183.2, "last_report_time": 1600000000}
/// ```
///
/// `cooldown_until` is only written while a recovery notice is being held
/// back. Missing keys take their defaults, and fractional timestamps are
/// truncated to whole seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertState {
    /// Whether an alert episode is in progress.
    pub was_high: bool,
    /// AQI seen during the most recent above-threshold cycle.
    pub last_high_aqi: f64,
    /// UNIX seconds of the most recent high-alert notice.
    #[serde(deserialize_with = "unix_seconds")]
    pub last_report_time: i64,
    /// UNIX seconds after which a pending recovery notice may be sent.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "optional_unix_seconds"
    )]
    pub cooldown_until: Option<i64>,
}

/// Coarse phase of the state machine, derived from [`AlertState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPhase {
    /// No alert episode in progress.
    Clear,
    /// An alert was sent and readings are still above threshold.
    Alerting,
    /// Readings dropped below threshold; the recovery notice is being held.
    CoolingDown,
}

impl AlertState {
    /// Current phase of the state machine.
    pub fn phase(&self) -> AlertPhase {
        match (self.was_high, self.cooldown_until) {
            (false, _) => AlertPhase::Clear,
            (true, None) => AlertPhase::Alerting,
            (true, Some(_)) => AlertPhase::CoolingDown,
        }
    }
}

fn unix_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let secs = f64::deserialize(deserializer)?;
    Ok(secs as i64)
}

fn optional_unix_seconds<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<i64>, D::Error> {
    let secs = Option::<f64>::deserialize(deserializer)?;
    Ok(secs.map(|s| s as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_clear() {
        let state = AlertState::default();
        assert!(!state.was_high);
        assert_eq!(state.last_high_aqi, 0.0);
        assert_eq!(state.last_report_time, 0);
        assert_eq!(state.cooldown_until, None);
        assert_eq!(state.phase(), AlertPhase::Clear);
    }

    #[test]
    fn test_phase() {
        let alerting = AlertState {
            was_high: true,
            ..Default::default()
        };
        assert_eq!(alerting.phase(), AlertPhase::Alerting);

        let cooling = AlertState {
            was_high: true,
            cooldown_until: Some(10),
            ..Default::default()
        };
        assert_eq!(cooling.phase(), AlertPhase::CoolingDown);
    }

    #[test]
    fn test_serialized_keys() {
        let state = AlertState {
            was_high: true,
            last_high_aqi: 183.5,
            last_report_time: 1_600_000_000,
            cooldown_until: None,
        };
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(
            json,
            r#"{"was_high":true,"last_high_aqi":183.5,"last_report_time":1600000000}"#
        );
    }

    #[test]
    fn test_cooldown_written_when_present() {
        let state = AlertState {
            was_high: true,
            cooldown_until: Some(42),
            ..Default::default()
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains(r#""cooldown_until":42"#));
    }

    #[test]
    fn test_empty_object_is_default() {
        let state: AlertState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, AlertState::default());
    }

    #[test]
    fn test_fractional_report_time_is_truncated() {
        let state: AlertState = serde_json::from_str(
            r#"{"was_high": true, "last_high_aqi": 201, "last_report_time": 1600000000.75}"#,
        )
        .unwrap();
        assert!(state.was_high);
        assert_eq!(state.last_high_aqi, 201.0);
        assert_eq!(state.last_report_time, 1_600_000_000);
        assert_eq!(state.cooldown_until, None);
    }

    #[test]
    fn test_partial_snapshot() {
        let state: AlertState = serde_json::from_str(r#"{"was_high": false}"#).unwrap();
        assert_eq!(state, AlertState::default());
    }
}
