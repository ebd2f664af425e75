//! Sensor readings extracted from PurpleAir JSON payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ParseResult;

/// Label used when a payload carries no usable `Label` field.
pub const UNKNOWN_LABEL: &str = "None";

/// A single reading from one sensor, taken during one poll cycle.
///
/// Readings are built once per cycle and never modified afterwards. A reading
/// whose payload lacked any of the expected fields still carries default
/// values, but `valid` is `false` and its label and timestamp should not be
/// trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Sensor identifier as configured (PurpleAir `show` id).
    pub sensor_id: String,
    /// Human-readable location name.
    pub label: String,
    /// PM2.5 concentration in µg/m³.
    pub pm25: f64,
    /// Temperature in °F, when reported.
    pub temperature_f: Option<f64>,
    /// UNIX timestamp of the sample.
    pub last_seen: i64,
    /// Whether every expected field was present in the payload.
    pub valid: bool,
}

impl SensorReading {
    /// Create a fully populated reading.
    pub fn new(sensor_id: impl Into<String>, label: impl Into<String>, pm25: f64, last_seen: i64) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            label: label.into(),
            pm25,
            temperature_f: None,
            last_seen,
            valid: true,
        }
    }

    /// Parse a raw response body into a reading.
    ///
    /// Fails only if the body is not JSON; structural problems are handled by
    /// [`SensorReading::from_payload`].
    pub fn from_slice(sensor_id: &str, body: &[u8]) -> ParseResult<Self> {
        let payload: Value = serde_json::from_slice(body)?;
        Ok(Self::from_payload(sensor_id, &payload))
    }

    /// Extract a reading from a decoded PurpleAir payload.
    ///
    /// Only the first element of the `results` array is used. Each of
    /// `Label`, `temp_f`, `LastSeen` and `PM2_5Value` that is missing (or not
    /// interpretable) falls back to its default and clears `valid`.
    pub fn from_payload(sensor_id: &str, payload: &Value) -> Self {
        let record = payload
            .get("results")
            .and_then(Value::as_array)
            .and_then(|results| results.first());
        let field = |name: &str| record.and_then(|r| r.get(name)).filter(|v| !v.is_null());

        let label = field("Label").and_then(Value::as_str);
        let temperature_f = field("temp_f").and_then(as_number);
        let last_seen = field("LastSeen").and_then(as_integer);
        let pm25 = field("PM2_5Value").and_then(as_number);

        let valid =
            label.is_some() && temperature_f.is_some() && last_seen.is_some() && pm25.is_some();

        Self {
            sensor_id: sensor_id.to_string(),
            label: label
                .filter(|l| !l.is_empty())
                .unwrap_or(UNKNOWN_LABEL)
                .to_string(),
            pm25: pm25.unwrap_or(0.0),
            temperature_f,
            last_seen: last_seen.unwrap_or(0),
            valid,
        }
    }
}

/// PurpleAir reports most numbers as strings, so accept both forms.
fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(record: Value) -> Value {
        json!({ "results": [record] })
    }

    #[test]
    fn test_complete_payload_is_valid() {
        let reading = SensorReading::from_payload(
            "61605",
            &payload(json!({
                "Label": "SLAC Bldg 53",
                "temp_f": 72,
                "LastSeen": 1_600_000_000,
                "PM2_5Value": 35.5
            })),
        );

        assert!(reading.valid);
        assert_eq!(reading.sensor_id, "61605");
        assert_eq!(reading.label, "SLAC Bldg 53");
        assert_eq!(reading.temperature_f, Some(72.0));
        assert_eq!(reading.last_seen, 1_600_000_000);
        assert!((reading.pm25 - 35.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_string_encoded_numbers() {
        let reading = SensorReading::from_payload(
            "38085",
            &payload(json!({
                "Label": "Menlo Park",
                "temp_f": "68",
                "LastSeen": "1600000100",
                "PM2_5Value": " 151.2 "
            })),
        );

        assert!(reading.valid);
        assert!((reading.pm25 - 151.2).abs() < 1e-9);
        assert_eq!(reading.last_seen, 1_600_000_100);
    }

    #[test]
    fn test_missing_fields_use_defaults_and_invalidate() {
        let reading = SensorReading::from_payload("60059", &payload(json!({ "temp_f": 70 })));

        assert!(!reading.valid);
        assert_eq!(reading.label, UNKNOWN_LABEL);
        assert_eq!(reading.pm25, 0.0);
        assert_eq!(reading.last_seen, 0);
        assert_eq!(reading.temperature_f, Some(70.0));
    }

    #[test]
    fn test_missing_temperature_alone_invalidates() {
        let reading = SensorReading::from_payload(
            "1",
            &payload(json!({ "Label": "A", "LastSeen": 5, "PM2_5Value": 1.0 })),
        );
        assert!(!reading.valid);
        assert_eq!(reading.label, "A");
    }

    #[test]
    fn test_null_and_garbage_fields_count_as_missing() {
        let reading = SensorReading::from_payload(
            "1",
            &payload(json!({
                "Label": null,
                "temp_f": 70,
                "LastSeen": 5,
                "PM2_5Value": "n/a"
            })),
        );
        assert!(!reading.valid);
        assert_eq!(reading.label, UNKNOWN_LABEL);
        assert_eq!(reading.pm25, 0.0);
    }

    #[test]
    fn test_empty_label_falls_back_but_stays_valid() {
        let reading = SensorReading::from_payload(
            "1",
            &payload(json!({ "Label": "", "temp_f": 70, "LastSeen": 5, "PM2_5Value": 3 })),
        );
        assert!(reading.valid);
        assert_eq!(reading.label, UNKNOWN_LABEL);
    }

    #[test]
    fn test_missing_results_array() {
        for body in [json!({}), json!({ "results": [] }), json!([1, 2, 3])] {
            let reading = SensorReading::from_payload("1", &body);
            assert!(!reading.valid);
            assert_eq!(reading.label, UNKNOWN_LABEL);
            assert_eq!(reading.pm25, 0.0);
        }
    }

    #[test]
    fn test_only_first_result_is_used() {
        let body = json!({
            "results": [
                { "Label": "Parent", "temp_f": 70, "LastSeen": 5, "PM2_5Value": 10.0 },
                { "Label": "Child B", "PM2_5Value": 400.0 }
            ]
        });
        let reading = SensorReading::from_payload("1", &body);
        assert_eq!(reading.label, "Parent");
        assert!((reading.pm25 - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_from_slice_rejects_non_json() {
        assert!(SensorReading::from_slice("1", b"<html>rate limited</html>").is_err());
    }

    #[test]
    fn test_from_slice_accepts_json() {
        let reading = SensorReading::from_slice(
            "1",
            br#"{"results":[{"Label":"X","temp_f":1,"LastSeen":2,"PM2_5Value":"3"}]}"#,
        )
        .unwrap();
        assert!(reading.valid);
        assert!((reading.pm25 - 3.0).abs() < f64::EPSILON);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn from_payload_never_panics(label in ".*", pm in any::<f64>(), seen in any::<i64>()) {
                let body = payload(json!({ "Label": label, "PM2_5Value": pm.to_string(), "LastSeen": seen }));
                let reading = SensorReading::from_payload("p", &body);
                prop_assert!(reading.pm25.is_finite());
            }
        }
    }
}
