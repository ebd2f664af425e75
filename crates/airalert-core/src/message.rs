//! Rendering of alert, recovery and status emails.
//!
//! Templates are plain strings with two tokens:
//!
//! - `$LEVEL_STRING`: the configured label for the AQI category
//! - `$AQI`: the representative AQI rounded to an integer
//!
//! After the template comes one block per sensor in batch order:
//!
//! ```text
//! Location: Roof
//! Last sampled: 2020-09-10 08:15:02
//! AQI: 187
//! ```

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use airalert_types::SensorReading;

use crate::aqi::{AqiCategory, calc_aqi};
use crate::engine::AlertDecision;

/// Subject of alert and recovery messages.
pub const ALERT_SUBJECT: &str = "Air Quality Alert";
/// Subject of the daily digest.
pub const STATUS_SUBJECT: &str = "Daily Air Quality Summary";

const SUMMARY_HEADER: &str = "A summary of the sensor data follows:\n\n";
const LEVEL_TOKEN: &str = "$LEVEL_STRING";
const AQI_TOKEN: &str = "$AQI";

/// Body templates for the three message kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageTemplates {
    /// Sent when air quality crosses above the threshold.
    pub unhealthy: String,
    /// Sent when air quality has recovered.
    pub normal: String,
    /// Daily digest.
    pub status: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            unhealthy: "An unhealthy AQI has been detected in the immediate vicinity.\n\
                Sensitive groups should stay indoors and use masks or respirators.\n\
                Others should limit their outdoor activities and consider using PPE.\n\n\
                Current level: $LEVEL_STRING (AQI $AQI)\n\n"
                .to_string(),
            normal: "The air quality has returned to safe or moderately safe levels.\n\n\
                Current level: $LEVEL_STRING (AQI $AQI)\n\n"
                .to_string(),
            status: "Good morning, here is your daily air quality summary.\n\n\
                Current level: $LEVEL_STRING (AQI $AQI)\n\n"
                .to_string(),
        }
    }
}

/// Level labels substituted for `$LEVEL_STRING`, one per AQI category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityLabels {
    pub good: String,
    pub moderate: String,
    /// Unhealthy for sensitive groups.
    pub unhealthy_s: String,
    pub unhealthy: String,
    /// Very unhealthy.
    pub unhealthy_v: String,
    pub hazardous: String,
}

impl Default for QualityLabels {
    fn default() -> Self {
        let label = |category: AqiCategory| category.description().to_string();
        Self {
            good: label(AqiCategory::Good),
            moderate: label(AqiCategory::Moderate),
            unhealthy_s: label(AqiCategory::UnhealthyForSensitiveGroups),
            unhealthy: label(AqiCategory::Unhealthy),
            unhealthy_v: label(AqiCategory::VeryUnhealthy),
            hazardous: label(AqiCategory::Hazardous),
        }
    }
}

impl QualityLabels {
    /// Label for a category.
    pub fn label(&self, category: AqiCategory) -> &str {
        match category {
            AqiCategory::Good => &self.good,
            AqiCategory::Moderate => &self.moderate,
            AqiCategory::UnhealthyForSensitiveGroups => &self.unhealthy_s,
            AqiCategory::Unhealthy => &self.unhealthy,
            AqiCategory::VeryUnhealthy => &self.unhealthy_v,
            AqiCategory::Hazardous => &self.hazardous,
        }
    }
}

/// A fully rendered email, ready for a [`crate::Notifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub to: Vec<String>,
    pub from: String,
    pub subject: String,
    pub body: String,
}

/// Turns decisions into messages.
#[derive(Debug, Clone)]
pub struct Renderer {
    templates: MessageTemplates,
    labels: QualityLabels,
    sender: String,
    recipients: Vec<String>,
    offset: UtcOffset,
}

impl Renderer {
    /// Create a renderer. Timestamps are shown in UTC until
    /// [`Renderer::with_offset`] is used.
    pub fn new(
        templates: MessageTemplates,
        labels: QualityLabels,
        sender: impl Into<String>,
        recipients: Vec<String>,
    ) -> Self {
        Self {
            templates,
            labels,
            sender: sender.into(),
            recipients,
            offset: UtcOffset::UTC,
        }
    }

    /// Show "Last sampled" times in the given offset.
    #[must_use]
    pub fn with_offset(mut self, offset: UtcOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Render a decision with the batch it was made from.
    ///
    /// Returns `None` for [`AlertDecision::NoAction`].
    pub fn render(
        &self,
        decision: &AlertDecision,
        readings: &[SensorReading],
    ) -> Option<OutgoingMessage> {
        self.render_in(decision, readings, self.offset)
    }

    /// Like [`Renderer::render`], with "Last sampled" times shown in `offset`.
    pub fn render_in(
        &self,
        decision: &AlertDecision,
        readings: &[SensorReading],
        offset: UtcOffset,
    ) -> Option<OutgoingMessage> {
        let (template, subject, with_header, aqi) = match *decision {
            AlertDecision::NoAction => return None,
            AlertDecision::RaiseAlert(aqi) => (&self.templates.unhealthy, ALERT_SUBJECT, true, aqi),
            AlertDecision::ClearAlert(aqi) => (&self.templates.normal, ALERT_SUBJECT, true, aqi),
            AlertDecision::StatusDigest(aqi) => (&self.templates.status, STATUS_SUBJECT, false, aqi),
        };

        let mut body = self.fill(template, aqi);
        if with_header {
            body.push_str(SUMMARY_HEADER);
        }
        body.push_str(&self.sensor_summary(readings, offset));

        Some(OutgoingMessage {
            to: self.recipients.clone(),
            from: self.sender.clone(),
            subject: subject.to_string(),
            body,
        })
    }

    fn fill(&self, template: &str, aqi: f64) -> String {
        // Label and number must describe the same value.
        let rounded = aqi.round();
        let level = self.labels.label(AqiCategory::from_aqi(rounded));
        template
            .replace(LEVEL_TOKEN, level)
            .replace(AQI_TOKEN, &format!("{}", rounded as i64))
    }

    fn sensor_summary(&self, readings: &[SensorReading], offset: UtcOffset) -> String {
        readings
            .iter()
            .map(|reading| {
                format!(
                    "Location: {}\nLast sampled: {}\nAQI: {}\n\n",
                    reading.label,
                    format_last_seen(reading.last_seen, offset),
                    calc_aqi(reading.pm25) as i64
                )
            })
            .collect()
    }

}

fn format_last_seen(unix_secs: i64, offset: UtcOffset) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    OffsetDateTime::from_unix_timestamp(unix_secs)
        .ok()
        .and_then(|ts| ts.to_offset(offset).format(format).ok())
        .unwrap_or_else(|| unix_secs.to_string())
}
