//! Alert decision state machine.
//!
//! Each poll cycle reduces its batch of readings to one representative AQI
//! (the worst sensor wins) and compares it with the configured threshold and
//! the current [`AlertState`]:
//!
//! | Current | Cycle | Decision | Next |
//! |---------|-------|----------|------|
//! | Clear | at or below threshold | `NoAction` | Clear |
//! | Clear | above threshold | `RaiseAlert` | Alerting |
//! | Alerting | above threshold | `NoAction` | Alerting |
//! | Alerting | at or below threshold | `NoAction`, cooldown starts | CoolingDown |
//! | CoolingDown | above threshold | `NoAction`, cooldown cancelled | Alerting |
//! | CoolingDown | at or below, deadline not reached | `NoAction` | CoolingDown |
//! | CoolingDown | at or below, deadline reached | `ClearAlert` | Clear |
//!
//! The recovery cooldown is a deadline stored in the state rather than a
//! sleep, so it survives restarts and never stalls the scheduler. With a zero
//! cooldown the recovery notice goes out on the first clear cycle.
//!
//! Status digests are not part of the state machine: [`AlertEngine::digest`]
//! borrows the engine immutably and can never change the alert state.

use std::time::Duration;

use time::OffsetDateTime;
use tracing::{debug, info};

use airalert_types::{AlertState, SensorReading};

use crate::aqi::calc_aqi;

/// Representative AQI of a batch with no readings.
pub const EMPTY_BATCH_AQI: f64 = 0.0;

/// Threshold and cooldown settings for the state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertPolicy {
    /// An AQI strictly above this value is "bad".
    pub threshold: f64,
    /// How long a recovery notice is held after readings drop back down.
    pub cooldown: Duration,
}

impl AlertPolicy {
    /// Create a new policy.
    pub fn new(threshold: f64, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown,
        }
    }

    fn cooldown_secs(&self) -> i64 {
        i64::try_from(self.cooldown.as_secs()).unwrap_or(i64::MAX)
    }
}

/// What to tell recipients after a cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlertDecision {
    /// Nothing to send.
    NoAction,
    /// Air quality crossed above the threshold.
    RaiseAlert(f64),
    /// Air quality has been back at or below the threshold for the cooldown.
    ClearAlert(f64),
    /// Unconditional daily summary.
    StatusDigest(f64),
}

impl AlertDecision {
    /// The AQI carried by the decision, if any.
    pub fn aqi(&self) -> Option<f64> {
        match self {
            AlertDecision::NoAction => None,
            AlertDecision::RaiseAlert(aqi)
            | AlertDecision::ClearAlert(aqi)
            | AlertDecision::StatusDigest(aqi) => Some(*aqi),
        }
    }

    /// Whether the decision results in a message.
    pub fn is_notification(&self) -> bool {
        !matches!(self, AlertDecision::NoAction)
    }

    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            AlertDecision::NoAction => "none",
            AlertDecision::RaiseAlert(_) => "alert",
            AlertDecision::ClearAlert(_) => "recovery",
            AlertDecision::StatusDigest(_) => "status",
        }
    }
}

/// Result of evaluating one batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// Representative AQI of the batch.
    pub aqi: f64,
    /// What to send.
    pub decision: AlertDecision,
    /// State to persist after this cycle.
    pub state: AlertState,
}

/// Maximum AQI across the batch, or [`EMPTY_BATCH_AQI`] for an empty batch.
///
/// Readings are scored whether or not they are marked valid.
pub fn representative_aqi(readings: &[SensorReading]) -> f64 {
    readings
        .iter()
        .map(|reading| calc_aqi(reading.pm25))
        .fold(EMPTY_BATCH_AQI, f64::max)
}

/// Run one step of the state machine.
///
/// Pure: the same readings, policy, state and time always give the same
/// result.
pub fn evaluate(
    readings: &[SensorReading],
    policy: &AlertPolicy,
    state: &AlertState,
    now: OffsetDateTime,
) -> Evaluation {
    let aqi = representative_aqi(readings);
    let now_secs = now.unix_timestamp();
    let mut next = *state;

    let decision = if aqi > policy.threshold {
        next.last_high_aqi = aqi;
        next.cooldown_until = None;
        if state.was_high {
            AlertDecision::NoAction
        } else {
            next.was_high = true;
            next.last_report_time = now_secs;
            AlertDecision::RaiseAlert(aqi)
        }
    } else if !state.was_high {
        next.cooldown_until = None;
        AlertDecision::NoAction
    } else {
        let due = state
            .cooldown_until
            .unwrap_or_else(|| now_secs.saturating_add(policy.cooldown_secs()));
        if now_secs >= due {
            next.was_high = false;
            next.cooldown_until = None;
            AlertDecision::ClearAlert(aqi)
        } else {
            next.cooldown_until = Some(due);
            AlertDecision::NoAction
        }
    };

    Evaluation {
        aqi,
        decision,
        state: next,
    }
}

/// Stateful wrapper around [`evaluate`] that owns the current [`AlertState`].
#[derive(Debug, Clone)]
pub struct AlertEngine {
    policy: AlertPolicy,
    state: AlertState,
}

impl AlertEngine {
    /// Create an engine starting from a previously persisted state.
    pub fn new(policy: AlertPolicy, state: AlertState) -> Self {
        Self { policy, state }
    }

    /// The policy in use.
    pub fn policy(&self) -> &AlertPolicy {
        &self.policy
    }

    /// The current state.
    pub fn state(&self) -> &AlertState {
        &self.state
    }

    /// When the pending recovery notice becomes due, if one is being held.
    pub fn cooldown_deadline(&self) -> Option<OffsetDateTime> {
        self.state
            .cooldown_until
            .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
    }

    /// Evaluate a batch and advance the state.
    pub fn evaluate(&mut self, readings: &[SensorReading], now: OffsetDateTime) -> Evaluation {
        let evaluation = evaluate(readings, &self.policy, &self.state, now);
        let previous = self.state;
        let next = evaluation.state;

        match evaluation.decision {
            AlertDecision::RaiseAlert(aqi) => {
                info!(
                    "AQI {:.1} is above {:.1}, raising alert",
                    aqi, self.policy.threshold
                );
            }
            AlertDecision::ClearAlert(aqi) => {
                info!("AQI {:.1} stayed within range through the cooldown, clearing alert", aqi);
            }
            _ => {
                if previous.cooldown_until.is_none() && next.cooldown_until.is_some() {
                    info!(
                        "AQI {:.1} back within range, holding recovery notice for {}s",
                        evaluation.aqi,
                        self.policy.cooldown.as_secs()
                    );
                } else if previous.cooldown_until.is_some() && next.cooldown_until.is_none() {
                    info!(
                        "AQI {:.1} above threshold again, recovery notice cancelled",
                        evaluation.aqi
                    );
                } else {
                    debug!(
                        "AQI {:.1}, no notification (alerting: {})",
                        evaluation.aqi, next.was_high
                    );
                }
            }
        }

        self.state = next;
        evaluation
    }

    /// Build a status digest for a freshly polled batch.
    pub fn digest(&self, readings: &[SensorReading]) -> AlertDecision {
        AlertDecision::StatusDigest(representative_aqi(readings))
    }
}
