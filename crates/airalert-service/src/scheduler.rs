//! Poll, alert and digest loops.
//!
//! The daemon runs three tasks:
//!
//! - [`AlertLoop`] polls every sensor on a fixed period, runs the alert
//!   engine, hands notifications to the mailer and persists the new state.
//! - [`DigestLoop`] sleeps until the configured local hour and sends the
//!   daily summary. The hour is resolved in the clock's current offset, so
//!   the digest stays at the same wall-clock time across daylight-saving
//!   changes.
//! - [`crate::Mailer`] owns the notifier and sends whatever the loops hand it.
//!
//! Each cycle builds its own batch and passes it along with its decision, so
//! the loops share nothing but the mailer inbox.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use time::{OffsetDateTime, PrimitiveDateTime, Time};
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, error, info, warn};

use airalert_core::{AlertDecision, AlertEngine, Clock, Evaluation, SensorSource, representative_aqi};
use airalert_store::StateStore;
use airalert_types::SensorReading;

use crate::mailer::MailerHandle;

/// Fetch every sensor concurrently.
///
/// The batch keeps the configured sensor order. Sensors that fail are logged
/// and left out.
pub async fn acquire(source: &dyn SensorSource, sensors: &[String]) -> Vec<SensorReading> {
    let results = join_all(sensors.iter().map(|id| source.fetch(id))).await;

    results
        .into_iter()
        .filter_map(|result| match result {
            Ok(reading) => Some(reading),
            Err(e) => {
                warn!("Dropping sensor {} from this cycle: {}", e.sensor(), e);
                None
            }
        })
        .collect()
}

/// Extra wait added to the early cooldown wake. The timer and the wall clock
/// can disagree slightly, and a wake just short of the deadline is wasted.
const WAKE_SLACK: Duration = Duration::from_secs(1);

/// Longest single sleep of the digest loop. Local-offset changes are picked
/// up at least this often.
const DIGEST_RECHECK: Duration = Duration::from_secs(10 * 60);

/// The next occurrence of `hour:00` local time strictly after `after`.
///
/// Returns `None` if `hour` is not a valid hour of the day.
pub fn next_digest_at(after: OffsetDateTime, hour: u8) -> Option<OffsetDateTime> {
    let at = Time::from_hms(hour, 0, 0).ok()?;
    let today = after.replace_time(at);
    if today > after {
        Some(today)
    } else {
        today.checked_add(time::Duration::DAY)
    }
}

fn until(now: OffsetDateTime, deadline: OffsetDateTime) -> Duration {
    Duration::try_from(deadline - now).unwrap_or(Duration::ZERO)
}

async fn sleep_for(wait: Option<Duration>) {
    match wait {
        Some(wait) => sleep(wait).await,
        None => std::future::pending().await,
    }
}

/// Drives the alert engine.
pub struct AlertLoop {
    engine: AlertEngine,
    store: StateStore,
    source: Arc<dyn SensorSource>,
    clock: Arc<dyn Clock>,
    sensors: Arc<[String]>,
    mailer: MailerHandle,
    // Cooldown deadline we already woke up early for.
    woke_for: Option<i64>,
}

impl AlertLoop {
    /// Create the loop around an engine restored from `store`.
    pub fn new(
        engine: AlertEngine,
        store: StateStore,
        source: Arc<dyn SensorSource>,
        clock: Arc<dyn Clock>,
        sensors: Arc<[String]>,
        mailer: MailerHandle,
    ) -> Self {
        Self {
            engine,
            store,
            source,
            clock,
            sensors,
            mailer,
            woke_for: None,
        }
    }

    /// The engine driven by this loop.
    pub fn engine(&self) -> &AlertEngine {
        &self.engine
    }

    /// Poll every `period` until `stop` flips.
    ///
    /// The first cycle runs immediately. While a recovery notice is held
    /// back, the loop also wakes once when its cooldown ends.
    pub async fn run(mut self, period: Duration, mut stop: watch::Receiver<bool>) {
        info!(
            "Polling {} sensor(s) every {}s",
            self.sensors.len(),
            period.as_secs()
        );

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let early = self.early_wake();
            tokio::select! {
                _ = ticker.tick() => {}
                _ = sleep_for(early) => {
                    self.woke_for = self.engine.state().cooldown_until;
                    debug!("Recovery cooldown over, polling early");
                }
                _ = stop.changed() => break,
            }
            if *stop.borrow() {
                break;
            }

            self.run_cycle().await;
        }

        info!("Alert loop stopped");
    }

    /// Time until the pending cooldown ends, unless already woken for it.
    fn early_wake(&self) -> Option<Duration> {
        let pending = self.engine.state().cooldown_until;
        if pending.is_none() || pending == self.woke_for {
            return None;
        }
        self.engine
            .cooldown_deadline()
            .map(|deadline| until(self.clock.now(), deadline) + WAKE_SLACK)
    }

    /// Run one full cycle: acquire, evaluate, notify, persist.
    ///
    /// Returns `None` when no sensor answered and the cycle was skipped.
    pub async fn run_cycle(&mut self) -> Option<Evaluation> {
        let batch = acquire(self.source.as_ref(), &self.sensors).await;
        self.process(batch).await
    }

    /// One cycle for cron-style use: acquire a single batch, send the digest
    /// first if the local hour is `status_hour`, then run the alert cycle on
    /// the same batch.
    pub async fn run_once(&mut self, status_hour: u8) -> Option<Evaluation> {
        let batch = acquire(self.source.as_ref(), &self.sensors).await;
        if batch.is_empty() {
            warn!("No sensor returned a reading, nothing to do");
            return None;
        }

        if self.clock.now().hour() == status_hour {
            let batch: Arc<[SensorReading]> = batch.clone().into();
            let digest = self.engine.digest(&batch);
            info!(
                "Sending status digest (AQI {:.1})",
                digest.aqi().unwrap_or_default()
            );
            let _ = self.mailer.deliver(digest, batch).await;
        }

        self.process(batch).await
    }

    async fn process(&mut self, batch: Vec<SensorReading>) -> Option<Evaluation> {
        if batch.is_empty() {
            warn!("No sensor returned a reading, skipping cycle");
            return None;
        }

        let evaluation = self.engine.evaluate(&batch, self.clock.now());
        info!(
            "Polled {}/{} sensor(s), AQI {:.1}",
            batch.len(),
            self.sensors.len(),
            evaluation.aqi
        );

        if evaluation.decision.is_notification() {
            // Failures are logged by the mailer; the transition stands.
            let _ = self.mailer.deliver(evaluation.decision, batch.into()).await;
        }

        if let Err(e) = self.store.save(&evaluation.state) {
            error!("Failed to persist alert state: {}", e);
        }

        Some(evaluation)
    }
}

/// Sends the daily status digest.
pub struct DigestLoop {
    source: Arc<dyn SensorSource>,
    clock: Arc<dyn Clock>,
    sensors: Arc<[String]>,
    hour: u8,
    mailer: MailerHandle,
}

impl DigestLoop {
    /// Create a loop firing at `hour:00` local time.
    pub fn new(
        source: Arc<dyn SensorSource>,
        clock: Arc<dyn Clock>,
        sensors: Arc<[String]>,
        hour: u8,
        mailer: MailerHandle,
    ) -> Self {
        Self {
            source,
            clock,
            sensors,
            hour,
            mailer,
        }
    }

    /// Send one digest per day until `stop` flips.
    ///
    /// The loop tracks the local date of the next digest. The exact instant
    /// is recomputed in the clock's current offset on every wake.
    pub async fn run(self, mut stop: watch::Receiver<bool>) {
        let Ok(at) = Time::from_hms(self.hour, 0, 0) else {
            error!("Invalid status hour {}, digest disabled", self.hour);
            return;
        };
        let Some(first) = next_digest_at(self.clock.now(), self.hour) else {
            return;
        };
        info!("Next status digest at {}", first);
        let mut due = first.date();

        loop {
            let now = self.clock.now();
            let next = PrimitiveDateTime::new(due, at).assume_offset(now.offset());

            if now >= next {
                self.send_digest().await;
                let after = self.clock.now().max(next);
                let Some(following) = next_digest_at(after, self.hour) else {
                    break;
                };
                due = following.date();
                info!("Next status digest at {}", following);
                continue;
            }

            tokio::select! {
                _ = sleep(until(now, next).min(DIGEST_RECHECK)) => {}
                _ = stop.changed() => break,
            }
            if *stop.borrow() {
                break;
            }
        }

        info!("Digest loop stopped");
    }

    /// Acquire a fresh batch and send it as the digest.
    ///
    /// Returns the decision that was sent, or `None` if no sensor answered.
    pub async fn send_digest(&self) -> Option<AlertDecision> {
        let batch = acquire(self.source.as_ref(), &self.sensors).await;
        if batch.is_empty() {
            warn!("No sensor returned a reading, skipping status digest");
            return None;
        }

        let decision = AlertDecision::StatusDigest(representative_aqi(&batch));
        info!("Sending status digest (AQI {:.1})", representative_aqi(&batch));
        let _ = self.mailer.deliver(decision, batch.into()).await;
        Some(decision)
    }
}
