//! The mailer task.
//!
//! The mailer is the only owner of the [`Notifier`]. Alert and digest loops
//! hand it a decision together with the batch it was made from, and get the
//! delivery result back on a oneshot channel. Notices are handled one at a
//! time, in arrival order.
//!
//! Timestamps in a message are shown in the clock's offset at the moment the
//! message is rendered.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use airalert_core::{AlertDecision, Clock, Notifier, NotifyError, Renderer};
use airalert_types::SensorReading;

/// Notices that can wait in the inbox before senders block.
const INBOX_CAPACITY: usize = 16;

/// One decision to turn into mail.
struct Notice {
    decision: AlertDecision,
    batch: Arc<[SensorReading]>,
    ack: oneshot::Sender<Result<(), NotifyError>>,
}

/// Sending side of the mailer inbox.
#[derive(Debug, Clone)]
pub struct MailerHandle {
    tx: mpsc::Sender<Notice>,
}

impl std::fmt::Debug for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notice")
            .field("decision", &self.decision)
            .field("batch", &self.batch.len())
            .finish()
    }
}

impl MailerHandle {
    /// Hand a decision to the mailer and wait until delivery was attempted.
    ///
    /// [`AlertDecision::NoAction`] is accepted and sends nothing.
    pub async fn deliver(
        &self,
        decision: AlertDecision,
        batch: Arc<[SensorReading]>,
    ) -> Result<(), NotifyError> {
        let (ack, done) = oneshot::channel();
        self.tx
            .send(Notice {
                decision,
                batch,
                ack,
            })
            .await
            .map_err(|_| NotifyError::Transport("mailer has shut down".to_string()))?;

        done.await.unwrap_or_else(|_| {
            Err(NotifyError::Transport(
                "mailer stopped before delivery".to_string(),
            ))
        })
    }
}

/// Renders notices and sends them through the notifier.
pub struct Mailer {
    notifier: Arc<dyn Notifier>,
    renderer: Renderer,
    clock: Arc<dyn Clock>,
    inbox: mpsc::Receiver<Notice>,
}

impl Mailer {
    /// Create a mailer and the handle used to reach it.
    pub fn new(
        notifier: Arc<dyn Notifier>,
        renderer: Renderer,
        clock: Arc<dyn Clock>,
    ) -> (Self, MailerHandle) {
        let (tx, inbox) = mpsc::channel(INBOX_CAPACITY);
        let mailer = Self {
            notifier,
            renderer,
            clock,
            inbox,
        };
        (mailer, MailerHandle { tx })
    }

    /// Process notices until every [`MailerHandle`] has been dropped.
    ///
    /// Notices already in the inbox are still delivered after the last
    /// handle goes away.
    pub async fn run(mut self) {
        debug!("Mailer started");
        while let Some(notice) = self.inbox.recv().await {
            let result = self.handle(&notice.decision, &notice.batch).await;
            // The sender may have given up waiting; the result is logged either way.
            let _ = notice.ack.send(result);
        }
        info!("Mailer stopped");
    }

    async fn handle(
        &self,
        decision: &AlertDecision,
        batch: &[SensorReading],
    ) -> Result<(), NotifyError> {
        let offset = self.clock.offset();
        let Some(message) = self.renderer.render_in(decision, batch, offset) else {
            return Ok(());
        };

        match self.notifier.send(&message).await {
            Ok(()) => {
                info!(
                    "Sent {} email \"{}\" to {} recipient(s)",
                    decision.kind(),
                    message.subject,
                    message.to.len()
                );
                Ok(())
            }
            Err(e) => {
                error!("Failed to send {} email: {}", decision.kind(), e);
                Err(e)
            }
        }
    }
}
