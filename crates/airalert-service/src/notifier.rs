//! Mail delivery.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use airalert_core::{Notifier, NotifyError, OutgoingMessage};

use crate::config::EmailConfig;

/// Sends messages through an SMTP relay.
///
/// The transport is built once and keeps a connection pool, so consecutive
/// messages reuse the same session when the server allows it.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    /// Build a transport from the mail settings. No connection is made yet.
    pub fn new(config: &EmailConfig) -> Result<Self, NotifyError> {
        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_addr)
                .map_err(|e| NotifyError::Transport(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_addr)
        };

        let mut builder = builder.port(config.smtp_port);
        if config.login_required {
            builder = builder.credentials(Credentials::new(
                config.email_addr.clone(),
                config.email_pw.clone(),
            ));
        }

        debug!(
            "SMTP transport for {}:{} (tls: {}, login: {})",
            config.smtp_addr, config.smtp_port, config.use_tls, config.login_required
        );
        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), NotifyError> {
        let email = build_message(message)?;
        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// Logs messages instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), NotifyError> {
        info!(
            "[dry run] would send \"{}\" from {} to {}:\n{}",
            message.subject,
            message.from,
            message.to.join(", "),
            message.body
        );
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.parse().map_err(|e: lettre::address::AddressError| NotifyError::Address {
        address: address.to_string(),
        message: e.to_string(),
    })
}

/// Assemble a plain-text email.
fn build_message(message: &OutgoingMessage) -> Result<Message, NotifyError> {
    let mut builder = Message::builder()
        .from(parse_mailbox(&message.from)?)
        .subject(message.subject.clone())
        .header(ContentType::TEXT_PLAIN);
    for to in &message.to {
        builder = builder.to(parse_mailbox(to)?);
    }
    builder
        .body(message.body.clone())
        .map_err(|e| NotifyError::Build(e.to_string()))
}
