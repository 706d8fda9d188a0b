// ============================
// crates/backend-lib/src/notify.rs
// ============================
//! Out-of-band notification (email) abstraction.
//!
//! The core only supplies addressing and content; delivery is the
//! notifier's problem. The default for local development is
//! `LogNotifier`, which logs the message and reports success.
use crate::config::SmtpSettings;
use crate::error::AppError;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use tracing::info;

/// Message delivery abstraction consumed by the reset flow.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a message or return an error so the caller can record
    /// the failure.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError>;
}

/// Local dev notifier that logs the payload instead of sending mail.
#[derive(Clone, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
        info!(to, subject, body, "email delivery stub");
        Ok(())
    }
}

/// SMTP notifier backed by lettre's blocking transport.
///
/// The transport call runs on the blocking pool; the async caller only
/// awaits the join handle.
#[derive(Clone)]
pub struct SmtpNotifier {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(settings: &SmtpSettings) -> anyhow::Result<Self> {
        // Plaintext SMTP to a trusted relay; TLS termination belongs to
        // the deployment, which keeps the dependency tree lean.
        let transport = SmtpTransport::builder_dangerous(&settings.host)
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();
        let from = settings
            .from
            .parse::<Mailbox>()
            .map_err(|err| anyhow::anyhow!("invalid from address: {err}"))?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
        let to = to
            .parse::<Mailbox>()
            .map_err(|err| AppError::Delivery(format!("invalid recipient: {err}")))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|err| AppError::Delivery(err.to_string()))?;

        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&email))
            .await?
            .map_err(|err| AppError::Delivery(err.to_string()))?;

        Ok(())
    }
}
