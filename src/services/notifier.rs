//! Contact-form notifications
//!
//! Submitting the contact form emails the site owner. Delivery happens on a
//! background worker fed by a bounded queue, so a slow or unreachable SMTP
//! server never holds up the request. Delivery is best-effort: failures are
//! logged and dropped.

use crate::config::{MailConfig, MailTls};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// An email to the site owner about a new contact message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactNotification {
    pub subject: String,
    /// Address of whoever filled in the form
    pub reply_to: String,
    pub body: String,
}

/// Something that can deliver a [`ContactNotification`]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &ContactNotification) -> Result<()>;
}

/// Delivers notifications through an SMTP relay
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpNotifier {
    /// Build the SMTP transport from mail configuration
    pub fn new(config: &MailConfig) -> Result<Self> {
        let builder = match config.tls {
            MailTls::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host),
            MailTls::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host),
        }
        .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?;

        let mut builder = builder
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.timeout_secs)));
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        let from = config
            .from_address()
            .parse()
            .map_err(|e| anyhow!("Invalid from address: {}", e))?;
        let to = config
            .owner()
            .parse()
            .map_err(|e| anyhow!("Invalid owner address: {}", e))?;

        Ok(Self {
            transport: builder.build(),
            from,
            to,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, notification: &ContactNotification) -> Result<()> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(notification.subject.clone())
            .header(ContentType::TEXT_PLAIN);

        match notification.reply_to.parse::<Mailbox>() {
            Ok(reply_to) => builder = builder.reply_to(reply_to),
            Err(e) => tracing::debug!("Omitting Reply-To {:?}: {}", notification.reply_to, e),
        }

        let email = builder
            .body(notification.body.clone())
            .context("Failed to build email")?;

        self.transport
            .send(email)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;

        Ok(())
    }
}

/// Logs notifications instead of sending them; used when SMTP is not configured
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &ContactNotification) -> Result<()> {
        tracing::info!(
            subject = %notification.subject,
            reply_to = %notification.reply_to,
            "Contact notification (mail disabled)"
        );
        Ok(())
    }
}

/// Pick the notifier for the given mail configuration
pub fn notifier_from_config(config: &MailConfig) -> Result<Arc<dyn Notifier>> {
    if config.is_enabled() {
        Ok(Arc::new(SmtpNotifier::new(config)?))
    } else {
        Ok(Arc::new(LogNotifier))
    }
}

/// Handle to the background delivery worker
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<ContactNotification>,
}

impl NotificationQueue {
    /// Start the worker task.
    ///
    /// The worker runs until every queue handle has been dropped and the
    /// queue is drained.
    pub fn spawn(notifier: Arc<dyn Notifier>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<ContactNotification>(capacity.max(1));

        let worker = tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                match notifier.send(&notification).await {
                    Ok(()) => tracing::info!(subject = %notification.subject, "Notification sent"),
                    Err(e) => tracing::warn!("Failed to deliver notification: {:#}", e),
                }
            }
            tracing::debug!("Notification worker stopped");
        });

        (Self { tx }, worker)
    }

    /// Queue a notification without waiting. Returns false when it was dropped.
    pub fn enqueue(&self, notification: ContactNotification) -> bool {
        match self.tx.try_send(notification) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(n)) => {
                tracing::warn!(subject = %n.subject, "Notification queue full, dropping");
                false
            }
            Err(mpsc::error::TrySendError::Closed(n)) => {
                tracing::warn!(subject = %n.subject, "Notification worker gone, dropping");
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Collects every notification it is asked to send
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<ContactNotification>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, notification: &ContactNotification) -> Result<()> {
            self.sent
                .lock()
                .map_err(|_| anyhow!("poisoned"))?
                .push(notification.clone());
            Ok(())
        }
    }

    /// Fails every delivery
    pub struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn send(&self, _notification: &ContactNotification) -> Result<()> {
            Err(anyhow!("smtp unreachable"))
        }
    }
}
