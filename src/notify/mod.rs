//! Best-effort email delivery.
//!
//! Requests hand an [`Email`] to the [`Notifier`] and move on. A single worker drains a
//! bounded queue and retries each message with linear backoff; nothing it does can fail
//! the request that enqueued the message.

pub mod smtp;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

pub use smtp::SmtpMailer;

use crate::config::NotifyConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl Email {
    /// Verification message pointing at `GET /api/users/verify/:token`
    pub fn verification(to: &str, code: &str, base_url: &str) -> Self {
        let link = format!("{}/api/users/verify/{}", base_url.trim_end_matches('/'), code);
        Self {
            to: to.to_string(),
            subject: "Email Verification".to_string(),
            text: format!("Verify your email address by opening this link: {}", link),
            html: format!(
                "<p>Verify your email address by clicking <a target=\"_blank\" href=\"{}\">here</a>.</p>",
                link
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Mail transport unavailable: {0}")]
    Unavailable(String),
}

/// Outbound mail transport
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl From<&NotifyConfig> for RetryPolicy {
    fn from(config: &NotifyConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: config.backoff(),
        }
    }
}

/// Handle to the delivery queue. Cheap to clone; every clone feeds the same worker.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<Email>,
}

impl Notifier {
    /// Start the delivery worker. The worker exits once every `Notifier` clone is dropped
    /// and the queue has drained.
    pub fn spawn(mailer: Arc<dyn Mailer>, capacity: usize, policy: RetryPolicy) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(deliver_all(rx, mailer, policy));
        (Self { tx }, worker)
    }

    /// Enqueue without waiting. Returns whether the email was accepted.
    pub fn dispatch(&self, email: Email) -> bool {
        match self.tx.try_send(email) {
            Ok(()) => true,
            Err(TrySendError::Full(email)) => {
                tracing::warn!(to = %email.to, subject = %email.subject, "Notification queue full, dropping email");
                false
            }
            Err(TrySendError::Closed(email)) => {
                tracing::warn!(to = %email.to, subject = %email.subject, "Notification worker stopped, dropping email");
                false
            }
        }
    }
}

async fn deliver_all(mut rx: mpsc::Receiver<Email>, mailer: Arc<dyn Mailer>, policy: RetryPolicy) {
    while let Some(email) = rx.recv().await {
        deliver(mailer.as_ref(), &email, policy).await;
    }
    tracing::debug!("Notification worker shutting down");
}

async fn deliver(mailer: &dyn Mailer, email: &Email, policy: RetryPolicy) -> bool {
    for attempt in 1..=policy.max_attempts {
        match mailer.send(email).await {
            Ok(()) => {
                tracing::info!(to = %email.to, subject = %email.subject, attempt, "Email sent successfully");
                return true;
            }
            Err(e) if attempt < policy.max_attempts => {
                tracing::warn!(to = %email.to, attempt, "Email delivery failed, retrying: {}", e);
                tokio::time::sleep(policy.backoff * attempt).await;
            }
            Err(e) => {
                tracing::error!(to = %email.to, attempt, "Email delivery abandoned: {}", e);
            }
        }
    }
    false
}
