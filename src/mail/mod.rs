//! # Mail
//!
//! Outgoing email. Handlers build an [`Email`] and hand it to [`dispatch`], which
//! delivers it in the background so a slow relay never holds up a request.
//!
//! ## Transports
//! - [`SmtpMailer`]: plain SMTP to a relay
//! - [`LogMailer`]: writes the message to the log, for development

pub mod message;
pub mod notifications;
pub mod smtp;

use async_trait::async_trait;
use log::{error, info};
use std::sync::Arc;

use crate::common::config::{MailConfig, MailTransport};
use crate::common::Result;

pub use message::{escape_html, Email, Mailbox};
pub use notifications::{contact_email, recovery_email};
pub use smtp::SmtpMailer;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<()>;
}

/// Logs messages instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<()> {
        info!(
            "📧 [log transport] {} -> {}: {}\n{}",
            email.from, email.to, email.subject, email.text
        );
        Ok(())
    }
}

/// Build the transport selected in the configuration.
pub fn mailer_from_config(config: &MailConfig) -> Arc<dyn Mailer> {
    match config.transport {
        MailTransport::Log => Arc::new(LogMailer),
        MailTransport::Smtp => Arc::new(SmtpMailer::from_config(config)),
    }
}

/// Send `email` on a background task. Failures are logged, never returned.
pub fn dispatch(mailer: Arc<dyn Mailer>, email: Email) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = mailer.send(&email).await {
            error!("❌ Could not send \"{}\" to {}: {}", email.subject, email.to.address, e);
        }
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::common::CmsError;
    use std::sync::Mutex;

    /// Records every message it is asked to send.
    #[derive(Default)]
    pub(crate) struct RecordingMailer {
        pub(crate) sent: Mutex<Vec<Email>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: &Email) -> Result<()> {
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _email: &Email) -> Result<()> {
            Err(CmsError::Mail("relay down".to_string()))
        }
    }

    fn email() -> Email {
        Email {
            from: Mailbox::new("A", "a@example.com"),
            to: Mailbox::new("B", "b@example.com"),
            subject: "s".to_string(),
            text: "t".to_string(),
            html: "h".to_string(),
        }
    }

    #[tokio::test]
    async fn dispatch_delivers_in_background() {
        let mailer = Arc::new(RecordingMailer::default());
        dispatch(mailer.clone(), email()).await.unwrap();
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn dispatch_swallows_failures() {
        dispatch(Arc::new(FailingMailer), email()).await.unwrap();
    }

    #[test]
    fn transport_selection() {
        let mut config = MailConfig::default();
        // Both constructions must succeed without touching the network
        let _log = mailer_from_config(&config);
        config.transport = MailTransport::Smtp;
        let _smtp = mailer_from_config(&config);
    }
}
