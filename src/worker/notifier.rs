//! Outbound notifications.

use std::future::Future;
use std::time::Duration;

use lettre::address::AddressError;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::config::MailConfig;
use crate::worker::event::SignupEvent;

pub const WELCOME_SUBJECT: &str = "Welcome!";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("missing mail setting {0}")]
    Config(&'static str),

    #[error("invalid address: {0}")]
    Address(#[from] AddressError),

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("send did not complete within {0:?}")]
    Timeout(Duration),
}

/// Delivers the side effect for one event.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, event: &SignupEvent) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// Render the welcome mail for `event`.
pub fn welcome_message(from: &Mailbox, event: &SignupEvent) -> Result<Message, NotifyError> {
    let to = Mailbox::new(Some(event.name.clone()), event.email.parse::<Address>()?);
    let message = Message::builder()
        .from(from.clone())
        .to(to)
        .subject(WELCOME_SUBJECT)
        .header(ContentType::TEXT_PLAIN)
        .body(format!("Hello {},\n\nWelcome to our service!", event.name))?;
    Ok(message)
}

/// Sender mailbox: `from` when configured, otherwise the SMTP account name.
pub fn sender_mailbox(config: &MailConfig) -> Result<Mailbox, NotifyError> {
    let sender = config
        .from
        .as_deref()
        .filter(|from| !from.trim().is_empty())
        .or(config.username.as_deref())
        .ok_or(NotifyError::Config("SMTP_FROM"))?;
    Ok(sender.trim().parse::<Mailbox>()?)
}

/// Sends mail through an authenticated STARTTLS relay.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    timeout: Duration,
}

impl SmtpNotifier {
    pub fn from_config(config: &MailConfig) -> Result<Self, NotifyError> {
        let host = config.host.as_deref().ok_or(NotifyError::Config("SMTP_HOST"))?;
        let username = config
            .username
            .as_deref()
            .ok_or(NotifyError::Config("SMTP_USER"))?;
        let password = config
            .password
            .as_deref()
            .ok_or(NotifyError::Config("SMTP_PASSWORD"))?;
        let from = sender_mailbox(config)?;
        let timeout = Duration::from_secs(config.timeout_secs);

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            .port(config.port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .timeout(Some(timeout))
            .build();

        Ok(Self {
            transport,
            from,
            timeout,
        })
    }
}

impl Notifier for SmtpNotifier {
    async fn notify(&self, event: &SignupEvent) -> Result<(), NotifyError> {
        let message = welcome_message(&self.from, event)?;

        // socket timeouts alone do not bound the whole SMTP dialogue
        match tokio::time::timeout(self.timeout, self.transport.send(message)).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => Err(NotifyError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welcome_message_has_subject_and_greeting() {
        let from: Mailbox = "noreply@example.com".parse().unwrap();
        let message = welcome_message(&from, &SignupEvent::new("a@x.com", "A")).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: Welcome!"));
        assert!(raw.contains("a@x.com"));
        assert!(raw.contains("Hello A,"));
    }

    #[test]
    fn bad_recipient_is_rejected() {
        let from: Mailbox = "noreply@example.com".parse().unwrap();
        let err = welcome_message(&from, &SignupEvent::new("not-an-address", "A")).unwrap_err();
        assert!(matches!(err, NotifyError::Address(_)));
    }

    #[test]
    fn missing_credentials_are_reported() {
        let config = MailConfig {
            host: Some("smtp.example.com".into()),
            ..MailConfig::default()
        };
        assert!(matches!(
            SmtpNotifier::from_config(&config),
            Err(NotifyError::Config("SMTP_USER"))
        ));
    }

    fn mail(username: &str, from: Option<&str>) -> MailConfig {
        MailConfig {
            host: Some("smtp.example.com".to_string()),
            username: Some(username.to_string()),
            from: from.map(str::to_string),
            password: Some("secret".to_string()),
            ..MailConfig::default()
        }
    }

    #[test]
    fn sender_defaults_to_account_name() {
        let sender = sender_mailbox(&mail("noreply@example.com", None)).unwrap();
        assert_eq!(sender.email.to_string(), "noreply@example.com");
    }

    #[test]
    fn explicit_sender_allows_non_address_account() {
        assert!(matches!(
            sender_mailbox(&mail("apikey", None)),
            Err(NotifyError::Address(_))
        ));

        let sender = sender_mailbox(&mail("apikey", Some("Signup <hello@example.com>"))).unwrap();
        assert_eq!(sender.email.to_string(), "hello@example.com");
        assert_eq!(sender.name.as_deref(), Some("Signup"));
    }
}
