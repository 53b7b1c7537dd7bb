//! Email transports implementing [`BaseEmailService`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use super::{BaseEmailService, OutgoingEmail};
use crate::config::EmailConfig;

/// SMTP delivery over STARTTLS.
pub struct SmtpEmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailService {
    pub fn new(host: &str, config: &EmailConfig) -> Result<Self> {
        let from: Mailbox = config
            .from_address
            .parse()
            .with_context(|| format!("EMAIL_FROM is not a valid mailbox: {}", config.from_address))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .with_context(|| format!("invalid SMTP host: {}", host))?
            .port(config.port);

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl BaseEmailService for SmtpEmailService {
    async fn send_email(&self, email: OutgoingEmail) -> Result<()> {
        let to: Mailbox = email
            .to
            .parse()
            .with_context(|| format!("invalid recipient address: {}", email.to))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                email.text_body,
                email.html_body,
            ))
            .context("failed to build email message")?;

        self.transport
            .send(message)
            .await
            .context("SMTP delivery failed")?;

        info!(to = %email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}

/// Writes emails to the log instead of delivering them. Used when no SMTP host is configured.
#[derive(Default)]
pub struct LogEmailService;

#[async_trait]
impl BaseEmailService for LogEmailService {
    async fn send_email(&self, email: OutgoingEmail) -> Result<()> {
        info!(
            to = %email.to,
            subject = %email.subject,
            body = %email.text_body,
            "email (log backend)"
        );
        Ok(())
    }
}

/// Pick the transport for the given configuration.
pub fn create_email_service(config: &EmailConfig) -> Result<std::sync::Arc<dyn BaseEmailService>> {
    match &config.host {
        Some(host) => Ok(std::sync::Arc::new(SmtpEmailService::new(host, config)?)),
        None => {
            info!("EMAIL_HOST not set, emails will be logged instead of sent");
            Ok(std::sync::Arc::new(LogEmailService))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email_config(host: Option<&str>) -> EmailConfig {
        EmailConfig {
            host: host.map(String::from),
            port: 587,
            username: String::new(),
            password: String::new(),
            from_address: "ALX Travel <noreply@example.com>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_log_backend_accepts_email() {
        let service = create_email_service(&email_config(None)).unwrap();
        let result = service
            .send_email(OutgoingEmail {
                to: "guest@example.com".into(),
                subject: "Hello".into(),
                html_body: "<p>Hi</p>".into(),
                text_body: "Hi".into(),
            })
            .await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_from_address_is_rejected() {
        let mut config = email_config(Some("smtp.example.com"));
        config.from_address = "not an address".into();
        assert!(SmtpEmailService::new("smtp.example.com", &config).is_err());
    }
}
