use async_trait::async_trait;
use mail_builder::MessageBuilder;
use mail_send::SmtpClientBuilder;
use tracing::{debug, info};

use crate::config::SmtpConfig;

pub mod templates;

/// Notification sink for transactional email. Behind a trait so tests and
/// local development can run without an SMTP server.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification(&self, to: &str, code: &str) -> anyhow::Result<()>;
    async fn send_welcome(&self, to: &str, name: &str) -> anyhow::Result<()>;
    async fn send_password_reset(&self, to: &str, reset_url: &str) -> anyhow::Result<()>;
    async fn send_reset_success(&self, to: &str) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    async fn send_html(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        let message = MessageBuilder::new()
            .from((
                self.config.from_name.as_str(),
                self.config.from_email.as_str(),
            ))
            .to(to)
            .subject(subject)
            .html_body(html);

        let mut builder = SmtpClientBuilder::new(self.config.host.as_str(), self.config.port)
            .implicit_tls(false);
        if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            builder = builder.credentials((user.as_str(), pass.as_str()));
        }

        let mut client = builder
            .connect()
            .await
            .map_err(|e| anyhow::anyhow!("smtp connect failed: {e}"))?;
        client
            .send(message)
            .await
            .map_err(|e| anyhow::anyhow!("smtp send failed: {e}"))?;

        debug!(to, subject, "email sent");
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_verification(&self, to: &str, code: &str) -> anyhow::Result<()> {
        let html = templates::render(templates::VERIFICATION_TEMPLATE, "{code}", code);
        self.send_html(to, templates::VERIFICATION_SUBJECT, &html)
            .await
    }

    async fn send_welcome(&self, to: &str, name: &str) -> anyhow::Result<()> {
        let html = templates::render(templates::WELCOME_TEMPLATE, "{name}", name);
        self.send_html(to, templates::WELCOME_SUBJECT, &html).await
    }

    async fn send_password_reset(&self, to: &str, reset_url: &str) -> anyhow::Result<()> {
        let html = templates::render(templates::RESET_REQUEST_TEMPLATE, "{reset_url}", reset_url);
        self.send_html(to, templates::RESET_REQUEST_SUBJECT, &html)
            .await
    }

    async fn send_reset_success(&self, to: &str) -> anyhow::Result<()> {
        self.send_html(
            to,
            templates::RESET_SUCCESS_SUBJECT,
            templates::RESET_SUCCESS_TEMPLATE,
        )
        .await
    }
}

/// Drops every message; used by `AppState::fake()` and when email delivery
/// is disabled.
pub struct NullMailer;

#[async_trait]
impl Mailer for NullMailer {
    async fn send_verification(&self, to: &str, _code: &str) -> anyhow::Result<()> {
        info!(to, "email delivery disabled, skipping verification email");
        Ok(())
    }

    async fn send_welcome(&self, to: &str, _name: &str) -> anyhow::Result<()> {
        info!(to, "email delivery disabled, skipping welcome email");
        Ok(())
    }

    async fn send_password_reset(&self, to: &str, _reset_url: &str) -> anyhow::Result<()> {
        info!(to, "email delivery disabled, skipping reset email");
        Ok(())
    }

    async fn send_reset_success(&self, to: &str) -> anyhow::Result<()> {
        info!(to, "email delivery disabled, skipping reset confirmation");
        Ok(())
    }
}
