use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::SmtpConfig;

/// Outbound email seam. Handlers depend on this trait so tests can swap in
/// a fake without a live SMTP server.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)?
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .port(cfg.port)
            .timeout(Some(Duration::from_secs(10)))
            .build();
        let from = cfg.from.parse::<Mailbox>()?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        self.transport.send(email).await?;
        info!(to = %to, subject = %subject, "email sent");
        Ok(())
    }
}

fn lifecycle_link(base_url: &str, path: &str, token: &str) -> String {
    format!("{}/{}/{}", base_url.trim_end_matches('/'), path, token)
}

/// Subject and body for the account-verification email.
pub fn verification_email(base_url: &str, token: &str, ttl_minutes: i64) -> (String, String) {
    let link = lifecycle_link(base_url, "verify-account", token);
    let subject = "Verify your Inkwell account".to_string();
    let body = format!(
        "Welcome to Inkwell!\n\
        \n\
        Please verify your account by following this link:\n\
        \n\
        {link}\n\
        \n\
        The link expires in {ttl_minutes} minutes.\n\
        \n\
        The Inkwell Team"
    );
    (subject, body)
}

/// Subject and body for the password-reset email.
pub fn reset_email(base_url: &str, token: &str, ttl_minutes: i64) -> (String, String) {
    let link = lifecycle_link(base_url, "reset-password", token);
    let subject = "Reset your Inkwell password".to_string();
    let body = format!(
        "We received a request to reset your Inkwell password.\n\
        \n\
        You can choose a new password by following this link:\n\
        \n\
        {link}\n\
        \n\
        The link expires in {ttl_minutes} minutes. If you did not request a\n\
        reset you can safely ignore this email.\n\
        \n\
        The Inkwell Team"
    );
    (subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_link_embeds_token() {
        let (subject, body) = verification_email("http://localhost:3000", "abc123", 10);
        assert!(subject.contains("Verify"));
        assert!(body.contains("http://localhost:3000/verify-account/abc123"));
        assert!(body.contains("10 minutes"));
    }

    #[test]
    fn reset_link_embeds_token_and_trims_slash() {
        let (_, body) = reset_email("https://blog.example.com/", "deadbeef", 10);
        assert!(body.contains("https://blog.example.com/reset-password/deadbeef"));
    }
}
