use anyhow::{Context, Result};
use chrono::NaiveDate;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use crate::config::email::EmailConfig;

pub fn digest_subject(date: NaiveDate) -> String {
    format!("Campus digest - {}", date.format("%Y-%m-%d"))
}

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailSender {
    /// STARTTLS relay with login credentials.
    pub fn from_config(cfg: &EmailConfig) -> Result<Self> {
        let from = cfg
            .from
            .parse()
            .with_context(|| format!("invalid EMAIL_FROM {:?}", cfg.from))?;
        let to = cfg
            .to
            .parse()
            .with_context(|| format!("invalid EMAIL_TO {:?}", cfg.to))?;

        let creds = Credentials::new(cfg.from.clone(), cfg.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.smtp_server)
            .with_context(|| format!("invalid EMAIL_SMTP_SERVER {:?}", cfg.smtp_server))?
            .port(cfg.smtp_port)
            .credentials(creds)
            .build();

        Ok(Self { mailer, from, to })
    }

    pub async fn send_report(&self, subject: &str, body: &str) -> Result<()> {
        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        tracing::info!(target: "notify", to = %self.to, "digest email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_carries_date() {
        let d = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(digest_subject(d), "Campus digest - 2026-10-19");
    }

    #[test]
    fn bad_address_is_an_error() {
        let cfg = EmailConfig {
            from: "not an address".into(),
            to: "me@example.com".into(),
            password: "x".into(),
            smtp_server: "smtp.example.com".into(),
            smtp_port: 587,
        };
        assert!(EmailSender::from_config(&cfg).is_err());
    }
}
