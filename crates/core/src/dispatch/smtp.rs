use crate::config::Settings;
use crate::dispatch::{ContentPart, MailTransport, OutboundReport};
use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use std::time::Duration;

/// Authenticated SMTP delivery, one connection per message.
#[derive(Debug, Clone)]
pub struct SmtpMailTransport {
    host: String,
    port: u16,
    starttls: bool,
    timeout: Duration,
}

impl SmtpMailTransport {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            host: settings.smtp_host.clone(),
            port: settings.smtp_port,
            starttls: settings.smtp_starttls,
            timeout: settings.dispatch_timeout,
        }
    }

    fn mailer(&self, credentials: Credentials) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let builder = if self.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host)
        }
        .with_context(|| format!("failed to configure SMTP relay {}", self.host))?;

        Ok(builder
            .port(self.port)
            .credentials(credentials)
            .timeout(Some(self.timeout))
            .build())
    }
}

#[async_trait::async_trait]
impl MailTransport for SmtpMailTransport {
    fn transport_name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, report: OutboundReport) -> Result<()> {
        let message = build_message(&report)?;
        let credentials = Credentials::new(
            report.sender.clone(),
            report.credential.expose_secret().to_string(),
        );
        let mailer = self.mailer(credentials)?;

        mailer
            .send(message)
            .await
            .with_context(|| format!("SMTP delivery via {}:{} failed", self.host, self.port))?;

        tracing::debug!(host = %self.host, "SMTP server accepted message");
        Ok(())
    }
}

pub fn build_message(report: &OutboundReport) -> Result<Message> {
    let from: Mailbox = report
        .sender
        .parse()
        .with_context(|| format!("invalid sender address {:?}", report.sender))?;
    let to: Mailbox = report
        .recipient
        .parse()
        .with_context(|| format!("invalid recipient address {:?}", report.recipient))?;

    let mut parts = report.parts.iter().map(single_part);
    let first = parts.next().context("message has no content parts")??;
    let mut body = MultiPart::mixed().singlepart(first);
    for part in parts {
        body = body.singlepart(part?);
    }

    Message::builder()
        .from(from)
        .to(to)
        .subject(report.subject.clone())
        .multipart(body)
        .context("failed to assemble report email")
}

fn single_part(part: &ContentPart) -> Result<SinglePart> {
    match part {
        ContentPart::Text(text) => Ok(SinglePart::plain(text.clone())),
        ContentPart::Attachment {
            filename,
            content_type,
            bytes,
        } => {
            let ct = ContentType::parse(content_type)
                .map_err(|_| anyhow::anyhow!("invalid attachment content type {content_type:?}"))?;
            Ok(Attachment::new(filename.clone()).body(bytes.clone(), ct))
        }
    }
}
