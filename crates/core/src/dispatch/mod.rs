//! Report Dispatcher: validates a report submission, packages the artifact and hands it
//! to a [`MailTransport`]. Exactly one transport call per submission, no retries.

pub mod smtp;

use crate::error::{DashboardError, Result};
use crate::report::ReportArtifact;
use secrecy::SecretString;
use std::time::Duration;

pub const DEFAULT_SUBJECT: &str = "NASDAQ Dashboard Report";
pub const DEFAULT_BODY: &str = "Hi, here is your dashboard chart summary attached.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    Attachment {
        filename: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

/// A fully assembled outbound message. The credential travels with it only for the
/// duration of the transport call.
#[derive(Debug)]
pub struct OutboundReport {
    pub sender: String,
    pub credential: SecretString,
    pub recipient: String,
    pub subject: String,
    pub parts: Vec<ContentPart>,
}

#[async_trait::async_trait]
pub trait MailTransport: Send + Sync {
    fn transport_name(&self) -> &'static str;

    async fn send(&self, message: OutboundReport) -> anyhow::Result<()>;
}

/// What the user typed into the report form.
#[derive(Debug)]
pub struct ReportForm {
    pub sender: String,
    pub credential: SecretString,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl ReportForm {
    pub fn new(
        sender: impl Into<String>,
        credential: SecretString,
        recipient: impl Into<String>,
        subject: Option<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            credential,
            recipient: recipient.into(),
            subject: subject
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            body: DEFAULT_BODY.to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        use secrecy::ExposeSecret;

        let recipient = self.recipient.trim();
        if recipient.is_empty() {
            return Err(DashboardError::validation(
                "recipient",
                "recipient address is required",
            ));
        }
        if !recipient.contains('@') {
            return Err(DashboardError::validation(
                "recipient",
                format!("{recipient:?} is not an email address"),
            ));
        }
        if self.credential.expose_secret().is_empty() {
            return Err(DashboardError::validation(
                "credential",
                "sender password is required",
            ));
        }
        Ok(())
    }

    fn into_outbound(self, artifact: ReportArtifact) -> OutboundReport {
        let filename = artifact.filename().to_string();
        let content_type = artifact.content_type().to_string();
        OutboundReport {
            sender: self.sender.trim().to_string(),
            credential: self.credential,
            recipient: self.recipient.trim().to_string(),
            subject: self.subject,
            parts: vec![
                ContentPart::Text(self.body),
                ContentPart::Attachment {
                    filename,
                    content_type,
                    bytes: artifact.into_bytes(),
                },
            ],
        }
    }
}

/// Sends `artifact` to the form's recipient through `transport`, waiting at most `timeout`.
///
/// Validation failures never reach the transport. Any transport failure, including
/// expiry of `timeout`, comes back as [`DashboardError::Dispatch`].
pub async fn dispatch_report(
    transport: &dyn MailTransport,
    form: ReportForm,
    artifact: ReportArtifact,
    timeout: Duration,
) -> Result<()> {
    form.validate()?;

    let message = form.into_outbound(artifact);
    let recipient = message.recipient.clone();
    let transport_name = transport.transport_name();

    match tokio::time::timeout(timeout, transport.send(message)).await {
        Ok(Ok(())) => {
            tracing::info!(transport = transport_name, %recipient, "report email sent");
            Ok(())
        }
        Ok(Err(err)) => {
            tracing::warn!(transport = transport_name, %recipient, error = %err, "report email failed");
            Err(DashboardError::Dispatch(format!("{err:#}")))
        }
        Err(_) => {
            tracing::warn!(transport = transport_name, %recipient, ?timeout, "report email timed out");
            Err(DashboardError::Dispatch(format!(
                "mail transport did not respond within {}s",
                timeout.as_secs_f64()
            )))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingTransport;
    use super::*;
    use crate::aggregate::mean_by_exchange;
    use crate::domain::listing::NumericColumn;
    use crate::ingest::fixture_dataset;
    use crate::report::{render_bar_chart, ChartLabels};
    use secrecy::ExposeSecret;

    fn artifact() -> ReportArtifact {
        let agg = mean_by_exchange(fixture_dataset(), NumericColumn::RoundLotSize).unwrap();
        render_bar_chart(&agg, &ChartLabels::round_lot_report()).unwrap()
    }

    fn form(recipient: &str, password: &str) -> ReportForm {
        ReportForm::new(
            "me@example.com",
            SecretString::from(password.to_string()),
            recipient,
            None,
        )
    }

    #[tokio::test]
    async fn sends_text_and_png_attachment_once() {
        let transport = RecordingTransport::default();
        let art = artifact();
        let expected = art.bytes().to_vec();

        dispatch_report(&transport, form("you@example.com", "pw"), art, Duration::from_secs(5))
            .await
            .unwrap();

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let msg = &sent[0];
        assert_eq!(msg.recipient, "you@example.com");
        assert_eq!(msg.subject, DEFAULT_SUBJECT);
        assert_eq!(msg.credential.expose_secret(), "pw");
        assert_eq!(msg.parts[0], ContentPart::Text(DEFAULT_BODY.to_string()));
        match &msg.parts[1] {
            ContentPart::Attachment {
                content_type,
                bytes,
                ..
            } => {
                assert_eq!(content_type, "image/png");
                assert_eq!(bytes, &expected);
            }
            other => panic!("unexpected part {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_recipient_never_reaches_transport() {
        let transport = RecordingTransport::default();
        let err = dispatch_report(
            &transport,
            form("not-an-email", "pw"),
            artifact(),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            DashboardError::Validation {
                field: "recipient",
                ..
            }
        ));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn empty_recipient_and_password_are_rejected() {
        let transport = RecordingTransport::default();
        let err = dispatch_report(&transport, form("  ", "pw"), artifact(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::Validation { field: "recipient", .. }));

        let err = dispatch_report(&transport, form("a@b.c", ""), artifact(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::Validation { field: "credential", .. }));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn transport_failure_becomes_dispatch_error_with_reason() {
        let transport = RecordingTransport::failing("535 authentication rejected");
        let err = dispatch_report(&transport, form("a@b.c", "pw"), artifact(), Duration::from_secs(5))
            .await
            .unwrap_err();

        match err {
            DashboardError::Dispatch(msg) => assert!(msg.contains("535 authentication rejected")),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn stalled_transport_times_out_as_dispatch_error() {
        let transport = RecordingTransport {
            stall: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        let err = dispatch_report(
            &transport,
            form("a@b.c", "pw"),
            artifact(),
            Duration::from_millis(20),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DashboardError::Dispatch(_)));
    }

    #[test]
    fn blank_subject_falls_back_to_default() {
        let f = ReportForm::new("a@b.c", SecretString::from("x".to_string()), "c@d.e", Some(" ".into()));
        assert_eq!(f.subject, DEFAULT_SUBJECT);
        let f = ReportForm::new("a@b.c", SecretString::from("x".to_string()), "c@d.e", Some("Weekly".into()));
        assert_eq!(f.subject, "Weekly");
    }

    #[test]
    fn credential_is_redacted_in_debug_output() {
        let f = form("a@b.c", "hunter2");
        assert!(!format!("{f:?}").contains("hunter2"));
    }
}
