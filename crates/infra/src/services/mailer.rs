use serde::Serialize;
use tracing::info;

/// Template selector understood by the mail gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailTemplate {
    BookingConfirmed,
    BookingCancelled,
    BookingRescheduled,
    CalendarAccountInvalid,
}

/// A rendered-to-be email handed to the mail gateway.
///
/// The gateway owns templating and delivery; we only hand over the template
/// name, its variables and the iCalendar attachment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingEmail {
    pub template: EmailTemplate,
    pub recipients: Vec<String>,
    pub variables: serde_json::Value,
    /// iCalendar object whose UID equals the booking uid
    pub ical_attachment: Option<String>,
}

#[async_trait::async_trait]
pub trait IMailer: Send + Sync {
    async fn send(&self, email: &BookingEmail) -> anyhow::Result<()>;
}

/// Posts emails to the configured HTTP mail gateway
pub struct HttpMailer {
    client: reqwest::Client,
    gateway_url: String,
}

impl HttpMailer {
    pub fn new(gateway_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            gateway_url,
        }
    }
}

#[async_trait::async_trait]
impl IMailer for HttpMailer {
    async fn send(&self, email: &BookingEmail) -> anyhow::Result<()> {
        let res = self
            .client
            .post(&self.gateway_url)
            .json(email)
            .send()
            .await?;
        res.error_for_status()?;
        Ok(())
    }
}

/// Used when no mail gateway is configured; emails only show up in the logs
pub struct LoggingMailer {}

#[async_trait::async_trait]
impl IMailer for LoggingMailer {
    async fn send(&self, email: &BookingEmail) -> anyhow::Result<()> {
        info!(
            "No mail gateway configured, skipping email {:?} to {:?}",
            email.template, email.recipients
        );
        Ok(())
    }
}
