//! services/api/src/adapters/mail.rs
//!
//! Outbound email adapters implementing the `MailService` port.

use async_trait::async_trait;
use interview_core::ports::{MailService, OutgoingEmail, PortError, PortResult};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Serialize)]
struct SendEmailBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Sends mail through an HTTP email API (Resend-compatible JSON).
#[derive(Clone)]
pub struct HttpMailAdapter {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailAdapter {
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl MailService for HttpMailAdapter {
    async fn send(&self, email: &OutgoingEmail) -> PortResult<()> {
        let body = SendEmailBody {
            from: &self.from,
            to: [email.to.as_str()],
            subject: &email.subject,
            html: &email.html,
        };

        let res = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let detail = res.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "Mail API returned {}: {}",
                status, detail
            )));
        }

        debug!("Sent '{}' to {}", email.subject, email.to);
        Ok(())
    }
}

/// Used when no mail API key is configured: the message is only logged.
#[derive(Clone, Default)]
pub struct LogMailAdapter;

#[async_trait]
impl MailService for LogMailAdapter {
    async fn send(&self, email: &OutgoingEmail) -> PortResult<()> {
        info!(
            to = %email.to,
            subject = %email.subject,
            "Mail delivery disabled; message body follows:\n{}",
            email.html
        );
        Ok(())
    }
}
