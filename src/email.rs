//! Transactional email through the Resend HTTP API.

use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";
const FROM_ADDRESS: &str = "Superfolio <onboarding@resend.dev>";
/// Resend's sink address; mail sent here is accepted and never delivered.
pub const TEST_RECIPIENT: &str = "delivered@resend.dev";

#[derive(Error, Debug)]
pub enum MailError {
    #[error("email delivery is not configured")]
    NotConfigured,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider answered {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// The welcome mail carrying the verification link.
pub fn verification_email(to: &str, username: &str, verification_url: &str) -> EmailMessage {
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h1 style="color: #0085ff; margin-bottom: 24px;">Welcome to Superfolio!</h1>
  <p style="margin-bottom: 24px; font-size: 16px; line-height: 1.5;">Please verify your email address with the button below.</p>
  <a href="{url}" style="display: inline-block; background-color: #0085ff; color: white; padding: 12px 24px; text-decoration: none; border-radius: 6px; margin-bottom: 24px;">Verify Email Address</a>
  <p style="margin-bottom: 12px; font-size: 16px; line-height: 1.5;">Your profile will be available at <strong>superfolio.me/{username}</strong></p>
  <p style="margin-bottom: 8px; color: #666; font-size: 14px;">If the button does not work, paste this address into your browser:</p>
  <p style="color: #666; font-size: 14px; word-break: break-all;">{url}</p>
</div>"#,
        url = verification_url,
        username = username,
    );

    EmailMessage {
        from: FROM_ADDRESS.to_string(),
        to: to.to_string(),
        subject: "Welcome to Superfolio - Verify your email".to_string(),
        html,
        tags: vec![Tag {
            name: "type".into(),
            value: "verification".into(),
        }],
    }
}

pub fn test_email() -> EmailMessage {
    EmailMessage {
        from: FROM_ADDRESS.to_string(),
        to: TEST_RECIPIENT.to_string(),
        subject: "Test Email".to_string(),
        html: "<p>This is a test email from Superfolio</p>".to_string(),
        tags: Vec::new(),
    }
}

#[derive(Clone)]
pub struct Mailer {
    client: Client,
    api_key: Option<String>,
}

impl Mailer {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Sends `message` and returns the provider's JSON answer.
    pub async fn send(&self, message: &EmailMessage) -> Result<serde_json::Value, MailError> {
        let api_key = self.api_key.as_deref().ok_or(MailError::NotConfigured)?;

        let response = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(api_key)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!("Sent \"{}\" to {}", message.subject, message.to);
        Ok(response.json().await?)
    }

    pub async fn send_verification(
        &self,
        to: &str,
        username: &str,
        verification_url: &str,
    ) -> Result<serde_json::Value, MailError> {
        self.send(&verification_email(to, username, verification_url))
            .await
    }
}
