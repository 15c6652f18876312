//! Contact-form mail delivery through an HTTP relay.
//!
//! The relay takes a JSON payload and forwards it as email to the
//! configured admin address; the submitter's address goes into the
//! reply-to header so answering works from any mail client.

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub relay_url: String,
    pub api_token: String,
    pub admin_email: String,
}

/// An incoming contact-form submission.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactMessage {
    /// Field-level validation, reported before anything is sent.
    pub fn validate(&self) -> Result<(), (&'static str, &'static str)> {
        let email_re = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();

        if self.name.trim().is_empty() {
            return Err(("name", "must not be empty"));
        }
        if !email_re.is_match(self.email.trim()) {
            return Err(("email", "must be a valid email address"));
        }
        if self.message.trim().is_empty() {
            return Err(("message", "must not be empty"));
        }
        Ok(())
    }
}

#[derive(Serialize, Debug)]
struct RelayPayload {
    from: String,
    to: String,
    #[serde(rename = "replyTo")]
    reply_to: String,
    subject: String,
    html: String,
}

pub struct Mailer {
    config: MailConfig,
    client: reqwest::Client,
}

impl Mailer {
    pub fn new(config: MailConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Forward a contact-form message to the admin inbox.
    pub async fn send_contact(&self, message: &ContactMessage) -> Result<()> {
        let payload = RelayPayload {
            from: message.email.trim().to_string(),
            to: self.config.admin_email.clone(),
            reply_to: message.email.trim().to_string(),
            subject: format!("New Message from {} via Contact Form", message.name.trim()),
            html: render_contact_email(message),
        };

        let response = self
            .client
            .post(&self.config.relay_url)
            .bearer_auth(&self.config.api_token)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            error!("Failed to relay contact mail: {}", error_text);
            anyhow::bail!("Mail relay failed: {}", error_text);
        }

        info!("Relayed contact mail from {}", payload.reply_to);
        Ok(())
    }
}

/// Render the contact message as a small HTML email. All user-supplied
/// text is escaped before interpolation.
fn render_contact_email(message: &ContactMessage) -> String {
    let name = escape_html(message.name.trim());
    let email = escape_html(message.email.trim());
    let body = escape_html(message.message.trim());
    let year = chrono::Utc::now().format("%Y");

    format!(
        r#"<div style="font-family: Arial, sans-serif; padding: 24px;">
  <h2 style="margin-top: 0;">New contact form message</h2>
  <p><strong>Name:</strong> {name}</p>
  <p><strong>Email:</strong> {email}</p>
  <h3>Message</h3>
  <p style="background: #f3f4f6; padding: 12px; border-radius: 6px;">{body}</p>
  <p style="color: #6b7280; font-size: 12px;">&copy; {year} HoardMap</p>
</div>"#
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> ContactMessage {
        ContactMessage {
            name: "Ravi Babu".to_string(),
            email: "ravi@example.com".to_string(),
            message: "Is the ring road hoarding still available?".to_string(),
        }
    }

    #[test]
    fn accepts_a_well_formed_message() {
        assert!(message().validate().is_ok());
    }

    #[test]
    fn rejects_blank_fields_with_the_field_name() {
        let mut m = message();
        m.name = "  ".to_string();
        assert_eq!(m.validate().unwrap_err().0, "name");

        let mut m = message();
        m.message = String::new();
        assert_eq!(m.validate().unwrap_err().0, "message");
    }

    #[test]
    fn rejects_malformed_email_addresses() {
        for bad in ["ravi", "ravi@", "@example.com", "ravi @example.com", "ravi@example"] {
            let mut m = message();
            m.email = bad.to_string();
            assert_eq!(m.validate().unwrap_err().0, "email", "{bad} should fail");
        }
    }

    #[test]
    fn rendered_email_escapes_user_input() {
        let mut m = message();
        m.message = "<script>alert('x')</script>".to_string();
        let html = render_contact_email(&m);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("Ravi Babu"));
    }
}
