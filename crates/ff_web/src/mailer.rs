//! Contact form submissions and their delivery.

use async_trait::async_trait;
use ff_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

pub const DEFAULT_SENDER: &str = "FundFixers <noreply@fundfixers.com>";
pub const DEFAULT_RECIPIENT: &str = "contact@fundfixers.com";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub fraudulent_company: String,
    #[serde(default)]
    pub description: String,
}

impl ContactSubmission {
    /// Labelled rows in the order they appear in the email.
    fn rows(&self) -> [(&'static str, &str); 7] {
        [
            ("Full Name", &self.full_name),
            ("Email", &self.email),
            ("Phone", &self.phone),
            ("Country", &self.country),
            ("Amount Lost", &self.amount),
            ("Fraudulent Company", &self.fraudulent_company),
            ("Description", &self.description),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = self
            .rows()
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(label, _)| *label)
            .collect();
        if !missing.is_empty() {
            return Err(Error::Mail(format!("missing fields: {}", missing.join(", "))));
        }
        if !self.email.contains('@') {
            return Err(Error::Mail(format!("invalid email address: {}", self.email)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

impl ContactEmail {
    pub fn from_submission(submission: &ContactSubmission, recipient: &str) -> Self {
        const CELL: &str = "padding: 10px; border: 1px solid #ddd;";
        let rows: String = submission
            .rows()
            .iter()
            .map(|(label, value)| {
                format!(
                    "<tr><td style=\"{cell} font-weight: bold;\">{}</td><td style=\"{cell}\">{}</td></tr>",
                    label,
                    html_escape::encode_text(value),
                    cell = CELL
                )
            })
            .collect();

        Self {
            from: DEFAULT_SENDER.to_string(),
            to: vec![recipient.to_string()],
            subject: format!(
                "New Contact Form Submission from {}",
                submission.full_name.trim()
            ),
            html: format!(
                "<h1>New Contact Form Submission</h1>\
                 <table style=\"border-collapse: collapse; width: 100%; max-width: 600px;\">{}</table>",
                rows
            ),
        }
    }
}

/// Delivers contact emails. Returns the provider's response payload.
#[async_trait]
pub trait ContactMailer: Send + Sync {
    async fn send(&self, email: &ContactEmail) -> Result<Value>;
}

/// Writes the email to the log instead of sending it.
#[derive(Debug, Default)]
pub struct LoggingMailer;

#[async_trait]
impl ContactMailer for LoggingMailer {
    async fn send(&self, email: &ContactEmail) -> Result<Value> {
        info!(
            to = ?email.to,
            subject = %email.subject,
            "📧 Contact email ({} bytes of HTML)",
            email.html.len()
        );
        Ok(json!({ "delivered": false, "logged": true, "to": email.to }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> ContactSubmission {
        ContactSubmission {
            full_name: "Jane Doe".to_string(),
            phone: "+44 20 7946 0000".to_string(),
            country: "UK".to_string(),
            email: "jane@example.com".to_string(),
            amount: "5000".to_string(),
            fraudulent_company: "Acme <Invest>".to_string(),
            description: "They said \"guaranteed\" & vanished".to_string(),
        }
    }

    #[test]
    fn test_deserialize_camel_case() {
        let parsed: ContactSubmission = serde_json::from_value(json!({
            "fullName": "Jane Doe",
            "phone": "1",
            "country": "UK",
            "email": "jane@example.com",
            "amount": "10",
            "fraudulentCompany": "Acme",
            "description": "text"
        }))
        .unwrap();
        assert_eq!(parsed.fraudulent_company, "Acme");
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        let mut form = submission();
        form.phone = " ".to_string();
        form.description.clear();
        let err = form.validate().unwrap_err().to_string();
        assert!(err.contains("Phone"));
        assert!(err.contains("Description"));

        let mut form = submission();
        form.email = "not-an-email".to_string();
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_email_escapes_values() {
        let email = ContactEmail::from_submission(&submission(), "ops@example.com");
        assert_eq!(email.to, vec!["ops@example.com".to_string()]);
        assert_eq!(email.subject, "New Contact Form Submission from Jane Doe");
        assert!(email.html.contains("Acme &lt;Invest&gt;"));
        assert!(email.html.contains("\"guaranteed\" &amp; vanished"));
        assert!(!email.html.contains("<Invest>"));
        assert!(email.html.contains("Fraudulent Company"));
    }

    #[test]
    fn test_email_cells_cannot_inject_markup() {
        let mut form = submission();
        form.full_name = "<script>alert(1)</script>".to_string();
        form.description = "</td></tr><tr><td>forged".to_string();
        let email = ContactEmail::from_submission(&form, DEFAULT_RECIPIENT);
        assert!(!email.html.contains("<script>"));
        assert!(email.html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(email.html.contains("&lt;/td&gt;&lt;/tr&gt;&lt;tr&gt;&lt;td&gt;forged"));
        assert_eq!(email.html.matches("<tr>").count(), 7);
    }

    #[tokio::test]
    async fn test_logging_mailer() {
        let email = ContactEmail::from_submission(&submission(), DEFAULT_RECIPIENT);
        let response = LoggingMailer.send(&email).await.unwrap();
        assert_eq!(response["logged"], true);
    }
}
