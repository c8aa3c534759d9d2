//! Outbound message type and the built-in message bodies.

use serde::{Deserialize, Serialize};

/// A single outbound email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub html_content: String,
    /// Overrides the mailer's default sender address.
    #[serde(default)]
    pub from_email: Option<String>,
    /// Overrides the mailer's default sender name.
    #[serde(default)]
    pub from_name: Option<String>,
}

/// Escapes text for inclusion in HTML element content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Builds the "your claim statement is ready" email.
pub fn claim_statement_email(to_email: &str, name: &str, claim_statement: &str) -> EmailMessage {
    let body = escape_html(claim_statement).replace('\n', "<br>\n");
    let html_content = format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Your VA Disability Claim Statement</title></head>\n\
         <body>\n<p>Dear {},</p>\n<p>Your claim statement is ready:</p>\n<div>{}</div>\n</body>\n</html>\n",
        escape_html(name),
        body
    );

    EmailMessage {
        to_email: to_email.to_string(),
        to_name: name.to_string(),
        subject: "Your VA Disability Claim Statement is Ready".to_string(),
        html_content,
        from_email: None,
        from_name: None,
    }
}
