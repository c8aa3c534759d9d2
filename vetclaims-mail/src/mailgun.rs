//! Mailgun implementation.
//!
//! Uses the Mailgun Messages API (`POST /v3/{domain}/messages`, form encoded,
//! basic auth `api:<key>`).

use crate::mailer::{DeliveryOutcome, Mailer, SimulationReason};
use crate::message::EmailMessage;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// Errors constructing a mailer.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Mailgun hosting region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MailgunRegion {
    #[default]
    Us,
    Eu,
}

impl MailgunRegion {
    /// Parses a region name; anything other than `EU` is treated as US.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("eu") {
            MailgunRegion::Eu
        } else {
            MailgunRegion::Us
        }
    }

    fn api_base_url(self) -> &'static str {
        match self {
            MailgunRegion::Us => "https://api.mailgun.net",
            MailgunRegion::Eu => "https://api.eu.mailgun.net",
        }
    }
}

/// Mailgun configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailgunConfig {
    pub api_key: String,
    pub domain: String,
    pub region: MailgunRegion,
    pub from_email: String,
    pub from_name: String,
    /// Overrides the region's API host (used by tests).
    pub api_base_url: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for MailgunConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            domain: String::new(),
            region: MailgunRegion::Us,
            from_email: "assistant@mg.vets4claims.com".to_string(),
            from_name: "Vets4Claims Assistant".to_string(),
            api_base_url: None,
            timeout_secs: 30,
        }
    }
}

impl MailgunConfig {
    /// Full URL of the messages endpoint.
    pub fn messages_endpoint(&self) -> String {
        let base = self
            .api_base_url
            .as_deref()
            .unwrap_or_else(|| self.region.api_base_url())
            .trim_end_matches('/');
        format!("{}/v3/{}/messages", base, self.domain)
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: Option<String>,
}

/// Mailgun-backed mailer.
pub struct MailgunMailer {
    config: MailgunConfig,
    client: Client,
}

impl MailgunMailer {
    /// Creates a new mailer. Fails if the API key or domain is empty.
    pub fn new(config: MailgunConfig) -> Result<Self, MailError> {
        if config.api_key.is_empty() || config.domain.is_empty() {
            return Err(MailError::Config(
                "Mailgun API key and domain are required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MailError::Config(format!("failed to create HTTP client: {e}")))?;

        info!(
            "Mailgun configured with domain {} ({:?})",
            config.domain, config.region
        );
        Ok(Self { config, client })
    }

    fn from_header(&self, message: &EmailMessage) -> String {
        format!(
            "{} <{}>",
            message.from_name.as_deref().unwrap_or(&self.config.from_name),
            message.from_email.as_deref().unwrap_or(&self.config.from_email)
        )
    }
}

#[async_trait]
impl Mailer for MailgunMailer {
    fn provider_name(&self) -> &'static str {
        "Mailgun"
    }

    async fn send(&self, message: &EmailMessage) -> DeliveryOutcome {
        let form = [
            ("from", self.from_header(message)),
            ("to", message.to_email.clone()),
            ("subject", message.subject.clone()),
            ("html", message.html_content.clone()),
        ];

        let response = match self
            .client
            .post(self.config.messages_endpoint())
            .basic_auth("api", Some(&self.config.api_key))
            .form(&form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!("Mailgun request to {} failed: {}", message.to_email, e);
                return DeliveryOutcome::Failed {
                    reason: format!("request failed: {e}"),
                };
            }
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!(
                "Mailgun rejected credentials, simulating send to {}",
                message.to_email
            );
            return DeliveryOutcome::Simulated {
                reason: SimulationReason::AuthenticationFailed,
            };
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Mailgun API error: {} - {}", status.as_u16(), body);
            return DeliveryOutcome::Failed {
                reason: format!("Mailgun returned HTTP {}", status.as_u16()),
            };
        }

        let message_id = response
            .json::<SendResponse>()
            .await
            .ok()
            .and_then(|r| r.id)
            .unwrap_or_else(|| "mailgun-sent".to_string());
        info!("Email sent to {}", message.to_email);
        DeliveryOutcome::Delivered { message_id }
    }
}
