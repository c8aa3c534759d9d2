//! Mailer abstraction and the typed delivery result.

use crate::message::EmailMessage;
use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

/// Why a message was not actually sent even though the caller may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationReason {
    /// No mail provider credentials are configured.
    NotConfigured,
    /// The provider rejected our credentials.
    AuthenticationFailed,
}

/// Result of a send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// The provider accepted the message.
    Delivered { message_id: String },
    /// Nothing was sent; degraded but not an error.
    Simulated { reason: SimulationReason },
    /// The send attempt failed.
    Failed { reason: String },
}

impl DeliveryOutcome {
    /// True for `Delivered` and `Simulated`.
    pub fn is_success(&self) -> bool {
        !matches!(self, DeliveryOutcome::Failed { .. })
    }

    /// True only if the message really left the building.
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Abstract mail delivery interface.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Returns the name of the mail provider.
    fn provider_name(&self) -> &'static str;

    /// Attempts to deliver `message`.
    async fn send(&self, message: &EmailMessage) -> DeliveryOutcome;
}

/// Mailer used when no provider is configured. Logs and simulates.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredMailer;

#[async_trait]
impl Mailer for UnconfiguredMailer {
    fn provider_name(&self) -> &'static str {
        "unconfigured"
    }

    async fn send(&self, message: &EmailMessage) -> DeliveryOutcome {
        warn!(
            "Mail provider not configured, simulating send to {} ({})",
            message.to_email, message.subject
        );
        DeliveryOutcome::Simulated {
            reason: SimulationReason::NotConfigured,
        }
    }
}
