//! Transactional email delivery.
//!
//! Sending never raises: every attempt resolves to a `DeliveryOutcome`, which
//! tells the caller whether the message really went out (`Delivered`), was
//! skipped while the service keeps working (`Simulated`), or failed.

mod mailer;
mod mailgun;
mod message;

pub use mailer::{DeliveryOutcome, Mailer, SimulationReason, UnconfiguredMailer};
pub use mailgun::{MailError, MailgunConfig, MailgunMailer, MailgunRegion};
pub use message::{EmailMessage, claim_statement_email, escape_html};
