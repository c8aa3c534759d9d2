//! HTTP API for the Vets4Claims backend.
//!
//! Routes are thin: they parse the request, hand it to `ProfileService` or
//! the configured `Mailer`, and translate the result into JSON. Errors are
//! always returned as `{"detail": "..."}`.

mod config;
mod error;

pub use config::{Args, build_state};
pub use error::{ApiError, ErrorBody};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, header};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use vetclaims_identity::parse_bearer;
use vetclaims_mail::{DeliveryOutcome, EmailMessage, Mailer, claim_statement_email};
use vetclaims_profile::{ProfileService, ProfileSubmission, ProfileView, StatusUpdate};

/// Shared request state.
pub struct AppState {
    pub profiles: ProfileService,
    pub mailer: Arc<dyn Mailer>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProfileResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub profile: ProfileView,
}

impl ProfileResponse {
    fn new(profile: ProfileView) -> Self {
        Self {
            success: true,
            message: None,
            profile,
        }
    }

    fn with_message(profile: ProfileView, message: &str) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
            profile,
        }
    }
}

/// Result of a send: `success` plus the flattened `DeliveryOutcome`.
#[derive(Serialize, Clone, Debug)]
pub struct EmailResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: DeliveryOutcome,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ClaimEmailRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub claim_statement: String,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "vets4claims-backend".to_string(),
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer)
}

async fn upsert_profile_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ProfileSubmission>, JsonRejection>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let Json(submission) = payload?;
    info!("Received veteran profile for {}", submission.fields.email);
    let profile = state
        .profiles
        .upsert(submission, bearer_token(&headers))
        .await?;
    Ok(Json(ProfileResponse::new(profile)))
}

async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<Json<ProfileResponse>, ApiError> {
    info!("Fetching veteran profile for {}", email);
    let profile = state.profiles.get_by_email(&email)?;
    Ok(Json(ProfileResponse::new(profile)))
}

async fn signup_status_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let Json(update) = payload?;
    info!("Updating signup status for {}", update.email);
    let profile = state.profiles.update_status(&update)?;
    Ok(Json(ProfileResponse::with_message(
        profile,
        "Status updated successfully",
    )))
}

async fn payment_status_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let Json(update) = payload?;
    info!("Updating payment status for {}", update.email);
    let profile = state.profiles.update_payment_status(&update)?;
    Ok(Json(ProfileResponse::with_message(
        profile,
        "Payment status updated successfully",
    )))
}

async fn deliver(mailer: &dyn Mailer, message: &EmailMessage) -> Result<Json<EmailResponse>, ApiError> {
    match mailer.send(message).await {
        DeliveryOutcome::Failed { reason } => {
            Err(ApiError::BadGateway(format!("Failed to send email: {reason}")))
        }
        outcome => Ok(Json(EmailResponse {
            success: true,
            outcome,
        })),
    }
}

async fn send_email_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EmailMessage>, JsonRejection>,
) -> Result<Json<EmailResponse>, ApiError> {
    let Json(message) = payload?;
    info!("Sending email to {}", message.to_email);
    deliver(state.mailer.as_ref(), &message).await
}

async fn send_claim_email_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ClaimEmailRequest>, JsonRejection>,
) -> Result<Json<EmailResponse>, ApiError> {
    let Json(request) = payload?;
    if [&request.email, &request.name, &request.claim_statement]
        .iter()
        .any(|field| field.trim().is_empty())
    {
        return Err(ApiError::BadRequest(
            "Missing required fields: email, name, or claim_statement".to_string(),
        ));
    }

    info!("Sending claim statement email to {}", request.email);
    let message = claim_statement_email(&request.email, &request.name, &request.claim_statement);
    deliver(state.mailer.as_ref(), &message).await
}

/// Build the HTTP API router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/veteran-profiles", post(upsert_profile_handler))
        .route("/veteran-profiles/{email}", get(get_profile_handler))
        .route("/update-signup-status", post(signup_status_handler))
        .route("/update-payment-status", post(payment_status_handler))
        .route("/send-email", post(send_email_handler))
        .route("/send-claim-email", post(send_claim_email_handler))
        .with_state(state)
}
