use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;
use vetclaims_crypto::{EncryptionService, generate_random_key};
use vetclaims_identity::{
    AuthenticatedUser, DisabledIdentityProvider, IdentityError, IdentityProvider, IdentityResult,
};
use vetclaims_mail::{DeliveryOutcome, EmailMessage, Mailer, SimulationReason, UnconfiguredMailer};
use vetclaims_profile::ProfileService;
use vetclaims_server::{AppState, ErrorBody, HealthResponse, ProfileResponse, build_router};
use vetclaims_storage::SqliteProfileStore;
use vetclaims_types::ProfileId;

struct SingleUserIdentity {
    token: &'static str,
    id: ProfileId,
}

#[async_trait]
impl IdentityProvider for SingleUserIdentity {
    fn provider_name(&self) -> &'static str {
        "test"
    }

    async fn verify(&self, token: &str) -> IdentityResult<AuthenticatedUser> {
        if token == self.token {
            Ok(AuthenticatedUser {
                id: self.id,
                email: None,
            })
        } else {
            Err(IdentityError::Rejected { status: 401 })
        }
    }
}

struct FixedMailer(DeliveryOutcome);

#[async_trait]
impl Mailer for FixedMailer {
    fn provider_name(&self) -> &'static str {
        "fixed"
    }

    async fn send(&self, _message: &EmailMessage) -> DeliveryOutcome {
        self.0.clone()
    }
}

fn test_state(identity: Arc<dyn IdentityProvider>, mailer: Arc<dyn Mailer>) -> Arc<AppState> {
    let store = SqliteProfileStore::open_in_memory().unwrap();
    let cipher = EncryptionService::from_key(generate_random_key());
    Arc::new(AppState {
        profiles: ProfileService::new(Arc::new(store), Arc::new(cipher), identity),
        mailer,
    })
}

/// Spin up the HTTP server on an OS-assigned port, returning the base URL.
async fn spawn_server_with(state: Arc<AppState>) -> String {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}", port)
}

async fn spawn_test_server() -> String {
    spawn_server_with(test_state(
        Arc::new(DisabledIdentityProvider),
        Arc::new(UnconfiguredMailer),
    ))
    .await
}

fn profile_body(email: &str) -> Value {
    json!({
        "email": email,
        "first_name": "Jane",
        "last_name": "Doe",
        "phone": "555-0100",
        "military_service": { "branch": "Army", "years": 6 },
        "claim_info": null
    })
}

async fn post(base: &str, path: &str, body: &Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}{}", base, path))
        .json(body)
        .send()
        .await
        .unwrap()
}

// ── Health / routing ────────────────────────────────────────────

#[tokio::test]
async fn health_endpoint_reports_healthy() {
    let base = spawn_test_server().await;
    let resp = reqwest::get(format!("{}/health", base)).await.unwrap();

    assert_eq!(resp.status(), 200);
    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.contains("application/json"));

    let body: HealthResponse = resp.json().await.unwrap();
    assert_eq!(body.status, "healthy");
    assert_eq!(body.service, "vets4claims-backend");
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let base = spawn_test_server().await;
    let resp = reqwest::get(format!("{}/api/v1/nonexistent", base))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

// ── Profiles ────────────────────────────────────────────────────

#[tokio::test]
async fn create_then_fetch_profile() {
    let base = spawn_test_server().await;
    let mut body = profile_body("vet@example.com");
    body["ssn"] = json!("123 45 6789");

    let resp = post(&base, "/veteran-profiles", &body).await;
    assert_eq!(resp.status(), 200);
    let created: ProfileResponse = resp.json().await.unwrap();
    assert!(created.success);
    assert_eq!(created.profile.ssn.as_deref(), Some("123-45-6789"));
    assert!(created.profile.fields.claim_info.is_empty());

    let resp = reqwest::get(format!("{}/veteran-profiles/vet@example.com", base))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let raw: Value = resp.json().await.unwrap();
    assert_eq!(raw["success"], true);
    assert_eq!(raw["profile"]["id"], json!(created.profile.id.to_string()));
    assert_eq!(raw["profile"]["ssn"], "123-45-6789");
    assert_eq!(raw["profile"]["military_service"]["years"], 6);
    assert!(raw["profile"].get("ssn_encrypted").is_none());
}

#[tokio::test]
async fn malformed_ssn_is_bad_request() {
    let base = spawn_test_server().await;
    let mut body = profile_body("vet@example.com");
    body["ssn"] = json!("123-45-678");

    let resp = post(&base, "/veteran-profiles", &body).await;
    assert_eq!(resp.status(), 400);
    let err: ErrorBody = resp.json().await.unwrap();
    assert!(err.detail.contains("ssn"));

    let resp = reqwest::get(format!("{}/veteran-profiles/vet@example.com", base))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn missing_profile_returns_detail() {
    let base = spawn_test_server().await;
    let resp = reqwest::get(format!("{}/veteran-profiles/ghost@example.com", base))
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
    let err: ErrorBody = resp.json().await.unwrap();
    assert_eq!(err.detail, "Veteran profile not found");
}

#[tokio::test]
async fn malformed_json_is_unprocessable() {
    let base = spawn_test_server().await;
    let resp = reqwest::Client::new()
        .post(format!("{}/veteran-profiles", base))
        .header("content-type", "application/json")
        .body("{\"email\": ")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 422);
    let err: ErrorBody = resp.json().await.unwrap();
    assert!(!err.detail.is_empty());
}

#[tokio::test]
async fn bearer_token_claims_anonymous_profile() {
    let user = ProfileId::new();
    let base = spawn_server_with(test_state(
        Arc::new(SingleUserIdentity { token: "good", id: user }),
        Arc::new(UnconfiguredMailer),
    ))
    .await;

    let anon: ProfileResponse = post(&base, "/veteran-profiles", &profile_body("vet@example.com"))
        .await
        .json()
        .await
        .unwrap();
    assert_ne!(anon.profile.id, user);
    assert!(!anon.profile.fields.has_signed_up);

    let resp = reqwest::Client::new()
        .post(format!("{}/veteran-profiles", base))
        .bearer_auth("good")
        .json(&profile_body("vet@example.com"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let claimed: ProfileResponse = resp.json().await.unwrap();
    assert_eq!(claimed.profile.id, user);
    assert!(claimed.profile.fields.has_signed_up);
}

#[tokio::test]
async fn rejected_bearer_token_is_anonymous() {
    let user = ProfileId::new();
    let base = spawn_server_with(test_state(
        Arc::new(SingleUserIdentity { token: "good", id: user }),
        Arc::new(UnconfiguredMailer),
    ))
    .await;

    let resp = reqwest::Client::new()
        .post(format!("{}/veteran-profiles", base))
        .bearer_auth("expired")
        .json(&profile_body("vet@example.com"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: ProfileResponse = resp.json().await.unwrap();
    assert_ne!(body.profile.id, user);
}

#[tokio::test]
async fn email_conflict_is_bad_request() {
    let user = ProfileId::new();
    let base = spawn_server_with(test_state(
        Arc::new(SingleUserIdentity { token: "good", id: user }),
        Arc::new(UnconfiguredMailer),
    ))
    .await;
    let client = reqwest::Client::new();

    // the account owns one address, an anonymous record holds another
    client
        .post(format!("{}/veteran-profiles", base))
        .bearer_auth("good")
        .json(&profile_body("owner@example.com"))
        .send()
        .await
        .unwrap();
    post(&base, "/veteran-profiles", &profile_body("vet@example.com")).await;

    let resp = client
        .post(format!("{}/veteran-profiles", base))
        .bearer_auth("good")
        .json(&profile_body("vet@example.com"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let err: ErrorBody = resp.json().await.unwrap();
    assert_eq!(err.detail, "Profile with this email already exists");
}

// ── Status updates ──────────────────────────────────────────────

#[tokio::test]
async fn status_updates_set_flags() {
    let base = spawn_test_server().await;
    post(&base, "/veteran-profiles", &profile_body("vet@example.com")).await;

    let resp = post(
        &base,
        "/update-signup-status",
        &json!({ "email": "vet@example.com", "has_signed_up": true }),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: ProfileResponse = resp.json().await.unwrap();
    assert_eq!(body.message.as_deref(), Some("Status updated successfully"));
    assert!(body.profile.fields.has_signed_up);
    assert!(!body.profile.fields.has_paid);

    let resp = post(
        &base,
        "/update-payment-status",
        &json!({ "email": "vet@example.com", "has_paid": true, "has_signed_up": false }),
    )
    .await;
    let body: ProfileResponse = resp.json().await.unwrap();
    assert_eq!(
        body.message.as_deref(),
        Some("Payment status updated successfully")
    );
    assert!(body.profile.fields.has_paid);
    assert!(body.profile.fields.has_signed_up);
}

#[tokio::test]
async fn status_update_unknown_email_is_404() {
    let base = spawn_test_server().await;
    for path in ["/update-signup-status", "/update-payment-status"] {
        let resp = post(
            &base,
            path,
            &json!({ "email": "ghost@example.com", "has_paid": true }),
        )
        .await;
        assert_eq!(resp.status(), 404);
    }
}

// ── Email ───────────────────────────────────────────────────────

fn email_body() -> Value {
    json!({
        "to_email": "vet@example.com",
        "to_name": "Jane Doe",
        "subject": "Hello",
        "html_content": "<p>Hi</p>"
    })
}

#[tokio::test]
async fn unconfigured_mail_is_simulated() {
    let base = spawn_test_server().await;
    let resp = post(&base, "/send-email", &email_body()).await;

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({ "success": true, "status": "simulated", "reason": "not_configured" })
    );
}

#[tokio::test]
async fn delivered_mail_reports_message_id() {
    let base = spawn_server_with(test_state(
        Arc::new(DisabledIdentityProvider),
        Arc::new(FixedMailer(DeliveryOutcome::Delivered {
            message_id: "<abc@mg>".to_string(),
        })),
    ))
    .await;

    let body: Value = post(&base, "/send-email", &email_body())
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "delivered");
    assert_eq!(body["message_id"], "<abc@mg>");
}

#[tokio::test]
async fn auth_failure_is_still_success() {
    let base = spawn_server_with(test_state(
        Arc::new(DisabledIdentityProvider),
        Arc::new(FixedMailer(DeliveryOutcome::Simulated {
            reason: SimulationReason::AuthenticationFailed,
        })),
    ))
    .await;

    let resp = post(
        &base,
        "/send-claim-email",
        &json!({ "email": "vet@example.com", "name": "Jane", "claim_statement": "I served." }),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["reason"], "authentication_failed");
}

#[tokio::test]
async fn failed_mail_is_bad_gateway() {
    let base = spawn_server_with(test_state(
        Arc::new(DisabledIdentityProvider),
        Arc::new(FixedMailer(DeliveryOutcome::Failed {
            reason: "Mailgun returned HTTP 500".to_string(),
        })),
    ))
    .await;

    let resp = post(&base, "/send-email", &email_body()).await;
    assert_eq!(resp.status(), 502);
    let err: ErrorBody = resp.json().await.unwrap();
    assert!(err.detail.contains("HTTP 500"));
}

#[tokio::test]
async fn claim_email_requires_all_fields() {
    let base = spawn_test_server().await;
    for body in [
        json!({ "email": "", "name": "Jane", "claim_statement": "x" }),
        json!({ "email": "vet@example.com", "name": " ", "claim_statement": "x" }),
        json!({ "email": "vet@example.com", "name": "Jane" }),
    ] {
        let resp = post(&base, "/send-claim-email", &body).await;
        assert_eq!(resp.status(), 400);
        let err: ErrorBody = resp.json().await.unwrap();
        assert_eq!(
            err.detail,
            "Missing required fields: email, name, or claim_statement"
        );
    }
}
