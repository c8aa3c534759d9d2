use pretty_assertions::assert_eq;
use vetclaims_mail::{
    DeliveryOutcome, EmailMessage, MailError, Mailer, MailgunConfig, MailgunMailer, MailgunRegion,
    SimulationReason, UnconfiguredMailer, claim_statement_email, escape_html,
};
use wiremock::matchers::{body_string_contains, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn message() -> EmailMessage {
    EmailMessage {
        to_email: "vet@example.com".to_string(),
        to_name: "Jane Doe".to_string(),
        subject: "Hello".to_string(),
        html_content: "<p>Hi</p>".to_string(),
        from_email: None,
        from_name: None,
    }
}

fn mailer_for(server: &MockServer) -> MailgunMailer {
    MailgunMailer::new(MailgunConfig {
        api_key: "key-test".to_string(),
        domain: "mg.example.com".to_string(),
        api_base_url: Some(server.uri()),
        timeout_secs: 5,
        ..Default::default()
    })
    .unwrap()
}

// ── Config ──────────────────────────────────────────────────────

#[test]
fn region_parsing() {
    assert_eq!(MailgunRegion::from_name("EU"), MailgunRegion::Eu);
    assert_eq!(MailgunRegion::from_name(" eu "), MailgunRegion::Eu);
    assert_eq!(MailgunRegion::from_name("US"), MailgunRegion::Us);
    assert_eq!(MailgunRegion::from_name("anything"), MailgunRegion::Us);
}

#[test]
fn endpoint_follows_region() {
    let mut cfg = MailgunConfig {
        domain: "mg.example.com".to_string(),
        ..Default::default()
    };
    assert_eq!(
        cfg.messages_endpoint(),
        "https://api.mailgun.net/v3/mg.example.com/messages"
    );
    cfg.region = MailgunRegion::Eu;
    assert_eq!(
        cfg.messages_endpoint(),
        "https://api.eu.mailgun.net/v3/mg.example.com/messages"
    );
}

#[test]
fn missing_credentials_rejected() {
    let result = MailgunMailer::new(MailgunConfig::default());
    assert!(matches!(result, Err(MailError::Config(_))));
}

// ── DeliveryOutcome ─────────────────────────────────────────────

#[test]
fn outcome_flags() {
    let delivered = DeliveryOutcome::Delivered {
        message_id: "x".into(),
    };
    let simulated = DeliveryOutcome::Simulated {
        reason: SimulationReason::NotConfigured,
    };
    let failed = DeliveryOutcome::Failed {
        reason: "boom".into(),
    };
    assert!(delivered.is_success() && delivered.is_delivered());
    assert!(simulated.is_success() && !simulated.is_delivered());
    assert!(!failed.is_success() && !failed.is_delivered());
}

#[test]
fn outcome_serializes_with_status_tag() {
    let json = serde_json::to_value(DeliveryOutcome::Simulated {
        reason: SimulationReason::AuthenticationFailed,
    })
    .unwrap();
    assert_eq!(
        json,
        serde_json::json!({"status": "simulated", "reason": "authentication_failed"})
    );
}

// ── Sending ─────────────────────────────────────────────────────

#[tokio::test]
async fn unconfigured_mailer_simulates() {
    let outcome = UnconfiguredMailer.send(&message()).await;
    assert_eq!(
        outcome,
        DeliveryOutcome::Simulated {
            reason: SimulationReason::NotConfigured
        }
    );
}

#[tokio::test]
async fn successful_send_is_delivered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/mg.example.com/messages"))
        .and(header_exists("authorization"))
        .and(body_string_contains("to=vet%40example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "<20261017.1@mg.example.com>",
            "message": "Queued. Thank you."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = mailer_for(&server).send(&message()).await;
    assert_eq!(
        outcome,
        DeliveryOutcome::Delivered {
            message_id: "<20261017.1@mg.example.com>".to_string()
        }
    );
}

#[tokio::test]
async fn sender_override_is_used() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("dev%40example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "1"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut msg = message();
    msg.from_email = Some("dev@example.com".to_string());
    msg.from_name = Some("Dev".to_string());
    assert!(mailer_for(&server).send(&msg).await.is_delivered());
}

#[tokio::test]
async fn unauthorized_falls_back_to_simulated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Forbidden"))
        .mount(&server)
        .await;

    let outcome = mailer_for(&server).send(&message()).await;
    assert_eq!(
        outcome,
        DeliveryOutcome::Simulated {
            reason: SimulationReason::AuthenticationFailed
        }
    );
}

#[tokio::test]
async fn server_error_is_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let outcome = mailer_for(&server).send(&message()).await;
    assert!(matches!(outcome, DeliveryOutcome::Failed { ref reason } if reason.contains("500")));
}

#[tokio::test]
async fn unreachable_provider_is_failed() {
    // bind then release a port so nothing is listening there
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mailer = MailgunMailer::new(MailgunConfig {
        api_key: "key-test".to_string(),
        domain: "mg.example.com".to_string(),
        api_base_url: Some(format!("http://{addr}")),
        timeout_secs: 5,
        ..Default::default()
    })
    .unwrap();
    let outcome = mailer.send(&message()).await;
    assert!(matches!(outcome, DeliveryOutcome::Failed { .. }));
}

#[tokio::test]
async fn missing_id_in_response_still_delivered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let outcome = mailer_for(&server).send(&message()).await;
    assert_eq!(
        outcome,
        DeliveryOutcome::Delivered {
            message_id: "mailgun-sent".to_string()
        }
    );
}

// ── Message bodies ──────────────────────────────────────────────

#[test]
fn escape_html_escapes_markup() {
    assert_eq!(
        escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
        "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
    );
}

#[test]
fn claim_email_escapes_statement() {
    let msg = claim_statement_email("vet@example.com", "Jane", "Line one\n<script>x</script>");
    assert_eq!(msg.to_email, "vet@example.com");
    assert_eq!(msg.to_name, "Jane");
    assert!(msg.html_content.contains("Line one<br>"));
    assert!(msg.html_content.contains("&lt;script&gt;"));
    assert!(!msg.html_content.contains("<script>"));
}
