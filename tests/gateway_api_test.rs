//! Gateway API Integration Tests

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use quick_xml::{events::Event, Reader};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt; // For `oneshot`
use voice_gateway::config::Config;
use voice_gateway::domain::call_events::{CallEventSink, CallStatusEvent, RecordingStatusEvent};
use voice_gateway::domain::call_history::{CallHistoryProvider, CallRecord};
use voice_gateway::domain::directory::{ClientDirectory, StaticDirectory};
use voice_gateway::domain::shared::{DomainError, Identity, Result};
use voice_gateway::infrastructure::twilio::{AccessTokenIssuer, RequestValidator, SIGNATURE_HEADER};
use voice_gateway::interface::api::{build_router, init_metrics, AppState, Authorizer};

const PLATFORM_NUMBER: &str = "+15559999999";
const AUTH_TOKEN: &str = "account-secret";

/// Call history double returning a fixed number of records
struct FakeHistory {
    count: usize,
    fail: bool,
}

#[async_trait]
impl CallHistoryProvider for FakeHistory {
    async fn recent_calls(&self, _limit: usize) -> Result<Vec<CallRecord>> {
        if self.fail {
            return Err(DomainError::Upstream("Authenticate (HTTP 401)".to_string()));
        }
        Ok((0..self.count)
            .map(|i| CallRecord {
                sid: format!("CA{:032}", i),
                from: Some("client:alice".to_string()),
                to: Some("+15551234567".to_string()),
                status: Some("completed".to_string()),
                direction: Some("outbound-dial".to_string()),
                duration: Some(30),
                start_time: None,
                end_time: None,
                date_created: None,
                price: None,
                price_unit: Some("USD".to_string()),
            })
            .collect())
    }
}

/// Event sink double remembering what it received
#[derive(Default)]
struct RecordingSink {
    fail: bool,
    call_events: Mutex<Vec<CallStatusEvent>>,
    recording_events: Mutex<Vec<RecordingStatusEvent>>,
}

#[async_trait]
impl CallEventSink for RecordingSink {
    async fn call_status(&self, event: &CallStatusEvent) -> Result<()> {
        self.call_events.lock().unwrap().push(event.clone());
        if self.fail {
            return Err(DomainError::Internal("sink offline".to_string()));
        }
        Ok(())
    }

    async fn recording_status(&self, event: &RecordingStatusEvent) -> Result<()> {
        self.recording_events.lock().unwrap().push(event.clone());
        if self.fail {
            return Err(DomainError::Internal("sink offline".to_string()));
        }
        Ok(())
    }
}

struct BrokenDirectory;

/// Accepts callers presenting a fixed `x-gateway-key` header
struct GatewayKeyAuthorizer;

impl Authorizer for GatewayKeyAuthorizer {
    fn authorize(&self, headers: &HeaderMap) -> Result<()> {
        match headers.get("x-gateway-key").and_then(|v| v.to_str().ok()) {
            Some("open-sesame") => Ok(()),
            _ => Err(DomainError::Unauthorized("missing gateway key".to_string())),
        }
    }
}

impl ClientDirectory for BrokenDirectory {
    fn resolve_inbound(&self, _called: Option<&str>) -> Result<Identity> {
        Err(DomainError::Internal("directory unavailable".to_string()))
    }
}

fn config_with(extra: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = [
        ("TWILIO_ACCOUNT_SID", "AC00000000000000000000000000000000"),
        ("TWILIO_AUTH_TOKEN", AUTH_TOKEN),
        ("TWILIO_PHONE_NUMBER", PLATFORM_NUMBER),
        ("TWILIO_TWIML_APP_SID", "AP00000000000000000000000000000000"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    for (key, value) in extra {
        vars.insert(key.to_string(), value.to_string());
    }

    Config::from_vars(vars).unwrap()
}

struct TestApp {
    router: Router,
    sink: Arc<RecordingSink>,
}

fn build_app(
    config: Config,
    history: FakeHistory,
    sink: RecordingSink,
    directory: Arc<dyn ClientDirectory>,
) -> TestApp {
    let sink = Arc::new(sink);
    let issuer = AccessTokenIssuer::new(&config.twilio, config.gateway.token_ttl_secs);
    let state = AppState::new(
        config,
        Arc::new(issuer),
        Arc::new(history),
        sink.clone(),
        directory,
    );

    TestApp {
        router: build_router(state, init_metrics()),
        sink,
    }
}

fn setup(config: Config) -> TestApp {
    build_app(
        config,
        FakeHistory {
            count: 3,
            fail: false,
        },
        RecordingSink::default(),
        Arc::new(StaticDirectory::new("browser-client")),
    )
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, String, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

fn form_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn json_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Parse a call-control document, returning element names in order
fn parse_document(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    let mut names = Vec::new();
    loop {
        match reader.read_event().expect("call-control document should parse") {
            Event::Start(e) | Event::Empty(e) => {
                names.push(String::from_utf8(e.name().as_ref().to_vec()).unwrap())
            }
            Event::Eof => break,
            _ => {}
        }
    }
    assert_eq!(names.first().map(String::as_str), Some("Response"));
    names
}

#[tokio::test]
async fn test_voice_dials_destination_with_caller_id_and_recording() {
    let app = setup(config_with(&[]));

    let (status, content_type, body) =
        send(&app.router, form_request("/api/voice", "To=%2B15551234567")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.starts_with("text/xml"));
    assert!(body.contains("<Number>+15551234567</Number>"));
    assert!(body.contains("callerId=\"+15559999999\""));
    assert!(body.contains("record=\"record-from-answer-dual\""));
    assert!(body.contains("recordingStatusCallback=\"/api/recording-status\""));
    assert_eq!(parse_document(&body), vec!["Response", "Dial", "Number"]);
}

#[tokio::test]
async fn test_voice_dials_browser_client() {
    let app = setup(config_with(&[]));

    let (status, _, body) = send(&app.router, form_request("/api/voice", "To=client%3Abob")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<Client>bob</Client>"));
}

#[tokio::test]
async fn test_voice_without_destination_returns_apology() {
    let app = setup(config_with(&[]));

    let (status, content_type, body) = send(&app.router, form_request("/api/voice", "")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.starts_with("text/xml"));
    assert_eq!(parse_document(&body), vec!["Response", "Say"]);
}

#[tokio::test]
async fn test_voice_with_malformed_body_returns_valid_document() {
    let app = setup(config_with(&[]));

    let request = Request::builder()
        .method("POST")
        .uri("/api/voice")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(vec![0xff, 0xfe, b'{', b'%', b'&']))
        .unwrap();
    let (status, _, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    parse_document(&body);
}

#[tokio::test]
async fn test_voice_without_platform_number_returns_apology() {
    let app = setup(config_with(&[("TWILIO_PHONE_NUMBER", "")]));

    let (status, _, body) =
        send(&app.router, form_request("/api/voice", "To=%2B15551234567")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("<Dial"));
    assert_eq!(parse_document(&body), vec!["Response", "Say"]);
}

#[tokio::test]
async fn test_voice_escapes_hostile_destination() {
    let app = setup(config_with(&[]));

    let (status, _, body) = send(
        &app.router,
        form_request("/api/voice", "To=%3C%2FClient%3E%3CHangup%2F%3E"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("<Hangup/>"));
    assert_eq!(parse_document(&body), vec!["Response", "Dial", "Client"]);
}

#[tokio::test]
async fn test_voice_dials_bare_identity_as_client() {
    let app = setup(config_with(&[]));

    let (status, _, body) = send(&app.router, form_request("/api/voice", "To=alice")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<Client>alice</Client>"));
    assert!(!body.contains("<Number>"));
    assert_eq!(parse_document(&body), vec!["Response", "Dial", "Client"]);
}

#[tokio::test]
async fn test_incoming_rings_browser_client() {
    let app = setup(config_with(&[]));

    let (status, content_type, body) = send(
        &app.router,
        form_request("/api/incoming", "From=%2B15550001111&To=%2B15559999999"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.starts_with("text/xml"));
    assert!(body.contains("<Client>browser-client</Client>"));
    assert_eq!(parse_document(&body), vec!["Response", "Dial", "Client"]);
}

#[tokio::test]
async fn test_incoming_directory_failure_returns_apology() {
    let app = build_app(
        config_with(&[]),
        FakeHistory {
            count: 0,
            fail: false,
        },
        RecordingSink::default(),
        Arc::new(BrokenDirectory),
    );

    let (status, _, body) = send(&app.router, form_request("/api/incoming", "")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_document(&body), vec!["Response", "Say"]);
}

#[tokio::test]
async fn test_call_status_acknowledges_partial_payload() {
    let app = setup(config_with(&[]));

    let (status, _, body) = send(
        &app.router,
        form_request("/api/call-status", "CallSid=CA123&CallStatus=completed"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());

    let events = app.sink.call_events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].call_sid.as_deref(), Some("CA123"));
    assert_eq!(events[0].call_status.as_deref(), Some("completed"));
    assert!(events[0].call_duration.is_none());
}

#[tokio::test]
async fn test_call_status_is_idempotent_for_retries() {
    let app = setup(config_with(&[]));
    let payload = "CallSid=CA123&CallStatus=completed&From=client%3Aalice&To=%2B15551234567&CallDuration=12";

    for _ in 0..2 {
        let (status, _, _) = send(&app.router, form_request("/api/call-status", payload)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let events = app.sink.call_events.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], events[1]);
}

#[tokio::test]
async fn test_recording_status_acknowledges() {
    let app = setup(config_with(&[]));

    let (status, _, body) = send(
        &app.router,
        form_request(
            "/api/recording-status",
            "RecordingSid=RE123&RecordingUrl=https%3A%2F%2Fapi.twilio.com%2Frecordings%2FRE123",
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());

    let events = app.sink.recording_events.lock().unwrap();
    assert_eq!(events[0].recording_sid.as_deref(), Some("RE123"));
    assert_eq!(
        events[0].recording_url.as_deref(),
        Some("https://api.twilio.com/recordings/RE123")
    );
}

#[tokio::test]
async fn test_callbacks_acknowledge_when_sink_fails() {
    let app = build_app(
        config_with(&[]),
        FakeHistory {
            count: 0,
            fail: false,
        },
        RecordingSink {
            fail: true,
            ..Default::default()
        },
        Arc::new(StaticDirectory::new("browser-client")),
    );

    let (status, _, _) = send(&app.router, form_request("/api/call-status", "")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&app.router, form_request("/api/recording-status", "garbage&&==")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_token_without_body_generates_identity() {
    let app = setup(config_with(&[]));

    let request = Request::builder()
        .method("POST")
        .uri("/api/token")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    let identity = json["identity"].as_str().unwrap();
    let token = json["token"].as_str().unwrap();

    assert!(identity.starts_with("user_"));
    assert!(!token.is_empty());
    assert_eq!(token.split('.').count(), 3);
}

#[tokio::test]
async fn test_token_with_requested_identity() {
    let app = setup(config_with(&[]));

    let (status, _, body) =
        send(&app.router, json_request("/api/token", r#"{"identity":"alice"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["identity"], "alice");
}

#[tokio::test]
async fn test_token_signing_misconfigured() {
    let app = setup(config_with(&[("TWILIO_AUTH_TOKEN", "")]));

    let (status, content_type, body) = send(&app.router, json_request("/api/token", "{}")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(content_type.starts_with("application/json"));
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["error"], "Failed to generate token");
    assert!(json["message"].as_str().unwrap().contains("not configured"));
}

#[tokio::test]
async fn test_token_error_detail_hidden_in_production() {
    let app = setup(config_with(&[
        ("TWILIO_TWIML_APP_SID", ""),
        ("APP_ENV", "production"),
    ]));

    let (status, _, body) = send(&app.router, json_request("/api/token", "{}")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["error"], "Failed to generate token");
    assert_eq!(json["message"], "Internal server error");
    assert!(!body.contains(AUTH_TOKEN));
}

#[tokio::test]
async fn test_health_reports_configured() {
    let app = setup(config_with(&[]));

    let (status, _, body) = send(&app.router, get_request("/api/health")).await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["configured"], true);
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_health_reports_missing_configuration() {
    let app = setup(config_with(&[("TWILIO_TWIML_APP_SID", "")]));

    let (status, _, body) = send(&app.router, get_request("/api/health")).await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["configured"], false);
}

#[tokio::test]
async fn test_call_history_is_capped_and_normalized() {
    let app = build_app(
        config_with(&[]),
        FakeHistory {
            count: 30,
            fail: false,
        },
        RecordingSink::default(),
        Arc::new(StaticDirectory::new("browser-client")),
    );

    let (status, _, body) = send(&app.router, get_request("/api/call-history")).await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    let calls = json.as_array().unwrap();
    assert_eq!(calls.len(), 20);
    for call in calls {
        for key in ["sid", "from", "to", "status", "duration", "startTime", "endTime"] {
            assert!(call.get(key).is_some(), "missing {}", key);
        }
    }
}

#[tokio::test]
async fn test_call_history_upstream_failure() {
    let app = build_app(
        config_with(&[]),
        FakeHistory {
            count: 0,
            fail: true,
        },
        RecordingSink::default(),
        Arc::new(StaticDirectory::new("browser-client")),
    );

    let (status, _, body) = send(&app.router, get_request("/api/call-history")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["error"], "Failed to fetch call history");
    assert!(json["message"].as_str().unwrap().contains("Authenticate"));
}

#[tokio::test]
async fn test_bearer_token_guards_caller_endpoints() {
    let app = setup(config_with(&[("API_AUTH_TOKEN", "let-me-in")]));

    let (status, _, body) = send(&app.router, json_request("/api/token", "{}")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["error"], "Unauthorized");

    let (status, _, _) = send(&app.router, get_request("/api/call-history")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("POST")
        .uri("/api/token")
        .header(header::AUTHORIZATION, "Bearer let-me-in")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);

    // Health and provider webhooks are not behind the bearer token
    let (status, _, _) = send(&app.router, get_request("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(&app.router, form_request("/api/call-status", "")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_webhook_signature_verification() {
    let app = setup(config_with(&[(
        "WEBHOOK_BASE_URL",
        "https://gateway.example.com",
    )]));

    let (status, _, _) = send(&app.router, form_request("/api/voice", "To=%2B15551234567")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let validator = RequestValidator::new(AUTH_TOKEN);
    let signature = validator.compute_signature(
        "https://gateway.example.com/api/voice",
        &[("To".to_string(), "+15551234567".to_string())],
    )
    .unwrap();

    let mut request = form_request("/api/voice", "To=%2B15551234567");
    request
        .headers_mut()
        .insert(SIGNATURE_HEADER, signature.parse().unwrap());
    let (status, _, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<Number>+15551234567</Number>"));
    assert!(body.contains(
        "recordingStatusCallback=\"https://gateway.example.com/api/recording-status\""
    ));

    let mut forged = form_request("/api/voice", "To=%2B15550000000");
    forged
        .headers_mut()
        .insert(SIGNATURE_HEADER, signature.parse().unwrap());
    let (status, _, _) = send(&app.router, forged).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup(config_with(&[]));

    send(&app.router, form_request("/api/voice", "To=%2B15551234567")).await;
    let (status, content_type, body) = send(&app.router, get_request("/api/metrics")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.starts_with("text/plain"));
    assert!(body.contains("voice_webhooks_total"));
}

#[tokio::test]
async fn test_static_frontend_is_served() {
    let app = setup(config_with(&[]));

    let (status, content_type, body) = send(&app.router, get_request("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.starts_with("text/html"));
    assert!(body.contains("/api/token"));
    // The page forwards an API token when the server requires one
    assert!(body.contains("id=\"apiToken\""));
    assert!(body.contains("'Authorization'"));
    assert!(body.contains("'Bearer '"));
}

#[tokio::test]
async fn test_voice_without_recording() {
    let app = setup(config_with(&[("RECORD_OUTBOUND_CALLS", "false")]));

    let (status, _, body) =
        send(&app.router, form_request("/api/voice", "To=%2B15551234567")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<Number>+15551234567</Number>"));
    assert!(!body.contains("record="));
    assert!(!body.contains("recordingStatusCallback"));
}

#[tokio::test]
async fn test_custom_authorizer_guards_caller_endpoints() {
    let config = config_with(&[]);
    let issuer = AccessTokenIssuer::new(&config.twilio, config.gateway.token_ttl_secs);
    let state = AppState::new(
        config,
        Arc::new(issuer),
        Arc::new(FakeHistory {
            count: 1,
            fail: false,
        }),
        Arc::new(RecordingSink::default()),
        Arc::new(StaticDirectory::new("browser-client")),
    )
    .with_authorizer(Arc::new(GatewayKeyAuthorizer));
    let router = build_router(state, init_metrics());

    let (status, _, _) = send(&router, get_request("/api/call-history")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/call-history")
        .header("x-gateway-key", "open-sesame")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);

    // Health stays public
    let (status, _, _) = send(&router, get_request("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
}
