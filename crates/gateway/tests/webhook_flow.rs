//! End-to-end webhook tests against the full router with in-memory backends
//! and a canned LLM.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use lq_cache::{Cache, MemoryStore};
use lq_crm::{LeadStore, MemoryLeadStore};
use lq_domain::config::{Config, LlmConfig};
use lq_domain::error::Result;
use lq_providers::{ChatRequest, ChatResponse, LlmProvider, ProviderRegistry};
use lq_gateway::{api, bootstrap};

struct CannedLlm {
    reply: String,
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl LlmProvider for CannedLlm {
    async fn chat(&self, _req: &ChatRequest) -> Result<ChatResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ChatResponse {
            content: self.reply.clone(),
            usage: None,
            model: "canned".into(),
            finish_reason: Some("stop".into()),
        })
    }

    fn provider_id(&self) -> &str {
        "openai"
    }
}

struct Harness {
    app: Router,
    llm: Arc<CannedLlm>,
    leads: Arc<MemoryLeadStore>,
}

fn harness(reply: &str, secret: Option<&str>) -> Harness {
    let llm = Arc::new(CannedLlm {
        reply: reply.into(),
        calls: AtomicUsize::new(0),
    });
    let defaults = LlmConfig::default();
    let providers: HashMap<String, Arc<dyn LlmProvider>> =
        HashMap::from([("openai".to_string(), llm.clone() as Arc<dyn LlmProvider>)]);
    let registry = ProviderRegistry::from_parts(providers, defaults.responder, defaults.extractor);

    let mut config = Config::default();
    config.server.webhook_secret = secret.map(str::to_string);

    let leads = Arc::new(MemoryLeadStore::new());
    let state = bootstrap::assemble(
        Arc::new(config),
        Arc::new(Cache::memory_only(Arc::new(MemoryStore::new()))),
        leads.clone() as Arc<dyn LeadStore>,
        None,
        Arc::new(registry),
    )
    .unwrap();

    Harness {
        app: api::router(state.clone()).with_state(state),
        llm,
        leads,
    }
}

async fn post(app: &Router, body: Value, secret: Option<&str>) -> (StatusCode, Value) {
    let mut req = Request::builder()
        .method("POST")
        .uri("/api/webhook/manychat")
        .header("content-type", "application/json");
    if let Some(s) = secret {
        req = req.header("x-webhook-secret", s);
    }
    let req = req.body(Body::from(body.to_string())).unwrap();
    send(app, req).await
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_reports_memory_cache() {
    let h = harness("unused", None);
    let req = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
    let (status, body) = send(&h.app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["cache"], "memory");
}

#[tokio::test]
async fn normal_turn_returns_reply_path_and_quick_replies() {
    let h = harness("The FBA course fits your budget. [PATH: B]", None);
    let (status, body) = post(
        &h.app,
        json!({"subscriber_id": "555", "message": "I want to start Amazon FBA", "message_id": "m-1"}),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let response = &body["response"];
    assert_eq!(response["reply"], "The FBA course fits your budget.");
    assert_eq!(response["quick_replies"][0], "Watch Video");
    assert_eq!(response["metadata"]["path"], "B");
    assert_eq!(response["metadata"]["session_id"], "local-555");
    assert_eq!(h.llm.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_message_is_greeted_without_llm() {
    let h = harness("unused", None);
    let (status, body) = post(&h.app, json!({"manychat_id": 42, "message": ""}), None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["response"]["reply"].as_str().unwrap().starts_with("Assalamu Alaikum"));
    assert!(body["response"].get("metadata").is_none());
    assert_eq!(h.llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn banned_request_is_refused_without_llm() {
    let h = harness("unused", None);
    let (_, body) = post(
        &h.app,
        json!({"subscriber_id": "7", "message": "Can you source a first copy Rolex?"}),
        None,
    )
    .await;

    assert!(body["response"]["reply"].as_str().unwrap().contains("illegal"));
    assert_eq!(h.llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn redelivered_message_id_is_acknowledged_as_duplicate() {
    let h = harness("Hello! [PATH: E]", None);
    let payload = json!({"subscriber_id": "9", "message": "hi", "message_id": "dup-1"});

    let (_, first) = post(&h.app, payload.clone(), None).await;
    assert!(first.get("response").is_some());

    let (status, second) = post(&h.app, payload, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second, json!({"status": "duplicate"}));
    assert_eq!(h.llm.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_user_id_is_bad_request() {
    let h = harness("unused", None);
    let (status, body) = post(&h.app, json!({"message": "hello"}), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid payload");
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let h = harness("unused", None);
    let req = Request::builder()
        .method("POST")
        .uri("/api/webhook/manychat")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&h.app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid payload");
}

#[tokio::test]
async fn webhook_secret_is_enforced_when_configured() {
    let h = harness("ok [PATH: E]", Some("s3cret"));
    let payload = json!({"subscriber_id": "1", "message": "hi"});

    let (status, _) = post(&h.app, payload.clone(), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = post(&h.app, payload.clone(), Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(h.llm.calls.load(Ordering::SeqCst), 0);

    let (status, body) = post(&h.app, payload, Some("s3cret")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"]["reply"], "ok");
}

#[tokio::test]
async fn contact_info_reaches_the_lead_store() {
    let h = harness("Welcome! [PATH: A]", None);
    post(
        &h.app,
        json!({
            "subscriber_id": "321",
            "message": "I need a supplier in China",
            "contact_info": {"first_name": "Zara", "phone": "+91 98765 43210"}
        }),
        None,
    )
    .await;

    let lead = h.leads.get("321").unwrap();
    assert_eq!(lead.name.as_deref(), Some("Zara"));
    assert_eq!(lead.phone.as_deref(), Some("+919876543210"));
}
