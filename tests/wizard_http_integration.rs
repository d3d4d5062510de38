//! Integration tests for the wizard WebSocket + REST surface.
//!
//! Each test spins up the full Axum app on a random port, then drives it via
//! reqwest and tokio-tungstenite.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use diet_coach::config::ReplyPacing;
use diet_coach::error::{RecipeError, SubmissionError};
use diet_coach::preferences::{PreferencesAck, PreferencesService};
use diet_coach::profile::ProfileStore;
use diet_coach::recipes::{RecipeFull, RecipeImage, RecipeService, RecipeSummary};
use diet_coach::server::{Services, build_app};
use diet_coach::wizard::PersonalInfo;
use diet_coach::wizard::prompts;

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Preferences backend that records calls; can fail or block until released.
#[derive(Default)]
struct StubPreferences {
    calls: AtomicUsize,
    fail_with: Option<String>,
    gate: Option<Arc<Notify>>,
}

#[async_trait]
impl PreferencesService for StubPreferences {
    async fn submit(&self, _profile: &PersonalInfo) -> Result<PreferencesAck, SubmissionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.fail_with {
            Some(message) => Err(SubmissionError::Failed {
                message: message.clone(),
            }),
            None => Ok(PreferencesAck {
                ok: true,
                anon_id: Some("anon-test".to_string()),
                ..Default::default()
            }),
        }
    }
}

/// Recipe backend that is never reached in these tests.
struct NoRecipes;

#[async_trait]
impl RecipeService for NoRecipes {
    async fn recommend(&self, _images: &[RecipeImage]) -> Result<Vec<RecipeSummary>, RecipeError> {
        Err(RecipeError::RequestFailed("offline".to_string()))
    }
    async fn card_full(&self, _id: &str) -> Result<RecipeFull, RecipeError> {
        Err(RecipeError::RequestFailed("offline".to_string()))
    }
    async fn cards_flat(&self, _limit: usize) -> Result<Vec<RecipeSummary>, RecipeError> {
        Ok(Vec::new())
    }
}

struct TestServer {
    base: String,
    ws_base: String,
    preferences: Arc<StubPreferences>,
    store: ProfileStore,
    client: reqwest::Client,
}

impl TestServer {
    async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}{path}", self.base))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{path}", self.base))
            .send()
            .await
            .unwrap()
    }

    async fn create_session(&self) -> String {
        let resp = self.post("/api/wizard/sessions", json!({})).await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }
}

/// Start the app on a random port with immediate reply pacing.
async fn start_server(preferences: StubPreferences) -> TestServer {
    let preferences = Arc::new(preferences);
    let store = ProfileStore::in_memory();
    let services = Services::new(
        preferences.clone(),
        Arc::new(NoRecipes),
        store.clone(),
        ReplyPacing::immediate(),
    );
    let app = build_app(&services, &[]);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        base: format!("http://127.0.0.1:{port}"),
        ws_base: format!("ws://127.0.0.1:{port}"),
        preferences,
        store,
        client: reqwest::Client::new(),
    }
}

/// Parse a WS text frame into a serde_json::Value.
fn parse_ws_json(msg: &Message) -> Value {
    match msg {
        Message::Text(txt) => serde_json::from_str(txt).expect("invalid JSON from server"),
        other => panic!("expected Text frame, got {:?}", other),
    }
}

/// Answer every question up to (not including) the confirmation.
async fn answer_all(server: &TestServer, id: &str, sex: &str, answers: [&str; 3], diet: &str) {
    let resp = server
        .post(
            &format!("/api/wizard/sessions/{id}/select"),
            json!({"kind": "sex", "value": sex}),
        )
        .await;
    assert_eq!(resp.status(), 200);
    for text in answers {
        let resp = server
            .post(
                &format!("/api/wizard/sessions/{id}/message"),
                json!({ "text": text }),
            )
            .await;
        assert_eq!(resp.status(), 200);
    }
    let resp = server
        .post(
            &format!("/api/wizard/sessions/{id}/message"),
            json!({ "text": diet }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["step"], "awaiting_confirmation");
}

// ── REST Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn rest_health_endpoint() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(StubPreferences::default()).await;
        let resp = server.get("/health").await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn full_wizard_submits_once() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(StubPreferences::default()).await;
        let id = server.create_session().await;

        answer_all(&server, &id, "male", ["29", "170", "65.5"], "균형식").await;
        let resp = server
            .post(
                &format!("/api/wizard/sessions/{id}/select"),
                json!({"kind": "confirm", "value": "yes"}),
            )
            .await;
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["step"], "completed");

        let resp = server
            .post(&format!("/api/wizard/sessions/{id}/finalize"), json!({}))
            .await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["next"], "/recipes");
        assert_eq!(
            body["profile"],
            json!({
                "sex": "남성",
                "age": 29,
                "heightCm": 170.0,
                "weightKg": 65.5,
                "diet": "균형식"
            })
        );
        assert_eq!(server.preferences.calls.load(Ordering::SeqCst), 1);
        assert_eq!(server.store.get().await.unwrap().age, 29);

        let body: Value = server.get("/api/profile/next").await.json().await.unwrap();
        assert_eq!(body["next"], "/recipes");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn invalid_age_keeps_step() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(StubPreferences::default()).await;
        let id = server.create_session().await;

        server
            .post(
                &format!("/api/wizard/sessions/{id}/select"),
                json!({"kind": "sex", "value": "female"}),
            )
            .await;
        let resp = server
            .post(
                &format!("/api/wizard/sessions/{id}/message"),
                json!({"text": "150"}),
            )
            .await;
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["step"], "awaiting_age");
        assert!(body["profile"]["age"].is_null());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn finalize_before_confirmation_is_conflict() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(StubPreferences::default()).await;
        let id = server.create_session().await;

        answer_all(&server, &id, "male", ["29", "170", "65.5"], "균형식").await;
        let resp = server
            .post(&format!("/api/wizard/sessions/{id}/finalize"), json!({}))
            .await;
        assert_eq!(resp.status(), 409);
        assert_eq!(server.preferences.calls.load(Ordering::SeqCst), 0);
        assert!(server.store.get().await.is_none());

        let body: Value = server
            .get(&format!("/api/wizard/sessions/{id}"))
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(body["step"], "awaiting_confirmation");
        assert_eq!(body["submission"], "idle");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn negative_confirmation_then_finalize_is_rejected() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(StubPreferences::default()).await;
        let id = server.create_session().await;

        answer_all(&server, &id, "female", ["40", "160", "55"], "lowcarb").await;
        let resp = server
            .post(
                &format!("/api/wizard/sessions/{id}/select"),
                json!({"kind": "confirm", "value": "no"}),
            )
            .await;
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["step"], "awaiting_sex");
        assert!(body["profile"]["dietPreference"].is_null());

        let resp = server
            .post(&format!("/api/wizard/sessions/{id}/finalize"), json!({}))
            .await;
        assert_eq!(resp.status(), 422);
        assert_eq!(server.preferences.calls.load(Ordering::SeqCst), 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn failed_submission_returns_service_message() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(StubPreferences {
            fail_with: Some("서버 점검 중".to_string()),
            ..Default::default()
        })
        .await;
        let id = server.create_session().await;

        answer_all(&server, &id, "male", ["29", "170", "65"], "키토").await;
        server
            .post(
                &format!("/api/wizard/sessions/{id}/select"),
                json!({"kind": "confirm", "value": "yes"}),
            )
            .await;

        let resp = server
            .post(&format!("/api/wizard/sessions/{id}/finalize"), json!({}))
            .await;
        assert_eq!(resp.status(), 502);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "서버 점검 중");
        assert!(server.store.get().await.is_none());

        let body: Value = server
            .get(&format!("/api/wizard/sessions/{id}"))
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(body["step"], "completed");
        assert_eq!(body["submission"], "idle");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn finalize_while_submitting_is_a_no_op() {
    timeout(TEST_TIMEOUT, async {
        let gate = Arc::new(Notify::new());
        let server = Arc::new(
            start_server(StubPreferences {
                gate: Some(Arc::clone(&gate)),
                ..Default::default()
            })
            .await,
        );
        let id = server.create_session().await;

        answer_all(&server, &id, "male", ["29", "170", "65.5"], "고단백").await;
        server
            .post(
                &format!("/api/wizard/sessions/{id}/select"),
                json!({"kind": "confirm", "value": "yes"}),
            )
            .await;

        let first = {
            let server = Arc::clone(&server);
            let id = id.clone();
            tokio::spawn(async move {
                server
                    .post(&format!("/api/wizard/sessions/{id}/finalize"), json!({}))
                    .await
                    .status()
            })
        };

        // Wait until the first request holds the guard.
        loop {
            let body: Value = server
                .get(&format!("/api/wizard/sessions/{id}"))
                .await
                .json()
                .await
                .unwrap();
            if body["submission"] == "submitting" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let resp = server
            .post(&format!("/api/wizard/sessions/{id}/finalize"), json!({}))
            .await;
        assert_eq!(resp.status(), 409);

        gate.notify_one();
        assert_eq!(first.await.unwrap(), 200);
        assert_eq!(server.preferences.calls.load(Ordering::SeqCst), 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn direct_form_uses_same_validation() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(StubPreferences::default()).await;

        let resp = server
            .post("/api/profile/direct", json!({"sex": "female", "age": "121", "diet": "keto"}))
            .await;
        assert_eq!(resp.status(), 422);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["field"], "age");

        let resp = server
            .post("/api/profile/direct", json!({"sex": "female", "diet": "keto"}))
            .await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["profile"]["age"], 25);
        assert_eq!(body["profile"]["diet"], "키토");
        assert_eq!(server.preferences.calls.load(Ordering::SeqCst), 1);
    })
    .await
    .expect("test timed out");
}

// ── WebSocket Tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn ws_connect_receives_transcript_sync() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(StubPreferences::default()).await;
        let id = server.create_session().await;

        let (mut ws, _resp) = connect_async(format!("{}/ws/wizard/{id}", server.ws_base))
            .await
            .expect("WS connect failed");

        let msg = ws.next().await.unwrap().unwrap();
        let json = parse_ws_json(&msg);
        assert_eq!(json["type"], "transcript_sync");
        assert_eq!(json["snapshot"]["step"], "awaiting_sex");
        let transcript = json["snapshot"]["transcript"].as_array().unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0]["text"], prompts::GREETING);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_selection_streams_user_then_assistant() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(StubPreferences::default()).await;
        let id = server.create_session().await;

        let (mut ws, _) = connect_async(format!("{}/ws/wizard/{id}", server.ws_base))
            .await
            .unwrap();
        let _ = ws.next().await.unwrap().unwrap();

        let action = json!({"type": "select", "kind": "sex", "value": "male"});
        ws.send(Message::Text(action.to_string().into())).await.unwrap();

        let user = parse_ws_json(&ws.next().await.unwrap().unwrap());
        assert_eq!(user["type"], "entry");
        assert_eq!(user["entry"]["speaker"], "user");
        assert_eq!(user["entry"]["text"], "남성");

        let reply = parse_ws_json(&ws.next().await.unwrap().unwrap());
        assert_eq!(reply["type"], "entry");
        assert_eq!(reply["entry"]["speaker"], "assistant");
        assert_eq!(reply["entry"]["text"], prompts::ASK_AGE);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_receives_reset_then_greeting() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(StubPreferences::default()).await;
        let id = server.create_session().await;

        let (mut ws, _) = connect_async(format!("{}/ws/wizard/{id}", server.ws_base))
            .await
            .unwrap();
        let _ = ws.next().await.unwrap().unwrap();

        let resp = server
            .post(&format!("/api/wizard/sessions/{id}/reset"), json!({}))
            .await;
        assert_eq!(resp.status(), 200);

        let reset = parse_ws_json(&ws.next().await.unwrap().unwrap());
        assert_eq!(reset["type"], "reset");
        let greeting = parse_ws_json(&ws.next().await.unwrap().unwrap());
        assert_eq!(greeting["entry"]["text"], prompts::GREETING);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_unknown_session_is_rejected() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(StubPreferences::default()).await;
        let result = connect_async(format!(
            "{}/ws/wizard/00000000-0000-0000-0000-000000000000",
            server.ws_base
        ))
        .await;
        assert!(result.is_err());
    })
    .await
    .expect("test timed out");
}
