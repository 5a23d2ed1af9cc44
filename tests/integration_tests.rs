use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use saathi::config::AppConfig;
use saathi::db;
use saathi::handlers;
use saathi::models::{DriverStats, NewOrder, Order, OrderFilter, OrderUpdate};
use saathi::services::ai::{LlmProvider, Message};
use saathi::services::orders::OrderStore;
use saathi::services::sessions::SessionStore;
use saathi::state::AppState;

// ── Mock Providers ──

/// Answers the field extractor with fixed JSON and echoes everything else.
#[derive(Default)]
struct MockLlm {
    calls: AtomicUsize,
    last_history_len: AtomicUsize,
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn chat(&self, system_prompt: &str, messages: &[Message], _: f32) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_history_len.store(messages.len(), Ordering::SeqCst);

        if system_prompt.contains("order fields") {
            return Ok(r#"{"customerName":"Asha","address":"MG Road, Pune","item":"shirts","qty":2,"pickupTime":null}"#.to_string());
        }
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        Ok(format!("MOCK: {last}"))
    }
}

/// Every call fails, as a database outage would.
struct FailingStore;

#[async_trait]
impl OrderStore for FailingStore {
    async fn find_by_tracking_id(&self, _: &str) -> anyhow::Result<Option<Order>> {
        anyhow::bail!("disk I/O error: /var/lib/saathi.db")
    }
    async fn find_by_id(&self, _: &str) -> anyhow::Result<Option<Order>> {
        anyhow::bail!("disk I/O error")
    }
    async fn apply_update(&self, _: &str, _: &OrderUpdate) -> anyhow::Result<Option<Order>> {
        anyhow::bail!("disk I/O error")
    }
    async fn create(&self, _: NewOrder) -> anyhow::Result<Order> {
        anyhow::bail!("disk I/O error")
    }
    async fn delete(&self, _: &str) -> anyhow::Result<bool> {
        anyhow::bail!("disk I/O error")
    }
    async fn next_pending_pickup(&self) -> anyhow::Result<Option<Order>> {
        anyhow::bail!("disk I/O error")
    }
    async fn recent(&self, _: &OrderFilter, _: i64) -> anyhow::Result<Vec<Order>> {
        anyhow::bail!("disk I/O error")
    }
}

struct PanickingStore;

#[async_trait]
impl OrderStore for PanickingStore {
    async fn find_by_tracking_id(&self, _: &str) -> anyhow::Result<Option<Order>> {
        panic!("index out of bounds")
    }
    async fn find_by_id(&self, _: &str) -> anyhow::Result<Option<Order>> {
        panic!("index out of bounds")
    }
    async fn apply_update(&self, _: &str, _: &OrderUpdate) -> anyhow::Result<Option<Order>> {
        panic!("index out of bounds")
    }
    async fn create(&self, _: NewOrder) -> anyhow::Result<Order> {
        panic!("index out of bounds")
    }
    async fn delete(&self, _: &str) -> anyhow::Result<bool> {
        panic!("index out of bounds")
    }
    async fn next_pending_pickup(&self) -> anyhow::Result<Option<Order>> {
        panic!("index out of bounds")
    }
    async fn recent(&self, _: &OrderFilter, _: i64) -> anyhow::Result<Vec<Order>> {
        panic!("index out of bounds")
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig::default()
}

fn test_state_with(config: AppConfig, llm: Option<Box<dyn LlmProvider>>) -> Arc<AppState> {
    let conn = db::init_db(":memory:").unwrap();
    Arc::new(AppState::new(config, conn, llm))
}

fn test_state() -> (Arc<AppState>, Arc<MockLlm>) {
    let mock = Arc::new(MockLlm::default());
    let llm: Box<dyn LlmProvider> = Box::new(SharedLlm(mock.clone()));
    (test_state_with(test_config(), Some(llm)), mock)
}

fn state_with_store(orders: Box<dyn OrderStore>) -> Arc<AppState> {
    let config = test_config();
    let conn = db::init_db(":memory:").unwrap();
    let db = Arc::new(Mutex::new(conn));
    Arc::new(AppState {
        sessions: SessionStore::new(db.clone(), &config),
        db,
        config,
        llm: None,
        orders,
        stats: DriverStats::default(),
    })
}

/// Lets a test keep a handle on the mock after the state takes ownership.
struct SharedLlm(Arc<MockLlm>);

#[async_trait]
impl LlmProvider for SharedLlm {
    async fn chat(&self, system_prompt: &str, messages: &[Message], t: f32) -> anyhow::Result<String> {
        self.0.chat(system_prompt, messages, t).await
    }
}

fn test_app(state: Arc<AppState>) -> Router {
    handlers::router(state)
}

async fn body_json(res: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn say(app: &Router, user_id: &str, text: &str) -> serde_json::Value {
    let payload = serde_json::json!({ "text": text, "userId": user_id });
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/ai")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await
}

async fn get(app: &Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn seed_order(app: &Router, tracking_id: &str) -> serde_json::Value {
    let payload = serde_json::json!({
        "trackingId": tracking_id,
        "customerName": "Ravi",
        "address": "Indiranagar",
        "item": "bag",
        "qty": 1,
    });
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders/create")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    body_json(res).await
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let (state, _) = test_state();
    let res = get(&test_app(state), "/health").await;
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["llm"], true);
}

// ── Order intents ──

#[tokio::test]
async fn test_track_unknown_order() {
    let (state, _) = test_state();
    let app = test_app(state);

    let json = say(&app, "driver-1", "track order ORD-7X2K").await;
    assert_eq!(json["action"], "order_not_found");
    assert_eq!(json["trackingId"], "ORD-7X2K");
    assert!(json["reply"].as_str().unwrap().contains("couldn't find"));
}

#[tokio::test]
async fn test_update_status_and_assignee() {
    let (state, _) = test_state();
    let app = test_app(state);
    seed_order(&app, "ORD-7X2K").await;

    let text = "update ORD-7X2K to shipped and assign to Priya Sharma";
    let json = say(&app, "driver-1", text).await;
    assert_eq!(json["action"], "update_order");
    assert_eq!(json["order"]["status"], "shipped");
    assert_eq!(json["order"]["assignedTo"], "Priya Sharma");
    // Untouched fields survive.
    assert_eq!(json["order"]["address"], "Indiranagar");

    // Same command again does not toggle.
    let again = say(&app, "driver-1", text).await;
    assert_eq!(again["order"]["status"], "shipped");
}

#[tokio::test]
async fn test_update_items() {
    let (state, _) = test_state();
    let app = test_app(state);
    seed_order(&app, "ORD-ITEMS").await;

    let json = say(&app, "driver-1", "update ORD-ITEMS remove bag and add 2 shirts, socks").await;
    assert_eq!(json["action"], "update_order");
    assert_eq!(json["order"]["item"], "2 shirts, socks");
}

#[tokio::test]
async fn test_update_without_fields_shows_menu() {
    let (state, _) = test_state();
    let app = test_app(state);
    seed_order(&app, "ORD-MENU").await;

    let json = say(&app, "driver-1", "update ORD-MENU").await;
    assert_eq!(json["action"], "ask_for_update_fields");
    assert!(json.get("order").is_none());
}

#[tokio::test]
async fn test_cancel_keeps_record() {
    let (state, _) = test_state();
    let app = test_app(state);
    seed_order(&app, "ORD-7X2K").await;

    let json = say(&app, "driver-1", "cancel order ORD-7X2K").await;
    assert_eq!(json["action"], "cancel_order");
    assert_eq!(json["order"]["status"], "cancelled");

    let res = get(&app, "/orders/track/ORD-7X2K").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "cancelled");
}

#[tokio::test]
async fn test_delete_removes_record() {
    let (state, _) = test_state();
    let app = test_app(state);
    seed_order(&app, "ORD-7X2K").await;

    let json = say(&app, "driver-1", "delete order ORD-7X2K").await;
    assert_eq!(json["action"], "delete_order");

    let json = say(&app, "driver-1", "track order ORD-7X2K").await;
    assert_eq!(json["action"], "order_not_found");

    let res = get(&app, "/orders/track/ORD-7X2K").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_tracking_id_asks_and_mutates_nothing() {
    let (state, _) = test_state();
    let app = test_app(state);
    seed_order(&app, "ORD-SAFE").await;

    let json = say(&app, "driver-1", "cancel my order").await;
    assert_eq!(json["action"], "ask_for_order_id");

    let res = get(&app, "/orders/track/ORD-SAFE").await;
    assert_eq!(body_json(res).await["status"], "created");
}

#[tokio::test]
async fn test_update_address() {
    let (state, _) = test_state();
    let app = test_app(state);
    seed_order(&app, "ORD-ADDR").await;

    let json = say(&app, "driver-1", "update address of ORD-ADDR to 12 Park Street, Kolkata").await;
    assert_eq!(json["action"], "update_address");
    assert_eq!(json["order"]["address"], "12 Park Street, Kolkata");
}

#[tokio::test]
async fn test_create_then_track_round_trip() {
    let (state, _) = test_state();
    let app = test_app(state);

    let created = say(&app, "driver-1", "create order for 2 shirts to MG Road Pune").await;
    assert_eq!(created["action"], "created_order");
    let tracking_id = created["trackingId"].as_str().unwrap().to_string();
    assert!(tracking_id.starts_with("ORD-"));
    assert_eq!(tracking_id, tracking_id.to_uppercase());
    assert_eq!(created["order"]["metadata"]["createdBy"], "driver-1");

    let tracked = say(&app, "driver-1", &format!("track {}", tracking_id.to_lowercase())).await;
    assert_eq!(tracked["action"], "track_order");
    assert_eq!(tracked["order"]["item"], created["order"]["item"]);
    assert_eq!(tracked["order"]["address"], "MG Road, Pune");
}

#[tokio::test]
async fn test_create_without_llm_echoes_text() {
    let state = test_state_with(test_config(), None);
    let app = test_app(state);

    let json = say(&app, "driver-1", "create order for a sofa").await;
    assert_eq!(json["action"], "created_order");
    assert_eq!(json["order"]["item"], "create order for a sofa");
    assert_eq!(json["order"]["qty"], 1);
}

#[tokio::test]
async fn test_next_pickup_and_list() {
    let (state, _) = test_state();
    let app = test_app(state);

    let json = say(&app, "driver-1", "what's my next pickup").await;
    assert_eq!(json["action"], "no_pickups");

    seed_order(&app, "ORD-P1").await;
    seed_order(&app, "ORD-P2").await;

    let json = say(&app, "driver-1", "what's my next pickup").await;
    assert_eq!(json["action"], "next_pickup");
    assert_eq!(json["order"]["trackingId"], "ORD-P1");

    let json = say(&app, "driver-1", "show my orders").await;
    assert_eq!(json["action"], "list_orders");
    assert_eq!(json["orders"].as_array().unwrap().len(), 2);
    assert_eq!(json["orders"][0]["trackingId"], "ORD-P2");
}

// ── Statistics and reminders ──

#[tokio::test]
async fn test_driver_stats_never_reach_update() {
    let (state, mock) = test_state();
    let app = test_app(state);

    let json = say(&app, "driver-1", "how many trips today").await;
    assert_eq!(json["action"], "trip_count_today");
    assert_eq!(json["data"]["tripsToday"], 7);

    let json = say(&app, "driver-1", "mumbai me petrol ka daam kya hai").await;
    assert_eq!(json["action"], "fuel_price_query");
    assert_eq!(json["data"]["city"], "Mumbai");

    assert_eq!(mock.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_reminder_is_not_sent_to_fallback() {
    let (state, mock) = test_state();
    let app = test_app(state);

    let json = say(&app, "driver-1", "remind me at 6:15 pm to call the customer").await;
    assert_eq!(json["action"], "set_reminder");
    assert!(json["reminder"]["fireAt"].as_str().unwrap().ends_with("T18:15:00"));
    assert_eq!(json["reminder"]["text"], "call the customer");
    assert_eq!(mock.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_reminder_mentioning_order_is_not_sent_to_fallback() {
    let (state, mock) = test_state();
    let app = test_app(state);

    let json = say(&app, "driver-1", "remind me to call 3 customers about ORD-1 at 6 pm").await;
    assert_eq!(json["action"], "set_reminder");
    assert!(json["reminder"]["fireAt"].as_str().unwrap().ends_with("T18:00:00"));
    assert_eq!(json["reminder"]["text"], "call 3 customers about ORD-1");
    assert_eq!(mock.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_pickup_time_skips_quantity() {
    let (state, _) = test_state();
    let app = test_app(state);
    seed_order(&app, "ORD-P1").await;

    let json = say(&app, "driver-1", "update ORD-P1 pickup 2 boxes at 5:45 pm").await;
    assert_eq!(json["action"], "update_order");
    assert!(json["order"]["pickupTime"].as_str().unwrap().ends_with("T17:45:00"));
}

// ── Fallback ──

#[tokio::test]
async fn test_general_goes_to_fallback_with_history() {
    let (state, mock) = test_state();
    let app = test_app(state);

    say(&app, "driver-1", "track order ORD-NOPE").await;
    let json = say(&app, "driver-1", "tell me a joke").await;
    assert_eq!(json["action"], "llm_reply");
    assert_eq!(json["reply"], "MOCK: tell me a joke");
    // Two prior turns plus the new utterance.
    assert_eq!(mock.last_history_len.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_history_is_per_user() {
    let (state, mock) = test_state();
    let app = test_app(state);

    say(&app, "driver-1", "track order ORD-NOPE").await;
    say(&app, "driver-2", "tell me a joke").await;
    assert_eq!(mock.last_history_len.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_fallback_without_llm_degrades() {
    let state = test_state_with(test_config(), None);
    let app = test_app(state);

    let json = say(&app, "driver-1", "tell me a joke").await;
    assert_eq!(json["action"], "fallback");
    assert_eq!(json["reply"], "Sorry, I couldn't process that right now.");
}

// ── Clarification follow-ups ──

#[tokio::test]
async fn test_bare_tracking_id_completes_pending_cancel() {
    let (state, _) = test_state();
    let app = test_app(state);
    seed_order(&app, "ORD-7X2K").await;

    let json = say(&app, "driver-1", "cancel my order").await;
    assert_eq!(json["action"], "ask_for_order_id");

    let json = say(&app, "driver-1", "ORD-7X2K").await;
    assert_eq!(json["action"], "cancel_order");
    assert_eq!(json["order"]["status"], "cancelled");

    // The pending request is consumed.
    let json = say(&app, "driver-1", "ORD-7X2K").await;
    assert_eq!(json["action"], "llm_reply");
}

#[tokio::test]
async fn test_assignee_follow_up() {
    let (state, _) = test_state();
    let app = test_app(state);
    seed_order(&app, "ORD-ASSN").await;

    let json = say(&app, "driver-1", "assign ORD-ASSN").await;
    assert_eq!(json["action"], "ask_for_assignee");

    let json = say(&app, "driver-1", "Priya Sharma").await;
    assert_eq!(json["action"], "update_order");
    assert_eq!(json["order"]["assignedTo"], "Priya Sharma");
}

#[tokio::test]
async fn test_chatter_after_assignee_question_goes_to_fallback() {
    let (state, _) = test_state();
    let app = test_app(state);
    seed_order(&app, "ORD-A1").await;

    let json = say(&app, "driver-1", "assign ORD-A1").await;
    assert_eq!(json["action"], "ask_for_assignee");

    let json = say(&app, "driver-1", "tell me a joke").await;
    assert_eq!(json["action"], "llm_reply");
    assert_eq!(json["reply"], "MOCK: tell me a joke");

    let order = body_json(get(&app, "/orders/track/ORD-A1").await).await;
    assert!(order["assignedTo"].is_null());

    // The question is dropped, not left waiting.
    let json = say(&app, "driver-1", "Priya").await;
    assert_eq!(json["action"], "llm_reply");
}

#[tokio::test]
async fn test_question_after_address_question_goes_to_fallback() {
    let state = test_state_with(test_config(), None);
    let app = test_app(state);
    seed_order(&app, "ORD-A1").await;

    let json = say(&app, "driver-1", "update address of ORD-A1").await;
    assert_eq!(json["action"], "ask_for_address");

    let json = say(&app, "driver-1", "what is the weather like").await;
    assert_eq!(json["action"], "fallback");

    let order = body_json(get(&app, "/orders/track/ORD-A1").await).await;
    assert_eq!(order["address"], "Indiranagar");
}

#[tokio::test]
async fn test_address_follow_up() {
    let (state, _) = test_state();
    let app = test_app(state);
    seed_order(&app, "ORD-A1").await;

    say(&app, "driver-1", "update address of ORD-A1").await;
    let json = say(&app, "driver-1", "12 Park Street, Kolkata").await;
    assert_eq!(json["action"], "update_address");
    assert_eq!(json["order"]["address"], "12 Park Street, Kolkata");
}

#[tokio::test]
async fn test_new_intent_drops_pending() {
    let (state, _) = test_state();
    let app = test_app(state);
    seed_order(&app, "ORD-KEEP").await;

    say(&app, "driver-1", "cancel my order").await;
    say(&app, "driver-1", "how many trips today").await;
    say(&app, "driver-1", "ORD-KEEP").await;

    let res = get(&app, "/orders/track/ORD-KEEP").await;
    assert_eq!(body_json(res).await["status"], "created");
}

#[tokio::test]
async fn test_follow_up_disabled_by_config() {
    let config = AppConfig {
        resume_pending_clarification: false,
        ..test_config()
    };
    let state = test_state_with(config, None);
    let app = test_app(state);
    seed_order(&app, "ORD-7X2K").await;

    say(&app, "driver-1", "cancel my order").await;
    let json = say(&app, "driver-1", "ORD-7X2K").await;
    assert_eq!(json["action"], "fallback");
}

// ── Failures ──

#[tokio::test]
async fn test_store_failure_becomes_error_envelope() {
    let app = test_app(state_with_store(Box::new(FailingStore)));

    let json = say(&app, "driver-1", "track order ORD-7X2K").await;
    assert_eq!(json["action"], "error");
    assert_eq!(json["error"], "upstream_unavailable");
    assert!(!json["reply"].as_str().unwrap().contains("disk"));

    // The conversation keeps working afterwards.
    let json = say(&app, "driver-1", "how many trips today").await;
    assert_eq!(json["action"], "trip_count_today");
}

#[tokio::test]
async fn test_panic_in_turn_still_replies() {
    let app = test_app(state_with_store(Box::new(PanickingStore)));

    let json = say(&app, "driver-1", "track order ORD-7X2K").await;
    assert_eq!(json["action"], "error");
    assert_eq!(json["error"], "internal_error");

    let json = say(&app, "driver-1", "how many trips today").await;
    assert_eq!(json["action"], "trip_count_today");
}

#[tokio::test]
async fn test_empty_text_rejected() {
    let (state, _) = test_state();
    let app = test_app(state);

    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/ai")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"text":"   "}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

// ── Order REST surface ──

#[tokio::test]
async fn test_rest_get_modify_delete() {
    let (state, _) = test_state();
    let app = test_app(state);
    let order = seed_order(&app, "ORD-REST").await;
    let id = order["id"].as_str().unwrap();

    let res = get(&app, &format!("/orders/{id}")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["trackingId"], "ORD-REST");

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/orders/modify/{id}"))
                .header("content-type", "application/json")
                .body(Body::from(r#"{"status":"delivered"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "delivered");

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/orders/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["success"], true);

    let res = get(&app, &format!("/orders/{id}")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rest_list_with_filter_and_limit() {
    let (state, _) = test_state();
    let app = test_app(state);
    for code in ["ORD-L1", "ORD-L2", "ORD-L3"] {
        seed_order(&app, code).await;
    }

    let res = get(&app, "/orders/list?limit=2").await;
    let json = body_json(res).await;
    assert_eq!(json.as_array().unwrap().len(), 2);
    assert_eq!(json[0]["trackingId"], "ORD-L3");

    let res = get(&app, "/orders/list?assignedTo=Nobody").await;
    assert!(body_json(res).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_rest_create_requires_item() {
    let (state, _) = test_state();
    let app = test_app(state);

    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders/create")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"address":"Somewhere"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
