use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use donation_relay::api::rest::router;
use donation_relay::config::Config;
use donation_relay::notify::MemoryMailer;
use donation_relay::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

fn setup() -> axum::Router {
    router(Arc::new(AppState::new(&Config::default()).unwrap()))
}

fn setup_with_mailer(mailer: Arc<MemoryMailer>) -> axum::Router {
    router(Arc::new(AppState::with_mailer(&Config::default(), mailer)))
}

fn json_request(method: &str, uri: &str, actor: Option<(&str, &str)>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some((id, role)) = actor {
        builder = builder.header("x-actor-id", id).header("x-actor-role", role);
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str, actor: Option<(&str, &str)>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some((id, role)) = actor {
        builder = builder.header("x-actor-id", id).header("x-actor-role", role);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

const DONOR: (&str, &str) = ("donor1", "user");
const NGO: (&str, &str) = ("ngo1", "NGO");
const AGENT_1: (&str, &str) = ("agent1", "DELIVERY");
const AGENT_2: (&str, &str) = ("agent2", "DELIVERY");

fn rice() -> Value {
    json!({
        "foodname": "Rice",
        "meal": "lunch",
        "category": "cooked",
        "quantity": "10kg",
        "name": "Asha",
        "phoneno": "555-0100",
        "district": "Pune",
        "address": "12 Market Road",
        "email": "donor1@example.org"
    })
}

async fn create_donation(app: &axum::Router) -> String {
    let res = app
        .clone()
        .oneshot(json_request("POST", "/donations", Some(DONOR), rice()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await["id"].as_str().unwrap().to_string()
}

async fn assign_delivery(app: &axum::Router, donation_id: &str) -> Value {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/ngo/donations/{donation_id}/delivery-method"),
            Some(NGO),
            json!({
                "deliveryMethod": "assigned_delivery",
                "deliveryCharge": 50,
                "pickupLocation": "A",
                "dropLocation": "B"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await
}

async fn pending_id(app: &axum::Router) -> String {
    let res = app
        .clone()
        .oneshot(get_request("/deliveries/pending", Some(AGENT_1)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let pending = body_json(res).await;
    let list = pending.as_array().unwrap();
    assert_eq!(list.len(), 1);
    list[0]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["donations"], 0);
    assert_eq!(body["pending_deliveries"], 0);
    assert_eq!(body["accepted_deliveries"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = app.oneshot(get_request("/metrics", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("pending_deliveries"));
    assert!(body.contains("donations_recorded_total"));
}

#[tokio::test]
async fn missing_identity_returns_401() {
    let app = setup();
    let response = app
        .oneshot(json_request("POST", "/donations", None, rice()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_role_returns_401() {
    let app = setup();
    let response = app
        .oneshot(get_request("/donations", Some(("someone", "admin"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn record_donation_starts_pending_with_self_pickup() {
    let app = setup();
    let response = app
        .oneshot(json_request("POST", "/donations", Some(DONOR), rice()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["food_name"], "Rice");
    assert_eq!(body["quantity"], "10kg");
    assert_eq!(body["status"], "Pending");
    assert_eq!(body["delivery_method"], "self_pickup");
    assert_eq!(body["delivery_status"], "not_assigned");
    assert!(body["delivery_charge"].is_null());
    assert_eq!(body["donor_id"], "donor1");
}

#[tokio::test]
async fn record_donation_missing_fields_returns_400() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/donations",
            Some(DONOR),
            json!({ "foodname": "Rice" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("quantity"));
}

#[tokio::test]
async fn delivery_agent_cannot_record_donation() {
    let app = setup();
    let response = app
        .oneshot(json_request("POST", "/donations", Some(AGENT_1), rice()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn get_nonexistent_donation_returns_404() {
    let app = setup();
    let fake_id = "00000000-0000-0000-0000-000000000000";
    let response = app
        .oneshot(get_request(&format!("/donations/{fake_id}"), Some(NGO)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ngo_assigns_delivery_and_queue_holds_one_ticket() {
    let app = setup();
    let donation_id = create_donation(&app).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/ngo/donations/{donation_id}/accept"),
            Some(NGO),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "Accepted");

    let assigned = assign_delivery(&app, &donation_id).await;
    assert_eq!(assigned["pending_count"], 1);
    assert_eq!(assigned["donation"]["delivery_status"], "pending_delivery");
    assert_eq!(assigned["donation"]["delivery_charge"], 50);
    assert_eq!(assigned["donation"]["pickup_location"], "A");
    assert_eq!(assigned["donation"]["drop_location"], "B");

    let res = app
        .clone()
        .oneshot(get_request("/deliveries/pending", Some(AGENT_1)))
        .await
        .unwrap();
    let pending = body_json(res).await;
    let list = pending.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["delivery_charge"], 50);
    assert_eq!(list[0]["status"], "pending");
    assert_eq!(list[0]["donation_id"], donation_id.as_str());
    assert_eq!(list[0]["donation"]["food_name"], "Rice");
}

#[tokio::test]
async fn assigned_delivery_without_locations_returns_400() {
    let app = setup();
    let donation_id = create_donation(&app).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/ngo/donations/{donation_id}/delivery-method"),
            Some(NGO),
            json!({ "deliveryMethod": "assigned_delivery", "deliveryCharge": 50 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .oneshot(get_request("/health", None))
        .await
        .unwrap();
    assert_eq!(body_json(res).await["pending_deliveries"], 0);
}

#[tokio::test]
async fn donor_cannot_set_delivery_method() {
    let app = setup();
    let donation_id = create_donation(&app).await;

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/ngo/donations/{donation_id}/delivery-method"),
            Some(DONOR),
            json!({ "deliveryMethod": "self_pickup" }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn self_pickup_withdraws_pending_delivery() {
    let app = setup();
    let donation_id = create_donation(&app).await;
    assign_delivery(&app, &donation_id).await;

    for _ in 0..2 {
        let res = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/ngo/donations/{donation_id}/delivery-method"),
                Some(NGO),
                json!({ "deliveryMethod": "self_pickup" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["pending_count"], 0);
        assert_eq!(body["donation"]["delivery_status"], "not_assigned");
        assert!(body["donation"]["delivery_charge"].is_null());
        assert!(body["donation"]["pickup_location"].is_null());
    }

    // the repeated self pickup changed nothing, so it added no notification
    let res = app
        .oneshot(get_request("/notifications", Some(DONOR)))
        .await
        .unwrap();
    let notifications = body_json(res).await;
    let messages: Vec<&str> = notifications
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["message"].as_str().unwrap())
        .collect();
    assert_eq!(
        messages,
        vec![
            "Delivery method set to: self pickup",
            "Delivery method set to: assigned delivery",
            "Your donation of Rice (10kg) has been accepted by an NGO.",
        ]
    );
}

#[tokio::test]
async fn second_ngo_cannot_reroute_donation() {
    let app = setup();
    let donation_id = create_donation(&app).await;
    assign_delivery(&app, &donation_id).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/ngo/donations/{donation_id}/delivery-method"),
            Some(("ngo2", "ngo")),
            json!({ "deliveryMethod": "self_pickup" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .oneshot(get_request("/health", None))
        .await
        .unwrap();
    assert_eq!(body_json(res).await["pending_deliveries"], 1);
}

#[tokio::test]
async fn malformed_delivery_method_returns_json_400() {
    let app = setup();
    let donation_id = create_donation(&app).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/ngo/donations/{donation_id}/delivery-method"),
            Some(NGO),
            json!({ "deliveryMethod": "teleport", "deliveryCharge": -5 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(res).await["error"].is_string());

    let res = app
        .oneshot(get_request("/donations/not-a-uuid", Some(NGO)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(res).await["error"].is_string());
}

#[tokio::test]
async fn notification_feed_requires_identity() {
    let app = setup();

    let res = app
        .clone()
        .oneshot(get_request("/ws", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(body_json(res).await["error"].is_string());

    // identified, but not a websocket handshake
    let res = app
        .oneshot(get_request("/ws", Some(DONOR)))
        .await
        .unwrap();
    assert_ne!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.status().is_client_error());
}

#[tokio::test]
async fn full_delivery_flow() {
    let mailer = Arc::new(MemoryMailer::new());
    let app = setup_with_mailer(mailer.clone());
    let donation_id = create_donation(&app).await;
    assign_delivery(&app, &donation_id).await;
    let pending = pending_id(&app).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/deliveries/pending/{pending}/accept"),
            Some(AGENT_1),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let accepted = body_json(res).await;
    assert_eq!(accepted["status"], "accepted_delivery");
    assert_eq!(accepted["agent_id"], "agent1");
    assert_eq!(accepted["donation_id"], donation_id.as_str());
    assert_eq!(accepted["food_name"], "Rice");
    assert_eq!(accepted["donor_email"], "donor1@example.org");

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/deliveries/pending/{pending}/accept"),
            Some(AGENT_2),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app
        .clone()
        .oneshot(get_request(&format!("/donations/{donation_id}"), Some(DONOR)))
        .await
        .unwrap();
    assert_eq!(body_json(res).await["delivery_status"], "accepted_delivery");

    let res = app
        .clone()
        .oneshot(get_request("/deliveries/pending", Some(AGENT_2)))
        .await
        .unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 0);

    let res = app
        .clone()
        .oneshot(get_request("/deliveries/accepted", Some(AGENT_1)))
        .await
        .unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 1);

    let res = app
        .clone()
        .oneshot(get_request("/deliveries/accepted", Some(AGENT_2)))
        .await
        .unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 0);

    let res = app
        .clone()
        .oneshot(get_request("/notifications", Some(NGO)))
        .await
        .unwrap();
    let ngo_notes = body_json(res).await;
    assert_eq!(ngo_notes.as_array().unwrap().len(), 1);

    let res = app
        .clone()
        .oneshot(get_request("/profile", Some(DONOR)))
        .await
        .unwrap();
    let profile = body_json(res).await;
    assert_eq!(profile["donations"].as_array().unwrap().len(), 1);
    assert!(profile["notifications"][0]["message"]
        .as_str()
        .unwrap()
        .contains("on the way"));

    let mut sent = Vec::new();
    for _ in 0..100 {
        sent = mailer.sent().await;
        if sent.len() >= 2 {
            break;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
    }
    assert_eq!(sent.len(), 2);

    let res = app.oneshot(get_request("/health", None)).await.unwrap();
    let health = body_json(res).await;
    assert_eq!(health["pending_deliveries"], 0);
    assert_eq!(health["accepted_deliveries"], 1);
}

#[tokio::test]
async fn ngo_dashboard_lists_donations_awaiting_pickup() {
    let app = setup();
    let waiting = create_donation(&app).await;
    let claimed = create_donation(&app).await;
    let _unreviewed = create_donation(&app).await;

    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/ngo/donations/{waiting}/accept"),
            Some(NGO),
            json!({}),
        ))
        .await
        .unwrap();
    assign_delivery(&app, &claimed).await;
    let pending = pending_id(&app).await;
    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/deliveries/pending/{pending}/accept"),
            Some(AGENT_1),
            json!({}),
        ))
        .await
        .unwrap();

    let res = app
        .oneshot(get_request("/ngo/dashboard", Some(NGO)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let dashboard = body_json(res).await;
    let list = dashboard.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], waiting.as_str());
}

#[tokio::test]
async fn donors_list_only_their_own_donations() {
    let app = setup();
    create_donation(&app).await;
    app.clone()
        .oneshot(json_request(
            "POST",
            "/donations",
            Some(("donor2", "donor")),
            rice(),
        ))
        .await
        .unwrap();

    let res = app
        .clone()
        .oneshot(get_request("/donations", Some(DONOR)))
        .await
        .unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 1);

    let res = app
        .oneshot(get_request("/donations?status=Pending", Some(NGO)))
        .await
        .unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn chatbot_counts_donations() {
    let app = setup();
    create_donation(&app).await;

    let res = app
        .oneshot(json_request(
            "POST",
            "/chatbot",
            None,
            json!({ "question": "How many donations are there?" }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        body_json(res).await["answer"],
        "There are currently 1 donations in the system."
    );
}

#[tokio::test]
async fn contact_form_forwards_mail() {
    let mailer = Arc::new(MemoryMailer::new());
    let app = setup_with_mailer(mailer.clone());

    let res = app
        .oneshot(json_request(
            "POST",
            "/contact",
            None,
            json!({ "name": "Ravi", "email": "ravi@example.org", "message": "Can I donate bread?" }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let sent = mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, Config::default().support_email);
    assert!(sent[0].body.contains("Can I donate bread?"));
}

#[tokio::test]
async fn contact_form_with_mail_outage_returns_503() {
    let app = setup_with_mailer(Arc::new(MemoryMailer::unavailable()));

    let res = app
        .oneshot(json_request(
            "POST",
            "/contact",
            None,
            json!({ "name": "Ravi", "email": "ravi@example.org", "message": "hello" }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}
