//! Integration tests for user, payment and referral routes
//!
//! The checkout provider is replaced by a wiremock server.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use sea_orm::EntityTrait;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use wiremock::{
    matchers::{body_string_contains, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use entrain::db::entities::{payments, users};
use entrain::handlers;
use entrain::state::AppState;
use entrain::test_utils::*;

const EMAIL: &str = "buyer@entrain.test";

fn create_test_router(state: &AppState) -> Router {
    Router::new()
        .nest("/api", handlers::api_routes())
        .with_state(state.clone())
}

fn api_request(method: &str, uri: &str, email: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-email", email);

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn parse_json_response<T: serde::de::DeserializeOwned>(
    response: axum::response::Response,
) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn state_with_provider(provider: &MockServer) -> AppState {
    let mut config = test_config();
    config.stripe_api_base = provider.uri();
    let (state, _receiver) = setup_test_app_state_with_config(config).await;
    state
}

fn paid_session(id: &str, user_id: uuid::Uuid, credits: i32) -> Value {
    json!({
        "id": id,
        "url": null,
        "payment_status": "paid",
        "payment_intent": "pi_123",
        "amount_total": 999,
        "currency": "usd",
        "metadata": {
            "user_id": user_id.to_string(),
            "user_email": EMAIL,
            "credits": credits.to_string(),
        }
    })
}

#[tokio::test]
async fn test_sync_user_provisions_once() {
    let state = setup_test_app_state().await;
    let app = create_test_router(&state);

    let body = json!({ "email": "new@entrain.test", "name": "New Listener" });
    let response = app
        .clone()
        .oneshot(api_request("POST", "/api/users/sync", "", Some(body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created: Value = parse_json_response(response).await;
    assert_eq!(created["credits"], 1);
    assert_eq!(created["name"], "New Listener");

    let body = json!({ "email": "new@entrain.test", "image": "https://img.test/a.png" });
    let response = app
        .clone()
        .oneshot(api_request("POST", "/api/users/sync", "", Some(body)))
        .await
        .unwrap();
    let synced: Value = parse_json_response(response).await;
    assert_eq!(synced["id"], created["id"]);
    assert_eq!(synced["name"], "New Listener");
    assert_eq!(synced["image"], "https://img.test/a.png");

    let response = app
        .oneshot(api_request("GET", "/api/users/me", "new@entrain.test", None))
        .await
        .unwrap();
    let me: Value = parse_json_response(response).await;
    assert_eq!(me["email"], "new@entrain.test");

    assert_eq!(users::Entity::find().all(&state.db).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_sync_user_rejects_invalid_email() {
    let state = setup_test_app_state().await;
    let app = create_test_router(&state);

    let response = app
        .oneshot(api_request(
            "POST",
            "/api/users/sync",
            "",
            Some(json!({ "email": "not-an-email" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_create_checkout_session() {
    let provider = MockServer::start().await;
    let state = state_with_provider(&provider).await;
    create_test_user(&state.db, EMAIL, 1).await;

    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .and(header("authorization", "Bearer sk_test_123"))
        .and(body_string_contains("line_items%5B0%5D%5Bprice%5D=price_small"))
        .and(body_string_contains("metadata%5Bcredits%5D=5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_1",
            "url": "https://checkout.test/cs_test_1",
        })))
        .expect(1)
        .mount(&provider)
        .await;

    let app = create_test_router(&state);
    let response = app
        .oneshot(api_request(
            "POST",
            "/api/payments/create-checkout-session",
            EMAIL,
            Some(json!({ "price_id": "price_small" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = parse_json_response(response).await;
    assert_eq!(body["checkout_url"], "https://checkout.test/cs_test_1");
}

#[tokio::test]
async fn test_create_checkout_session_unknown_price() {
    let provider = MockServer::start().await;
    let state = state_with_provider(&provider).await;
    create_test_user(&state.db, EMAIL, 1).await;

    let app = create_test_router(&state);
    let response = app
        .oneshot(api_request(
            "POST",
            "/api/payments/create-checkout-session",
            EMAIL,
            Some(json!({ "price_id": "price_bogus" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = parse_json_response(response).await;
    assert_eq!(body["detail"], "Invalid price ID");
}

#[tokio::test]
async fn test_provider_failure_is_bad_gateway() {
    let provider = MockServer::start().await;
    let state = state_with_provider(&provider).await;
    create_test_user(&state.db, EMAIL, 1).await;

    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "message": "No such price" }
        })))
        .mount(&provider)
        .await;

    let app = create_test_router(&state);
    let response = app
        .oneshot(api_request(
            "POST",
            "/api/payments/create-checkout-session",
            EMAIL,
            Some(json!({ "price_id": "price_large" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = parse_json_response(response).await;
    assert_eq!(body["detail"], "Payment service error");
}

#[tokio::test]
async fn test_confirm_payment_credits_once() {
    let provider = MockServer::start().await;
    let state = state_with_provider(&provider).await;
    let user = create_test_user(&state.db, EMAIL, 1).await;

    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_paid"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(paid_session("cs_paid", user.id, 20)),
        )
        .mount(&provider)
        .await;

    let app = create_test_router(&state);
    let confirm = || {
        api_request(
            "POST",
            "/api/payments/confirm",
            EMAIL,
            Some(json!({ "session_id": "cs_paid" })),
        )
    };

    let response = app.clone().oneshot(confirm()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = parse_json_response(response).await;
    assert_eq!(body, json!({ "credited": true, "credits": 21 }));

    let response = app.oneshot(confirm()).await.unwrap();
    let body: Value = parse_json_response(response).await;
    assert_eq!(body, json!({ "credited": false, "credits": 21 }));

    let recorded = payments::Entity::find().all(&state.db).await.unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].amount_cents, 999);
    assert_eq!(recorded[0].payment_intent_id.as_deref(), Some("pi_123"));
}

#[tokio::test]
async fn test_confirm_payment_for_someone_else_or_unpaid() {
    let provider = MockServer::start().await;
    let state = state_with_provider(&provider).await;
    let user = create_test_user(&state.db, EMAIL, 1).await;

    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_foreign"))
        .respond_with(ResponseTemplate::new(200).set_body_json(paid_session(
            "cs_foreign",
            uuid::Uuid::new_v4(),
            5,
        )))
        .mount(&provider)
        .await;

    let mut unpaid = paid_session("cs_unpaid", user.id, 5);
    unpaid["payment_status"] = json!("unpaid");
    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_unpaid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(unpaid))
        .mount(&provider)
        .await;

    let app = create_test_router(&state);

    let response = app
        .clone()
        .oneshot(api_request(
            "POST",
            "/api/payments/confirm",
            EMAIL,
            Some(json!({ "session_id": "cs_foreign" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(api_request(
            "POST",
            "/api/payments/confirm",
            EMAIL,
            Some(json!({ "session_id": "cs_unpaid" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(payments::Entity::find().all(&state.db).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_referral_capture_and_summary() {
    let state = setup_test_app_state().await;
    let referrer = create_test_user(&state.db, "referrer@entrain.test", 1).await;
    create_test_user(&state.db, EMAIL, 1).await;

    let app = create_test_router(&state);

    let response = app
        .clone()
        .oneshot(api_request(
            "POST",
            "/api/referrals",
            EMAIL,
            Some(json!({ "referral_code": format!(" {} ", referrer.id) })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = parse_json_response(response).await;
    assert_eq!(body["message"], "Referral recorded");

    let response = app
        .clone()
        .oneshot(api_request(
            "POST",
            "/api/referrals",
            EMAIL,
            Some(json!({ "referral_code": "friend-of-mine" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .oneshot(api_request(
            "GET",
            "/api/referrals/me",
            "referrer@entrain.test",
            None,
        ))
        .await
        .unwrap();
    let body: Value = parse_json_response(response).await;
    assert_eq!(
        body["referral_link"],
        format!("http://localhost:3000/?ref={}", referrer.id)
    );
    assert_eq!(body["rewarded_count"], 0);
    assert_eq!(body["pending_count"], 1);
}
