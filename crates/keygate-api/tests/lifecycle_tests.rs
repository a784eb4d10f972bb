//! End-to-end license lifecycle tests against the assembled application
//! router: webhook-driven creation, authenticated validation, deletion,
//! and the rate-limit and health surfaces.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{app_state, basic_auth_header, sign_payload, stripe_client, WEBHOOK_SECRET};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

fn app_with_stripe() -> (axum::Router, keygate_api::AppState) {
    // The Stripe base URL is never contacted by webhook processing;
    // only signature verification uses the client here.
    let state = app_state(Some(stripe_client("http://127.0.0.1:9")));
    (keygate_api::app(state.clone()), state)
}

fn webhook_request(payload: &serde_json::Value) -> Request<Body> {
    let bytes = serde_json::to_vec(payload).unwrap();
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .header("stripe-signature", sign_payload(&bytes, WEBHOOK_SECRET))
        .body(Body::from(bytes))
        .unwrap()
}

fn check_request(license_key: &str, fingerprint: &str, forwarded_for: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/check-license")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, basic_auth_header())
        .header("x-forwarded-for", forwarded_for)
        .body(Body::from(
            json!({"license_key": license_key, "fingerprint": fingerprint}).to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn checkout_then_validate_then_cancel() {
    let (app, state) = app_with_stripe();

    // Subscription activated for cus_1 on the yearly plan.
    let response = app
        .clone()
        .oneshot(webhook_request(&json!({
            "id": "evt_checkout_1",
            "type": "checkout.session.completed",
            "data": {"object": {
                "customer": "cus_1",
                "metadata": {"plan": "yearly"},
                "client_reference_id": "fp-abc"
            }}
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let ack: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(ack["status"], "success");

    let licenses = state.licenses.list();
    assert_eq!(licenses.len(), 1);
    assert_eq!(licenses[0].devices_allowed, 3);
    assert_eq!(licenses[0].fingerprint, "fp-abc");
    let license_key = licenses[0].license_key.clone();

    // The issued key validates with the bound fingerprint.
    let response = app
        .clone()
        .oneshot(check_request(&license_key, "fp-abc", "198.51.100.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["plan"], "yearly");
    assert_eq!(body["devices_allowed"], 3);

    // A different fingerprint does not.
    let response = app
        .clone()
        .oneshot(check_request(&license_key, "fp-stolen", "198.51.100.2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Subscription cancelled: the license is revoked.
    let response = app
        .clone()
        .oneshot(webhook_request(&json!({
            "id": "evt_cancel_1",
            "type": "customer.subscription.deleted",
            "data": {"object": {"customer": "cus_1"}}
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(state.licenses.is_empty());

    // The key no longer validates.
    let response = app
        .clone()
        .oneshot(check_request(&license_key, "fp-abc", "198.51.100.3"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn redelivered_webhook_creates_one_license() {
    let (app, state) = app_with_stripe();
    let event = json!({
        "id": "evt_once",
        "type": "checkout.session.completed",
        "data": {"object": {
            "customer": "cus_1",
            "metadata": {"plan": "monthly"},
            "client_reference_id": "fp-abc"
        }}
    });

    for _ in 0..3 {
        let response = app.clone().oneshot(webhook_request(&event)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(state.licenses.len(), 1);
}

#[tokio::test]
async fn validation_rate_limit_applies_despite_valid_credentials() {
    let (app, state) = app_with_stripe();
    let license = keygate_core::License::issue(
        "cus_1",
        keygate_core::Plan::Monthly,
        "fp-abc",
        "unknown",
        "unknown",
    );
    state.licenses.try_create(None, &license);

    // Budget is 10/minute per client address.
    for _ in 0..10 {
        let response = app
            .clone()
            .oneshot(check_request(&license.license_key, "fp-abc", "203.0.113.5"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(check_request(&license.license_key, "fp-abc", "203.0.113.5"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], "RATE_LIMITED");

    // A different client address still has budget.
    let response = app
        .clone()
        .oneshot(check_request(&license.license_key, "fp-abc", "203.0.113.6"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_probes_are_unauthenticated() {
    let (app, _state) = app_with_stripe();

    for path in ["/health/liveness", "/health/readiness"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn index_serves_fallback_html() {
    let (app, _state) = app_with_stripe();

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (app, _state) = app_with_stripe();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let spec: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(spec["paths"].get("/check-license").is_some());
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (app, _state) = app_with_stripe();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
