use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use chat_cell::router::chat_routes;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn app(config: &TestConfig) -> Router {
    chat_routes(config.to_arc())
}

fn classify_request(config: &TestConfig, body: Value) -> Request<Body> {
    let user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, None);

    Request::builder()
        .method("POST")
        .uri("/classify")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_classify_high_severity() {
    let config = TestConfig::default();

    let response = app(&config)
        .oneshot(classify_request(&config, json!({ "message": "I have chest pain and a mild headache" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["severity"], "high");
    assert_eq!(json["appointment_needed"], true);
    assert_eq!(json["matched_keyword"], "chest pain");
    assert!(json["recommendation"].as_str().unwrap().contains("book an appointment"));
}

#[tokio::test]
async fn test_blank_message_is_bad_request() {
    let config = TestConfig::default();

    let response = app(&config)
        .oneshot(classify_request(&config, json!({ "message": "   " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_non_string_message_is_rejected() {
    let config = TestConfig::default();

    let response = app(&config)
        .oneshot(classify_request(&config, json!({ "message": 42 })))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_classify_requires_authentication() {
    let config = TestConfig::default();

    let response = app(&config)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/classify")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "message": "runny nose" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
