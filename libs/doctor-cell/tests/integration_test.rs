use std::sync::Arc;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt;
use serde_json::{json, Value};
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};

use doctor_cell::router::doctor_routes;
use doctor_cell::services::{DoctorService, InMemoryDoctorRepository};
use shared_utils::test_utils::{TestConfig, TestUser, JwtTestUtils, MockSupabaseResponses};

fn create_test_app(config: &TestConfig) -> (Router, Arc<DoctorService>) {
    let service = Arc::new(DoctorService::new(Arc::new(InMemoryDoctorRepository::new())));
    (doctor_routes(config.to_arc(), Arc::clone(&service)), service)
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn bearer(user: &TestUser, config: &TestConfig) -> String {
    format!("Bearer {}", JwtTestUtils::create_test_token(user, &config.jwt_secret, None))
}

#[tokio::test]
async fn test_public_listing_needs_no_token() {
    let config = TestConfig::default();
    let (app, service) = create_test_app(&config);
    let admin = TestUser::admin("admin@medibot.com").to_caller();
    service.seed_sample_doctors(&admin).await.unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/?specialty=cardio")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["doctors"][0]["name"], "Dr. Michael Chen");
}

#[tokio::test]
async fn test_create_doctor_requires_token() {
    let config = TestConfig::default();
    let (app, _) = create_test_app(&config);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(Body::from(json!({
                    "name": "Dr. Who",
                    "specialty": "Time",
                    "email": "who@medibot.com",
                    "consultation_fee": 1.0
                }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_patient_cannot_create_doctor() {
    let config = TestConfig::default();
    let (app, _) = create_test_app(&config);
    let patient = TestUser::patient("patient@example.com");

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("authorization", bearer(&patient, &config))
                .header("content-type", "application/json")
                .body(Body::from(json!({
                    "name": "Dr. Who",
                    "specialty": "Time",
                    "email": "who@medibot.com",
                    "consultationFee": 1.0
                }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_creates_and_deactivates_doctor() {
    let config = TestConfig::default();
    let (app, _) = create_test_app(&config);
    let admin = TestUser::admin("admin@medibot.com");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("authorization", bearer(&admin, &config))
                .header("content-type", "application/json")
                .body(Body::from(json!({
                    "name": "Dr. Priya Nair",
                    "specialty": "Dermatology",
                    "email": "priya.nair@medibot.com",
                    "consultationFee": 120.0,
                    "clerkId": "user_priya"
                }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json(response).await;
    assert_eq!(created["user_id"], "user_priya");
    let doctor_id = created["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/{}", doctor_id))
                .header("authorization", bearer(&admin, &config))
                .header("content-type", "application/json")
                .body(Body::from(json!({ "status": "inactive" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Public listing hides inactive doctors, the admin view does not
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(read_json(response).await["total"], 0);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/admin/all")
                .header("authorization", bearer(&admin, &config))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["total"], 1);
}

#[tokio::test]
async fn test_create_doctor_reports_invalid_fields() {
    let config = TestConfig::default();
    let (app, _) = create_test_app(&config);
    let admin = TestUser::admin("admin@medibot.com");

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("authorization", bearer(&admin, &config))
                .header("content-type", "application/json")
                .body(Body::from(json!({
                    "name": "",
                    "specialty": "Cardiology",
                    "email": "not-an-email",
                    "consultation_fee": -5.0
                }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = read_json(response).await;
    let fields: Vec<&str> = json["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["name", "email", "consultation_fee"]);
}

#[tokio::test]
async fn test_get_unknown_doctor_is_not_found() {
    let config = TestConfig::default();
    let (app, _) = create_test_app(&config);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_supabase_backed_listing() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::supabase(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("order", "created_at.asc,id.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_row(
                "6f0a1d52-6f3f-4c55-9d53-1b1f6f3c0a01", "Dr. Sarah Johnson", "General Medicine", 150.0, "active"
            ),
            MockSupabaseResponses::doctor_row(
                "6f0a1d52-6f3f-4c55-9d53-1b1f6f3c0a02", "Dr. Michael Chen", "Cardiology", 250.0, "inactive"
            ),
        ])))
        .mount(&mock_server)
        .await;

    let service = Arc::new(DoctorService::from_config(&config.to_app_config()));
    let app = doctor_routes(config.to_arc(), service);

    let response = app
        .oneshot(Request::builder().uri("/specialties").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;
    assert_eq!(json["specialties"], json!(["General Medicine"]));
}
