use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use appointment_cell::router::appointment_routes;
use appointment_cell::services::{AppointmentBookingService, InMemoryAppointmentRepository, MeetingLinkMinter};
use doctor_cell::services::{DoctorService, InMemoryDoctorRepository};
use notification_cell::services::{MemoryGateway, NotificationDispatcher};
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

struct TestApp {
    router: Router,
    doctors: Arc<DoctorService>,
    config: TestConfig,
}

impl TestApp {
    fn new() -> Self {
        let config = TestConfig::default();
        let doctors = Arc::new(DoctorService::new(Arc::new(InMemoryDoctorRepository::new())));
        let dispatcher = Arc::new(NotificationDispatcher::start(
            Arc::new(MemoryGateway::new()),
            1,
            16,
            Duration::from_secs(1),
        ));
        let service = Arc::new(AppointmentBookingService::new(
            Arc::new(InMemoryAppointmentRepository::new()),
            Arc::clone(&doctors),
            MeetingLinkMinter::new("https://meet.medibot.test", "meeting-secret"),
            dispatcher,
        ));

        Self {
            router: appointment_routes(config.to_arc(), service),
            doctors,
            config,
        }
    }

    fn token(&self, user: &TestUser) -> String {
        format!("Bearer {}", JwtTestUtils::create_test_token(user, &self.config.jwt_secret, None))
    }

    async fn send(&self, method: &str, uri: &str, user: Option<&TestUser>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("authorization", self.token(user));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}

fn booking_body() -> Value {
    json!({
        "patientName": "Jane Doe",
        "patientEmail": "Jane@Example.com",
        "appointmentDate": "2030-06-15",
        "appointmentTime": "10:30",
        "reason": "Follow-up visit",
        "symptoms": "mild cough"
    })
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let app = TestApp::new();

    let (status, json) = app.send("GET", "/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = TestApp::new();
    let user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_expired_token(&user, &app.config.jwt_secret);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_full_booking_flow_over_http() {
    let app = TestApp::new();
    let admin = TestUser::admin("admin@medibot.com");
    app.doctors.seed_sample_doctors(&admin.to_caller()).await.unwrap();

    let patient = TestUser::patient("jane@example.com");
    let (status, created) = app.send("POST", "/", Some(&patient), Some(booking_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["success"], true);
    assert_eq!(created["appointment"]["status"], "pending");
    assert_eq!(created["appointment"]["patient_email"], "jane@example.com");
    assert_eq!(created["appointment"]["patient_id"], patient.id.as_str());
    assert_eq!(created["appointment"]["appointment_time"], "10:30");
    let id = created["appointment_id"].as_str().unwrap().to_string();

    let (status, approved) = app
        .send("PUT", &format!("/{}/respond", id), Some(&admin), Some(json!({ "decision": "approve" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["appointment"]["status"], "approved");

    let (status, _) = app
        .send("PUT", &format!("/{}/respond", id), Some(&admin), Some(json!({ "decision": "reject" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, fetched) = app.send("GET", &format!("/{}", id), Some(&patient), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["meeting_link"], approved["appointment"]["meeting_link"]);

    let (status, completed) = app.send("POST", &format!("/{}/complete", id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["appointment"]["status"], "completed");

    let (status, stats) = app.send("GET", "/stats", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["completed"], 1);
}

#[tokio::test]
async fn test_validation_errors_list_fields() {
    let app = TestApp::new();
    let patient = TestUser::patient("jane@example.com");

    let (status, json) = app
        .send("POST", "/", Some(&patient), Some(json!({
            "patientName": "Jane Doe",
            "patientEmail": "jane@example.com",
            "appointmentDate": "2024-13-01",
            "appointmentTime": "10:30",
            "reason": "Checkup"
        })))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["fields"][0]["field"], "appointment_date");
}

#[tokio::test]
async fn test_booking_without_doctors_is_not_found() {
    let app = TestApp::new();
    let patient = TestUser::patient("jane@example.com");

    let (status, json) = app.send("POST", "/", Some(&patient), Some(booking_body())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("No doctors available"));
}

#[tokio::test]
async fn test_patient_cannot_respond_or_delete() {
    let app = TestApp::new();
    let admin = TestUser::admin("admin@medibot.com");
    app.doctors.seed_sample_doctors(&admin.to_caller()).await.unwrap();

    let patient = TestUser::patient("jane@example.com");
    let (_, created) = app.send("POST", "/", Some(&patient), Some(booking_body())).await;
    let id = created["appointment_id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send("PUT", &format!("/{}/respond", id), Some(&patient), Some(json!({ "decision": "approve" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send("DELETE", &format!("/{}", id), Some(&patient), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send("DELETE", &format!("/{}", id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send("GET", &format!("/{}", id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_filters_by_query() {
    let app = TestApp::new();
    let admin = TestUser::admin("admin@medibot.com");
    app.doctors.seed_sample_doctors(&admin.to_caller()).await.unwrap();

    let patient = TestUser::patient("jane@example.com");
    for _ in 0..2 {
        app.send("POST", "/", Some(&patient), Some(booking_body())).await;
    }

    let (status, json) = app.send("GET", "/?status=pending&limit=1", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 1);

    let (_, json) = app.send("GET", "/?status=approved", Some(&admin), None).await;
    assert_eq!(json["total"], 0);

    let (_, json) = app.send("GET", "/", Some(&patient), None).await;
    assert_eq!(json["total"], 2);
}

#[tokio::test]
async fn test_reschedule_and_upcoming_over_http() {
    let app = TestApp::new();
    let admin = TestUser::admin("admin@medibot.com");
    app.doctors.seed_sample_doctors(&admin.to_caller()).await.unwrap();

    let patient = TestUser::patient("jane@example.com");
    let (_, created) = app.send("POST", "/", Some(&patient), Some(booking_body())).await;
    let id = created["appointment_id"].as_str().unwrap().to_string();

    let tomorrow = (chrono::Utc::now().date_naive() + chrono::Days::new(1)).to_string();
    let (status, updated) = app
        .send("PATCH", &format!("/{}", id), Some(&patient), Some(json!({
            "appointmentDate": tomorrow,
            "appointmentTime": "11:15"
        })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["appointment"]["appointment_date"], tomorrow.as_str());
    assert_eq!(updated["appointment"]["appointment_time"], "11:15");

    let (status, upcoming) = app.send("GET", "/upcoming?days=3", Some(&patient), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(upcoming["total"], 1);
    assert_eq!(upcoming["appointments"][0]["id"], id.as_str());

    app.send("PUT", &format!("/{}/respond", id), Some(&admin), Some(json!({ "decision": "approve" }))).await;
    let (status, _) = app
        .send("PATCH", &format!("/{}", id), Some(&patient), Some(json!({ "reason": "Too late" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
