use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use appointment_cell::services::AppointmentBookingService;
use chat_cell::router::chat_routes;
use doctor_cell::router::doctor_routes;
use doctor_cell::services::DoctorService;
use notification_cell::services::NotificationDispatcher;
use shared_config::AppConfig;

/// Long-lived services shared by every request.
pub struct AppServices {
    pub doctors: Arc<DoctorService>,
    pub appointments: Arc<AppointmentBookingService>,
    pub notifications: Arc<NotificationDispatcher>,
}

impl AppServices {
    /// Wires the store backend and notification gateway named in the config.
    /// Spawns the notification workers, so it must run inside the runtime.
    pub fn from_config(config: &AppConfig) -> Self {
        let doctors = Arc::new(DoctorService::from_config(config));
        let notifications = Arc::new(NotificationDispatcher::from_config(config));
        let appointments = Arc::new(AppointmentBookingService::from_config(
            config,
            Arc::clone(&doctors),
            Arc::clone(&notifications),
        ));

        Self {
            doctors,
            appointments,
            notifications,
        }
    }
}

pub fn create_router(state: Arc<AppConfig>, services: &AppServices) -> Router {
    Router::new()
        .route("/", get(|| async { "MEDIBOT API is running!" }))
        .nest("/appointments", appointment_routes(state.clone(), Arc::clone(&services.appointments)))
        .nest("/doctors", doctor_routes(state.clone(), Arc::clone(&services.doctors)))
        .nest("/chat", chat_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

    async fn body_json(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_chat_suggested_booking_end_to_end() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();
        let services = AppServices::from_config(&app_config);
        let app = create_router(Arc::new(app_config), &services);

        let admin = TestUser::admin("admin@medibot.com");
        let patient = TestUser::patient("jane@example.com");
        let admin_token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, None);
        let patient_token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/doctors/seed")
                    .header("authorization", format!("Bearer {}", admin_token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["count"], 3);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/chat/classify")
                    .header("authorization", format!("Bearer {}", patient_token))
                    .header("content-type", "application/json")
                    .body(Body::from(json!({ "message": "I've had a high fever since yesterday" }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let triage = body_json(response).await;
        assert_eq!(triage["severity"], "high");
        assert_eq!(triage["appointment_needed"], true);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/appointments")
                    .header("authorization", format!("Bearer {}", patient_token))
                    .header("content-type", "application/json")
                    .body(Body::from(json!({
                        "patientName": "Jane Doe",
                        "patientEmail": "jane@example.com",
                        "appointmentDate": "2030-06-15",
                        "appointmentTime": "09:00",
                        "reason": "High fever",
                        "specialty": "general"
                    }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["appointment"]["doctor_name"], "Dr. Sarah Johnson");
        assert_eq!(created["appointment"]["consultation_fee"], 150.0);

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        services.notifications.shutdown().await;
        assert_eq!(services.notifications.stats().delivered, 1);
    }
}
