use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::{CallerIdentity, User};
use shared_models::error::AppError;

use crate::models::{
    AppointmentFilter, CreateAppointmentRequest, RespondRequest, UpcomingQuery, UpdateAppointmentRequest,
};
use crate::services::booking::AppointmentBookingService;

// ==============================================================================
// BOOKING
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let caller = CallerIdentity::from(&user);
    let appointment = service.create_appointment(&caller, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment_id": appointment.id,
            "appointment": appointment,
            "message": "Appointment request sent to the doctor"
        })),
    ))
}

// ==============================================================================
// DOCTOR DECISIONS AND LIFECYCLE
// ==============================================================================

#[axum::debug_handler]
pub async fn respond_to_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RespondRequest>,
) -> Result<Json<Value>, AppError> {
    let caller = CallerIdentity::from(&user);
    let appointment = service
        .respond(&caller, appointment_id, request.decision, request.doctor_notes)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let caller = CallerIdentity::from(&user);
    let appointment = service.cancel_appointment(&caller, appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let caller = CallerIdentity::from(&user);
    let appointment = service.complete_appointment(&caller, appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let caller = CallerIdentity::from(&user);
    let appointment = service.update_appointment(&caller, appointment_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let caller = CallerIdentity::from(&user);
    service.delete_appointment(&caller, appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment deleted"
    })))
}

// ==============================================================================
// READS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let caller = CallerIdentity::from(&user);
    let appointment = service.get_appointment(&caller, appointment_id).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(service): State<Arc<AppointmentBookingService>>,
    Extension(user): Extension<User>,
    Query(filter): Query<AppointmentFilter>,
) -> Result<Json<Value>, AppError> {
    let caller = CallerIdentity::from(&user);
    let appointments = service.list_appointments(&caller, filter).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn list_upcoming_appointments(
    State(service): State<Arc<AppointmentBookingService>>,
    Extension(user): Extension<User>,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<Value>, AppError> {
    let caller = CallerIdentity::from(&user);
    let appointments = service.upcoming_appointments(&caller, query).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment_stats(
    State(service): State<Arc<AppointmentBookingService>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let caller = CallerIdentity::from(&user);
    let stats = service.appointment_stats(&caller).await?;

    Ok(Json(json!(stats)))
}
