use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::{CallerIdentity, User};
use shared_models::error::AppError;
use shared_utils::extractor::require_admin;

use crate::models::{CreateDoctorRequest, DoctorSearchFilters, UpdateDoctorRequest};
use crate::services::DoctorService;

#[derive(Debug, Deserialize)]
pub struct DoctorSearchQuery {
    pub specialty: Option<String>,
    pub search: Option<String>,
}

impl From<DoctorSearchQuery> for DoctorSearchFilters {
    fn from(query: DoctorSearchQuery) -> Self {
        Self {
            specialty: query.specialty,
            search: query.search,
        }
    }
}

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(
    State(service): State<Arc<DoctorService>>,
    Query(query): Query<DoctorSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let doctors = service.list_doctors(&query.into(), false).await?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn list_specialties(
    State(service): State<Arc<DoctorService>>,
) -> Result<Json<Value>, AppError> {
    let specialties = service.specialties().await?;
    Ok(Json(json!({ "specialties": specialties })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(service): State<Arc<DoctorService>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor = service.get_doctor(doctor_id).await?;
    Ok(Json(json!(doctor)))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_all_doctors(
    State(service): State<Arc<DoctorService>>,
    Extension(user): Extension<User>,
    Query(query): Query<DoctorSearchQuery>,
) -> Result<Json<Value>, AppError> {
    require_admin(&CallerIdentity::from(&user))?;

    let doctors = service.list_doctors(&query.into(), true).await?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn create_doctor(
    State(service): State<Arc<DoctorService>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let caller = CallerIdentity::from(&user);
    let doctor = service.create_doctor(&caller, request).await?;

    Ok((StatusCode::CREATED, Json(json!(doctor))))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(service): State<Arc<DoctorService>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let caller = CallerIdentity::from(&user);
    let doctor = service.update_doctor(&caller, doctor_id, request).await?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn delete_doctor(
    State(service): State<Arc<DoctorService>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let caller = CallerIdentity::from(&user);
    service.delete_doctor(&caller, doctor_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Doctor deleted"
    })))
}

#[axum::debug_handler]
pub async fn seed_doctors(
    State(service): State<Arc<DoctorService>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let caller = CallerIdentity::from(&user);
    let result = service.seed_sample_doctors(&caller).await?;

    Ok(Json(json!(result)))
}
