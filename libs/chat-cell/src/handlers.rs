use axum::{extract::Extension, Json};
use tracing::info;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{ClassifyRequest, ClassifyResponse};
use crate::services::triage;

#[axum::debug_handler]
pub async fn classify_message(
    Extension(user): Extension<User>,
    Json(request): Json<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>, AppError> {
    if request.message.trim().is_empty() {
        return Err(AppError::BadRequest("Invalid message format".to_string()));
    }

    let result = triage::classify(&request.message);
    info!(
        "Triage for user {}: {} (appointment needed: {})",
        user.id, result.severity, result.appointment_needed
    );

    Ok(Json(result.into()))
}
