use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, patch},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::DoctorService;

pub fn doctor_routes(config: Arc<AppConfig>, service: Arc<DoctorService>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/", get(handlers::list_doctors))
        .route("/specialties", get(handlers::list_specialties))
        .route("/{doctor_id}", get(handlers::get_doctor));

    // Admin routes; the handlers enforce the role
    let protected_routes = Router::new()
        .route("/", post(handlers::create_doctor))
        .route("/admin/all", get(handlers::list_all_doctors))
        .route("/seed", post(handlers::seed_doctors))
        .route("/{doctor_id}", patch(handlers::update_doctor).delete(handlers::delete_doctor))
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(service)
}
