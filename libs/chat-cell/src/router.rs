use std::sync::Arc;

use axum::{
    Router,
    routing::post,
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn chat_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/classify", post(handlers::classify_message))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
}
