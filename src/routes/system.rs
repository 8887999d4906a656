use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tracing::{error, info, instrument};

use crate::{auth::services::AuthService, error::ApiError, state::AppState};

pub fn system_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
}

pub async fn root() -> Json<Value> {
    info!("root endpoint accessed");
    Json(json!({ "message": "Secure Auth API", "status": "secure" }))
}

#[instrument(skip(auth))]
pub async fn health(State(auth): State<AuthService>) -> Result<Json<Value>, ApiError> {
    match auth.users().ping().await {
        Ok(()) => Ok(Json(json!({ "status": "healthy", "database": "connected" }))),
        Err(e) => {
            error!(error = %e, "health check failed");
            Err(ApiError::ServiceUnavailable)
        }
    }
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
