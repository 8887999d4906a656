use axum::{routing::get, Json, Router};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::instrument;

use crate::{auth::extractors::AuthUser, state::AppState};

#[derive(Debug, Serialize)]
pub struct SecureDataResponse {
    pub message: String,
    pub user: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

pub fn secure_routes() -> Router<AppState> {
    Router::new().route("/secure-data", get(get_secure_data))
}

#[instrument(skip_all)]
pub async fn get_secure_data(AuthUser(user): AuthUser) -> Json<SecureDataResponse> {
    Json(SecureDataResponse {
        message: "This is secure data".into(),
        user: user.email,
        timestamp: OffsetDateTime::now_utc(),
    })
}
