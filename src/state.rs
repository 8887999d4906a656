use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{
    jwt::JwtKeys,
    password::PasswordHashing,
    repo::{PgUserStore, UserStore},
    services::AuthService,
};
use crate::config::AppConfig;
use crate::middleware::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: AuthService,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Production wiring: Postgres-backed store with migrations applied.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let store = PgUserStore::connect_lazy(&config)?;

        // Run migrations if the database is reachable
        if let Err(e) = store.migrate().await {
            tracing::warn!(error = %e, "migrations failed; continuing");
        }

        Self::from_parts(config, Arc::new(store))
    }

    pub fn from_parts(config: AppConfig, users: Arc<dyn UserStore>) -> anyhow::Result<Self> {
        let keys = JwtKeys::from_config(&config.jwt);
        let hashing = PasswordHashing::new(config.password_hash_cost)?;
        let limiter = if config.rate_limit_enabled {
            RateLimiter::with_default_routes()
        } else {
            RateLimiter::disabled()
        };
        Ok(Self {
            auth: AuthService::new(users, keys, hashing),
            limiter: Arc::new(limiter),
            config: Arc::new(config),
        })
    }
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}
