use std::sync::Arc;

use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::auth::{
    dto::{LoginRequest, RegisterRequest, TokenResponse},
    jwt::{AuthError, JwtKeys},
    password::{check_password_policy, PasswordHashing},
    repo::UserStore,
    repo_types::{NewUser, User},
};
use crate::error::ApiError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registration, login and token resolution over an injected store.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    keys: JwtKeys,
    hashing: PasswordHashing,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, keys: JwtKeys, hashing: PasswordHashing) -> Self {
        Self {
            users,
            keys,
            hashing,
        }
    }

    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<User, ApiError> {
        let email = normalize_email(&req.email);
        if !is_valid_email(&email) {
            return Err(ApiError::Validation("Invalid email".into()));
        }
        let full_name = req.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(ApiError::Validation("Full name must not be empty".into()));
        }
        check_password_policy(&req.password)?;

        // Fast path only; the store's insert is the authority on uniqueness.
        if self.users.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(ApiError::Conflict);
        }

        let hashing = self.hashing.clone();
        let password = req.password;
        let password_hash = tokio::task::spawn_blocking(move || hashing.hash_password(&password))
            .await
            .context("password hashing task")??;

        let user = self
            .users
            .insert(NewUser {
                email,
                password_hash,
                full_name,
            })
            .await?;
        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(user)
    }

    pub async fn login(&self, req: LoginRequest) -> Result<TokenResponse, ApiError> {
        let email = normalize_email(&req.email);
        if !is_valid_email(&email) {
            return Err(ApiError::Validation("Invalid email".into()));
        }

        let hashing = self.hashing.clone();
        let password = req.password;
        let Some(user) = self.users.find_by_email(&email).await? else {
            tokio::task::spawn_blocking(move || hashing.verify_dummy(&password))
                .await
                .context("password verification task")?;
            warn!(email = %email, "login unknown email");
            return Err(ApiError::InvalidCredentials);
        };

        let stored = user.password_hash.clone();
        let ok = tokio::task::spawn_blocking(move || hashing.verify_password(&password, &stored))
            .await
            .context("password verification task")?;

        if !ok {
            warn!(email = %email, user_id = %user.id, "login invalid password");
            return Err(ApiError::InvalidCredentials);
        }
        if !user.is_active {
            warn!(email = %email, user_id = %user.id, "login inactive user");
            return Err(ApiError::InvalidCredentials);
        }

        let access_token = self.keys.issue_token(&user.email)?;
        info!(user_id = %user.id, email = %user.email, "user logged in");
        Ok(TokenResponse::bearer(access_token))
    }

    /// Verifies the token and re-resolves its subject against the store.
    /// A valid signature for a user that no longer resolves is still rejected.
    pub async fn resolve(&self, token: &str) -> Result<User, ApiError> {
        let email = self.keys.verify_token(token)?;
        match self.users.find_by_email(&email).await? {
            Some(user) if user.is_active => Ok(user),
            Some(_) => {
                warn!(email = %email, "token for inactive user");
                Err(AuthError.into())
            }
            None => {
                warn!(email = %email, "token for unknown user");
                Err(AuthError.into())
            }
        }
    }
}
