use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the credential store.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,                   // assigned on creation
    pub email: String,              // normalized, unique
    pub password_hash: String,      // Argon2 PHC string, never exposed
    pub full_name: String,
    pub created_at: OffsetDateTime, // set once
    pub is_active: bool,
}

/// Fields supplied by registration; the store assigns the rest.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
}

impl NewUser {
    pub(crate) fn into_user(self) -> User {
        User {
            id: Uuid::new_v4(),
            email: self.email,
            password_hash: self.password_hash,
            full_name: self.full_name,
            created_at: OffsetDateTime::now_utc(),
            is_active: true,
        }
    }
}
