use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::auth::repo::{StoreError, UserStore};
use crate::auth::repo_types::{NewUser, User};

/// Process-local store keyed by email. Used for tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }

    /// Out-of-band removal, bypassing the HTTP surface.
    pub fn remove(&self, email: &str) -> Option<User> {
        self.users.write().remove(email)
    }

    /// Returns false when no such user exists.
    pub fn set_active(&self, email: &str, active: bool) -> bool {
        match self.users.write().get_mut(email) {
            Some(user) => {
                user.is_active = active;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().get(email).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write();
        if users.contains_key(&user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = user.into_user();
        users.insert(user.email.clone(), user.clone());
        Ok(user)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password_hash: "$argon2id$placeholder".into(),
            full_name: "Ada Lovelace".into(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_identity_and_activates() {
        let store = InMemoryUserStore::new();
        let user = store.insert(new_user("ada@example.com")).await.unwrap();
        assert!(user.is_active);
        let found = store.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.created_at, user.created_at);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryUserStore::new();
        store.insert(new_user("ada@example.com")).await.unwrap();
        let err = store.insert(new_user("ada@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_inserts_admit_exactly_one() {
        let store = Arc::new(InMemoryUserStore::new());
        let mut tasks = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.insert(new_user("race@example.com")).await.is_ok()
            }));
        }
        let mut wins = 0;
        for t in tasks {
            if t.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn lookup_is_exact_match() {
        let store = InMemoryUserStore::new();
        store.insert(new_user("ada@example.com")).await.unwrap();
        assert!(store.find_by_email("ADA@example.com").await.unwrap().is_none());
    }

    #[test]
    fn out_of_band_helpers() {
        let store = InMemoryUserStore::new();
        assert!(!store.set_active("nobody@example.com", false));
        assert!(store.remove("nobody@example.com").is_none());
        assert!(store.is_empty());
    }
}
