use crate::domain::error::DomainError;
use crate::domain::repository::UserRepository;
use crate::domain::user::{NewUser, User, UserId};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace, warn};

#[derive(Default)]
struct UserTable {
    last_id: UserId,
    users: HashMap<UserId, User>,
}

#[derive(Clone)]
pub struct InMemoryUserRepository {
    storage: Arc<RwLock<UserTable>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(UserTable::default())),
        }
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        trace!("Acquiring write lock for user storage");
        let mut storage = self.storage.write().await;
        if storage.users.values().any(|u| u.username == user.username) {
            warn!(username = %user.username, "Username already taken");
            return Err(DomainError::DuplicateUsername.into());
        }

        storage.last_id += 1;
        let user = User {
            id: storage.last_id,
            username: user.username,
            password_hash: user.password_hash,
        };
        storage.users.insert(user.id, user.clone());
        debug!(
            user_id = user.id,
            username = %user.username,
            "User saved to memory storage"
        );
        Ok(user)
    }

    #[instrument(skip(self), fields(username = username))]
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        trace!("Acquiring read lock for user storage");
        let storage = self.storage.read().await;
        let user = storage
            .users
            .values()
            .find(|u| u.username == username)
            .cloned();
        match &user {
            Some(u) => debug!(user_id = u.id, "User found in storage"),
            None => trace!(username = username, "User not found in storage"),
        }
        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = id))]
    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>> {
        let storage = self.storage.read().await;
        Ok(storage.users.get(&id).cloned())
    }
}
