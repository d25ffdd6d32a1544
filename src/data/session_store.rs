use crate::domain::repository::SessionStore;
use crate::domain::session::Session;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace};

/// Sessions are ephemeral and die with the process.
#[derive(Clone)]
pub struct InMemorySessionStore {
    storage: Arc<RwLock<HashMap<String, Session>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    #[instrument(skip(self, session), fields(user_id = session.user_id))]
    async fn insert_session(&self, session: Session) -> Result<()> {
        let mut storage = self.storage.write().await;
        storage.insert(session.token.clone(), session);
        trace!("Session stored");
        Ok(())
    }

    async fn find_session(&self, token: &str) -> Result<Option<Session>> {
        let now = Utc::now();
        {
            let storage = self.storage.read().await;
            match storage.get(token) {
                None => return Ok(None),
                Some(session) if !session.is_expired_at(now) => return Ok(Some(session.clone())),
                Some(_) => {}
            }
        }

        let mut storage = self.storage.write().await;
        if let Some(session) = storage.get(token) {
            if session.is_expired_at(now) {
                debug!(user_id = session.user_id, "Dropping expired session");
                storage.remove(token);
                return Ok(None);
            }
            return Ok(Some(session.clone()));
        }
        Ok(None)
    }

    async fn remove_session(&self, token: &str) -> Result<()> {
        let mut storage = self.storage.write().await;
        storage.remove(token);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut storage = self.storage.write().await;
        let before = storage.len();
        storage.retain(|_, session| !session.is_expired_at(now));
        Ok(before - storage.len())
    }
}
