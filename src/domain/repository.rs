use crate::domain::card::{Card, CardId, NewCard};
use crate::domain::session::Session;
use crate::domain::user::{NewUser, User, UserId};
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts the user and assigns its id. Fails with `DomainError::DuplicateUsername`
    /// when the username is taken; the check and the insert are one atomic step.
    async fn insert_user(&self, user: NewUser) -> Result<User>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>>;
}

#[async_trait]
pub trait CardRepository: Send + Sync {
    async fn insert_card(&self, owner_id: UserId, card: NewCard) -> Result<Card>;
    async fn list_cards_by_owner(&self, owner_id: UserId) -> Result<Vec<Card>>;
    async fn find_card(&self, owner_id: UserId, id: CardId) -> Result<Option<Card>>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: Session) -> Result<()>;
    /// Returns the live session for `token`. Expired sessions are dropped and reported as absent.
    async fn find_session(&self, token: &str) -> Result<Option<Session>>;
    async fn remove_session(&self, token: &str) -> Result<()>;
    /// Drops every expired session, returning how many were removed.
    async fn purge_expired(&self) -> Result<usize>;
}
