//! SQLite-backed credential and card stores.
//!
//! Both tables live in one database file. The schema is created on connect, and
//! foreign keys are switched on so every card row points at an existing user.

use crate::domain::card::{Card, CardId, NewCard};
use crate::domain::error::DomainError;
use crate::domain::repository::{CardRepository, UserRepository};
use crate::domain::user::{NewUser, User, UserId};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const CREATE_USERS: &str = "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL
    )";

const CREATE_CARDS: &str = "CREATE TABLE IF NOT EXISTS cards (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        \"type\" TEXT,
        rarity TEXT,
        image TEXT,
        FOREIGN KEY(owner_id) REFERENCES users(id)
    )";

const CREATE_CARDS_OWNER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_cards_owner_id ON cards(owner_id)";

#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `url` and makes sure the schema exists.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid database url: {}", url))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open database: {}", url))?;

        let store = Self { pool };
        store.init_schema().await?;
        info!(url = %url, "SQLite store ready");
        Ok(store)
    }

    /// A private in-memory database. Pinned to one connection, since every
    /// SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        for statement in [CREATE_USERS, CREATE_CARDS, CREATE_CARDS_OWNER_INDEX] {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("Schema initialized");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("SQLite store closed");
    }
}

fn row_to_user(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
    })
}

fn row_to_card(row: &SqliteRow) -> Result<Card> {
    Ok(Card {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        name: row.try_get("name")?,
        card_type: row.try_get("type")?,
        rarity: row.try_get("rarity")?,
        image_path: row.try_get("image")?,
    })
}

#[async_trait]
impl UserRepository for SqliteStore {
    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let result = sqlx::query("INSERT INTO users (username, password_hash) VALUES (?, ?)")
            .bind(&user.username)
            .bind(&user.password_hash)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) => {
                let id = done.last_insert_rowid();
                debug!(user_id = id, "User inserted");
                Ok(User {
                    id,
                    username: user.username,
                    password_hash: user.password_hash,
                })
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                warn!(username = %user.username, "Username already taken");
                Err(DomainError::DuplicateUsername.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, password_hash FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, password_hash FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }
}

#[async_trait]
impl CardRepository for SqliteStore {
    #[instrument(skip(self, card), fields(owner_id = owner_id, name = %card.name))]
    async fn insert_card(&self, owner_id: UserId, card: NewCard) -> Result<Card> {
        let done = sqlx::query(
            "INSERT INTO cards (owner_id, name, \"type\", rarity, image) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(owner_id)
        .bind(&card.name)
        .bind(&card.card_type)
        .bind(&card.rarity)
        .bind(&card.image_path)
        .execute(&self.pool)
        .await?;

        let id = done.last_insert_rowid();
        debug!(card_id = id, "Card inserted");
        Ok(Card {
            id,
            owner_id,
            name: card.name,
            card_type: card.card_type,
            rarity: card.rarity,
            image_path: card.image_path,
        })
    }

    async fn list_cards_by_owner(&self, owner_id: UserId) -> Result<Vec<Card>> {
        let rows = sqlx::query(
            "SELECT id, owner_id, name, \"type\", rarity, image
             FROM cards
             WHERE owner_id = ?
             ORDER BY id ASC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_card).collect()
    }

    async fn find_card(&self, owner_id: UserId, id: CardId) -> Result<Option<Card>> {
        let row = sqlx::query(
            "SELECT id, owner_id, name, \"type\", rarity, image
             FROM cards
             WHERE id = ? AND owner_id = ?",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_card).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: format!("hash-of-{}", username),
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_user() {
        let store = SqliteStore::in_memory().await.unwrap();
        let user = store.insert_user(new_user("alice")).await.unwrap();

        let by_name = store.find_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        let by_id = store.find_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.password_hash, "hash-of-alice");
    }

    #[tokio::test]
    async fn test_unique_violation_maps_to_duplicate_username() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.insert_user(new_user("alice")).await.unwrap();

        let err = store.insert_user(new_user("alice")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::DuplicateUsername)
        ));
    }

    #[tokio::test]
    async fn test_cards_are_scoped_to_owner() {
        let store = SqliteStore::in_memory().await.unwrap();
        let alice = store.insert_user(new_user("alice")).await.unwrap();
        let bob = store.insert_user(new_user("bob")).await.unwrap();

        let dragon = store
            .insert_card(alice.id, NewCard::named("Dragon").with_image("x.png"))
            .await
            .unwrap();
        store
            .insert_card(bob.id, NewCard::named("Goblin").with_type("Creature"))
            .await
            .unwrap();

        let alice_cards = store.list_cards_by_owner(alice.id).await.unwrap();
        assert_eq!(alice_cards, vec![dragon.clone()]);

        let bob_cards = store.list_cards_by_owner(bob.id).await.unwrap();
        assert_eq!(bob_cards.len(), 1);
        assert_eq!(bob_cards[0].card_type.as_deref(), Some("Creature"));
        assert!(bob_cards[0].image_path.is_none());

        assert!(store.find_card(bob.id, dragon.id).await.unwrap().is_none());
        assert!(store.find_card(alice.id, dragon.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_card_for_unknown_owner_violates_foreign_key() {
        let store = SqliteStore::in_memory().await.unwrap();
        let result = store.insert_card(12345, NewCard::named("Orphan")).await;
        assert!(result.is_err());
    }
}
