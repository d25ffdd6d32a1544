use crate::domain::card::{Card, CardId, NewCard};
use crate::domain::repository::CardRepository;
use crate::domain::user::UserId;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

// BTreeMap keeps listings in insertion (id) order.
#[derive(Default)]
struct CardTable {
    last_id: CardId,
    cards: BTreeMap<CardId, Card>,
}

#[derive(Clone)]
pub struct InMemoryCardRepository {
    storage: Arc<RwLock<CardTable>>,
}

impl InMemoryCardRepository {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(CardTable::default())),
        }
    }
}

impl Default for InMemoryCardRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CardRepository for InMemoryCardRepository {
    #[instrument(skip(self, card), fields(owner_id = owner_id, name = %card.name))]
    async fn insert_card(&self, owner_id: UserId, card: NewCard) -> Result<Card> {
        let mut storage = self.storage.write().await;
        storage.last_id += 1;
        let card = Card {
            id: storage.last_id,
            owner_id,
            name: card.name,
            card_type: card.card_type,
            rarity: card.rarity,
            image_path: card.image_path,
        };
        storage.cards.insert(card.id, card.clone());
        debug!(card_id = card.id, owner_id = owner_id, "Card saved to memory storage");
        Ok(card)
    }

    async fn list_cards_by_owner(&self, owner_id: UserId) -> Result<Vec<Card>> {
        let storage = self.storage.read().await;
        Ok(storage
            .cards
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn find_card(&self, owner_id: UserId, id: CardId) -> Result<Option<Card>> {
        let storage = self.storage.read().await;
        Ok(storage
            .cards
            .get(&id)
            .filter(|c| c.owner_id == owner_id)
            .cloned())
    }
}
