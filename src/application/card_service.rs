use crate::domain::card::{Card, CardId, NewCard};
use crate::domain::error::DomainError;
use crate::domain::repository::CardRepository;
use crate::domain::user::UserId;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Clone)]
pub struct CardService {
    repository: Arc<dyn CardRepository>,
}

impl CardService {
    pub fn new(repository: Arc<dyn CardRepository>) -> Self {
        Self { repository }
    }

    #[instrument(skip(self))]
    pub async fn list_cards(&self, user_id: UserId) -> Result<Vec<Card>> {
        let cards = self.repository.list_cards_by_owner(user_id).await?;
        debug!(count = cards.len(), "Listed cards");
        Ok(cards)
    }

    #[instrument(skip(self, card), fields(name = %card.name))]
    pub async fn create_card(&self, user_id: UserId, card: NewCard) -> Result<Card> {
        let name = card.name.trim();
        if name.is_empty() {
            warn!("Rejected card with blank name");
            return Err(DomainError::Validation("Card name must not be empty".to_string()).into());
        }

        let card = NewCard {
            name: name.to_string(),
            card_type: non_blank(card.card_type),
            rarity: non_blank(card.rarity),
            image_path: card.image_path,
        };
        let card = self.repository.insert_card(user_id, card).await?;
        info!(card_id = card.id, "Card created");
        Ok(card)
    }

    /// Only the owner can see a card; anyone else gets `NotFound`, same as a missing id.
    pub async fn get_card(&self, user_id: UserId, card_id: CardId) -> Result<Card> {
        self.repository
            .find_card(user_id, card_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Card not found: {}", card_id)).into())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
