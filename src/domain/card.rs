use crate::domain::user::UserId;
use serde::{Deserialize, Serialize};

pub type CardId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    pub id: CardId,
    pub owner_id: UserId,
    pub name: String,
    #[serde(rename = "type")]
    pub card_type: Option<String>,
    pub rarity: Option<String>,
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewCard {
    pub name: String,
    pub card_type: Option<String>,
    pub rarity: Option<String>,
    pub image_path: Option<String>,
}

impl NewCard {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, card_type: impl Into<String>) -> Self {
        self.card_type = Some(card_type.into());
        self
    }

    pub fn with_rarity(mut self, rarity: impl Into<String>) -> Self {
        self.rarity = Some(rarity.into());
        self
    }

    pub fn with_image(mut self, image_path: impl Into<String>) -> Self {
        self.image_path = Some(image_path.into());
        self
    }
}
