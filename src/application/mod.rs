pub mod auth_service;
pub mod card_service;
pub mod upload;
