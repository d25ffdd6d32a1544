pub mod card_repository;
pub mod session_store;
pub mod sqlite;
pub mod user_repository;
