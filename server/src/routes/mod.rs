pub mod auth;
pub mod avatars;
pub mod health;
pub mod settings;
pub mod transactions;
pub mod users;
