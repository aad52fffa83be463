pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod openapi;
pub mod password;
pub mod repo;
pub mod routes;
pub mod services;
pub mod storage;

// Re-export commonly used items for tests / external users
pub use config::AppConfig;
pub use routes::{config, AppState};
