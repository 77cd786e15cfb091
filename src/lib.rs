pub mod auth;
pub mod card;
pub mod config;
pub mod crud;
pub mod generate;
pub mod llm;
pub mod palette;
pub mod server;
pub mod utils;
