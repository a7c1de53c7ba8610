pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod session;
