//! REST client for the AnimeWave catalog backend.

pub mod client;
pub mod error;
pub mod traits;
pub mod types;

pub use client::CatalogClient;
pub use error::ApiError;
pub use traits::CatalogBackend;
