//! The catalog backend seam.
//!
//! `CatalogClient` implements this over HTTP; the session controller is
//! generic over it so it can run against any backend.

use std::future::Future;

use crate::types::{
    CatalogItem, CatalogPage, CatalogQuery, FavoriteEntry, HistoryEntry, NewFavorite,
    NewHistoryEntry,
};

/// Calls the session controller makes against the catalog backend.
pub trait CatalogBackend: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Most recently updated titles.
    fn recent(&self, limit: u32)
        -> impl Future<Output = Result<Vec<CatalogItem>, Self::Error>> + Send;

    /// One page of the filtered catalog.
    fn list(
        &self,
        query: &CatalogQuery,
    ) -> impl Future<Output = Result<CatalogPage, Self::Error>> + Send;

    /// Title search. `query` is already trimmed and non-empty.
    fn search(
        &self,
        query: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<CatalogItem>, Self::Error>> + Send;

    fn genres(&self) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send;

    /// Full item detail, including translations and their links.
    fn anime(&self, id: &str) -> impl Future<Output = Result<CatalogItem, Self::Error>> + Send;

    fn history(
        &self,
        user_id: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<HistoryEntry>, Self::Error>> + Send;

    fn add_history(
        &self,
        entry: &NewHistoryEntry,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn remove_history(
        &self,
        user_id: &str,
        anime_id: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn favorites(
        &self,
        user_id: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<FavoriteEntry>, Self::Error>> + Send;

    fn add_favorite(
        &self,
        entry: &NewFavorite,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn remove_favorite(
        &self,
        user_id: &str,
        anime_id: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
