use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::ApiError;
use crate::traits::CatalogBackend;
use crate::types::{
    CatalogItem, CatalogPage, CatalogQuery, FavoriteEntry, GenresResponse, HealthResponse,
    HistoryEntry, NewFavorite, NewHistoryEntry,
};

/// HTTP client for the AnimeWave REST backend.
///
/// Every path lives under `{base_url}/api`.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    base_url: Url,
    http: Client,
}

impl CatalogClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: &str, http: Client) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `{base}/api/{segments...}`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status, "catalog API error");
            Err(ApiError::Api {
                status,
                message: body,
            })
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        tracing::debug!(%url, "GET");
        let resp = self.http.get(url).query(query).send().await?;
        let resp = Self::check_response(resp).await?;
        resp.json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// `GET /api/`. Returns the backend greeting.
    pub async fn health(&self) -> Result<String, ApiError> {
        let url = self.endpoint(&[""])?;
        let body: HealthResponse = self.get_json(url, &[]).await?;
        Ok(body.message)
    }
}

impl CatalogBackend for CatalogClient {
    type Error = ApiError;

    async fn recent(&self, limit: u32) -> Result<Vec<CatalogItem>, ApiError> {
        let url = self.endpoint(&["anime", "recent"])?;
        let page: CatalogPage = self.get_json(url, &[("limit", limit.to_string())]).await?;
        Ok(page.results)
    }

    async fn list(&self, query: &CatalogQuery) -> Result<CatalogPage, ApiError> {
        let url = self.endpoint(&["anime", "list"])?;
        self.get_json(url, &query.to_params()).await
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<CatalogItem>, ApiError> {
        let url = self.endpoint(&["anime", "search"])?;
        let page: CatalogPage = self
            .get_json(
                url,
                &[("query", query.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        Ok(page.results)
    }

    async fn genres(&self) -> Result<Vec<String>, ApiError> {
        let url = self.endpoint(&["anime", "genres"])?;
        let body: GenresResponse = self.get_json(url, &[]).await?;
        Ok(body.genres)
    }

    async fn anime(&self, id: &str) -> Result<CatalogItem, ApiError> {
        let url = self.endpoint(&["anime", id])?;
        self.get_json(url, &[]).await
    }

    async fn history(&self, user_id: &str, limit: u32) -> Result<Vec<HistoryEntry>, ApiError> {
        let url = self.endpoint(&["history", user_id])?;
        self.get_json(url, &[("limit", limit.to_string())]).await
    }

    async fn add_history(&self, entry: &NewHistoryEntry) -> Result<(), ApiError> {
        let url = self.endpoint(&["history"])?;
        let resp = self.http.post(url).json(entry).send().await?;
        Self::check_response(resp).await?;
        Ok(())
    }

    async fn remove_history(&self, user_id: &str, anime_id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["history", user_id, anime_id])?;
        let resp = self.http.delete(url).send().await?;
        Self::check_response(resp).await?;
        Ok(())
    }

    async fn favorites(&self, user_id: &str, limit: u32) -> Result<Vec<FavoriteEntry>, ApiError> {
        let url = self.endpoint(&["favorites", user_id])?;
        self.get_json(url, &[("limit", limit.to_string())]).await
    }

    async fn add_favorite(&self, entry: &NewFavorite) -> Result<(), ApiError> {
        let url = self.endpoint(&["favorites"])?;
        let resp = self.http.post(url).json(entry).send().await?;
        Self::check_response(resp).await?;
        Ok(())
    }

    async fn remove_favorite(&self, user_id: &str, anime_id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["favorites", user_id, anime_id])?;
        let resp = self.http.delete(url).send().await?;
        Self::check_response(resp).await?;
        Ok(())
    }
}
