//! Catalog session controller.
//!
//! Owns every piece of client-visible state (filters, loaded lists,
//! history, favorites, playback selection) and defines how each user
//! action turns into backend calls. Backend failures are logged and leave
//! the affected slot untouched; they never fail the session.
//!
//! Catalog fetches triggered by filter edits are numbered. A response is
//! applied only while its number is still the latest issued, so an older
//! request finishing late cannot overwrite a newer result. History,
//! favorites and search responses are whole-list replacements and are
//! accepted as they arrive.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use animewave_api::traits::CatalogBackend;
use animewave_api::types::{
    CatalogItem, CatalogQuery, FavoriteEntry, HistoryEntry, NewFavorite, NewHistoryEntry,
    TranslationId,
};

use crate::config::CatalogConfig;
use crate::error::CoreError;
use crate::identity::UserIdentity;
use crate::models::{FilterState, FilterUpdate, Playback};


/// Snapshot of everything the session exposes to a front end.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub filter: FilterState,
    pub search_query: String,
    pub search_results: Vec<CatalogItem>,
    pub recent_items: Vec<CatalogItem>,
    pub catalog_items: Vec<CatalogItem>,
    /// Total matches reported for the current catalog filter, if any.
    pub catalog_total: Option<u64>,
    pub history: Vec<HistoryEntry>,
    pub favorites: Vec<FavoriteEntry>,
    pub genres: Vec<String>,
    pub playback: Option<Playback>,
}

/// State slots populated by [`CatalogSession::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Recent,
    Catalog,
    History,
    Favorites,
    Genres,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recent => write!(f, "recent"),
            Self::Catalog => write!(f, "catalog"),
            Self::History => write!(f, "history"),
            Self::Favorites => write!(f, "favorites"),
            Self::Genres => write!(f, "genres"),
        }
    }
}

/// Which initial fetches failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    pub failed: Vec<Slot>,
}

impl InitReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn fail(&mut self, slot: Slot, error: &dyn std::error::Error) {
        warn!(%slot, "initial fetch failed: {error}");
        self.failed.push(slot);
    }
}

/// What happened to a state slot after an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response replaced the slot.
    Applied,
    /// No request was needed.
    Skipped,
    /// A newer request superseded this one; the response was dropped.
    Stale,
    /// The request failed; the slot is unchanged.
    Failed,
}

/// Membership the client asked the backend for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteToggle {
    Added,
    Removed,
}

/// Handle to one catalog session. Clones share the same state.
pub struct CatalogSession<B> {
    inner: Arc<Inner<B>>,
}

struct Inner<B> {
    backend: B,
    identity: UserIdentity,
    limits: CatalogConfig,
    state: RwLock<SessionState>,
    filter_seq: AtomicU64,
    in_flight: AtomicUsize,
}

impl<B> Clone for CatalogSession<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Counts one outstanding backend request for as long as it lives.
struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<B: CatalogBackend> CatalogSession<B> {
    pub fn new(backend: B, identity: UserIdentity, limits: CatalogConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                identity,
                limits,
                state: RwLock::new(SessionState::default()),
                filter_seq: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
            }),
        }
    }

    pub fn identity(&self) -> &UserIdentity {
        &self.inner.identity
    }

    /// True while any backend request is outstanding.
    pub fn is_loading(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst) > 0
    }

    pub async fn snapshot(&self) -> SessionState {
        self.inner.state.read().await.clone()
    }

    fn loading(&self) -> LoadingGuard<'_> {
        LoadingGuard::new(&self.inner.in_flight)
    }

    fn next_filter_seq(&self) -> u64 {
        self.inner.filter_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, seq: u64) -> bool {
        self.inner.filter_seq.load(Ordering::SeqCst) == seq
    }

    // ── Startup ──────────────────────────────────────────────────

    /// Fetch recent items, the default catalog, history, favorites and
    /// genres concurrently. Each slot succeeds or fails on its own.
    pub async fn initialize(&self) -> InitReport {
        let _loading = self.loading();
        let inner = &*self.inner;
        let user = inner.identity.as_str();
        let limits = inner.limits;

        let (query, seq) = {
            let state = inner.state.read().await;
            (state.filter.to_query(limits.list_limit), self.next_filter_seq())
        };

        let (recent, catalog, history, favorites, genres) = tokio::join!(
            inner.backend.recent(limits.recent_limit),
            inner.backend.list(&query),
            inner.backend.history(user, limits.history_limit),
            inner.backend.favorites(user, limits.favorites_limit),
            inner.backend.genres(),
        );

        let mut report = InitReport::default();
        let mut state = inner.state.write().await;
        match recent {
            Ok(items) => state.recent_items = items,
            Err(e) => report.fail(Slot::Recent, &e),
        }
        match catalog {
            Ok(page) if self.is_current(seq) => {
                state.catalog_items = page.results;
                state.catalog_total = page.total;
            }
            Ok(_) => debug!(seq, "initial catalog superseded by a filter fetch"),
            Err(e) => report.fail(Slot::Catalog, &e),
        }
        match history {
            Ok(entries) => state.history = entries,
            Err(e) => report.fail(Slot::History, &e),
        }
        match favorites {
            Ok(entries) => state.favorites = entries,
            Err(e) => report.fail(Slot::Favorites, &e),
        }
        match genres {
            Ok(genres) => state.genres = genres,
            Err(e) => report.fail(Slot::Genres, &e),
        }

        info!(
            user_id = %inner.identity,
            failed = report.failed.len(),
            "session initialized"
        );
        report
    }

    // ── Catalog filtering ────────────────────────────────────────

    /// Merge one filter field and re-fetch the catalog if needed.
    pub async fn update_filter(&self, update: FilterUpdate) -> FetchOutcome {
        self.apply_filters([update]).await
    }

    /// Merge several filter fields, then issue at most one catalog fetch.
    ///
    /// A fetch is issued when the merged filter is active, or when the
    /// merge returned an active filter to the default state (the catalog
    /// is then reloaded unfiltered). Nothing is fetched when the filter was
    /// and still is at its default.
    pub async fn apply_filters(
        &self,
        updates: impl IntoIterator<Item = FilterUpdate>,
    ) -> FetchOutcome {
        let (query, seq) = {
            let mut state = self.inner.state.write().await;
            let was_active = state.filter.is_active();
            for update in updates {
                state.filter.apply(update);
            }
            if !was_active && !state.filter.is_active() {
                return FetchOutcome::Skipped;
            }
            // Numbered under the lock so issue order follows merge order.
            (
                state.filter.to_query(self.inner.limits.list_limit),
                self.next_filter_seq(),
            )
        };
        self.fetch_catalog(seq, &query).await
    }

    /// Re-fetch the catalog for the current filter, active or not.
    pub async fn reload_catalog(&self) -> FetchOutcome {
        let (query, seq) = {
            let state = self.inner.state.read().await;
            (
                state.filter.to_query(self.inner.limits.list_limit),
                self.next_filter_seq(),
            )
        };
        self.fetch_catalog(seq, &query).await
    }

    async fn fetch_catalog(&self, seq: u64, query: &CatalogQuery) -> FetchOutcome {
        let _loading = self.loading();
        debug!(seq, ?query, "fetching catalog");
        let result = self.inner.backend.list(query).await;

        let mut state = self.inner.state.write().await;
        if !self.is_current(seq) {
            debug!(seq, "dropping stale catalog response");
            return FetchOutcome::Stale;
        }
        match result {
            Ok(page) => {
                state.catalog_items = page.results;
                state.catalog_total = page.total;
                FetchOutcome::Applied
            }
            Err(e) => {
                warn!(seq, "catalog fetch failed: {e}");
                FetchOutcome::Failed
            }
        }
    }

    // ── Recent and genres ────────────────────────────────────────

    /// Replace the recent list with the newest titles.
    pub async fn refresh_recent(&self) -> FetchOutcome {
        let _loading = self.loading();
        match self
            .inner
            .backend
            .recent(self.inner.limits.recent_limit)
            .await
        {
            Ok(items) => {
                self.inner.state.write().await.recent_items = items;
                FetchOutcome::Applied
            }
            Err(e) => {
                warn!("recent fetch failed: {e}");
                FetchOutcome::Failed
            }
        }
    }

    pub async fn refresh_genres(&self) -> FetchOutcome {
        let _loading = self.loading();
        match self.inner.backend.genres().await {
            Ok(genres) => {
                self.inner.state.write().await.genres = genres;
                FetchOutcome::Applied
            }
            Err(e) => {
                warn!("genres fetch failed: {e}");
                FetchOutcome::Failed
            }
        }
    }

    // ── Search ───────────────────────────────────────────────────

    /// Search by title. Blank queries are ignored.
    pub async fn search(&self, query: &str) -> FetchOutcome {
        let query = query.trim();
        if query.is_empty() {
            return FetchOutcome::Skipped;
        }

        let _loading = self.loading();
        match self
            .inner
            .backend
            .search(query, self.inner.limits.search_limit)
            .await
        {
            Ok(items) => {
                debug!(query, results = items.len(), "search complete");
                let mut state = self.inner.state.write().await;
                state.search_query = query.to_string();
                state.search_results = items;
                FetchOutcome::Applied
            }
            Err(e) => {
                warn!(query, "search failed: {e}");
                FetchOutcome::Failed
            }
        }
    }

    pub async fn clear_search(&self) {
        let mut state = self.inner.state.write().await;
        state.search_query.clear();
        state.search_results.clear();
    }

    // ── Item detail ──────────────────────────────────────────────

    /// Fetch the full record for one item.
    pub async fn item(&self, id: &str) -> Result<CatalogItem, CoreError> {
        let _loading = self.loading();
        self.inner
            .backend
            .anime(id)
            .await
            .map_err(|e| CoreError::Api(e.to_string()))
    }

    // ── History ──────────────────────────────────────────────────

    /// Record that `item` was opened, then reload history.
    pub async fn record_history(&self, item: &CatalogItem) -> FetchOutcome {
        self.post_history(self.history_entry(item)).await
    }

    /// Record a specific episode of `item`, then reload history.
    pub async fn record_episode(
        &self,
        item: &CatalogItem,
        season: Option<u32>,
        episode: u32,
    ) -> FetchOutcome {
        let entry = NewHistoryEntry {
            season,
            episode: Some(episode),
            ..self.history_entry(item)
        };
        self.post_history(entry).await
    }

    fn history_entry(&self, item: &CatalogItem) -> NewHistoryEntry {
        NewHistoryEntry {
            user_id: self.inner.identity.as_str().to_string(),
            anime_id: item.id.clone(),
            anime_title: item.title.clone(),
            anime_image: item.first_screenshot().map(str::to_string),
            season: None,
            episode: None,
        }
    }

    async fn post_history(&self, entry: NewHistoryEntry) -> FetchOutcome {
        {
            let _loading = self.loading();
            if let Err(e) = self.inner.backend.add_history(&entry).await {
                warn!(anime_id = %entry.anime_id, "failed to record history: {e}");
                return FetchOutcome::Failed;
            }
        }
        debug!(anime_id = %entry.anime_id, "history recorded");
        self.refresh_history().await
    }

    /// Remove one title from history, then reload history.
    pub async fn remove_history(&self, anime_id: &str) -> FetchOutcome {
        {
            let _loading = self.loading();
            let user = self.inner.identity.as_str();
            if let Err(e) = self.inner.backend.remove_history(user, anime_id).await {
                warn!(anime_id, "failed to remove history entry: {e}");
                return FetchOutcome::Failed;
            }
        }
        self.refresh_history().await
    }

    /// Replace the history list with the server's copy.
    pub async fn refresh_history(&self) -> FetchOutcome {
        let _loading = self.loading();
        let user = self.inner.identity.as_str();
        match self
            .inner
            .backend
            .history(user, self.inner.limits.history_limit)
            .await
        {
            Ok(entries) => {
                self.inner.state.write().await.history = entries;
                FetchOutcome::Applied
            }
            Err(e) => {
                warn!("history fetch failed: {e}");
                FetchOutcome::Failed
            }
        }
    }

    // ── Favorites ────────────────────────────────────────────────

    pub async fn is_favorite(&self, anime_id: &str) -> bool {
        self.inner
            .state
            .read()
            .await
            .favorites
            .iter()
            .any(|f| f.anime_id == anime_id)
    }

    /// Add or remove `item` depending on the currently loaded favorites,
    /// then reload favorites. Returns `None` if the change was rejected.
    ///
    /// Two toggles issued before the reload completes can race; the next
    /// reload reconciles with whatever the server settled on.
    pub async fn toggle_favorite(&self, item: &CatalogItem) -> Option<FavoriteToggle> {
        let user = self.inner.identity.as_str();
        let present = self.is_favorite(&item.id).await;

        let result = {
            let _loading = self.loading();
            if present {
                self.inner
                    .backend
                    .remove_favorite(user, &item.id)
                    .await
                    .map(|()| FavoriteToggle::Removed)
            } else {
                let entry = NewFavorite {
                    user_id: user.to_string(),
                    anime_id: item.id.clone(),
                    anime_title: item.title.clone(),
                    anime_image: item.first_screenshot().map(str::to_string),
                };
                self.inner
                    .backend
                    .add_favorite(&entry)
                    .await
                    .map(|()| FavoriteToggle::Added)
            }
        };

        match result {
            Ok(toggle) => {
                info!(anime_id = %item.id, ?toggle, "favorite toggled");
                self.refresh_favorites().await;
                Some(toggle)
            }
            Err(e) => {
                warn!(anime_id = %item.id, "favorite toggle failed: {e}");
                None
            }
        }
    }

    /// Replace the favorites list with the server's copy.
    pub async fn refresh_favorites(&self) -> FetchOutcome {
        let _loading = self.loading();
        let user = self.inner.identity.as_str();
        match self
            .inner
            .backend
            .favorites(user, self.inner.limits.favorites_limit)
            .await
        {
            Ok(entries) => {
                self.inner.state.write().await.favorites = entries;
                FetchOutcome::Applied
            }
            Err(e) => {
                warn!("favorites fetch failed: {e}");
                FetchOutcome::Failed
            }
        }
    }

    // ── Playback ─────────────────────────────────────────────────

    /// Open `item` in the player with its default translation.
    pub async fn open_playback(&self, item: CatalogItem) {
        let playback = Playback::open(item);
        debug!(
            anime_id = %playback.item().id,
            translation = ?playback.translation().map(|t| &t.id),
            "playback opened"
        );
        self.inner.state.write().await.playback = Some(playback);
    }

    /// Fetch the full item record, then open it.
    pub async fn open_playback_by_id(&self, id: &str) -> Result<(), CoreError> {
        let item = self.item(id).await?;
        self.open_playback(item).await;
        Ok(())
    }

    pub async fn close_playback(&self) {
        self.inner.state.write().await.playback = None;
    }

    /// Switch to another of the open item's translations. Ids the item
    /// does not list are ignored.
    pub async fn select_translation(&self, id: &TranslationId) -> bool {
        let mut state = self.inner.state.write().await;
        let selected = state
            .playback
            .as_mut()
            .is_some_and(|p| p.select_translation(id));
        if !selected {
            debug!(%id, "ignoring unknown translation");
        }
        selected
    }

    /// Stream URL for the open item and selected translation.
    pub async fn resolve_stream_link(&self) -> Option<String> {
        self.inner
            .state
            .read()
            .await
            .playback
            .as_ref()
            .and_then(Playback::stream_link)
            .map(str::to_string)
    }
}

impl<B: CatalogBackend + 'static> CatalogSession<B> {
    /// Open `item` for playback right away and record it in history in
    /// the background. The returned handle resolves once history has been
    /// recorded and reloaded; dropping it does not cancel the task.
    pub async fn start_watching(&self, item: CatalogItem) -> JoinHandle<FetchOutcome> {
        let session = self.clone();
        let tracked = item.clone();
        let handle = tokio::spawn(async move { session.record_history(&tracked).await });
        self.open_playback(item).await;
        handle
    }
}
