use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// ── Catalog items ────────────────────────────────────────────────

/// Translation identifier. The backend sends these as either JSON numbers
/// or strings; both decode to the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TranslationId(String);

impl TranslationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for TranslationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => Self(n.to_string()),
            Raw::Text(s) => Self(s),
        })
    }
}

impl From<u64> for TranslationId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for TranslationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for TranslationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One audio or subtitle variant of a catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub id: TranslationId,
    pub title: String,
    /// `voice` or `subtitles` when the backend reports it.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Broad item type, decoded from the backend's `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CatalogKind {
    Series,
    Movie,
    Other(String),
}

impl CatalogKind {
    pub fn as_wire_str(&self) -> &str {
        match self {
            Self::Series => "anime-serial",
            Self::Movie => "anime",
            Self::Other(s) => s,
        }
    }
}

impl Default for CatalogKind {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for CatalogKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "anime-serial" => Self::Series,
            "anime" => Self::Movie,
            _ => Self::Other(s),
        }
    }
}

impl From<CatalogKind> for String {
    fn from(kind: CatalogKind) -> Self {
        kind.as_wire_str().to_string()
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Series => write!(f, "Series"),
            Self::Movie => write!(f, "Movie"),
            Self::Other(s) if s.is_empty() => write!(f, "Unknown"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// One anime title as exposed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub title: String,
    #[serde(rename = "title_orig", default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub other_title: Option<String>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(rename = "type", default)]
    pub kind: CatalogKind,
    /// `tv`, `ova`, `ona`, `movie`, `special`, ...
    #[serde(default)]
    pub anime_kind: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(rename = "episodes_count", default)]
    pub episode_count: Option<u32>,
    #[serde(default)]
    pub last_season: Option<u32>,
    #[serde(default)]
    pub last_episode: Option<u32>,
    #[serde(rename = "screenshots", default, deserialize_with = "null_as_default")]
    pub screenshot_urls: Vec<String>,
    #[serde(rename = "translation", default)]
    pub primary_translation: Option<Translation>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub translations: Vec<Translation>,
    /// Stream URL per translation id. Entries may be missing for listed
    /// translations.
    #[serde(default, deserialize_with = "null_as_default")]
    pub translation_links: HashMap<String, String>,
    #[serde(rename = "link", default)]
    pub stream_link: Option<String>,
    #[serde(default)]
    pub kinopoisk_id: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub shikimori_id: Option<String>,
    #[serde(default)]
    pub worldart_link: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl CatalogItem {
    /// First screenshot, used as the card/tracking image.
    pub fn first_screenshot(&self) -> Option<&str> {
        self.screenshot_urls.first().map(String::as_str)
    }

    /// Look up one of this item's listed translations.
    pub fn translation(&self, id: &TranslationId) -> Option<&Translation> {
        self.translations.iter().find(|t| &t.id == id)
    }

    /// Translation selected when playback opens: the first listed one,
    /// otherwise the primary translation.
    pub fn default_translation(&self) -> Option<&Translation> {
        self.translations
            .first()
            .or(self.primary_translation.as_ref())
    }

    /// Stream URL for `translation`: its specific link, else the generic
    /// link, else nothing.
    pub fn stream_link_for(&self, translation: Option<&Translation>) -> Option<&str> {
        translation
            .and_then(|t| self.translation_links.get(t.id.as_str()))
            .or(self.stream_link.as_ref())
            .map(String::as_str)
    }
}

// ── Response envelopes ───────────────────────────────────────────

/// `{ results: [...] }`, with the paging fields `/anime/list` adds.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<CatalogItem>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub prev_page: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenresResponse {
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub message: String,
}

// ── Tracking ─────────────────────────────────────────────────────

/// A watch-history record as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub user_id: String,
    pub anime_id: String,
    #[serde(rename = "anime_title")]
    pub title: String,
    #[serde(rename = "anime_image", default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub progress: Option<u32>,
    #[serde(default)]
    pub season: Option<u32>,
    #[serde(default)]
    pub episode: Option<u32>,
    /// Server-assigned.
    #[serde(default, alias = "watched_at")]
    pub timestamp: Option<String>,
}

/// A favorite marker as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub user_id: String,
    pub anime_id: String,
    #[serde(rename = "anime_title")]
    pub title: String,
    #[serde(rename = "anime_image", default)]
    pub image_url: Option<String>,
    #[serde(default, alias = "created_at")]
    pub added_at: Option<String>,
}

/// Body of `POST /api/history`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewHistoryEntry {
    pub user_id: String,
    pub anime_id: String,
    pub anime_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anime_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
}

/// Body of `POST /api/favorites`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewFavorite {
    pub user_id: String,
    pub anime_id: String,
    pub anime_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anime_image: Option<String>,
}

// ── Catalog queries ──────────────────────────────────────────────

/// Field the catalog list is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Updated,
    Created,
}

impl SortField {
    pub fn as_wire_str(self) -> &'static str {
        match self {
            Self::Updated => "updated_at",
            Self::Created => "created_at",
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "updated" | "updated_at" => Ok(Self::Updated),
            "created" | "created_at" => Ok(Self::Created),
            other => Err(format!("unknown sort field '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_wire_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort order '{other}'")),
        }
    }
}

/// Parameters of `GET /api/anime/list`. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub limit: u32,
    pub types: Option<String>,
    pub anime_kind: Option<String>,
    pub year: Option<u32>,
    pub sort: Option<SortField>,
    pub order: Option<SortOrder>,
}

impl CatalogQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("limit", self.limit.to_string())];
        if let Some(types) = self.types.as_deref().filter(|s| !s.is_empty()) {
            params.push(("types", types.to_string()));
        }
        if let Some(kind) = self.anime_kind.as_deref().filter(|s| !s.is_empty()) {
            params.push(("anime_kind", kind.to_string()));
        }
        if let Some(year) = self.year {
            params.push(("year", year.to_string()));
        }
        if let Some(sort) = self.sort {
            params.push(("sort", sort.as_wire_str().to_string()));
        }
        if let Some(order) = self.order {
            params.push(("order", order.as_wire_str().to_string()));
        }
        params
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item() -> CatalogItem {
        let json = r#"{
            "id": "serial-4242",
            "type": "anime-serial",
            "link": "//kodik.info/serial/4242/abc/720p",
            "title": "Магическая битва",
            "title_orig": "Jujutsu Kaisen",
            "other_title": "呪術廻戦",
            "translation": { "id": 610, "title": "AniLibria.TV", "type": "voice" },
            "translations": [
                { "id": 610, "title": "AniLibria.TV", "type": "voice" },
                { "id": "767", "title": "SHIZA Project" }
            ],
            "translation_links": { "610": "//kodik.info/serial/4242/anilibria/720p" },
            "year": 2020,
            "last_season": 2,
            "last_episode": 23,
            "episodes_count": 47,
            "quality": "WEB-DLRip 720p",
            "screenshots": ["https://i.kodik.biz/1.jpg", "https://i.kodik.biz/2.jpg"],
            "shikimori_id": "40748",
            "updated_at": "2024-01-05T10:00:00Z"
        }"#;
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_deserialize_catalog_item() {
        let item = sample_item();
        assert_eq!(item.id, "serial-4242");
        assert_eq!(item.kind, CatalogKind::Series);
        assert_eq!(item.original_title.as_deref(), Some("Jujutsu Kaisen"));
        assert_eq!(item.episode_count, Some(47));
        assert_eq!(item.translations.len(), 2);
        assert_eq!(item.translations[0].id, TranslationId::from(610));
        assert_eq!(item.translations[1].id, TranslationId::from("767"));
        assert_eq!(item.first_screenshot(), Some("https://i.kodik.biz/1.jpg"));
    }

    #[test]
    fn test_null_collections_decode_empty() {
        let json = r#"{
            "id": "movie-1",
            "type": "anime",
            "link": "//kodik.info/video/1",
            "title": "Your Name",
            "screenshots": null,
            "translations": null,
            "translation_links": null
        }"#;
        let item: CatalogItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.kind, CatalogKind::Movie);
        assert!(item.screenshot_urls.is_empty());
        assert!(item.translations.is_empty());
        assert!(item.translation_links.is_empty());
        assert_eq!(item.first_screenshot(), None);
    }

    #[test]
    fn test_unknown_kind_is_preserved() {
        let kind = CatalogKind::from("cartoon-serial".to_string());
        assert_eq!(kind, CatalogKind::Other("cartoon-serial".into()));
        assert_eq!(kind.as_wire_str(), "cartoon-serial");
    }

    #[test]
    fn test_stream_link_fallbacks() {
        let item = sample_item();
        let listed_with_link = item.translation(&TranslationId::from(610));
        let listed_without_link = item.translation(&TranslationId::from(767));

        assert_eq!(
            item.stream_link_for(listed_with_link),
            Some("//kodik.info/serial/4242/anilibria/720p")
        );
        assert_eq!(
            item.stream_link_for(listed_without_link),
            Some("//kodik.info/serial/4242/abc/720p")
        );
        assert_eq!(
            item.stream_link_for(None),
            Some("//kodik.info/serial/4242/abc/720p")
        );
    }

    #[test]
    fn test_stream_link_absent_without_generic_link() {
        let mut item = sample_item();
        item.stream_link = None;
        let unlinked = item.translation(&TranslationId::from(767));
        assert_eq!(item.stream_link_for(unlinked), None);
        assert_eq!(item.stream_link_for(None), None);
    }

    #[test]
    fn test_default_translation_prefers_list() {
        let mut item = sample_item();
        assert_eq!(item.default_translation().unwrap().id, TranslationId::from(610));

        item.translations.clear();
        item.primary_translation = Some(Translation {
            id: TranslationId::from(1),
            title: "Primary".into(),
            kind: None,
        });
        assert_eq!(item.default_translation().unwrap().title, "Primary");

        item.primary_translation = None;
        assert!(item.default_translation().is_none());
    }

    #[test]
    fn test_history_entry_wire_names() {
        let json = r#"{
            "id": "b1a3",
            "user_id": "user_abc",
            "anime_id": "serial-4242",
            "anime_title": "Магическая битва",
            "anime_image": null,
            "progress": 0,
            "season": 1,
            "episode": 3,
            "watched_at": "2025-03-01T12:00:00"
        }"#;
        let entry: HistoryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.title, "Магическая битва");
        assert_eq!(entry.image_url, None);
        assert_eq!(entry.episode, Some(3));
        assert_eq!(entry.timestamp.as_deref(), Some("2025-03-01T12:00:00"));
    }

    #[test]
    fn test_new_favorite_omits_missing_image() {
        let body = NewFavorite {
            user_id: "user_abc".into(),
            anime_id: "movie-1".into(),
            anime_title: "Your Name".into(),
            anime_image: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "user_id": "user_abc",
                "anime_id": "movie-1",
                "anime_title": "Your Name"
            })
        );
    }

    #[test]
    fn test_query_params_skip_unset_fields() {
        let query = CatalogQuery {
            limit: 20,
            year: Some(2024),
            types: Some(String::new()),
            sort: Some(SortField::Updated),
            order: Some(SortOrder::Desc),
            ..Default::default()
        };
        assert_eq!(
            query.to_params(),
            vec![
                ("limit", "20".to_string()),
                ("year", "2024".to_string()),
                ("sort", "updated_at".to_string()),
                ("order", "desc".to_string()),
            ]
        );
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!("created".parse::<SortField>(), Ok(SortField::Created));
        assert_eq!("updated_at".parse::<SortField>(), Ok(SortField::Updated));
        assert!("rating".parse::<SortField>().is_err());
        assert_eq!("asc".parse::<SortOrder>(), Ok(SortOrder::Asc));
        assert!("up".parse::<SortOrder>().is_err());
    }
}
