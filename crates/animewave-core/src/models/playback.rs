use animewave_api::types::{CatalogItem, Translation, TranslationId};

/// The item open in the player and its selected translation.
#[derive(Debug, Clone)]
pub struct Playback {
    item: CatalogItem,
    translation: Option<Translation>,
}

impl Playback {
    /// Open `item` with its default translation selected.
    pub fn open(item: CatalogItem) -> Self {
        let translation = item.default_translation().cloned();
        Self { item, translation }
    }

    pub fn item(&self) -> &CatalogItem {
        &self.item
    }

    pub fn translation(&self) -> Option<&Translation> {
        self.translation.as_ref()
    }

    /// Select one of the item's listed translations. Unknown ids are ignored.
    pub fn select_translation(&mut self, id: &TranslationId) -> bool {
        match self.item.translation(id) {
            Some(t) => {
                self.translation = Some(t.clone());
                true
            }
            None => false,
        }
    }

    /// URL to embed for the current selection.
    pub fn stream_link(&self) -> Option<&str> {
        self.item.stream_link_for(self.translation.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use animewave_api::types::CatalogKind;

    use super::*;

    fn translation(id: u64, title: &str) -> Translation {
        Translation {
            id: TranslationId::from(id),
            title: title.into(),
            kind: None,
        }
    }

    fn item(translations: Vec<Translation>) -> CatalogItem {
        CatalogItem {
            id: "serial-1".into(),
            title: "Frieren".into(),
            original_title: None,
            other_title: None,
            year: Some(2023),
            kind: CatalogKind::Series,
            anime_kind: Some("tv".into()),
            quality: None,
            episode_count: Some(28),
            last_season: None,
            last_episode: None,
            screenshot_urls: vec![],
            primary_translation: None,
            translations,
            translation_links: HashMap::from([("1".to_string(), "//player/a".to_string())]),
            stream_link: Some("//player/generic".into()),
            kinopoisk_id: None,
            imdb_id: None,
            shikimori_id: None,
            worldart_link: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_open_selects_first_translation() {
        let playback = Playback::open(item(vec![translation(1, "A"), translation(2, "B")]));
        assert_eq!(playback.translation().unwrap().title, "A");
        assert_eq!(playback.stream_link(), Some("//player/a"));
    }

    #[test]
    fn test_selecting_unlinked_translation_uses_generic_link() {
        let mut playback = Playback::open(item(vec![translation(1, "A"), translation(2, "B")]));
        assert!(playback.select_translation(&TranslationId::from(2)));
        assert_eq!(playback.translation().unwrap().title, "B");
        assert_eq!(playback.stream_link(), Some("//player/generic"));
    }

    #[test]
    fn test_unknown_translation_is_ignored() {
        let mut playback = Playback::open(item(vec![translation(1, "A")]));
        assert!(!playback.select_translation(&TranslationId::from(9)));
        assert_eq!(playback.translation().unwrap().title, "A");
    }

    #[test]
    fn test_no_translation_uses_generic_link() {
        let playback = Playback::open(item(vec![]));
        assert!(playback.translation().is_none());
        assert_eq!(playback.stream_link(), Some("//player/generic"));
    }
}
