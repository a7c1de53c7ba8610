use serde::Serialize;
use serde_json::json;

use animewave_api::types::{CatalogItem, FavoriteEntry, HistoryEntry};
use animewave_api::ApiError;
use animewave_core::error::CoreError;
use animewave_core::identity::UserIdentity;
use animewave_core::models::Playback;

/// Writes command results to stdout as plain lines or pretty JSON.
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn emit<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), CoreError> {
        let text = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
        println!("{text}");
        Ok(())
    }

    pub fn items(&self, items: &[CatalogItem]) -> Result<(), CoreError> {
        if self.json {
            return self.emit(items);
        }
        if items.is_empty() {
            println!("no results");
        }
        for item in items {
            println!("{}", item_line(item));
        }
        Ok(())
    }

    pub fn page(&self, items: &[CatalogItem], total: Option<u64>) -> Result<(), CoreError> {
        if self.json {
            return self.emit(&json!({ "results": items, "total": total }));
        }
        self.items(items)?;
        if let Some(total) = total {
            println!("showing {} of {total}", items.len());
        }
        Ok(())
    }

    pub fn genres(&self, genres: &[String]) -> Result<(), CoreError> {
        if self.json {
            return self.emit(genres);
        }
        for genre in genres {
            println!("{genre}");
        }
        Ok(())
    }

    pub fn history(&self, entries: &[HistoryEntry]) -> Result<(), CoreError> {
        if self.json {
            return self.emit(entries);
        }
        if entries.is_empty() {
            println!("history is empty");
        }
        for entry in entries {
            let position = match (entry.season, entry.episode) {
                (Some(s), Some(e)) => format!("S{s:02}E{e:02}"),
                (None, Some(e)) => format!("E{e:02}"),
                _ => String::new(),
            };
            println!(
                "{:<24} {:<8} {:<20} {}",
                entry.anime_id,
                position,
                entry.timestamp.as_deref().unwrap_or("-"),
                entry.title
            );
        }
        Ok(())
    }

    pub fn favorites(&self, entries: &[FavoriteEntry]) -> Result<(), CoreError> {
        if self.json {
            return self.emit(entries);
        }
        if entries.is_empty() {
            println!("no favorites");
        }
        for entry in entries {
            println!("{:<24} {}", entry.anime_id, entry.title);
        }
        Ok(())
    }

    pub fn playback(&self, playback: Option<&Playback>, link: Option<&str>) -> Result<(), CoreError> {
        let Some(playback) = playback else {
            return Ok(());
        };
        let item = playback.item();
        if self.json {
            return self.emit(&json!({
                "anime_id": item.id,
                "title": item.title,
                "translation": playback.translation(),
                "translations": item.translations,
                "link": link,
            }));
        }

        println!("{}", item_line(item));
        for t in &item.translations {
            let marker = if playback.translation().is_some_and(|s| s.id == t.id) {
                "*"
            } else {
                " "
            };
            println!("  {marker} {:<6} {}", t.id.as_str(), t.title);
        }
        match link {
            Some(link) => println!("{}", absolute_link(link)),
            None => println!("no stream available"),
        }
        Ok(())
    }

    pub fn whoami(
        &self,
        identity: &UserIdentity,
        backend: &str,
        health: Result<String, ApiError>,
    ) -> Result<(), CoreError> {
        let (reachable, message) = match &health {
            Ok(message) => (true, message.clone()),
            Err(e) => (false, e.to_string()),
        };
        if self.json {
            return self.emit(&json!({
                "user_id": identity,
                "backend": backend,
                "reachable": reachable,
                "message": message,
            }));
        }
        println!("user:    {identity}");
        println!("backend: {backend}");
        println!(
            "status:  {} ({message})",
            if reachable { "up" } else { "down" }
        );
        Ok(())
    }
}

fn item_line(item: &CatalogItem) -> String {
    let year = item.year.map(|y| y.to_string()).unwrap_or_else(|| "----".into());
    let kind = item.anime_kind.as_deref().unwrap_or(item.kind.as_wire_str());
    format!("{:<24} {year} {:<8} {}", item.id, kind, item.title)
}

/// Player links come scheme-relative (`//host/...`).
fn absolute_link(link: &str) -> String {
    if link.starts_with("//") {
        format!("https:{link}")
    } else {
        link.to_string()
    }
}
