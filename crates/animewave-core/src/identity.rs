//! Client-local pseudo user id.
//!
//! The token scopes history and favorites on the backend. It is generated
//! once per installation and kept in a small JSON file under the platform
//! data directory, keyed by [`IDENTITY_KEY`]. It is not a credential.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::CoreError;

/// Fixed key the token is stored under.
pub const IDENTITY_KEY: &str = "animewave_user_id";

/// Opaque correlation token for history and favorites.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserIdentity(String);

impl UserIdentity {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Fresh random token.
    pub fn generate() -> Self {
        Self(format!("user_{}", Uuid::new_v4().simple()))
    }

    /// Read the persisted token, creating and storing one on first use.
    ///
    /// An unreadable or malformed store is replaced rather than failing
    /// startup; only a failed write is an error.
    pub fn load_or_create(store: &IdentityStore) -> Result<Self, CoreError> {
        match store.read() {
            Ok(Some(identity)) => return Ok(identity),
            Ok(None) => {}
            Err(e) => tracing::warn!(path = %store.path().display(), "discarding identity store: {e}"),
        }

        let identity = Self::generate();
        store.write(&identity)?;
        tracing::info!(user_id = %identity, "created new user identity");
        Ok(identity)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// File-backed key/value store holding the identity token.
#[derive(Debug, Clone)]
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store in the platform data directory.
    pub fn default_location() -> Self {
        Self::new(AppConfig::identity_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when no token has been stored yet.
    fn read(&self) -> Result<Option<UserIdentity>, CoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let entries = self.read_entries()?;
        Ok(entries
            .get(IDENTITY_KEY)
            .map(|token| token.trim())
            .filter(|token| !token.is_empty())
            .map(UserIdentity::new))
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, CoreError> {
        let content = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&content).map_err(|e| CoreError::Identity(e.to_string()))
    }

    fn write(&self, identity: &UserIdentity) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Keep unrelated keys if the existing file is still readable.
        let mut entries = self.read_entries().unwrap_or_default();
        entries.insert(IDENTITY_KEY.to_string(), identity.as_str().to_string());
        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| CoreError::Identity(e.to_string()))?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_distinct() {
        let a = UserIdentity::generate();
        let b = UserIdentity::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("user_"));
        assert_eq!(a.as_str().len(), "user_".len() + 32);
    }

    #[test]
    fn test_created_once_then_reused() {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::new(dir.path().join("data").join("identity.json"));

        let first = UserIdentity::load_or_create(&store).unwrap();
        let second = UserIdentity::load_or_create(&store).unwrap();
        assert_eq!(first, second);

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let entries: BTreeMap<String, String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(entries.get(IDENTITY_KEY).map(String::as_str), Some(first.as_str()));
    }

    #[test]
    fn test_existing_token_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.json");
        std::fs::write(&path, r#"{ "animewave_user_id": "user_fixed" }"#).unwrap();

        let identity = UserIdentity::load_or_create(&IdentityStore::new(&path)).unwrap();
        assert_eq!(identity.as_str(), "user_fixed");
    }

    #[test]
    fn test_corrupt_store_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.json");
        std::fs::write(&path, "not json").unwrap();
        let store = IdentityStore::new(&path);

        let identity = UserIdentity::load_or_create(&store).unwrap();
        assert!(identity.as_str().starts_with("user_"));
        assert_eq!(UserIdentity::load_or_create(&store).unwrap(), identity);
    }

    #[test]
    fn test_blank_token_is_regenerated_and_other_keys_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.json");
        std::fs::write(&path, r#"{ "animewave_user_id": "  ", "theme": "dark" }"#).unwrap();
        let store = IdentityStore::new(&path);

        let identity = UserIdentity::load_or_create(&store).unwrap();
        assert!(identity.as_str().starts_with("user_"));

        let raw = std::fs::read_to_string(&path).unwrap();
        let entries: BTreeMap<String, String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(entries.get("theme").map(String::as_str), Some("dark"));
    }
}
