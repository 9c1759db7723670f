//! Cache of usernames already confirmed gone
//!
//! Stored as a JSON array of strings. The file is read once when the bot
//! starts and overwritten once when it finishes.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use tracing::{info, warn};

use crate::error::BotResult;

/// Set of usernames known to be shadowbanned or deleted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoneCache {
    names: HashSet<String>,
}

impl GoneCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the cache from `path`.
    ///
    /// A missing, unreadable or undecodable file yields an empty cache.
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Could not read cache file {}: {e}", path.display());
                return Self::new();
            }
        };

        match serde_json::from_str::<Vec<String>>(&content) {
            Ok(names) => {
                let cache: Self = names.into_iter().collect();
                info!("Loaded {} cached usernames from {}", cache.len(), path.display());
                cache
            }
            Err(e) => {
                warn!("Ignoring corrupt cache file {}: {e}", path.display());
                Self::new()
            }
        }
    }

    /// Overwrite `path` with the cache contents, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save(&self, path: impl AsRef<Path>) -> BotResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Sorted so repeated runs produce stable files
        let sorted: BTreeSet<&String> = self.names.iter().collect();
        let json = serde_json::to_string(&sorted)?;
        tokio::fs::write(path, json).await?;

        info!("Saved {} cached usernames to {}", self.len(), path.display());
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, username: &str) -> bool {
        self.names.contains(username)
    }

    /// Add a username, returning whether it was new
    pub fn insert(&mut self, username: impl Into<String>) -> bool {
        self.names.insert(username.into())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl FromIterator<String> for GoneCache {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}
