use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};

use crate::error::AppResult;

/// Id of the movie the participant is looking at
pub const CURRENT_MOVIE_ID: &str = "currentMovieId";
/// `1` once the participant has run out of movies
pub const HAS_COMPLETED_VOTING: &str = "hasCompletedVoting";
/// Present once the participant cast at least one upvote
pub const HAS_UPVOTE: &str = "hasUpvote";

/// Durable per-participant key/value storage
///
/// Absent keys mean "no session yet"; callers never assume a key exists.
pub trait SessionStore: Send {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: &str) -> AppResult<()>;

    fn remove(&mut self, key: &str) -> AppResult<()>;
}

/// Store that lives as long as the process
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> AppResult<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> AppResult<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// Store persisted as a JSON object, rewritten on every change
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Opens the store at `path`; a missing or unreadable file starts empty
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();

        let values = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable session file");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };

        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.values)
            .map_err(|e| crate::error::AppError::Internal(e.to_string()))?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl SessionStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> AppResult<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> AppResult<()> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get(CURRENT_MOVIE_ID), None);

        store.set(CURRENT_MOVIE_ID, "3").unwrap();
        assert_eq!(store.get(CURRENT_MOVIE_ID).as_deref(), Some("3"));

        store.remove(CURRENT_MOVIE_ID).unwrap();
        assert_eq!(store.get(CURRENT_MOVIE_ID), None);
    }

    #[test]
    fn test_json_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let mut store = JsonFileStore::open(&path);
        store.set(CURRENT_MOVIE_ID, "2").unwrap();
        store.set(HAS_UPVOTE, "true").unwrap();
        store.remove(HAS_UPVOTE).unwrap();

        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.get(CURRENT_MOVIE_ID).as_deref(), Some("2"));
        assert_eq!(reopened.get(HAS_UPVOTE), None);
    }

    #[test]
    fn test_json_file_store_ignores_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        let store = JsonFileStore::open(&path);
        assert_eq!(store.get(CURRENT_MOVIE_ID), None);
    }
}
