//! JSON-file-backed per-user settings.
//!
//! The file maps stringified user IDs to their settings:
//!
//! ```json
//! { "123456": { "target_language": "es" } }
//! ```
//!
//! It is read once on first access and rewritten on every change by writing a
//! sibling temp file and renaming it over the original. A crash mid-write
//! leaves the previous file intact. One process owns the file; concurrent
//! writers from other processes are not supported.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tolmach_core::{config::SettingsConfig, error::TolmachError, shellexpand};
use tracing::{debug, info, warn};

/// Settings for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSettings {
    pub user_id: i64,
    pub target_language: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredSettings {
    target_language: String,
}

type SettingsMap = HashMap<i64, String>;

/// Per-user target-language store.
pub struct SettingsStore {
    path: PathBuf,
    default_language: String,
    /// `None` until the file has been loaded.
    cache: Mutex<Option<SettingsMap>>,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>, default_language: &str) -> Self {
        Self {
            path: path.into(),
            default_language: default_language.trim().to_lowercase(),
            cache: Mutex::new(None),
        }
    }

    pub fn from_config(config: &SettingsConfig, default_language: &str) -> Self {
        Self::new(shellexpand(&config.path), default_language)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Settings for `user_id`, or the defaults if the user never set anything.
    ///
    /// First access loads the file; a missing file is an empty store.
    /// Defaults are never stored, so users without a choice follow the
    /// configured default even when it changes.
    pub fn get(&self, user_id: i64) -> Result<UserSettings, TolmachError> {
        let guard = self.loaded()?;
        let target_language = guard
            .as_ref()
            .and_then(|map| map.get(&user_id))
            .cloned()
            .unwrap_or_else(|| self.default_language.clone());
        Ok(UserSettings {
            user_id,
            target_language,
        })
    }

    /// Set the target language for `user_id` and flush to disk.
    ///
    /// The code is trimmed and lowercased. On any error nothing changes,
    /// neither in memory nor on disk.
    pub fn set_target_language(&self, user_id: i64, lang: &str) -> Result<(), TolmachError> {
        let lang = lang.trim().to_lowercase();
        if lang.is_empty() {
            return Err(TolmachError::Validation("empty language code".into()));
        }

        let mut guard = self.loaded()?;
        let current = guard.get_or_insert_with(HashMap::new);
        let mut next = current.clone();
        next.insert(user_id, lang.clone());
        write_atomic(&self.path, &next)?;
        *current = next;

        info!("user {user_id} target language set to {lang}");
        Ok(())
    }

    /// Number of users who chose a target language.
    pub fn user_count(&self) -> Result<usize, TolmachError> {
        let guard = self.loaded()?;
        Ok(guard.as_ref().map(HashMap::len).unwrap_or(0))
    }

    /// Drop the in-memory copy; the next access re-reads the file.
    pub fn reload(&self) {
        if let Ok(mut guard) = self.cache.lock() {
            *guard = None;
        }
    }

    /// Lock the cache, loading the file first if needed.
    fn loaded(&self) -> Result<MutexGuard<'_, Option<SettingsMap>>, TolmachError> {
        let mut guard = self
            .cache
            .lock()
            .map_err(|_| TolmachError::Settings("settings lock poisoned".into()))?;
        if guard.is_none() {
            *guard = Some(load_file(&self.path)?);
        }
        Ok(guard)
    }
}

/// Read the settings file. A missing or empty file is an empty map.
fn load_file(path: &Path) -> Result<SettingsMap, TolmachError> {
    if !path.exists() {
        debug!("settings file {} not found, starting empty", path.display());
        return Ok(HashMap::new());
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        TolmachError::Settings(format!("failed to read {}: {e}", path.display()))
    })?;
    if content.trim().is_empty() {
        return Ok(HashMap::new());
    }

    let stored: BTreeMap<String, StoredSettings> = serde_json::from_str(&content).map_err(|e| {
        TolmachError::Settings(format!("corrupt settings file {}: {e}", path.display()))
    })?;

    let mut map = HashMap::with_capacity(stored.len());
    for (key, settings) in stored {
        match key.parse::<i64>() {
            Ok(user_id) => {
                map.insert(user_id, settings.target_language);
            }
            Err(_) => warn!("settings: skipping non-numeric user id {key:?}"),
        }
    }
    info!("loaded settings for {} users from {}", map.len(), path.display());
    Ok(map)
}

/// Temp file next to `path`, e.g. `user_settings.json.tmp`.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "settings".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `map` to a temp file, fsync it, and rename it over `path`.
fn write_atomic(path: &Path, map: &SettingsMap) -> Result<(), TolmachError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            TolmachError::Settings(format!("failed to create {}: {e}", parent.display()))
        })?;
    }

    let stored: BTreeMap<String, StoredSettings> = map
        .iter()
        .map(|(id, lang)| {
            (
                id.to_string(),
                StoredSettings {
                    target_language: lang.clone(),
                },
            )
        })
        .collect();
    let json = serde_json::to_string_pretty(&stored)?;

    let tmp = temp_path(path);
    let result = (|| -> std::io::Result<()> {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        std::fs::rename(&tmp, path)
    })();

    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(TolmachError::Settings(format!(
            "failed to write {}: {e}",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> SettingsStore {
        SettingsStore::new(dir.path().join("data/user_settings.json"), "en")
    }

    #[test]
    fn test_get_defaults_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let s = store.get(42).unwrap();
        assert_eq!(s.user_id, 42);
        assert_eq!(s.target_language, "en");
        // Lookup alone does not create the file.
        assert!(!store.path().exists());
    }

    #[test]
    fn test_set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.set_target_language(7, "es").unwrap();
        assert_eq!(store.get(7).unwrap().target_language, "es");
        // Other users are unaffected.
        assert_eq!(store.get(8).unwrap().target_language, "en");
    }

    #[test]
    fn test_lookup_does_not_persist_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.get(1).unwrap().target_language, "en");
        store.set_target_language(2, "es").unwrap();
        assert_eq!(store.user_count().unwrap(), 1);

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert!(value.get("1").is_none());

        let changed = SettingsStore::new(store.path(), "de");
        assert_eq!(changed.get(1).unwrap().target_language, "de");
        assert_eq!(changed.get(2).unwrap().target_language, "es");
    }

    #[test]
    fn test_durable_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        store_in(&dir).set_target_language(7, "es").unwrap();

        let fresh = store_in(&dir);
        assert_eq!(fresh.get(7).unwrap().target_language, "es");
        assert!(!temp_path(fresh.path()).exists(), "temp file should be renamed away");
    }

    #[test]
    fn test_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.set_target_language(123, "de").unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["123"]["target_language"], "de");
    }

    #[test]
    fn test_set_normalizes_and_rejects_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.set_target_language(1, "  FR ").unwrap();
        assert_eq!(store.get(1).unwrap().target_language, "fr");

        let err = store.set_target_language(1, "   ").unwrap_err();
        assert!(matches!(err, TolmachError::Validation(_)));
        assert_eq!(store.get(1).unwrap().target_language, "fr");
    }

    #[test]
    fn test_reads_existing_file_and_skips_bad_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        std::fs::write(
            &path,
            r#"{"5": {"target_language": "ru"}, "not-a-number": {"target_language": "it"}}"#,
        )
        .unwrap();
        let store = SettingsStore::new(&path, "en");
        assert_eq!(store.get(5).unwrap().target_language, "ru");
        assert_eq!(store.user_count().unwrap(), 1);
    }

    #[test]
    fn test_corrupt_file_is_error_and_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::new(&path, "en");
        assert!(matches!(store.get(1), Err(TolmachError::Settings(_))));
        assert!(store.set_target_language(1, "es").is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_empty_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        std::fs::write(&path, "").unwrap();
        let store = SettingsStore::new(&path, "EN");
        assert_eq!(store.get(3).unwrap().target_language, "en");
    }

    #[test]
    fn test_reload_picks_up_external_changes() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.set_target_language(9, "es").unwrap();

        let other = store_in(&dir);
        other.set_target_language(9, "pt").unwrap();

        assert_eq!(store.get(9).unwrap().target_language, "es");
        store.reload();
        assert_eq!(store.get(9).unwrap().target_language, "pt");
    }

    #[test]
    fn test_failed_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the parent directory should be.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let path = blocker.join("user_settings.json");

        let store = SettingsStore::new(&path, "en");
        assert!(store.set_target_language(1, "es").is_err());
        assert_eq!(store.get(1).unwrap().target_language, "en");
    }
}
