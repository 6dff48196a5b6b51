use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::task::Task;

/// String key-value storage in the shape of the browser `localStorage` API.
pub trait KeyValueStorage {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove_item(&mut self, key: &str) -> anyhow::Result<()>;
}

impl<T: KeyValueStorage + ?Sized> KeyValueStorage for Box<T> {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) -> anyhow::Result<()> {
        (**self).remove_item(key)
    }
}

/// Key names derived from a single prefix: `<prefix>_data` for the task
/// collection and `<prefix>_<pref>` for preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    prefix: String,
}

impl StorageKeys {
    pub const DEFAULT_PREFIX: &'static str = "app";

    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn data(&self) -> String {
        format!("{}_data", self.prefix)
    }

    pub fn pref(&self, name: &str) -> String {
        format!("{}_{name}", self.prefix)
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PREFIX)
    }
}

/// In-memory storage. A quota (in bytes, counting keys and values) makes
/// writes fail once exceeded, the way a full `localStorage` does.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: BTreeMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            items: BTreeMap::new(),
            quota: Some(quota),
        }
    }

    pub fn set_quota(&mut self, quota: Option<usize>) {
        self.quota = quota;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn used_without(&self, key: &str) -> usize {
        self.items
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        if let Some(quota) = self.quota {
            let needed = self.used_without(key) + key.len() + value.len();
            if needed > quota {
                bail!("storage quota exceeded ({needed} > {quota} bytes)");
            }
        }
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> anyhow::Result<()> {
        self.items.remove(key);
        Ok(())
    }
}

/// All keys of one storage area kept as a single JSON object on disk.
/// Every write replaces the file atomically.
#[derive(Debug)]
pub struct FileStorage {
    pub path: PathBuf,
    items: BTreeMap<String, String>,
}

impl FileStorage {
    pub const FILE_NAME: &'static str = "storage.json";

    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;
        let path = data_dir.join(Self::FILE_NAME);

        let items = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed reading {}", path.display()))?;
            parse_storage_file(&path, &raw)
        } else {
            BTreeMap::new()
        };

        info!(path = %path.display(), keys = items.len(), "opened file storage");
        Ok(Self { path, items })
    }

    fn persist(&self) -> anyhow::Result<()> {
        debug!(file = %self.path.display(), keys = self.items.len(), "writing storage file");
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut temp, &self.items)?;
        writeln!(temp)?;
        temp.flush()?;
        temp.persist(&self.path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.path.display(), err))?;
        Ok(())
    }
}

fn parse_storage_file(path: &Path, raw: &str) -> BTreeMap<String, String> {
    if raw.trim().is_empty() {
        return BTreeMap::new();
    }
    match serde_json::from_str::<BTreeMap<String, String>>(raw) {
        Ok(items) => items,
        Err(err) => {
            warn!(file = %path.display(), error = %err, "storage file unreadable; starting empty");
            BTreeMap::new()
        }
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let previous = self.items.insert(key.to_string(), value.to_string());
        if let Err(err) = self.persist() {
            match previous {
                Some(old) => self.items.insert(key.to_string(), old),
                None => self.items.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> anyhow::Result<()> {
        if self.items.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}

/// Reads the task collection stored under `key`.
///
/// Missing data yields an empty list. Data that is not JSON, or JSON that is
/// not an array, is removed from storage and also yields an empty list.
/// Array entries that do not describe a task are skipped.
#[tracing::instrument(skip(storage))]
pub fn load_tasks<S: KeyValueStorage + ?Sized>(storage: &mut S, key: &str) -> Vec<Task> {
    let raw = match storage.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            warn!(error = %err, "storage unavailable; starting with no tasks");
            return Vec::new();
        }
    };

    let entries = match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) | Err(_) => {
            warn!("stored task data corrupted; resetting");
            if let Err(err) = storage.remove_item(key) {
                warn!(error = %err, "failed removing corrupted task data");
            }
            return Vec::new();
        }
    };

    let total = entries.len();
    let tasks: Vec<Task> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(idx, entry)| match serde_json::from_value::<Task>(entry) {
            Ok(task) if !task.title.trim().is_empty() => Some(task),
            Ok(_) => {
                warn!(index = idx, "skipping stored task with empty title");
                None
            }
            Err(err) => {
                warn!(index = idx, error = %err, "skipping unreadable stored task");
                None
            }
        })
        .collect();

    debug!(total, loaded = tasks.len(), "loaded tasks from storage");
    tasks
}

#[tracing::instrument(skip(storage, tasks), fields(count = tasks.len()))]
pub fn save_tasks<S: KeyValueStorage + ?Sized>(
    storage: &mut S,
    key: &str,
    tasks: &[Task],
) -> anyhow::Result<()> {
    let json = serde_json::to_string(tasks).context("failed to serialize tasks")?;
    storage
        .set_item(key, &json)
        .with_context(|| format!("failed to write {key}"))
}

/// Reads a preference; an unreadable storage reads as "absent".
pub fn get_pref<S: KeyValueStorage + ?Sized>(storage: &S, keys: &StorageKeys, name: &str) -> Option<String> {
    match storage.get_item(&keys.pref(name)) {
        Ok(value) => value,
        Err(err) => {
            debug!(pref = name, error = %err, "preference read failed");
            None
        }
    }
}

pub fn set_pref<S: KeyValueStorage + ?Sized>(storage: &mut S, keys: &StorageKeys, name: &str, value: &str) {
    if let Err(err) = storage.set_item(&keys.pref(name), value) {
        warn!(pref = name, error = %err, "preference write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_prefix() {
        let keys = StorageKeys::default();
        assert_eq!(keys.data(), "app_data");
        assert_eq!(keys.pref("theme"), "app_theme");
        assert_eq!(StorageKeys::new("taskflow").data(), "taskflow_data");
    }

    #[test]
    fn corrupt_payload_is_discarded() {
        let mut storage = MemoryStorage::new();
        storage.set_item("app_data", "{not json").unwrap();
        assert!(load_tasks(&mut storage, "app_data").is_empty());
        assert_eq!(storage.get_item("app_data").unwrap(), None);
    }

    #[test]
    fn non_array_json_is_discarded() {
        let mut storage = MemoryStorage::new();
        storage.set_item("app_data", r#"{"id":"x"}"#).unwrap();
        assert!(load_tasks(&mut storage, "app_data").is_empty());
        assert!(storage.is_empty());
    }

    #[test]
    fn bad_entries_are_skipped_individually() {
        let mut storage = MemoryStorage::new();
        let payload = r#"[
            {"id":"6f1c2f3e-8a6b-4c1e-9a55-0d6a3f0b1c2d","title":"ok","createdAt":"2026-01-01T00:00:00Z","order":0},
            {"title":"no id"},
            {"id":"7f1c2f3e-8a6b-4c1e-9a55-0d6a3f0b1c2d","title":"  ","createdAt":"2026-01-01T00:00:00Z"}
        ]"#;
        storage.set_item("app_data", payload).unwrap();
        let tasks = load_tasks(&mut storage, "app_data");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "ok");
    }

    #[test]
    fn quota_rejects_oversized_writes() {
        let mut storage = MemoryStorage::with_quota(16);
        storage.set_item("k", "small").unwrap();
        assert!(storage.set_item("k", "this value is far too long").is_err());
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("small"));
    }

    #[test]
    fn prefs_round_trip() {
        let keys = StorageKeys::default();
        let mut storage = MemoryStorage::new();
        assert_eq!(get_pref(&storage, &keys, "theme"), None);
        set_pref(&mut storage, &keys, "theme", "dark");
        assert_eq!(get_pref(&storage, &keys, "theme").as_deref(), Some("dark"));
        assert_eq!(storage.get_item("app_theme").unwrap().as_deref(), Some("dark"));
    }
}
