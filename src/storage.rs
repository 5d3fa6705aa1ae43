use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const TASKS: &str = "tasks";
pub const SUBJECTS: &str = "subjects";
pub const SUBJECT_COLORS: &str = "subject_colors";
pub const CHAT_HISTORY: &str = "chat_history";
pub const API_KEY: &str = "api_key";
pub const CHAT_MODEL: &str = "chat_model";
pub const THEME: &str = "theme";

/// Flat key-value store of JSON documents, one file per key, under the
/// per-user data directory.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn open() -> Result<Store> {
        let dirs = ProjectDirs::from("", "", "studyhall").context("locating data directory")?;
        Ok(Store::at(dirs.data_dir()))
    }

    pub fn at(root: impl AsRef<Path>) -> Store {
        Store {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Reads the value stored at `key`. Absent files, unreadable files,
    /// invalid JSON, and shape mismatches all yield `fallback` rather
    /// than an error.
    pub fn load<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        let data = match fs::read_to_string(self.key_path(key)) {
            Ok(data) => data,
            Err(_) => return fallback,
        };
        serde_json::from_str(&data).unwrap_or(fallback)
    }

    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        fs::create_dir_all(&self.root).with_context(|| format!("creating {:?}", self.root))?;
        let path = self.key_path(key);
        let serialized = serde_json::to_string_pretty(value)
            .with_context(|| format!("serializing {}", key))?;
        fs::write(&path, serialized).with_context(|| format!("writing {:?}", path))?;
        Ok(())
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, Task};
    use chrono::Utc;
    use rand::{distributions::Alphanumeric, Rng};
    use std::collections::HashMap;

    fn scratch_store() -> Store {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        Store::at(std::env::temp_dir().join(format!("studyhall-test-{}", suffix)))
    }

    #[test]
    fn missing_key_yields_fallback() {
        let store = scratch_store();
        let tasks: Vec<Task> = store.load(TASKS, Vec::new());
        assert!(tasks.is_empty());
        let colors: HashMap<String, String> = store.load(SUBJECT_COLORS, HashMap::new());
        assert!(colors.is_empty());
    }

    #[test]
    fn round_trip_preserves_collections() {
        let store = scratch_store();
        let tasks = vec![Task {
            id: "1700000000000-ab12".into(),
            name: "Essay".into(),
            subject: "English".into(),
            due_date: Some("2024-01-01".parse().unwrap()),
            priority: Priority::High,
            completed: false,
            created_at: Utc::now(),
        }];
        store.save(TASKS, &tasks).unwrap();
        let loaded: Vec<Task> = store.load(TASKS, Vec::new());
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, tasks[0].id);
        assert_eq!(loaded[0].due_date, tasks[0].due_date);

        let subjects = vec!["Art".to_string(), "Math".to_string()];
        store.save(SUBJECTS, &subjects).unwrap();
        let loaded: Vec<String> = store.load(SUBJECTS, Vec::new());
        assert_eq!(loaded, subjects);
    }

    #[test]
    fn corrupt_value_yields_fallback() {
        let store = scratch_store();
        fs::create_dir_all(store.path()).unwrap();
        fs::write(store.path().join("tasks.json"), "{not json").unwrap();
        let tasks: Vec<Task> = store.load(TASKS, Vec::new());
        assert!(tasks.is_empty());
    }

    #[test]
    fn wrong_shape_yields_fallback() {
        let store = scratch_store();
        // An object where an array belongs.
        fs::create_dir_all(store.path()).unwrap();
        fs::write(store.path().join("subjects.json"), r#"{"a":1}"#).unwrap();
        let subjects: Vec<String> = store.load(SUBJECTS, Vec::new());
        assert!(subjects.is_empty());
    }

    #[test]
    fn plain_string_keys_round_trip() {
        let store = scratch_store();
        store.save(THEME, &"dark".to_string()).unwrap();
        let theme: String = store.load(THEME, "light".to_string());
        assert_eq!(theme, "dark");
        let missing: String = store.load(API_KEY, String::new());
        assert!(missing.is_empty());
    }
}
