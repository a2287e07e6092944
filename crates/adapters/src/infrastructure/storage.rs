//! File-backed key/value storage
//!
//! All pairs live in one JSON object file chosen by the host. Write failures
//! are logged and swallowed: losing a cached token only costs the user a
//! re-authorization.

use std::path::PathBuf;

use serde_json::{Map, Value};

use stagelink_ports::StorageProvider;

pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_map(&self) -> Map<String, Value> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(_) => return Map::new(),
        };
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => map,
            _ => {
                tracing::warn!("storage file {} is not a JSON object, ignoring", self.path.display());
                Map::new()
            }
        }
    }

    fn write_map(&self, map: &Map<String, Value>) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("failed to create storage directory: {}", e);
                return;
            }
        }
        let text = Value::Object(map.clone()).to_string();
        if let Err(e) = std::fs::write(&self.path, text) {
            tracing::warn!("failed to write storage file {}: {}", self.path.display(), e);
        }
    }
}

impl StorageProvider for FileStorage {
    fn save(&self, key: &str, value: &str) {
        let mut map = self.read_map();
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write_map(&map);
    }

    fn load(&self, key: &str) -> Option<String> {
        self.read_map()
            .get(key)
            .and_then(|v| v.as_str().map(|s| s.to_string()))
    }

    fn remove(&self, key: &str) {
        let mut map = self.read_map();
        if map.remove(key).is_some() {
            self.write_map(&map);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("stagelink-storage-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_save_load_remove_round_trip() {
        let path = temp_path("round-trip.json");
        let storage = FileStorage::new(&path);

        assert_eq!(storage.load("a-v1"), None);
        storage.save("a-v1", "{\"auth_token\":\"t\"}");
        assert_eq!(storage.load("a-v1").as_deref(), Some("{\"auth_token\":\"t\"}"));

        storage.remove("a-v1");
        assert_eq!(storage.load("a-v1"), None);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_load_from_missing_file_is_none() {
        let storage = FileStorage::new(temp_path("never-created.json"));
        assert_eq!(storage.load("anything"), None);
    }
}
