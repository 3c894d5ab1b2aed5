use crate::core::cache::{YieldCache, YieldStore};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Yield cache persisted as a pretty-printed JSON document.
pub struct DiskYieldStore {
    path: PathBuf,
}

impl DiskYieldStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl YieldStore for DiskYieldStore {
    fn load(&self) -> Option<YieldCache> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No yield cache at {}: {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_str::<YieldCache>(&content) {
            Ok(cache) => {
                debug!(
                    "Loaded yield cache from {} (last update {})",
                    self.path.display(),
                    cache.last_update
                );
                Some(cache)
            }
            Err(e) => {
                warn!(
                    "Ignoring corrupt yield cache at {}: {}",
                    self.path.display(),
                    e
                );
                None
            }
        }
    }

    fn save(&self, rates: &BTreeMap<String, f64>, today: NaiveDate) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let cache = YieldCache::new(rates.clone(), today);
        let content = serde_json::to_string_pretty(&cache)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write yield cache to {}", self.path.display()))?;
        debug!("Saved yield cache to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn rates() -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("510720".to_string(), 4.5),
            ("515180".to_string(), 5.12),
        ])
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = DiskYieldStore::new(dir.path().join("nested").join("cache.json"));
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();

        assert!(store.load().is_none());

        store.save(&rates(), today).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.last_update, today);
        assert_eq!(loaded.rates, rates());
    }

    #[test]
    fn test_file_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let store = DiskYieldStore::new(&path);
        store
            .save(&rates(), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["last_update"], "2024-03-15");
        assert_eq!(value["rates"]["515180"], 5.12);
    }

    #[test]
    fn test_corrupt_file_is_a_miss() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let store = DiskYieldStore::new(&path);

        for content in [
            "not json",
            r#"{"rates": {"510720": 4.5}}"#,
            r#"{"last_update": "15/03/2024", "rates": {}}"#,
            r#"{"last_update": "2024-03-15", "rates": {"510720": "high"}}"#,
        ] {
            std::fs::write(&path, content).unwrap();
            assert!(store.load().is_none(), "{content} should be ignored");
        }
    }

    #[test]
    fn test_save_overwrites_wholesale() {
        let dir = tempdir().unwrap();
        let store = DiskYieldStore::new(dir.path().join("cache.json"));
        let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        store.save(&rates(), day).unwrap();

        let replacement = BTreeMap::from([("512890".to_string(), 4.0)]);
        store.save(&replacement, day.succ_opt().unwrap()).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.rates, replacement);
        assert_eq!(loaded.last_update, day.succ_opt().unwrap());
    }
}
