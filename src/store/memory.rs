use crate::core::cache::{YieldCache, YieldStore};
use anyhow::Result;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::debug;

/// In-memory yield store, used when persistence is disabled and in tests.
#[derive(Default)]
pub struct MemoryYieldStore {
    inner: Mutex<Option<YieldCache>>,
}

impl MemoryYieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `cache`.
    pub fn with_cache(cache: YieldCache) -> Self {
        Self {
            inner: Mutex::new(Some(cache)),
        }
    }
}

impl YieldStore for MemoryYieldStore {
    fn load(&self) -> Option<YieldCache> {
        let cache = self.inner.lock().ok()?.clone();
        if cache.is_some() {
            debug!("Yield cache HIT");
        } else {
            debug!("Yield cache MISS");
        }
        cache
    }

    fn save(&self, rates: &BTreeMap<String, f64>, today: NaiveDate) -> Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("Yield store lock poisoned"))?;
        debug!("Yield cache PUT");
        *inner = Some(YieldCache::new(rates.clone(), today));
        Ok(())
    }
}
