use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dividend yields for the whole basket with a single refresh date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YieldCache {
    pub last_update: NaiveDate,
    pub rates: BTreeMap<String, f64>,
}

impl YieldCache {
    pub fn new(rates: BTreeMap<String, f64>, today: NaiveDate) -> Self {
        Self {
            last_update: today,
            rates,
        }
    }

    /// A cache is fresh while it is younger than `max_age_days` whole days.
    pub fn is_fresh(&self, today: NaiveDate, max_age_days: i64) -> bool {
        (today - self.last_update).num_days() < max_age_days
    }

    /// True when every code has a cached rate.
    pub fn covers<'a>(&self, mut codes: impl Iterator<Item = &'a str>) -> bool {
        codes.all(|code| self.rates.contains_key(code))
    }
}

/// Persistence for the yield cache. The cache is always read and written
/// wholesale.
pub trait YieldStore: Send + Sync {
    /// Returns `None` when nothing usable is stored, including corrupt data.
    fn load(&self) -> Option<YieldCache>;

    fn save(&self, rates: &BTreeMap<String, f64>, today: NaiveDate) -> Result<()>;
}
