//! Last-observed modification times of watched files

use std::collections::HashMap;
use std::time::SystemTime;

/// Observed modification metadata of a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatRecord {
    pub path: String,
    pub modified_at: SystemTime,
}

impl StatRecord {
    pub fn new(path: impl Into<String>, modified_at: SystemTime) -> Self {
        Self {
            path: path.into(),
            modified_at,
        }
    }
}

/// Result of comparing a fresh stat against the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// No prior record for this path
    First,
    /// Modification time differs from the cached record
    Changed,
    Unchanged,
}

impl Observation {
    /// Whether this observation counts as a change. First observations only
    /// count when `report_first` is set.
    pub fn is_change(self, report_first: bool) -> bool {
        match self {
            Observation::Changed => true,
            Observation::First => report_first,
            Observation::Unchanged => false,
        }
    }
}

/// Path to last-observed stat. Entries are replaced, never evicted.
#[derive(Debug, Default)]
pub struct StatCache {
    records: HashMap<String, StatRecord>,
}

impl StatCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&StatRecord> {
        self.records.get(path)
    }

    pub fn set(&mut self, record: StatRecord) {
        self.records.insert(record.path.clone(), record);
    }

    /// Compare `record` against the cached entry, then store it.
    pub fn observe(&mut self, record: StatRecord) -> Observation {
        let observation = match self.records.get(&record.path) {
            None => Observation::First,
            Some(cached) if cached.modified_at != record.modified_at => Observation::Changed,
            Some(_) => Observation::Unchanged,
        };
        self.set(record);
        observation
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
