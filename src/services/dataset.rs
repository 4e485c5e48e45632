// src/services/dataset.rs
use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize, Serializer};
use std::fs;
use std::path::Path;

use crate::handlers::error::{PipelineError, Result};
use crate::models::{InstrumentRecord, RollingReturnsRecord};

/// Key of the rolling-returns entry. Never a real ticker.
pub const ROLLING_RETURNS_KEY: &str = "_ROLLING_RETURNS_";

// Shape of one value in a previously written document.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Rolling(RollingReturnsRecord),
    Instrument(InstrumentRecord),
}

/// Accumulates instrument records keyed by ticker, plus the reserved
/// rolling-returns entry. Every insert replaces whatever was at the key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    instruments: IndexMap<String, InstrumentRecord>,
    rolling: Option<RollingReturnsRecord>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or fully replace an instrument. A replaced key keeps its position.
    pub fn insert_instrument(&mut self, key: impl Into<String>, record: InstrumentRecord) -> Result<()> {
        let key = key.into();
        if key == ROLLING_RETURNS_KEY {
            return Err(PipelineError::ReservedKey(key));
        }
        if self.instruments.insert(key.clone(), record).is_some() {
            debug!("Replaced existing entry for {}", key);
        }
        Ok(())
    }

    pub fn insert_rolling(&mut self, record: RollingReturnsRecord) {
        if self.rolling.replace(record).is_some() {
            debug!("Replaced existing {} entry", ROLLING_RETURNS_KEY);
        }
    }

    pub fn get(&self, key: &str) -> Option<&InstrumentRecord> {
        self.instruments.get(key)
    }

    pub fn rolling(&self) -> Option<&RollingReturnsRecord> {
        self.rolling.as_ref()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.instruments.keys().map(|k| k.as_str())
    }

    pub fn instruments(&self) -> impl Iterator<Item = (&str, &InstrumentRecord)> {
        self.instruments.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entry count including the reserved entry.
    pub fn len(&self) -> usize {
        self.instruments.len() + usize::from(self.rolling.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let stored: IndexMap<String, StoredEntry> = serde_json::from_str(json)?;
        let mut dataset = Dataset::new();
        for (key, entry) in stored {
            match entry {
                StoredEntry::Rolling(record) if key == ROLLING_RETURNS_KEY => dataset.insert_rolling(record),
                StoredEntry::Instrument(record) => dataset.insert_instrument(key, record)?,
                StoredEntry::Rolling(_) => return Err(PipelineError::ReservedKey(key)),
            }
        }
        Ok(dataset)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a document written by an earlier stage. Any failure here is fatal
    /// for the run that depends on it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let dataset = Self::from_json(&contents)?;
        info!("Loaded {} entries from {}", dataset.len(), path.display());
        Ok(dataset)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        info!("Saved {} entries to {}", self.len(), path.display());
        Ok(())
    }
}

impl Serialize for Dataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, record) in &self.instruments {
            map.serialize_entry(key, record)?;
        }
        if let Some(rolling) = &self.rolling {
            map.serialize_entry(ROLLING_RETURNS_KEY, rolling)?;
        }
        map.end()
    }
}
