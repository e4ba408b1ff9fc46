use std::path::Path;

use anyhow::{Context, Result};
use sled::IVec;

use crate::models::OriginRecord;

/// Durable record of confirmed artist origins, used to warm the resolver across restarts.
#[derive(Clone)]
pub struct OriginStore {
    tree: sled::Tree,
}

impl OriginStore {
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path).with_context(|| {
            format!("Failed to open origin database at {}", path.display())
        })?;
        let tree = db
            .open_tree("origins")
            .context("Unable to open origins tree")?;
        Ok(Self { tree })
    }

    pub fn record(&self, artist: &str, country: Option<&str>) -> Result<()> {
        let value = serde_json::to_vec(&OriginRecord::new(artist, country))
            .context("Failed to serialize origin record")?;
        self.tree
            .insert(Self::origin_key(artist), value)
            .context("Failed to persist origin record")?;
        self.tree.flush()?;
        Ok(())
    }

    pub fn get(&self, artist: &str) -> Result<Option<OriginRecord>> {
        self.tree
            .get(Self::origin_key(artist))?
            .map(Self::deserialize_record)
            .transpose()
    }

    /// Stored records in key order. Unreadable entries are skipped.
    pub fn all_origins(&self) -> Result<Vec<OriginRecord>> {
        let mut records = Vec::new();
        for result in self.tree.iter() {
            let (_, value) = result?;
            if let Ok(record) = Self::deserialize_record(value) {
                records.push(record);
            }
        }
        Ok(records)
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    fn deserialize_record(bytes: IVec) -> Result<OriginRecord> {
        serde_json::from_slice::<OriginRecord>(&bytes).context("Unable to deserialize origin record")
    }

    fn origin_key(artist: &str) -> Vec<u8> {
        format!("origin::{artist}").into_bytes()
    }
}
