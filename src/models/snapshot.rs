use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Country or region key used when nothing better is known.
pub const UNKNOWN: &str = "Unknown";

/// Where a list of artist names came from. Decides how duplicates are counted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Ranked list; every entry counts, duplicates included.
    TopArtists,
    /// Listening history; de-duplicated by name and capped before counting.
    RecentlyPlayed,
}

impl Default for SourceKind {
    fn default() -> Self {
        Self::TopArtists
    }
}

/// Resolved artist/country/region summary for one listener or a whole group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Snapshot {
    pub total_artists: usize,
    pub country_counts: BTreeMap<String, usize>,
    pub region_percentages: BTreeMap<String, f64>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            total_artists: 0,
            country_counts: BTreeMap::new(),
            region_percentages: BTreeMap::new(),
        }
    }
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.total_artists == 0
    }

    pub fn count_for(&self, country: &str) -> usize {
        self.country_counts.get(country).copied().unwrap_or_default()
    }

    pub fn share_of(&self, region: &str) -> f64 {
        self.region_percentages
            .get(region)
            .copied()
            .unwrap_or_default()
    }
}

/// Running per-country totals, merged from one or more snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryTally {
    pub total_artists: usize,
    pub country_counts: BTreeMap<String, usize>,
}

impl CountryTally {
    pub fn record(&mut self, country: impl Into<String>) {
        self.total_artists += 1;
        *self.country_counts.entry(country.into()).or_default() += 1;
    }

    pub fn absorb(&mut self, snapshot: &Snapshot) {
        self.total_artists += snapshot.total_artists;
        for (country, count) in &snapshot.country_counts {
            *self.country_counts.entry(country.clone()).or_default() += count;
        }
    }
}
