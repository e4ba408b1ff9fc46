use std::collections::BTreeMap;

use crate::models::{CountryTally, Snapshot};

use super::regions::RegionMap;

/// Converts per-country counts into per-region shares.
#[derive(Debug, Clone, Default)]
pub struct RegionRollup {
    regions: RegionMap,
}

impl RegionRollup {
    pub fn new(regions: RegionMap) -> Self {
        Self { regions }
    }

    pub fn regions(&self) -> &RegionMap {
        &self.regions
    }

    /// Region shares summing to 1.0, or an empty map when there is nothing to count.
    pub fn rollup(&self, counts: &BTreeMap<String, usize>) -> BTreeMap<String, f64> {
        let total: usize = counts.values().sum();
        if total == 0 {
            return BTreeMap::new();
        }

        let mut per_region: BTreeMap<String, usize> = BTreeMap::new();
        for (country, count) in counts.iter().filter(|(_, count)| **count > 0) {
            *per_region
                .entry(self.regions.region_of(country).to_string())
                .or_default() += count;
        }

        per_region
            .into_iter()
            .map(|(region, count)| (region, count as f64 / total as f64))
            .collect()
    }

    pub fn snapshot(&self, tally: CountryTally) -> Snapshot {
        let region_percentages = self.rollup(&tally.country_counts);
        Snapshot {
            total_artists: tally.total_artists,
            country_counts: tally.country_counts,
            region_percentages,
        }
    }
}
