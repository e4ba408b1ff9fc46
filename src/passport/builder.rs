use std::collections::HashSet;
use std::sync::Arc;

use tokio::time::{Instant, timeout_at};
use tracing::debug;

use crate::models::{CountryTally, Snapshot, SourceKind, UNKNOWN};

use super::resolver::CountryResolver;
use super::rollup::RegionRollup;

/// Turns a list of artist names into a [`Snapshot`].
#[derive(Clone)]
pub struct SnapshotBuilder {
    resolver: Arc<CountryResolver>,
    rollup: RegionRollup,
    recent_limit: usize,
}

impl SnapshotBuilder {
    pub fn new(resolver: Arc<CountryResolver>, rollup: RegionRollup, recent_limit: usize) -> Self {
        Self {
            resolver,
            rollup,
            recent_limit,
        }
    }

    pub fn resolver(&self) -> &CountryResolver {
        &self.resolver
    }

    pub fn rollup(&self) -> &RegionRollup {
        &self.rollup
    }

    pub async fn build<S: AsRef<str>>(&self, names: &[S], source: SourceKind) -> Snapshot {
        let mut tally = CountryTally::default();
        for name in select_names(names, source, self.recent_limit) {
            tally.record(self.resolver.resolve(name).await);
        }
        self.rollup.snapshot(tally)
    }

    /// Like [`build`](Self::build), but stops waiting on external lookups at `deadline`.
    ///
    /// Names still unanswered by then are counted from the seed table and cache where
    /// possible, and as `Unknown` otherwise, so every selected name is still counted.
    pub async fn build_until<S: AsRef<str>>(
        &self,
        names: &[S],
        source: SourceKind,
        deadline: Instant,
    ) -> Snapshot {
        let mut tally = CountryTally::default();
        let mut late = 0usize;
        for name in select_names(names, source, self.recent_limit) {
            let country = if Instant::now() < deadline {
                match timeout_at(deadline, self.resolver.resolve(name)).await {
                    Ok(country) => Some(country),
                    Err(_) => None,
                }
            } else {
                self.resolver
                    .resolve_local(name)
                    .map(|hit| hit.country_or_unknown())
            };
            let country = country.unwrap_or_else(|| {
                late += 1;
                UNKNOWN.to_string()
            });
            tally.record(country);
        }
        if late > 0 {
            debug!(late, total = tally.total_artists, "deadline passed before every name was resolved");
        }
        self.rollup.snapshot(tally)
    }

    /// Merged counts of several snapshots, rolled up once over the combined totals.
    pub fn merge<'a, I>(&self, snapshots: I) -> Snapshot
    where
        I: IntoIterator<Item = &'a Snapshot>,
    {
        let mut tally = CountryTally::default();
        for snapshot in snapshots {
            tally.absorb(snapshot);
        }
        self.rollup.snapshot(tally)
    }
}

/// Names that will be counted, in order. Blank names are dropped; recently played lists are
/// de-duplicated (first occurrence wins) and capped at `recent_limit` (0 = no cap).
pub fn select_names<S: AsRef<str>>(names: &[S], source: SourceKind, recent_limit: usize) -> Vec<&str> {
    let present = names
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| !name.trim().is_empty());

    match source {
        SourceKind::TopArtists => present.collect(),
        SourceKind::RecentlyPlayed => {
            let mut seen = HashSet::new();
            let unique = present.filter(|name| seen.insert(*name));
            if recent_limit == 0 {
                unique.collect()
            } else {
                unique.take(recent_limit).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::LookupOutcome;
    use crate::passport::regions::{NORTH_AMERICA, RegionMap};
    use crate::passport::resolver::tests::FakeLookup;
    use crate::passport::seeds::SeedTable;

    fn builder(resolver: CountryResolver, recent_limit: usize) -> SnapshotBuilder {
        SnapshotBuilder::new(
            Arc::new(resolver),
            RegionRollup::new(RegionMap::from_pairs([("Canada", NORTH_AMERICA)])),
            recent_limit,
        )
    }

    fn drake_only() -> CountryResolver {
        CountryResolver::new(SeedTable::from_pairs([("Drake", "Canada")]), 0)
    }

    #[tokio::test]
    async fn top_artists_count_duplicates() {
        let snapshot = builder(drake_only(), 12)
            .build(&["Drake", "Drake", "UnknownArtist"], SourceKind::TopArtists)
            .await;

        assert_eq!(snapshot.total_artists, 3);
        assert_eq!(snapshot.count_for("Canada"), 2);
        assert_eq!(snapshot.count_for(UNKNOWN), 1);
        assert!((snapshot.share_of(NORTH_AMERICA) - 2.0 / 3.0).abs() < 1e-9);
        assert!((snapshot.share_of(UNKNOWN) - 1.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn recently_played_dedups_before_capping() {
        let snapshot = builder(drake_only(), 2)
            .build(
                &["Drake", "Drake", "", "Someone", "Drake", "Third"],
                SourceKind::RecentlyPlayed,
            )
            .await;

        assert_eq!(snapshot.total_artists, 2);
        assert_eq!(snapshot.count_for("Canada"), 1);
        assert_eq!(snapshot.count_for(UNKNOWN), 1);
        assert_eq!(
            snapshot.country_counts.values().sum::<usize>(),
            snapshot.total_artists
        );
    }

    #[tokio::test]
    async fn blank_names_are_skipped() {
        let snapshot = builder(drake_only(), 12)
            .build(&["", "  ", "Drake"], SourceKind::TopArtists)
            .await;
        assert_eq!(snapshot.total_artists, 1);
    }

    #[tokio::test]
    async fn empty_input_gives_empty_snapshot() {
        let names: [&str; 0] = [];
        let snapshot = builder(drake_only(), 12)
            .build(&names, SourceKind::TopArtists)
            .await;
        assert!(snapshot.is_empty());
        assert!(snapshot.country_counts.is_empty());
        assert!(snapshot.region_percentages.is_empty());
    }

    #[tokio::test]
    async fn capped_names_are_never_looked_up() {
        let lookup = Arc::new(FakeLookup::with(&[(
            "Feist",
            LookupOutcome::Resolved("Canada".into()),
        )]));
        let resolver = CountryResolver::new(SeedTable::empty(), 0).with_lookup(
            lookup.clone(),
            Duration::ZERO,
            Duration::from_secs(3),
        );
        let names = ["Feist", "Feist", "B", "C", "D"];

        let snapshot = builder(resolver, 2)
            .build(&names, SourceKind::RecentlyPlayed)
            .await;

        assert_eq!(snapshot.total_artists, 2);
        assert_eq!(lookup.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_counts_unanswered_names_as_unknown() {
        let lookup = Arc::new(FakeLookup::default().answering(LookupOutcome::Resolved("Canada".into())));
        let resolver = CountryResolver::new(SeedTable::from_pairs([("Drake", "Canada")]), 0)
            .with_lookup(lookup.clone(), Duration::from_secs(1), Duration::from_secs(3));
        let builder = builder(resolver, 12);
        let names = ["A", "B", "C", "D", "E", "Drake"];

        let start = Instant::now();
        let snapshot = builder
            .build_until(&names, SourceKind::TopArtists, start + Duration::from_millis(2500))
            .await;

        assert!(start.elapsed() <= Duration::from_millis(2500));
        assert_eq!(snapshot.total_artists, 6);
        assert_eq!(
            snapshot.country_counts.values().sum::<usize>(),
            snapshot.total_artists
        );
        assert_eq!(lookup.calls(), 3);
        assert_eq!(snapshot.count_for("Canada"), 4);
        assert_eq!(snapshot.count_for(UNKNOWN), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn passed_deadline_still_uses_cached_answers() {
        let lookup = Arc::new(FakeLookup::default().answering(LookupOutcome::Resolved("Canada".into())));
        let resolver = CountryResolver::new(SeedTable::empty(), 0).with_lookup(
            lookup.clone(),
            Duration::ZERO,
            Duration::from_secs(3),
        );
        let builder = builder(resolver, 12);
        builder.build(&["Feist"], SourceKind::TopArtists).await;

        let snapshot = builder
            .build_until(&["Feist", "Grimes"], SourceKind::TopArtists, Instant::now())
            .await;

        assert_eq!(snapshot.count_for("Canada"), 1);
        assert_eq!(snapshot.count_for(UNKNOWN), 1);
        assert_eq!(lookup.calls(), 1);
    }

    #[test]
    fn merge_rolls_up_combined_counts() {
        let builder = builder(drake_only(), 12);
        let mut first = Snapshot::default();
        first.total_artists = 2;
        first.country_counts.insert("Canada".into(), 2);
        let mut second = Snapshot::default();
        second.total_artists = 2;
        second.country_counts.insert("Canada".into(), 1);
        second.country_counts.insert(UNKNOWN.into(), 1);

        let merged = builder.merge([&first, &second]);
        assert_eq!(merged.total_artists, 4);
        assert_eq!(merged.count_for("Canada"), 3);
        assert!((merged.share_of(NORTH_AMERICA) - 0.75).abs() < 1e-9);
        assert!((merged.share_of(UNKNOWN) - 0.25).abs() < 1e-9);
    }
}
