use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::models::{LookupOutcome, Resolution, ResolutionTier};
use crate::origins::OriginStore;

use super::cache::ResolutionCache;
use super::seeds::SeedTable;
use super::throttle::IntervalGate;

/// External service that can name an artist's country of origin.
#[async_trait]
pub trait OriginLookup: Send + Sync {
    async fn lookup_origin(&self, artist: &str) -> LookupOutcome;
}

struct ExternalLookup {
    client: Arc<dyn OriginLookup>,
    gate: IntervalGate,
    timeout: Duration,
}

/// Artist name → country, trying the seed table, then the cache, then the external lookup.
///
/// Never fails: anything that cannot be resolved comes back as `Unknown`. Every external
/// outcome is cached, so a name reaches the lookup service at most once per process.
pub struct CountryResolver {
    seeds: SeedTable,
    cache: ResolutionCache,
    external: Option<ExternalLookup>,
    store: Option<OriginStore>,
    // Serializes external lookups so concurrent misses on one name cannot both go out.
    lookup_slot: Mutex<()>,
}

impl CountryResolver {
    pub fn new(seeds: SeedTable, cache_capacity: usize) -> Self {
        Self {
            seeds,
            cache: ResolutionCache::new(cache_capacity),
            external: None,
            store: None,
            lookup_slot: Mutex::new(()),
        }
    }

    pub fn from_config(
        config: &AppConfig,
        lookup: Option<Arc<dyn OriginLookup>>,
        store: Option<OriginStore>,
    ) -> Self {
        let mut resolver = Self::new(SeedTable::builtin(), config.cache_capacity());
        if config.lookup_enabled() {
            if let Some(lookup) = lookup {
                resolver = resolver.with_lookup(lookup, config.lookup_interval(), config.lookup_timeout());
            }
        }
        if let Some(store) = store {
            resolver = resolver.with_store(store);
        }
        resolver
    }

    pub fn with_lookup(
        mut self,
        client: Arc<dyn OriginLookup>,
        min_interval: Duration,
        lookup_timeout: Duration,
    ) -> Self {
        self.external = Some(ExternalLookup {
            client,
            gate: IntervalGate::new(min_interval),
            timeout: lookup_timeout,
        });
        self
    }

    pub fn with_store(mut self, store: OriginStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn lookup_enabled(&self) -> bool {
        self.external.is_some()
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Loads persisted origins into the cache until it is full. Returns how many were loaded.
    pub fn warm_from_store(&self) -> Result<usize> {
        let Some(store) = &self.store else {
            return Ok(0);
        };

        let mut loaded = 0;
        for record in store.all_origins()? {
            if self.cache.is_full() {
                break;
            }
            self.cache.insert(&record.artist, record.country);
            loaded += 1;
        }
        info!(loaded, "warmed resolution cache from origin store");
        Ok(loaded)
    }

    pub async fn resolve(&self, artist: &str) -> String {
        self.resolve_outcome(artist).await.country_or_unknown()
    }

    pub async fn resolve_outcome(&self, artist: &str) -> Resolution {
        if artist.trim().is_empty() {
            return Resolution::new(ResolutionTier::Skipped, LookupOutcome::Unresolved);
        }

        if let Some(hit) = self.resolve_local(artist) {
            return hit;
        }

        let Some(external) = &self.external else {
            return Resolution::new(ResolutionTier::Skipped, LookupOutcome::Unresolved);
        };

        let _slot = self.lookup_slot.lock().await;
        // Another request may have resolved this name while we waited for the slot.
        if let Some(hit) = self.cached(artist) {
            return hit;
        }

        external.gate.wait().await;
        let outcome = match timeout(external.timeout, external.client.lookup_origin(artist)).await {
            Ok(outcome) => outcome,
            Err(_) => LookupOutcome::Failed(format!(
                "lookup timed out after {}ms",
                external.timeout.as_millis()
            )),
        };

        match &outcome {
            LookupOutcome::Failed(reason) => {
                warn!(artist = %artist, reason = %reason, "artist origin lookup failed");
            }
            other => {
                debug!(artist = %artist, country = ?other.country(), "artist origin looked up");
            }
        }

        self.cache.insert(artist, outcome.country().map(str::to_string));
        self.persist(artist, &outcome);

        Resolution::new(ResolutionTier::Lookup, outcome)
    }

    /// Seed table and cache only. `None` means answering would take an external lookup.
    pub fn resolve_local(&self, artist: &str) -> Option<Resolution> {
        if let Some(country) = self.seeds.get(artist) {
            return Some(Resolution::new(
                ResolutionTier::Seed,
                LookupOutcome::Resolved(country.to_string()),
            ));
        }
        self.cached(artist)
    }

    fn cached(&self, artist: &str) -> Option<Resolution> {
        self.cache.get(artist).map(|entry| {
            let outcome = match entry {
                Some(country) => LookupOutcome::Resolved(country),
                None => LookupOutcome::Unresolved,
            };
            Resolution::new(ResolutionTier::Cache, outcome)
        })
    }

    fn persist(&self, artist: &str, outcome: &LookupOutcome) {
        let Some(store) = &self.store else {
            return;
        };
        if !outcome.is_confirmed() {
            return;
        }
        if let Err(err) = store.record(artist, outcome.country()) {
            warn!(artist = %artist, error = %err, "failed to persist artist origin");
        }
    }
}
