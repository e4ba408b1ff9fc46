use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::snapshot::UNKNOWN;

/// Result of asking the external lookup service for an artist's origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Resolved(String),
    /// The service answered but had no usable country or area.
    Unresolved,
    /// Transport error, timeout, bad status or malformed body.
    Failed(String),
}

impl LookupOutcome {
    pub fn country(&self) -> Option<&str> {
        match self {
            LookupOutcome::Resolved(country) => Some(country),
            LookupOutcome::Unresolved | LookupOutcome::Failed(_) => None,
        }
    }

    /// Failures are not confirmed and are kept out of durable storage.
    pub fn is_confirmed(&self) -> bool {
        !matches!(self, LookupOutcome::Failed(_))
    }
}

/// Which resolver tier answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTier {
    Seed,
    Cache,
    Lookup,
    /// No tier was consulted: blank name, or external lookup switched off.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub tier: ResolutionTier,
    pub outcome: LookupOutcome,
}

impl Resolution {
    pub fn new(tier: ResolutionTier, outcome: LookupOutcome) -> Self {
        Self { tier, outcome }
    }

    pub fn country_or_unknown(&self) -> String {
        self.outcome.country().unwrap_or(UNKNOWN).to_string()
    }
}

/// Durable form of a confirmed resolver outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginRecord {
    pub artist: String,
    pub country: Option<String>,
    pub resolved_at_utc: String,
}

impl Default for OriginRecord {
    fn default() -> Self {
        Self {
            artist: String::new(),
            country: None,
            resolved_at_utc: Utc::now().to_rfc3339(),
        }
    }
}

impl OriginRecord {
    pub fn new(artist: &str, country: Option<&str>) -> Self {
        Self {
            artist: artist.to_string(),
            country: country.map(str::to_string),
            resolved_at_utc: Utc::now().to_rfc3339(),
        }
    }
}
