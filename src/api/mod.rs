pub mod musicbrainz;
pub mod spotify;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::PassportError;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl From<CatalogError> for PassportError {
    fn from(err: CatalogError) -> Self {
        PassportError::UpstreamUnavailable(format!("catalog: {err}"))
    }
}

/// Listener identity as the catalog reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogProfile {
    pub id: String,
    pub display_name: String,
}

/// Music catalog that lists a listener's artists, given their access token.
#[async_trait]
pub trait ArtistSource: Send + Sync {
    /// Artist names by popularity rank.
    async fn top_artists(&self, token: &str, limit: usize) -> Result<Vec<String>, CatalogError>;

    /// Artist names of recent plays, most recent first, duplicates included.
    async fn recently_played(&self, token: &str, limit: usize) -> Result<Vec<String>, CatalogError>;

    async fn profile(&self, token: &str) -> Result<CatalogProfile, CatalogError>;
}
