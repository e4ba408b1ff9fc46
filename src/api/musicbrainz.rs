use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url, header};
use serde::Deserialize;
use thiserror::Error;

use crate::config::AppConfig;
use crate::models::LookupOutcome;
use crate::passport::OriginLookup;

#[derive(Debug, Error)]
pub enum MusicBrainzError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("failed to parse response: {0}")]
    Parse(String),
    #[error("no results returned")]
    Empty,
}

/// Artist search against the MusicBrainz web service, used as the country-lookup collaborator.
///
/// Throttling lives in the resolver; this client only bounds each request with a timeout.
#[derive(Clone)]
pub struct MusicBrainzClient {
    http: Client,
    base_url: String,
}

impl MusicBrainzClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            "X-Client-Id",
            header::HeaderValue::from_str(config.client_id())
                .context("invalid client identifier header value")?,
        );

        let http = Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent())
            .timeout(config.lookup_timeout())
            .connect_timeout(config.lookup_timeout())
            .build()
            .context("unable to construct http client")?;

        Ok(Self {
            http,
            base_url: config.lookup_base_url().trim_end_matches('/').to_string(),
        })
    }

    /// Best single match for `name`, or [`MusicBrainzError::Empty`] when nothing matched.
    pub async fn best_artist_match(&self, name: &str) -> Result<ArtistMatch, MusicBrainzError> {
        let query = artist_query(name);
        let url = Url::parse_with_params(
            &format!("{}/artist", self.base_url),
            [("query", query.as_str()), ("limit", "1"), ("fmt", "json")],
        )
        .map_err(|err| MusicBrainzError::Parse(err.to_string()))?;

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MusicBrainzError::Status(status.as_u16()));
        }

        let body: ArtistSearchResponse = response
            .json()
            .await
            .map_err(|err| MusicBrainzError::Parse(err.to_string()))?;

        body.artists
            .into_iter()
            .next()
            .ok_or(MusicBrainzError::Empty)
    }
}

#[async_trait]
impl OriginLookup for MusicBrainzClient {
    async fn lookup_origin(&self, artist: &str) -> LookupOutcome {
        match self.best_artist_match(artist).await {
            Ok(found) => found.origin(),
            Err(MusicBrainzError::Empty) => LookupOutcome::Unresolved,
            Err(err) => LookupOutcome::Failed(err.to_string()),
        }
    }
}

fn artist_query(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
    format!("artist:\"{escaped}\"")
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct ArtistSearchResponse {
    artists: Vec<ArtistMatch>,
}

impl Default for ArtistSearchResponse {
    fn default() -> Self {
        Self {
            artists: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArtistMatch {
    pub id: String,
    pub name: String,
    pub score: i32,
    pub country: Option<String>,
    pub area: Option<AreaRecord>,
    #[serde(rename = "begin-area")]
    pub begin_area: Option<AreaRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AreaRecord {
    pub name: Option<String>,
}

impl ArtistMatch {
    /// Country code when present, else the area name, else the begin-area name.
    pub fn origin(&self) -> LookupOutcome {
        let area_name = |area: &Option<AreaRecord>| {
            area.as_ref()
                .and_then(|area| area.name.clone())
                .filter(|name| !name.trim().is_empty())
        };

        self.country
            .clone()
            .filter(|country| !country.trim().is_empty())
            .or_else(|| area_name(&self.area))
            .or_else(|| area_name(&self.begin_area))
            .map_or(LookupOutcome::Unresolved, LookupOutcome::Resolved)
    }
}
