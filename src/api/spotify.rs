use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url, header};
use serde::Deserialize;

use crate::config::AppConfig;

use super::{ArtistSource, CatalogError, CatalogProfile};

// The recently-played endpoint never returns more than this many plays.
const RECENT_PAGE_SIZE: usize = 50;

/// Reads a listener's artists from the Spotify Web API with their access token.
#[derive(Clone)]
pub struct SpotifyCatalog {
    http: Client,
    base_url: String,
}

impl SpotifyCatalog {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let http = Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent())
            .timeout(config.catalog_timeout())
            .build()
            .context("unable to construct catalog http client")?;

        Ok(Self {
            http,
            base_url: config.catalog_base_url().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T>(&self, path: &str, token: &str, params: &[(&str, String)]) -> Result<T, CatalogError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = Url::parse_with_params(&format!("{}{path}", self.base_url), params)
            .map_err(|err| CatalogError::Parse(err.to_string()))?;

        let response = self.http.get(url).bearer_auth(token).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }

        response
            .json()
            .await
            .map_err(|err| CatalogError::Parse(err.to_string()))
    }
}

#[async_trait]
impl ArtistSource for SpotifyCatalog {
    async fn top_artists(&self, token: &str, limit: usize) -> Result<Vec<String>, CatalogError> {
        let limit = limit.clamp(1, 50);
        let page: TopArtistsPage = self
            .get_json("/me/top/artists", token, &[("limit", limit.to_string())])
            .await?;
        Ok(page.artist_names())
    }

    async fn recently_played(&self, token: &str, limit: usize) -> Result<Vec<String>, CatalogError> {
        let limit = limit.clamp(1, RECENT_PAGE_SIZE);
        let page: RecentlyPlayedPage = self
            .get_json("/me/player/recently-played", token, &[("limit", limit.to_string())])
            .await?;
        Ok(page.artist_names())
    }

    async fn profile(&self, token: &str) -> Result<CatalogProfile, CatalogError> {
        let profile: ProfileRecord = self.get_json("/me", token, &[]).await?;
        if profile.id.is_empty() {
            return Err(CatalogError::Parse(String::from("profile is missing an id")));
        }
        let display_name = profile.display_name.unwrap_or_else(|| profile.id.clone());
        Ok(CatalogProfile {
            id: profile.id,
            display_name,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct TopArtistsPage {
    items: Vec<ArtistRecord>,
}

impl TopArtistsPage {
    fn artist_names(self) -> Vec<String> {
        self.items.into_iter().map(|artist| artist.name).collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RecentlyPlayedPage {
    items: Vec<PlayRecord>,
}

impl RecentlyPlayedPage {
    /// Every credited artist of every play, most recent first. Duplicates are kept.
    fn artist_names(self) -> Vec<String> {
        self.items
            .into_iter()
            .flat_map(|play| play.track.artists.into_iter().map(|artist| artist.name))
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct PlayRecord {
    track: TrackRecord,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct TrackRecord {
    artists: Vec<ArtistRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ArtistRecord {
    name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ProfileRecord {
    id: String,
    display_name: Option<String>,
}
