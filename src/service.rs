use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::api::ArtistSource;
use crate::config::AppConfig;
use crate::error::PassportError;
use crate::models::{Snapshot, SourceKind};
use crate::community::CommunityStore;
use crate::passport::{CountryResolver, RegionMap, RegionRollup, SnapshotBuilder};

const RECENT_FETCH_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassportResponse {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    pub source: SourceKind,
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatedCommunity {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JoinResponse {
    pub ok: bool,
    pub code: String,
    pub member_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberSummary {
    pub id: String,
    pub display_name: String,
    pub total_artists: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityView {
    pub code: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub members: Vec<MemberSummary>,
    pub group_passport: Snapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupPassportResponse {
    pub group_size: usize,
    #[serde(flatten)]
    pub snapshot: Snapshot,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberIdentity {
    pub external_id: String,
    pub display_name: String,
}

impl MemberIdentity {
    pub fn new(external_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Where a joining member's snapshot comes from.
#[derive(Debug, Clone)]
pub enum SnapshotSource {
    Names { names: Vec<String>, kind: SourceKind },
    Token { access_token: String, kind: SourceKind },
}

/// Passport and community operations in the shapes the HTTP layer serializes.
#[derive(Clone)]
pub struct PassportService {
    catalog: Arc<dyn ArtistSource>,
    builder: SnapshotBuilder,
    communities: Arc<CommunityStore>,
    top_limit: usize,
    request_timeout: Duration,
}

impl PassportService {
    pub fn new(
        config: &AppConfig,
        catalog: Arc<dyn ArtistSource>,
        resolver: Arc<CountryResolver>,
    ) -> Self {
        let rollup = RegionRollup::new(RegionMap::builtin());
        Self {
            catalog,
            builder: SnapshotBuilder::new(resolver, rollup.clone(), config.recent_limit()),
            communities: Arc::new(CommunityStore::new(rollup, config.community_name_max())),
            top_limit: config.top_limit(),
            request_timeout: config.request_timeout(),
        }
    }

    pub fn communities(&self) -> &CommunityStore {
        &self.communities
    }

    pub async fn passport_from_names(
        &self,
        names: &[String],
        kind: SourceKind,
    ) -> Result<PassportResponse, PassportError> {
        let snapshot = self.build_snapshot(names, kind).await;
        Ok(PassportResponse {
            snapshot,
            source: kind,
            note: self.note(),
        })
    }

    /// Passport from the token owner's catalog. `limit` caps top artists (1..=50) and
    /// defaults to the configured top limit. Recently played lists use their own cap.
    pub async fn passport_from_token(
        &self,
        access_token: &str,
        kind: SourceKind,
        limit: Option<usize>,
    ) -> Result<PassportResponse, PassportError> {
        let limit = limit.unwrap_or(self.top_limit).clamp(1, 50);
        let names = self.fetch_names(access_token, kind, limit).await?;
        self.passport_from_names(&names, kind).await
    }

    pub fn create_community(&self, name: &str) -> Result<CreatedCommunity, PassportError> {
        let code = self.communities.create(name)?;
        Ok(CreatedCommunity {
            code,
            name: name.trim().to_string(),
        })
    }

    /// Joins (or rejoins) a community. Without an explicit identity the catalog profile of
    /// the token's owner is used.
    pub async fn join_community(
        &self,
        code: &str,
        identity: Option<MemberIdentity>,
        source: SnapshotSource,
    ) -> Result<JoinResponse, PassportError> {
        // Fail fast on a bad code before spending catalog or lookup calls.
        if !self.communities.contains(code) {
            return Err(PassportError::NotFound(code.trim().to_ascii_uppercase()));
        }

        let (identity, snapshot) = match source {
            SnapshotSource::Names { names, kind } => {
                let identity = identity.ok_or_else(|| {
                    PassportError::invalid("a member identity is required when joining with names")
                })?;
                if names.iter().all(|name| name.trim().is_empty()) {
                    return Err(PassportError::invalid("artist list must not be empty"));
                }
                (identity, self.build_snapshot(&names, kind).await)
            }
            SnapshotSource::Token { access_token, kind } => {
                let identity = match identity {
                    Some(identity) => identity,
                    None => {
                        let profile = self
                            .catalog
                            .profile(&access_token)
                            .await
                            .inspect_err(|err| warn!(error = %err, "catalog profile fetch failed"))?;
                        MemberIdentity::new(profile.id, profile.display_name)
                    }
                };
                let names = self.fetch_names(&access_token, kind, self.top_limit).await?;
                (identity, self.build_snapshot(&names, kind).await)
            }
        };

        let member_count = self.communities.join(
            code,
            &identity.external_id,
            &identity.display_name,
            snapshot,
        )?;
        Ok(JoinResponse {
            ok: true,
            code: code.trim().to_ascii_uppercase(),
            member_count,
        })
    }

    pub fn community_view(&self, code: &str) -> Result<CommunityView, PassportError> {
        let (community, group_passport) = self.communities.get_with_aggregate(code)?;
        let members = community
            .members
            .iter()
            .map(|member| MemberSummary {
                id: member.external_id.clone(),
                display_name: member.display_name.clone(),
                total_artists: member.snapshot.total_artists,
            })
            .collect();

        Ok(CommunityView {
            code: community.join_code,
            name: community.name,
            created_at: community.created_at,
            members,
            group_passport,
        })
    }

    /// One-off group passport from several listeners' top artists. Listeners whose catalog
    /// fetch fails are left out.
    pub async fn aggregate_from_tokens(
        &self,
        tokens: &[String],
        limit: Option<usize>,
    ) -> Result<GroupPassportResponse, PassportError> {
        if tokens.is_empty() {
            return Err(PassportError::invalid("no tokens provided"));
        }

        let limit = limit.unwrap_or(self.top_limit).clamp(1, 50);
        let fetches = tokens
            .iter()
            .map(|token| self.fetch_names(token, SourceKind::TopArtists, limit));
        let member_names: Vec<Vec<String>> = join_all(fetches)
            .await
            .into_iter()
            .enumerate()
            .filter_map(|(index, result)| match result {
                Ok(names) => Some(names),
                Err(err) => {
                    warn!(member = index + 1, error = %err, "skipping group member");
                    None
                }
            })
            .collect();

        let mut snapshots = Vec::with_capacity(member_names.len());
        for names in &member_names {
            snapshots.push(self.build_snapshot(names, SourceKind::TopArtists).await);
        }

        info!(
            group_size = tokens.len(),
            fetched = member_names.len(),
            "built group passport from tokens"
        );
        Ok(GroupPassportResponse {
            group_size: tokens.len(),
            snapshot: self.builder.merge(&snapshots),
            note: self.note(),
        })
    }

    /// Names still waiting on a lookup when `request_timeout` runs out count as `Unknown`.
    async fn build_snapshot(&self, names: &[String], kind: SourceKind) -> Snapshot {
        let deadline = Instant::now() + self.request_timeout;
        self.builder.build_until(names, kind, deadline).await
    }

    async fn fetch_names(
        &self,
        access_token: &str,
        kind: SourceKind,
        top_limit: usize,
    ) -> Result<Vec<String>, PassportError> {
        if access_token.trim().is_empty() {
            return Err(PassportError::invalid("access token must not be empty"));
        }

        let fetched = match kind {
            SourceKind::TopArtists => self.catalog.top_artists(access_token, top_limit).await,
            SourceKind::RecentlyPlayed => {
                self.catalog
                    .recently_played(access_token, RECENT_FETCH_LIMIT)
                    .await
            }
        };
        fetched
            .inspect_err(|err| warn!(error = %err, ?kind, "catalog fetch failed"))
            .map_err(PassportError::from)
    }

    fn note(&self) -> String {
        if self.builder.resolver().lookup_enabled() {
            String::from("Country via MusicBrainz lookup; approximate and rate-limited.")
        } else {
            String::from("Country lookup disabled; only well-known artists are placed.")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::api::{CatalogError, CatalogProfile};
    use crate::models::{LookupOutcome, UNKNOWN};
    use crate::passport::SeedTable;
    use crate::passport::resolver::tests::FakeLookup;
    use crate::passport::regions::{EUROPE, NORTH_AMERICA};

    #[derive(Default)]
    struct FakeCatalog {
        top: HashMap<String, Vec<String>>,
        recent: HashMap<String, Vec<String>>,
        profiles: HashMap<String, CatalogProfile>,
        calls: AtomicUsize,
    }

    impl FakeCatalog {
        fn listener(mut self, token: &str, id: &str, top: &[&str], recent: &[&str]) -> Self {
            let owned = |names: &[&str]| -> Vec<String> { names.iter().map(|n| n.to_string()).collect() };
            self.top.insert(token.into(), owned(top));
            self.recent.insert(token.into(), owned(recent));
            self.profiles.insert(
                token.into(),
                CatalogProfile {
                    id: id.into(),
                    display_name: id.to_uppercase(),
                },
            );
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ArtistSource for FakeCatalog {
        async fn top_artists(&self, token: &str, limit: usize) -> Result<Vec<String>, CatalogError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let names = self.top.get(token).ok_or(CatalogError::Status(401))?;
            Ok(names.iter().take(limit).cloned().collect())
        }

        async fn recently_played(&self, token: &str, _limit: usize) -> Result<Vec<String>, CatalogError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.recent.get(token).cloned().ok_or(CatalogError::Status(401))
        }

        async fn profile(&self, token: &str) -> Result<CatalogProfile, CatalogError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.profiles.get(token).cloned().ok_or(CatalogError::Status(401))
        }
    }

    fn service(catalog: FakeCatalog) -> (PassportService, Arc<FakeCatalog>) {
        let catalog = Arc::new(catalog);
        let resolver = Arc::new(CountryResolver::new(
            SeedTable::from_pairs([("Drake", "Canada"), ("Adele", "United Kingdom")]),
            0,
        ));
        let config = AppConfig::default().with_lookup_enabled(false);
        (
            PassportService::new(&config, catalog.clone(), resolver),
            catalog,
        )
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn passport_from_token_counts_top_artists() {
        let (service, _) = service(FakeCatalog::default().listener(
            "tok",
            "ana",
            &["Drake", "Adele", "Drake", "Nobody"],
            &[],
        ));

        let passport = service
            .passport_from_token("tok", SourceKind::TopArtists, None)
            .await
            .unwrap();
        assert_eq!(passport.snapshot.total_artists, 4);
        assert!((passport.snapshot.share_of(NORTH_AMERICA) - 0.5).abs() < 1e-9);
        assert!((passport.snapshot.share_of(EUROPE) - 0.25).abs() < 1e-9);
        assert!(passport.note.contains("disabled"));

        let json = serde_json::to_value(&passport).unwrap();
        assert_eq!(json["total_artists"], 4);
        assert_eq!(json["source"], "top_artists");
    }

    #[tokio::test]
    async fn passport_from_token_honours_requested_limit() {
        let (service, _) = service(FakeCatalog::default().listener(
            "tok",
            "ana",
            &["Drake", "Adele", "Drake", "Nobody"],
            &[],
        ));

        let two = service
            .passport_from_token("tok", SourceKind::TopArtists, Some(2))
            .await
            .unwrap();
        assert_eq!(two.snapshot.total_artists, 2);
        assert_eq!(two.snapshot.count_for("United Kingdom"), 1);

        let clamped = service
            .passport_from_token("tok", SourceKind::TopArtists, Some(0))
            .await
            .unwrap();
        assert_eq!(clamped.snapshot.total_artists, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_cold_requests_degrade_to_unknown_instead_of_failing() {
        let lookup = Arc::new(FakeLookup::default().answering(LookupOutcome::Resolved("JP".into())));
        let config = AppConfig::default();
        let resolver = Arc::new(CountryResolver::from_config(&config, Some(lookup.clone()), None));
        let service = PassportService::new(&config, Arc::new(FakeCatalog::default()), resolver);

        let first: Vec<String> = (0..12).map(|i| format!("First {i}")).collect();
        let second: Vec<String> = (0..12).map(|i| format!("Second {i}")).collect();
        let start = Instant::now();
        let (a, b) = tokio::join!(
            service.passport_from_names(&first, SourceKind::RecentlyPlayed),
            service.passport_from_names(&second, SourceKind::RecentlyPlayed),
        );

        assert!(start.elapsed() <= config.request_timeout() + Duration::from_secs(1));
        for passport in [a.unwrap(), b.unwrap()] {
            let snapshot = passport.snapshot;
            assert_eq!(snapshot.total_artists, 12);
            assert_eq!(
                snapshot.country_counts.values().sum::<usize>(),
                snapshot.total_artists
            );
            assert_eq!(snapshot.count_for("JP") + snapshot.count_for(UNKNOWN), 12);
            assert!(snapshot.count_for("JP") >= 5);
            assert!(snapshot.count_for(UNKNOWN) >= 1);
        }
        assert!(lookup.calls() < 24);
    }

    #[tokio::test]
    async fn catalog_failure_is_upstream_unavailable() {
        let (service, _) = service(FakeCatalog::default());
        let err = service
            .passport_from_token("expired", SourceKind::RecentlyPlayed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PassportError::UpstreamUnavailable(_)));

        let err = service
            .passport_from_token("  ", SourceKind::TopArtists, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PassportError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn join_with_unknown_code_does_no_catalog_work() {
        let (service, catalog) = service(FakeCatalog::default().listener("tok", "ana", &["Drake"], &[]));
        let err = service
            .join_community(
                "zzzzzz",
                None,
                SnapshotSource::Token {
                    access_token: "tok".into(),
                    kind: SourceKind::TopArtists,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, PassportError::NotFound("ZZZZZZ".into()));
        assert_eq!(catalog.calls(), 0);
    }

    #[tokio::test]
    async fn join_by_token_uses_catalog_profile_and_rejoin_replaces() {
        let (service, _) = service(FakeCatalog::default().listener(
            "tok",
            "ana",
            &["Drake"],
            &["Adele", "Adele", "Drake"],
        ));
        let created = service.create_community("Class A").unwrap();

        let joined = service
            .join_community(
                &created.code,
                None,
                SnapshotSource::Token {
                    access_token: "tok".into(),
                    kind: SourceKind::TopArtists,
                },
            )
            .await
            .unwrap();
        assert_eq!(joined.member_count, 1);

        let rejoined = service
            .join_community(
                &created.code,
                None,
                SnapshotSource::Token {
                    access_token: "tok".into(),
                    kind: SourceKind::RecentlyPlayed,
                },
            )
            .await
            .unwrap();
        assert_eq!(rejoined.member_count, 1);

        let view = service.community_view(&created.code).unwrap();
        assert_eq!(
            view.members,
            [MemberSummary {
                id: "ana".into(),
                display_name: "ANA".into(),
                total_artists: 2,
            }]
        );
        assert_eq!(view.group_passport.count_for("United Kingdom"), 1);
    }

    #[tokio::test]
    async fn join_with_names_requires_identity_and_artists() {
        let (service, _) = service(FakeCatalog::default());
        let code = service.create_community("Class A").unwrap().code;

        let missing_identity = service
            .join_community(
                &code,
                None,
                SnapshotSource::Names {
                    names: names(&["Drake"]),
                    kind: SourceKind::TopArtists,
                },
            )
            .await;
        assert!(matches!(missing_identity, Err(PassportError::InvalidInput(_))));

        let empty = service
            .join_community(
                &code,
                Some(MemberIdentity::new("u1", "U1")),
                SnapshotSource::Names {
                    names: names(&["", " "]),
                    kind: SourceKind::TopArtists,
                },
            )
            .await;
        assert!(matches!(empty, Err(PassportError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn community_view_rolls_up_merged_counts() {
        let (service, _) = service(FakeCatalog::default());
        let code = service.create_community("Class A").unwrap().code;
        for (id, list) in [("u1", &["Drake", "Drake"][..]), ("u2", &["Drake", "Nobody"][..])] {
            service
                .join_community(
                    &code,
                    Some(MemberIdentity::new(id, id)),
                    SnapshotSource::Names {
                        names: names(list),
                        kind: SourceKind::TopArtists,
                    },
                )
                .await
                .unwrap();
        }

        let view = service.community_view(&code).unwrap();
        assert_eq!(view.code, code);
        assert_eq!(view.members.len(), 2);
        assert_eq!(view.group_passport.total_artists, 4);
        assert_eq!(view.group_passport.count_for("Canada"), 3);
        assert!((view.group_passport.share_of(NORTH_AMERICA) - 0.75).abs() < 1e-9);
        assert!((view.group_passport.share_of(UNKNOWN) - 0.25).abs() < 1e-9);
    }

    #[tokio::test]
    async fn aggregate_from_tokens_skips_failed_members() {
        let (service, _) = service(
            FakeCatalog::default()
                .listener("a", "a", &["Drake", "Drake"], &[])
                .listener("b", "b", &["Adele"], &[]),
        );

        let group = service
            .aggregate_from_tokens(&names(&["a", "expired", "b"]), None)
            .await
            .unwrap();
        assert_eq!(group.group_size, 3);
        assert_eq!(group.snapshot.total_artists, 3);
        assert_eq!(group.snapshot.count_for("Canada"), 2);

        let err = service.aggregate_from_tokens(&[], None).await.unwrap_err();
        assert!(matches!(err, PassportError::InvalidInput(_)));
    }
}
