use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use music_passport::api::musicbrainz::MusicBrainzClient;
use music_passport::api::spotify::SpotifyCatalog;
use music_passport::origins::OriginStore;
use music_passport::{
    AppConfig, CountryResolver, MemberIdentity, OriginLookup, PassportService, SnapshotSource,
    SourceKind,
};

/// Builds a music passport from artist lists, one file per listener.
#[derive(Debug, Parser)]
#[command(name = "music-passport", version)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, env = "PASSPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Resolve from the built-in seed table only.
    #[arg(long)]
    offline: bool,

    /// Treat the lists as listening history (de-duplicated and capped).
    #[arg(long)]
    recent: bool,

    /// Artist list files, one name per line. Reads one list from stdin when omitted.
    members: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("music_passport=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if cli.offline {
        config = config.with_lookup_enabled(false);
    }

    let lookup: Arc<dyn OriginLookup> = Arc::new(MusicBrainzClient::new(&config)?);
    let store = config.origin_store_path().map(OriginStore::open).transpose()?;
    let resolver = Arc::new(CountryResolver::from_config(&config, Some(lookup), store));
    resolver.warm_from_store()?;

    let catalog = Arc::new(SpotifyCatalog::new(&config)?);
    let service = PassportService::new(&config, catalog, resolver);
    let kind = if cli.recent {
        SourceKind::RecentlyPlayed
    } else {
        SourceKind::TopArtists
    };

    let output = if cli.members.is_empty() {
        let mut raw = String::new();
        io::stdin()
            .read_to_string(&mut raw)
            .context("failed to read artist names from stdin")?;
        let passport = service.passport_from_names(&parse_names(&raw), kind).await?;
        serde_json::to_string_pretty(&passport)?
    } else {
        let code = service.create_community("CLI Community")?.code;
        info!(code = %code, members = cli.members.len(), "building community passport");

        for path in &cli.members {
            let names = read_names(path)?;
            let member_id = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            service
                .join_community(
                    &code,
                    Some(MemberIdentity::new(member_id.clone(), member_id)),
                    SnapshotSource::Names { names, kind },
                )
                .await
                .with_context(|| format!("failed to add member from {}", path.display()))?;
        }

        serde_json::to_string_pretty(&service.community_view(&code)?)?
    };

    println!("{output}");
    Ok(())
}

fn read_names(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read artist list {}", path.display()))?;
    Ok(parse_names(&raw))
}

fn parse_names(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}
