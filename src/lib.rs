//! Music passport engine: resolves listeners' artists to countries of origin and rolls
//! them up into region shares, for single listeners and for groups.

pub mod api;
pub mod community;
pub mod config;
pub mod error;
pub mod models;
pub mod origins;
pub mod passport;
pub mod service;

pub use community::CommunityStore;
pub use config::AppConfig;
pub use error::PassportError;
pub use models::{Community, LookupOutcome, Member, Snapshot, SourceKind};
pub use passport::{CountryResolver, OriginLookup, RegionMap, RegionRollup, SeedTable, SnapshotBuilder};
pub use service::{MemberIdentity, PassportService, SnapshotSource};
