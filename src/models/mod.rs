pub mod community;
pub mod origin;
pub mod snapshot;

pub use community::{Community, Member};
pub use origin::{LookupOutcome, OriginRecord, Resolution, ResolutionTier};
pub use snapshot::{CountryTally, Snapshot, SourceKind, UNKNOWN};
