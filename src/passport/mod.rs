//! Artist origin resolution and the country → region rollup.

pub mod builder;
pub mod cache;
pub mod regions;
pub mod resolver;
pub mod rollup;
pub mod seeds;
pub mod throttle;

pub use builder::{SnapshotBuilder, select_names};
pub use cache::ResolutionCache;
pub use regions::RegionMap;
pub use resolver::{CountryResolver, OriginLookup};
pub use rollup::RegionRollup;
pub use seeds::SeedTable;
pub use throttle::IntervalGate;
