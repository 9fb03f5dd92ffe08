//! Population exposure of indigenous localities around mining units.
//!
//! The core is [`processing::calculate_impact`]: mines are buffered by a
//! metric radius in a UTM projection, joined against locality points and
//! aggregated per mine and globally, with each locality counted once in the
//! global totals.

pub mod buffer;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod filter;
pub mod processing;
pub mod projection;
pub mod server;
pub mod types;

pub use error::ImpactError;
pub use filter::RegionFilter;
pub use processing::{calculate_impact, calculate_impact_with, ImpactOptions, ImpactResult};
pub use projection::Crs;
pub use types::{
    AffectedLocality, GlobalStat, Layer, Locality, MatchRecord, Mine, MineBuffer, PerMineStat,
    Region,
};
