//! Error types for the impact engine.
//!
//! Only programmer errors end up here. Empty inputs or a non-positive
//! radius produce an empty `ImpactResult`, never an error.

use thiserror::Error;

/// Errors produced by the impact engine and the projection layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImpactError {
    #[error("{layer} layer is declared in EPSG:{found}, expected EPSG:{expected}")]
    UnexpectedCrs {
        layer: &'static str,
        expected: u32,
        found: u32,
    },

    #[error("working projection EPSG:{0} is not metric")]
    NonMetricProjection(u32),

    #[error("unsupported CRS EPSG:{0}")]
    UnsupportedCrs(u32),
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, ImpactError>;
