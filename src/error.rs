use std::fmt;

use thiserror::Error;

/// Stage of a fuse call that raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Pairing,
    Apportionment,
    Aggregation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Pairing => "pairing",
            Stage::Apportionment => "apportionment",
            Stage::Aggregation => "aggregation",
        })
    }
}

/// Which input layer a problem was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Into,
    From,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Into => "into_layer",
            Side::From => "from_layer",
        })
    }
}

/// Typed root causes of a failed fuse call.
///
/// Public functions return `anyhow::Result`; callers that need to branch on the
/// failure kind can `downcast_ref::<FuseError>()` the returned error.
#[derive(Debug, Error)]
pub enum FuseError {
    #[error("[{stage}] column '{column}' not found in {layer}")]
    MissingColumn { stage: Stage, layer: Side, column: String },

    #[error("[{stage}] column '{column}' has non-numeric type {dtype}")]
    NonNumericColumn { stage: Stage, column: String, dtype: String },

    #[error("[{stage}] column '{column}' is declared as both a size and a density attribute")]
    ConflictingRoles { stage: Stage, column: String },

    #[error("[{stage}] column '{column}' already exists in into_layer")]
    ColumnCollision { stage: Stage, column: String },

    #[error("[{stage}] invalid geometry in {layer} at row {row}: {reason}")]
    Geometry { stage: Stage, layer: Side, row: usize, reason: String },

    #[error("[pairing] reference frame mismatch: into_layer is EPSG:{into}, from_layer is EPSG:{from}")]
    CrsMismatch { into: u32, from: u32 },

    #[error("layer has {rows} data rows but {geoms} geometries")]
    Shape { rows: usize, geoms: usize },

    #[error("key column '{column}' not found")]
    MissingKey { column: String },

    #[error("key column '{column}' holds duplicate value {value}")]
    DuplicateKey { column: String, value: String },
}
