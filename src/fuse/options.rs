use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{error::{FuseError, Stage}, geom::PairPredicate};

/// Name of the optional coverage column added to the fused layer.
pub const OVERLAP_COLUMN: &str = "_OVERLAP";

/// Attribute roles and switches for a single fuse call.
///
/// Columns of the source layer that are listed in neither `size_columns` nor
/// `density_columns` are ignored. Every field has a default, so a partial JSON
/// object such as `{"size_columns": ["pop"]}` is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuseOptions {
    /// Counts and other quantities proportional to area, scaled by the share of the source polygon.
    pub size_columns: Vec<String>,
    /// Densities and rates, scaled by the share of the target polygon.
    pub density_columns: Vec<String>,
    /// Add an `_OVERLAP` coverage column to the result.
    pub include_overlap: bool,
    pub predicate: PairPredicate,
}

impl FuseOptions {
    pub fn new() -> Self { Self::default() }

    /// Parse options from a JSON object; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("[FuseOptions::from_json] invalid options")
    }

    pub fn with_size_columns<I, S>(mut self, columns: I) -> Self
    where I: IntoIterator<Item = S>, S: Into<String> {
        self.size_columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn with_density_columns<I, S>(mut self, columns: I) -> Self
    where I: IntoIterator<Item = S>, S: Into<String> {
        self.density_columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn with_overlap(mut self, include_overlap: bool) -> Self {
        self.include_overlap = include_overlap;
        self
    }

    pub fn with_predicate(mut self, predicate: PairPredicate) -> Self {
        self.predicate = predicate;
        self
    }

    /// Size columns in declaration order, repeats removed.
    pub(crate) fn sizes(&self) -> Vec<&str> { dedup(&self.size_columns) }

    /// Density columns in declaration order, repeats removed.
    pub(crate) fn densities(&self) -> Vec<&str> { dedup(&self.density_columns) }

    /// Check that no column is given both roles.
    pub(crate) fn validate(&self) -> Result<(), FuseError> {
        match self.sizes().into_iter().find(|name| self.density_columns.iter().any(|d| d.as_str() == *name)) {
            Some(column) => Err(FuseError::ConflictingRoles { stage: Stage::Apportionment, column: column.into() }),
            None => Ok(()),
        }
    }
}

fn dedup(columns: &[String]) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::with_capacity(columns.len());
    for column in columns {
        if !out.contains(&column.as_str()) { out.push(column) }
    }
    out
}
