use geo::{Area, BooleanOps};
use polars::prelude::DataType;
use rayon::prelude::*;
use tracing::debug;

use crate::{error::{FuseError, Side, Stage}, geom::Geometries, layer::Layer};

/// A (target, source) pairing with the areas needed to apportion attributes across it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidatePair {
    into_row: usize,
    from_row: usize,
    intersection_area: f64,
    into_area: f64,
    from_area: f64,
}

impl CandidatePair {
    /// Measure the overlap of `into[into_row]` and `from[from_row]`.
    /// The intersection area is capped at the smaller polygon area.
    pub(crate) fn measure(
        into: &Geometries, into_row: usize, into_area: f64,
        from: &Geometries, from_row: usize, from_area: f64,
    ) -> Self {
        let intersection_area = into.shapes()[into_row]
            .intersection(&from.shapes()[from_row])
            .unsigned_area()
            .min(into_area)
            .min(from_area);

        Self { into_row, from_row, intersection_area, into_area, from_area }
    }

    #[inline] pub fn into_row(&self) -> usize { self.into_row }

    #[inline] pub fn from_row(&self) -> usize { self.from_row }

    #[inline] pub fn intersection_area(&self) -> f64 { self.intersection_area }

    #[inline] pub fn into_area(&self) -> f64 { self.into_area }

    #[inline] pub fn from_area(&self) -> f64 { self.from_area }

    /// Share of the target polygon covered by the intersection; 0 for a zero-area target.
    #[inline]
    pub fn into_fraction(&self) -> f64 {
        if self.into_area > 0.0 { self.intersection_area / self.into_area } else { 0.0 }
    }

    /// Share of the source polygon covered by the intersection; 0 for a zero-area source.
    #[inline]
    pub fn from_fraction(&self) -> f64 {
        if self.from_area > 0.0 { self.intersection_area / self.from_area } else { 0.0 }
    }

    #[inline]
    fn is_degenerate(&self) -> bool { self.into_area <= 0.0 || self.from_area <= 0.0 }
}

/// How a source attribute is scaled across a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    Size,
    Density,
}

/// The declared source columns, read as floats and indexed `[column][source row]`.
#[derive(Debug)]
pub(crate) struct SourceColumns<'a> {
    pub(crate) names: Vec<&'a str>,
    roles: Vec<Role>,
    values: Vec<Vec<Option<f64>>>,
}

impl<'a> SourceColumns<'a> {
    /// Read `sizes` then `densities` from `from`. Unlisted columns are never touched.
    pub(crate) fn read(from: &Layer, sizes: &[&'a str], densities: &[&'a str]) -> Result<Self, FuseError> {
        let declared = sizes.iter().map(|&name| (name, Role::Size))
            .chain(densities.iter().map(|&name| (name, Role::Density)));

        let mut columns = SourceColumns { names: Vec::new(), roles: Vec::new(), values: Vec::new() };
        for (name, role) in declared {
            let column = from.data().column(name)
                .map_err(|_| FuseError::MissingColumn { stage: Stage::Aggregation, layer: Side::From, column: name.into() })?;

            let non_numeric = || FuseError::NonNumericColumn {
                stage: Stage::Aggregation,
                column: name.into(),
                dtype: column.dtype().to_string(),
            };
            if !column.dtype().is_numeric() && !matches!(column.dtype(), DataType::Null) {
                return Err(non_numeric());
            }
            let cast = column.cast(&DataType::Float64).map_err(|_| non_numeric())?;
            let values = cast.f64().map_err(|_| non_numeric())?.into_iter().collect();

            columns.names.push(name);
            columns.roles.push(role);
            columns.values.push(values);
        }
        Ok(columns)
    }

    #[inline] pub(crate) fn len(&self) -> usize { self.names.len() }
}

/// One candidate pair's scaled contribution to its target row.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Contribution {
    pub(crate) into_row: usize,
    pub(crate) coverage: f64,
    pub(crate) values: Vec<Option<f64>>, // Parallel to SourceColumns::names
}

/// Measure every candidate pair, in pair order.
pub(crate) fn measure_pairs(into: &Geometries, from: &Geometries, pairs: &[(usize, usize)]) -> Vec<CandidatePair> {
    let into_areas = into.areas();
    let from_areas = from.areas();

    pairs.par_iter()
        .map(|&(i, j)| CandidatePair::measure(into, i, into_areas[i], from, j, from_areas[j]))
        .collect()
}

/// Scale each declared attribute of the pair's source row by the fraction matching its role.
/// Null source values stay null.
pub(crate) fn apportion(pairs: &[CandidatePair], columns: &SourceColumns) -> Vec<Contribution> {
    let degenerate = pairs.iter().filter(|pair| pair.is_degenerate()).count();
    if degenerate > 0 {
        debug!(degenerate, "zero-area polygons in candidate pairs; their fractions are set to 0");
    }

    pairs.par_iter()
        .map(|pair| {
            let (into_fraction, from_fraction) = (pair.into_fraction(), pair.from_fraction());
            let values = columns.roles.iter()
                .zip(&columns.values)
                .map(|(role, values)| {
                    let fraction = match role {
                        Role::Size => from_fraction,
                        Role::Density => into_fraction,
                    };
                    values[pair.from_row].map(|v| v * fraction)
                })
                .collect();

            Contribution { into_row: pair.into_row, coverage: into_fraction, values }
        })
        .collect()
}
