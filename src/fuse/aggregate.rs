use anyhow::{Context, Result};
use polars::prelude::{NamedFrom, Series};
use tracing::warn;

use crate::{error::{FuseError, Stage}, fuse::{apportion::Contribution, OVERLAP_COLUMN}, layer::Layer};

/// Tolerance above 1.0 before a coverage sum is reported as excess overlap.
const COVERAGE_TOLERANCE: f64 = 1e-9;

/// Per-target sums of apportioned attributes. Rows without a candidate pair hold None.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GroupSums {
    pub(crate) columns: Vec<Vec<Option<f64>>>, // [column][target row]
    pub(crate) coverage: Vec<Option<f64>>,     // [target row]
}

/// Sum contributions by target row, visiting them in the given order.
/// A row with at least one pair gets Some(sum), with null contributions counted as zero.
pub(crate) fn group_and_sum(contributions: &[Contribution], num_rows: usize, num_columns: usize) -> GroupSums {
    let mut sums = GroupSums {
        columns: vec![vec![None; num_rows]; num_columns],
        coverage: vec![None; num_rows],
    };

    for contribution in contributions {
        let row = contribution.into_row;
        *sums.coverage[row].get_or_insert(0.0) += contribution.coverage;
        for (column, value) in sums.columns.iter_mut().zip(&contribution.values) {
            *column[row].get_or_insert(0.0) += value.unwrap_or(0.0);
        }
    }

    sums
}

/// Attach the grouped sums to `into` as new columns, keeping every row in its original order.
/// Coverage is attached as `_OVERLAP` when `include_overlap` is set.
pub(crate) fn left_merge(into: &Layer, names: &[&str], sums: GroupSums, include_overlap: bool) -> Result<Layer> {
    let existing = into.data().get_column_names();
    let added = names.iter().copied().chain(include_overlap.then_some(OVERLAP_COLUMN));
    for name in added {
        if existing.iter().any(|col| col.as_str() == name) {
            return Err(FuseError::ColumnCollision { stage: Stage::Aggregation, column: name.into() }.into());
        }
    }

    if include_overlap {
        let excess = sums.coverage.iter().flatten().filter(|&&c| c > 1.0 + COVERAGE_TOLERANCE).count();
        if excess > 0 {
            warn!(excess, "source polygons overlap each other; {OVERLAP_COLUMN} exceeds 1 for some rows");
        }
    }

    let mut data = into.data().clone();
    for (name, values) in names.iter().zip(sums.columns) {
        data.with_column(Series::new((*name).into(), values))
            .with_context(|| format!("[left_merge] failed to attach column '{name}'"))?;
    }
    if include_overlap {
        data.with_column(Series::new(OVERLAP_COLUMN.into(), sums.coverage))
            .with_context(|| format!("[left_merge] failed to attach column '{OVERLAP_COLUMN}'"))?;
    }

    Ok(into.with_data(data))
}

#[cfg(test)]
mod tests {
    use geo::{polygon, MultiPolygon};
    use polars::df;

    use super::*;
    use crate::geom::Geometries;

    fn contribution(into_row: usize, coverage: f64, values: &[Option<f64>]) -> Contribution {
        Contribution { into_row, coverage, values: values.to_vec() }
    }

    fn layer(data: polars::frame::DataFrame, n: usize) -> Layer {
        let shapes = (0..n)
            .map(|i| {
                let x = i as f64;
                MultiPolygon(vec![polygon![(x: x, y: 0.0), (x: x + 1.0, y: 0.0), (x: x + 1.0, y: 1.0), (x: x, y: 0.0)]])
            })
            .collect();
        Layer::new(data, Geometries::new(shapes, None)).unwrap()
    }

    #[test]
    fn sums_by_target_row() {
        let contributions = [
            contribution(0, 0.25, &[Some(1.0), Some(2.0)]),
            contribution(2, 0.5, &[Some(3.0), None]),
            contribution(0, 0.75, &[Some(4.0), Some(5.0)]),
        ];
        let sums = group_and_sum(&contributions, 3, 2);

        assert_eq!(sums.columns[0], vec![Some(5.0), None, Some(3.0)]);
        assert_eq!(sums.columns[1], vec![Some(7.0), None, Some(0.0)]);
        assert_eq!(sums.coverage, vec![Some(1.0), None, Some(0.5)]);
    }

    #[test]
    fn merge_keeps_rows_and_appends_columns() {
        let into = layer(df!["name" => ["a", "b", "c"]].unwrap(), 3);
        let sums = group_and_sum(&[contribution(1, 0.5, &[Some(2.0)])], 3, 1);
        let fused = left_merge(&into, &["pop"], sums, true).unwrap();

        assert_eq!(fused.len(), 3);
        let names = fused.data().get_column_names().iter().map(|n| n.to_string()).collect::<Vec<_>>();
        assert_eq!(names, vec!["name", "pop", OVERLAP_COLUMN]);
        assert_eq!(fused.column_f64("pop").unwrap(), vec![None, Some(2.0), None]);
        assert_eq!(fused.column_f64(OVERLAP_COLUMN).unwrap(), vec![None, Some(0.5), None]);
    }

    #[test]
    fn merge_into_geometry_only_layer() {
        let into = layer(polars::frame::DataFrame::empty(), 2);
        let sums = group_and_sum(&[contribution(0, 1.0, &[Some(4.0)])], 2, 1);
        let fused = left_merge(&into, &["pop"], sums, false).unwrap();
        assert_eq!(fused.data().height(), 2);
        assert_eq!(fused.data().width(), 1);
    }

    #[test]
    fn merge_refuses_to_shadow_target_columns() {
        let into = layer(df!["pop" => [1.0]].unwrap(), 1);
        let sums = group_and_sum(&[], 1, 1);
        let err = left_merge(&into, &["pop"], sums, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FuseError>(),
            Some(FuseError::ColumnCollision { stage: Stage::Aggregation, column }) if column == "pop"
        ));
        assert!(err.to_string().starts_with("[aggregation]"));

        let into = layer(df![OVERLAP_COLUMN => [1.0]].unwrap(), 1);
        let err = left_merge(&into, &[], group_and_sum(&[], 1, 0), true).unwrap_err();
        assert!(matches!(err.downcast_ref::<FuseError>(), Some(FuseError::ColumnCollision { .. })));
    }
}
