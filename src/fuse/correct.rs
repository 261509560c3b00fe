use anyhow::{Context, Result};
use polars::prelude::{NamedFrom, Series};

use crate::{fuse::OVERLAP_COLUMN, layer::Layer};

impl Layer {
    /// Divide each of `columns` by `_OVERLAP`, compensating for target polygons that the
    /// source layer only partly covers. Rows with null or zero coverage become null.
    pub fn correct_for_overlap(&self, columns: &[&str]) -> Result<Layer> {
        let coverage = self.column_f64(OVERLAP_COLUMN)
            .context("[correct_for_overlap] layer has no coverage column; fuse with include_overlap")?;

        let mut data = self.data().clone();
        for &name in columns {
            let corrected = self.column_f64(name)?
                .into_iter()
                .zip(&coverage)
                .map(|(value, cover)| match (value, cover) {
                    (Some(v), Some(c)) if *c != 0.0 => Some(v / c),
                    _ => None,
                })
                .collect::<Vec<_>>();

            data.with_column(Series::new(name.into(), corrected))
                .with_context(|| format!("[correct_for_overlap] failed to replace column '{name}'"))?;
        }

        Ok(self.with_data(data))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use geo::{polygon, MultiPolygon};
    use polars::df;

    use super::*;
    use crate::geom::Geometries;

    fn layer(data: polars::frame::DataFrame) -> Layer {
        let shapes = (0..data.height())
            .map(|_| MultiPolygon(vec![polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 0.0)]]))
            .collect();
        Layer::new(data, Geometries::new(shapes, None)).unwrap()
    }

    #[test]
    fn divides_by_coverage() {
        let fused = layer(df![
            "pop" => [Some(72.0), Some(10.0), None, Some(3.0)],
            OVERLAP_COLUMN => [Some(0.8), Some(0.0), None, None],
        ].unwrap());
        let corrected = fused.correct_for_overlap(&["pop"]).unwrap();
        let pop = corrected.column_f64("pop").unwrap();

        assert_relative_eq!(pop[0].unwrap(), 90.0, epsilon = 1e-9);
        assert_eq!(&pop[1..], &[None, None, None]);
        assert_eq!(corrected.data().width(), 2);
    }

    #[test]
    fn requires_coverage_column() {
        let fused = layer(df!["pop" => [1.0]].unwrap());
        assert!(fused.correct_for_overlap(&["pop"]).is_err());
    }

    #[test]
    fn requires_named_column() {
        let fused = layer(df!["pop" => [1.0], OVERLAP_COLUMN => [1.0]].unwrap());
        assert!(fused.correct_for_overlap(&["households"]).is_err());
    }
}
