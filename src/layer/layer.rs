use std::{fmt, sync::Arc};

use ahash::AHashSet;
use anyhow::{Context, Result};
use polars::{frame::DataFrame, prelude::DataType};

use crate::{error::FuseError, geom::Geometries};

/// A keyed collection of polygon records: one row of attribute data per geometry.
///
/// Rows are identified by position unless a key column is given, in which case the
/// column must hold unique values. A frame with no columns is accepted for layers
/// that carry geometry only.
#[derive(Clone)]
pub struct Layer {
    data: DataFrame,
    geoms: Geometries,
    key: Option<Arc<str>>, // Name of the explicit key column, if any
}

impl Layer {
    /// Build a positionally keyed layer.
    pub fn new(data: DataFrame, geoms: Geometries) -> Result<Self> {
        if data.width() > 0 && data.height() != geoms.len() {
            return Err(FuseError::Shape { rows: data.height(), geoms: geoms.len() }.into());
        }
        Ok(Self { data, geoms, key: None })
    }

    /// Build a layer with no attribute columns.
    pub fn from_geometries(geoms: Geometries) -> Self {
        Self { data: DataFrame::empty(), geoms, key: None }
    }

    /// Build a layer keyed by the unique values of column `key`.
    pub fn with_key(data: DataFrame, geoms: Geometries, key: &str) -> Result<Self> {
        let mut layer = Self::new(data, geoms)?;

        let column = layer.data.column(key)
            .map_err(|_| FuseError::MissingKey { column: key.into() })?
            .cast(&DataType::String)
            .with_context(|| format!("[with_key] cannot read key column '{key}' as text"))?;

        let mut seen = AHashSet::with_capacity(layer.len());
        for value in column.str()?.into_iter() {
            if !seen.insert(value) {
                return Err(FuseError::DuplicateKey {
                    column: key.into(),
                    value: value.unwrap_or("null").into(),
                }.into());
            }
        }

        layer.key = Some(Arc::from(key));
        Ok(layer)
    }

    /// Number of records (one per geometry).
    #[inline] pub fn len(&self) -> usize { self.geoms.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.geoms.is_empty() }

    #[inline] pub fn data(&self) -> &DataFrame { &self.data }

    #[inline] pub fn geoms(&self) -> &Geometries { &self.geoms }

    /// Name of the explicit key column, or None for positional keys.
    #[inline] pub fn key(&self) -> Option<&str> { self.key.as_deref() }

    #[inline] pub fn epsg(&self) -> Option<u32> { self.geoms.epsg() }

    /// Replace the attribute data, keeping geometry and key.
    pub(crate) fn with_data(&self, data: DataFrame) -> Self {
        Self { data, geoms: self.geoms.clone(), key: self.key.clone() }
    }

    /// Read column `name` as floats, with nulls where values are absent.
    pub fn column_f64(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let column = self.data.column(name)
            .with_context(|| format!("[column_f64] column '{name}' not found"))?
            .cast(&DataType::Float64)
            .with_context(|| format!("[column_f64] column '{name}' is not numeric"))?;
        Ok(column.f64()?.into_iter().collect())
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cols_fmt: Vec<String> = self.data.get_column_names()
            .iter()
            .zip(self.data.dtypes().iter())
            .map(|(n, dt)| format!("{n}: {:?}", dt))
            .collect();

        // Show up to 16 column descriptors unless pretty-printed with {:#?}
        let max_cols = if f.alternate() { cols_fmt.len() } else { cols_fmt.len().min(16) };

        f.debug_struct("Layer")
            .field("records", &self.len())
            .field("key", &self.key())
            .field("epsg", &self.epsg())
            .field("data_cols", &&cols_fmt[..max_cols])
            .field("data_cols_more", &cols_fmt.len().saturating_sub(max_cols))
            .field("bounds", &self.geoms.bounds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use geo::{polygon, MultiPolygon};
    use polars::df;

    use super::*;

    fn unit_squares(n: usize) -> Geometries {
        let shapes = (0..n)
            .map(|i| {
                let x = i as f64;
                MultiPolygon(vec![polygon![(x: x, y: 0.0), (x: x + 1.0, y: 0.0), (x: x + 1.0, y: 1.0), (x: x, y: 1.0), (x: x, y: 0.0)]])
            })
            .collect();
        Geometries::new(shapes, None)
    }

    #[test]
    fn row_mismatch_is_rejected() {
        let data = df!["pop" => [1.0, 2.0, 3.0]].unwrap();
        let err = Layer::new(data, unit_squares(2)).unwrap_err();
        assert!(matches!(err.downcast_ref::<FuseError>(), Some(FuseError::Shape { rows: 3, geoms: 2 })));
    }

    #[test]
    fn geometry_only_layer() {
        let layer = Layer::from_geometries(unit_squares(4));
        assert_eq!(layer.len(), 4);
        assert_eq!(layer.data().width(), 0);
        assert_eq!(layer.key(), None);
    }

    #[test]
    fn explicit_key_must_be_unique() {
        let data = df!["tract" => ["a", "b", "a"]].unwrap();
        let err = Layer::with_key(data, unit_squares(3), "tract").unwrap_err();
        match err.downcast_ref::<FuseError>() {
            Some(FuseError::DuplicateKey { column, value }) => {
                assert_eq!(column, "tract");
                assert_eq!(value, "a");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn explicit_key_is_kept() {
        let data = df!["tract" => [10i64, 11, 12], "pop" => [1.0, 2.0, 3.0]].unwrap();
        let layer = Layer::with_key(data, unit_squares(3), "tract").unwrap();
        assert_eq!(layer.key(), Some("tract"));
        assert_eq!(layer.column_f64("tract").unwrap(), vec![Some(10.0), Some(11.0), Some(12.0)]);
    }

    #[test]
    fn missing_key_column() {
        let data = df!["pop" => [1.0]].unwrap();
        let err = Layer::with_key(data, unit_squares(1), "tract").unwrap_err();
        assert!(matches!(err.downcast_ref::<FuseError>(), Some(FuseError::MissingKey { .. })));
    }
}
