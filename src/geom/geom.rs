use geo::{Area, Coord, CoordsIter, MultiPolygon, Rect};
use rayon::prelude::*;
use rstar::{RTree, AABB};

use crate::{error::{FuseError, Side, Stage}, geom::RowEnvelope};

/// Geometries holds one MultiPolygon per layer row, plus an R-tree over their bounding boxes.
#[derive(Debug, Clone)]
pub struct Geometries {
    shapes: Vec<MultiPolygon<f64>>,
    rtree: RTree<RowEnvelope>,
    epsg: Option<u32>, // EPSG code, if known
}

impl Geometries {
    /// Construct a Geometries object from a vector of MultiPolygons.
    /// Empty or non-finite shapes have no usable bounding box and are left out of the R-tree.
    pub fn new(shapes: Vec<MultiPolygon<f64>>, epsg: Option<u32>) -> Self {
        let entries = shapes.iter().enumerate()
            .filter_map(|(row, shape)| RowEnvelope::of(row, shape))
            .collect();
        Self { rtree: RTree::bulk_load(entries), shapes, epsg }
    }

    /// Get the number of MultiPolygons.
    #[inline] pub fn len(&self) -> usize { self.shapes.len() }

    /// Check if there are no MultiPolygons.
    #[inline] pub fn is_empty(&self) -> bool { self.shapes.is_empty() }

    /// Get a reference to the list of MultiPolygons.
    #[inline] pub fn shapes(&self) -> &[MultiPolygon<f64>] { &self.shapes }

    /// Get the EPSG code, if known.
    #[inline] pub fn epsg(&self) -> Option<u32> { self.epsg }

    /// Query the R-tree for row envelopes intersecting the given envelope.
    #[inline]
    pub(crate) fn query(&self, envelope: AABB<[f64; 2]>) -> impl Iterator<Item=&RowEnvelope> {
        self.rtree.locate_in_envelope_intersecting(&envelope)
    }

    /// Iterate over the envelopes of all indexed shapes, in R-tree order.
    #[inline]
    pub(crate) fn boxes(&self) -> impl Iterator<Item=&RowEnvelope> {
        self.rtree.iter()
    }

    /// Compute the planar area of every MultiPolygon, in row order.
    pub fn areas(&self) -> Vec<f64> {
        self.shapes.par_iter()
            .map(|shape| shape.unsigned_area())
            .collect()
    }

    /// Extent of the indexed shapes, read off the R-tree root. None when nothing is indexed.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        if self.rtree.size() == 0 { return None }
        let root = self.rtree.root().envelope();
        Some(Rect::new(Coord::from(root.lower()), Coord::from(root.upper())))
    }

    /// Check that every shape has at least one polygon and only finite coordinates.
    /// No repair is attempted.
    pub(crate) fn validate(&self, layer: Side) -> Result<(), FuseError> {
        for (row, shape) in self.shapes.iter().enumerate() {
            let reason = if shape.0.is_empty() {
                Some("empty geometry")
            } else if shape.coords_iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
                Some("non-finite coordinate")
            } else {
                None
            };

            if let Some(reason) = reason {
                return Err(FuseError::Geometry { stage: Stage::Pairing, layer, row, reason: reason.into() });
            }
        }
        Ok(())
    }
}
