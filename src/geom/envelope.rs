use geo::{BoundingRect, MultiPolygon};
use rstar::{RTreeObject, AABB};

/// Axis-aligned envelope of one layer row, as stored in the R-tree.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RowEnvelope {
    row: usize,
    envelope: AABB<[f64; 2]>,
}

impl RowEnvelope {
    /// Envelope of `shape` at `row`. None for empty shapes and shapes with NaN or infinite corners.
    pub(crate) fn of(row: usize, shape: &MultiPolygon<f64>) -> Option<Self> {
        let rect = shape.bounding_rect()?;
        let (lo, hi) = (rect.min(), rect.max());
        [lo.x, lo.y, hi.x, hi.y].iter().all(|v| v.is_finite())
            .then(|| Self { row, envelope: AABB::from_corners([lo.x, lo.y], [hi.x, hi.y]) })
    }

    #[inline] pub(crate) fn row(&self) -> usize { self.row }
}

impl RTreeObject for RowEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope { self.envelope }
}
