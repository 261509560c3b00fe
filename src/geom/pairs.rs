use geo::Intersects;
use rstar::RTreeObject;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{error::FuseError, geom::Geometries};

/// Test applied to R-tree candidates before they become a candidate pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairPredicate {
    /// Bounding boxes overlap and the geometries intersect (touching counts).
    #[default]
    Intersects,
    /// Bounding boxes overlap.
    Envelope,
}

impl Geometries {
    /// Ensure `self` and `other` share a reference frame.
    /// Unknown EPSG codes on either side are assumed compatible; nothing is reprojected.
    pub(crate) fn check_frame(&self, other: &Geometries) -> Result<(), FuseError> {
        match (self.epsg(), other.epsg()) {
            (Some(into), Some(from)) if into != from => Err(FuseError::CrsMismatch { into, from }),
            (Some(_), None) | (None, Some(_)) => {
                warn!("only one layer declares an EPSG code; assuming both share it");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// For each shape in `self`, find every shape in `other` that satisfies `predicate`.
    /// Returns (self row, other row) pairs sorted by self row, then other row.
    pub(crate) fn candidate_pairs(&self, other: &Geometries, predicate: PairPredicate) -> Vec<(usize, usize)> {
        let mut pairs = self.boxes()
            .flat_map(move |entry| {
                let i = entry.row();
                other.query(entry.envelope())
                    .map(|cand| cand.row())
                    .filter(move |&j| match predicate {
                        PairPredicate::Envelope => true,
                        PairPredicate::Intersects => self.shapes()[i].intersects(&other.shapes()[j]),
                    })
                    .map(move |j| (i, j))
            })
            .collect::<Vec<_>>();

        pairs.sort_unstable();
        pairs
    }
}
