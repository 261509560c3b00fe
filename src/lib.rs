#![doc = "LayerFuse public API: areal-weighted attribute interpolation between polygon layers"]
mod error;
mod fuse;
mod geom;
mod layer;

#[doc(inline)]
pub use error::{FuseError, Side, Stage};

#[doc(inline)]
pub use fuse::{candidate_pairs, fuse, layerfuse, CandidatePair, FuseOptions, OVERLAP_COLUMN};

#[doc(inline)]
pub use geom::{Geometries, PairPredicate};

#[doc(inline)]
pub use layer::Layer;

pub const TITLE: &str = "Layer Fuse";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
pub const LICENSE: &str = env!("CARGO_PKG_LICENSE");
