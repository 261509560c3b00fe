mod envelope;
mod geom;
mod pairs;

use envelope::RowEnvelope;
pub use geom::Geometries;
pub use pairs::PairPredicate;
