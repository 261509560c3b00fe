mod aggregate;
mod apportion;
mod correct;
mod fuse;
mod options;

pub use apportion::CandidatePair;
pub use fuse::{candidate_pairs, fuse, layerfuse};
pub use options::{FuseOptions, OVERLAP_COLUMN};
