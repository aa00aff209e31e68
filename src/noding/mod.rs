pub mod split;
pub mod sweep;

pub use split::{intersect, planarize, split_points, split_segments};
pub use sweep::{
    crossing_candidates, does_not_intersect, find_intersects, ActiveSet, ArrayActiveSet,
};
