//! Band processing: percentile stretch, RGB stacking, and save helpers.

pub mod compose;
pub mod save;
pub mod stretch;
