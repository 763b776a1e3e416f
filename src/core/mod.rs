//! Core processing building blocks: percentile stretch, RGB composition,
//! and save helpers. These are internal primitives consumed by the
//! high-level `api` module.
pub mod params;
pub mod processing;
