//! Output writers: PNG/JPEG composites and JSON metadata sidecars.
pub mod jpeg;
pub mod metadata;
pub mod png;
