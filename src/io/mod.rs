//! I/O layer for reading Sentinel-2 products and GDAL-backed rasters.
//! Provides the `sentinel2` product reader, `gdal` adapters, and `writers`
//! for PNG/JPEG outputs and metadata sidecars.
pub mod sentinel2;
pub use sentinel2::{ProductError, ProductReader, TileMetadata};

pub mod gdal;
pub use gdal::{GdalBandReader, GdalError, GdalMetadata};

pub mod writers;
