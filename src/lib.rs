#![doc = r#"
s2rgb — Sentinel-2 true-color quicklook toolkit.

This crate turns Sentinel-2 L2A products (zip archives as downloaded from the
Copernicus Data Space, or unpacked `.SAFE` directories) into
percentile-stretched true-color PNGs or JPEGs, and can query and download the
products themselves from the CDSE OData catalog. It powers the `s2rgb` CLI
and can be embedded in your own Rust applications.

Stability
---------
The public library API is experimental in initial releases and may evolve as
the crate stabilizes. Breaking changes can occur.

Requirements
------------
- GDAL development headers and runtime available on your system, built with
  JPEG2000 support (the OpenJPEG driver reads the band rasters).
- Rust 2024 edition toolchain.
- A Copernicus Data Space account for catalog downloads (composition works
  offline).

Add dependency
--------------
```toml
[dependencies]
s2rgb = "0.1"
```

Quick start: compose a product to a file
----------------------------------------
```rust,no_run
use std::path::Path;
use s2rgb::{ComposeParams, OutputFormat, StretchParams, compose_product_to_path};

fn main() -> s2rgb::Result<()> {
    let params = ComposeParams {
        format: OutputFormat::Jpeg,
        stretch: StretchParams::new(2.0, 98.0),
        ..ComposeParams::default()
    };

    compose_product_to_path(
        Path::new("/data/S2B_MSIL2A_example.zip"),
        Path::new("/out/S2B_MSIL2A_example_RGB.jpg"),
        &params,
    )
}
```

Compose in-memory to `ComposedImage`
------------------------------------
```rust,no_run
use std::path::Path;
use s2rgb::{ComposeParams, compose_product_to_buffer};

fn main() -> s2rgb::Result<()> {
    let img = compose_product_to_buffer(
        Path::new("/data/S2B_MSIL2A_example.zip"),
        &ComposeParams::default(),
    )?;

    // `img.rgb` holds interleaved 8-bit RGB; the sidecar fields live in
    // `img.metadata`.
    println!("{}x{} quicklook of {}", img.width, img.height, img.metadata.product_name);
    Ok(())
}
```

Batch helpers
-------------
```rust,no_run
use std::path::Path;
use s2rgb::{ComposeParams, compose_directory_to_path};

fn main() -> s2rgb::Result<()> {
    let report = compose_directory_to_path(
        Path::new("/data/Sentinel_Raw"),
        Path::new("/out"),
        &ComposeParams::default(),
        true,  // continue_on_error
        false, // overwrite
    )?;

    println!(
        "processed={} skipped={} errors={}",
        report.processed, report.skipped, report.errors
    );
    Ok(())
}
```

Fetch products from the catalog
-------------------------------
```rust,no_run
use chrono::NaiveDate;
use std::path::Path;
use s2rgb::{ProductQuery, fetch_products_to_dir};

fn main() -> s2rgb::Result<()> {
    let query = ProductQuery {
        collection: "SENTINEL-2".to_string(),
        bbox: [-1.830597, 42.719777, -1.483154, 42.888040],
        start_date: NaiveDate::from_ymd_opt(2024, 4, 28).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2024, 8, 6).unwrap(),
        max_cloud_cover: 90.0,
        limit: 1,
    };

    let report = fetch_products_to_dir(
        &query,
        Path::new("credentials.txt"),
        Path::new("/data/Sentinel_Raw"),
    )?;
    println!("downloaded {} of {} products", report.downloaded, report.found);
    Ok(())
}
```

Error handling
--------------
All public functions return `s2rgb::Result<T>`; match on `s2rgb::Error` to
handle specific cases, e.g. product reader or catalog errors.

```rust,no_run
use std::path::Path;
use s2rgb::{ComposeParams, Error, compose_product_to_path};

fn main() {
    let params = ComposeParams::default();
    match compose_product_to_path(Path::new("/bad/path.zip"), Path::new("/out.png"), &params) {
        Ok(()) => {}
        Err(Error::Product(e)) => eprintln!("product error: {e}"),
        Err(Error::Gdal(e)) => eprintln!("GDAL error: {e}"),
        Err(Error::Catalog(e)) => eprintln!("catalog error: {e}"),
        Err(other) => eprintln!("other error: {other}"),
    }
}
```

Useful modules
--------------
- [`api`] — high-level, ergonomic entry points.
- [`cdse`] — Copernicus Data Space catalog client (auth, search, download).
- [`core`] — stretch parameters and the processing primitives.
- [`io`] — product and GDAL readers, image writers.
- [`types`] — enums shared across the crate (`OutputFormat`, `SpectralBand`).
- [`error`] — crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod cdse;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Curated public API surface
// Types
pub use crate::core::params::{ChannelMap, ComposeParams, StretchParams};
pub use crate::error::{Error, Result};
pub use crate::types::{OutputFormat, SpectralBand};

// Readers
pub use crate::io::gdal::{GdalBandReader, GdalError, GdalMetadata};
pub use crate::io::sentinel2::{ProductError, ProductReader, TileMetadata};

// Selected writer helpers (keep low-level metadata helpers public)
pub use crate::io::writers::metadata::{
    create_metadata_sidecar, create_metadata_sidecar_with_extras, extract_metadata_fields,
};

// Catalog client
pub use crate::cdse::{CdseError, Credentials, ProductEntry, ProductQuery};

// Processing primitives (kept public for custom pipelines)
pub use crate::core::processing::compose::compose_rgb;
pub use crate::core::processing::stretch::{BandStats, compute_band_stats, stretch_band};

// High-level API re-exports
pub use crate::api::{
    BatchReport, ComposedImage, FetchReport, compose_directory_to_path,
    compose_product_to_buffer, compose_product_to_path, fetch_products_to_dir, iterate_products,
    quicklook_file_name,
};
