//! High-level, ergonomic library API: compose products to files or in-memory
//! buffers, batch helpers for directories, and the catalog fetch entrypoint.
//! Prefer these over the low-level processing modules when integrating s2rgb.
use std::path::{Path, PathBuf};

use ndarray::Array3;
use tracing::{info, warn};

use crate::cdse;
use crate::cdse::query::ProductQuery;
use crate::core::params::ComposeParams;
use crate::core::processing::compose::compose_rgb;
use crate::core::processing::save::save_composite;
use crate::core::processing::stretch::stretch_band;
use crate::error::{Error, Result};
use crate::io::sentinel2::{ProductReader, TileMetadata};
use crate::types::OutputFormat;

/// Result of in-memory composition
#[derive(Debug, Clone)]
pub struct ComposedImage {
    pub width: usize,
    pub height: usize,
    pub format: OutputFormat,
    /// Interleaved 8-bit RGB, row-major
    pub rgb: Vec<u8>,
    pub metadata: TileMetadata,
}

/// Batch composition report
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchReport {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Catalog fetch report
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchReport {
    pub found: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Output file name for a product quicklook: `<stem>_RGB.<ext>`
pub fn quicklook_file_name(stem: &str, format: OutputFormat) -> String {
    format!("{}_RGB.{}", stem, format.extension())
}

/// Stretch the three channel bands and stack them, reading one band at a
/// time so only a single full-resolution u16 raster is resident at once.
fn compose_with_reader(reader: &mut ProductReader, params: &ComposeParams) -> Result<Array3<u8>> {
    params.stretch.validate()?;

    let red = {
        let band = reader.read_band(params.channels.red)?;
        stretch_band(&band, &params.stretch)?
    };
    let green = {
        let band = reader.read_band(params.channels.green)?;
        stretch_band(&band, &params.stretch)?
    };
    let blue = {
        let band = reader.read_band(params.channels.blue)?;
        stretch_band(&band, &params.stretch)?
    };

    compose_rgb(&red, &green, &blue)
}

/// Compose a product to an in-memory RGB buffer (no disk output)
pub fn compose_product_to_buffer(input: &Path, params: &ComposeParams) -> Result<ComposedImage> {
    let mut reader = ProductReader::open(input)?;
    let rgb = compose_with_reader(&mut reader, params)?;

    let (height, width, _) = rgb.dim();
    let data = match rgb.as_slice() {
        Some(slice) => slice.to_vec(),
        None => rgb.iter().copied().collect(),
    };

    Ok(ComposedImage {
        width,
        height,
        format: params.format,
        rgb: data,
        metadata: reader.metadata.clone(),
    })
}

/// Compose a product and save it, with its metadata sidecar, to `output`
pub fn compose_product_to_path(input: &Path, output: &Path, params: &ComposeParams) -> Result<()> {
    let mut reader = ProductReader::open(input)?;
    let rgb = compose_with_reader(&mut reader, params)?;
    save_composite(
        &rgb,
        output,
        params.format,
        Some(&reader.metadata),
        &params.stretch,
    )
    .map_err(Error::external)?;
    Ok(())
}

/// Return candidate products under `input_dir`: zip archives and unpacked
/// `.SAFE` directories, in lexical order.
pub fn iterate_products(input_dir: &Path) -> Result<std::vec::IntoIter<PathBuf>> {
    let mut products = Vec::new();
    for entry in std::fs::read_dir(input_dir).map_err(Error::from)? {
        let path = entry.map_err(Error::from)?.path();
        let is_zip = path.is_file()
            && path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("zip"))
                .unwrap_or(false);
        let is_safe_dir = path.is_dir()
            && path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("SAFE"))
                .unwrap_or(false);
        if is_zip || is_safe_dir {
            products.push(path);
        }
    }
    products.sort();
    Ok(products.into_iter())
}

/// Compose every product from `input_dir` into `output_dir` using `params`.
/// Existing quicklooks are skipped unless `overwrite` is set. If
/// `continue_on_error` is true, errors are counted in the report and
/// processing continues; otherwise the first error is returned.
pub fn compose_directory_to_path(
    input_dir: &Path,
    output_dir: &Path,
    params: &ComposeParams,
    continue_on_error: bool,
    overwrite: bool,
) -> Result<BatchReport> {
    std::fs::create_dir_all(output_dir).map_err(Error::from)?;

    let mut report = BatchReport::default();

    for path in iterate_products(input_dir)? {
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = stem.strip_suffix(".SAFE").map(str::to_string).unwrap_or(stem);
        let output_path = output_dir.join(quicklook_file_name(&stem, params.format));

        if output_path.exists() && !overwrite {
            info!("Skipping {:?} (quicklook already exists)", path);
            report.skipped += 1;
            continue;
        }

        match ProductReader::open_with_warnings(&path) {
            Ok(Some(mut reader)) => {
                let result = compose_with_reader(&mut reader, params).and_then(|rgb| {
                    save_composite(
                        &rgb,
                        &output_path,
                        params.format,
                        Some(&reader.metadata),
                        &params.stretch,
                    )
                    .map_err(Error::external)
                });
                match result {
                    Ok(()) => report.processed += 1,
                    Err(e) => {
                        warn!("Failed to compose {:?}: {}", path, e);
                        report.errors += 1;
                        if !continue_on_error {
                            return Err(e);
                        }
                    }
                }
            }
            Ok(None) => report.skipped += 1,
            Err(e) => {
                warn!("Failed to open {:?}: {}", path, e);
                report.errors += 1;
                if !continue_on_error {
                    return Err(e.into());
                }
            }
        }
    }

    Ok(report)
}

/// Search the catalog and download every matching product into
/// `output_dir`. Archives already present are skipped; download failures
/// are logged and counted, and the remaining products still run.
pub fn fetch_products_to_dir(
    query: &ProductQuery,
    credentials_path: &Path,
    output_dir: &Path,
) -> Result<FetchReport> {
    let credentials = cdse::Credentials::from_file(credentials_path)?;
    let client = cdse::http_client()?;

    let products = cdse::search_products(&client, query)?;
    let mut report = FetchReport {
        found: products.len(),
        ..FetchReport::default()
    };

    std::fs::create_dir_all(output_dir).map_err(Error::from)?;

    for (index, product) in products.iter().enumerate() {
        let dest = output_dir.join(format!("{}.zip", product.file_stem()));
        if dest.exists() {
            info!("Archive already exists, skipping download: {:?}", dest);
            report.skipped += 1;
            continue;
        }

        info!(
            "Downloading {} ({}/{})",
            product.name,
            index + 1,
            products.len()
        );
        // Tokens are short-lived relative to a product download, so each
        // product authenticates from scratch.
        let attempt = cdse::request_access_token(&client, &credentials)
            .and_then(|token| cdse::download_product(&client, &token, product, &dest));
        match attempt {
            Ok(()) => report.downloaded += 1,
            Err(e) => {
                warn!("Failed to download {}: {}", product.name, e);
                report.errors += 1;
            }
        }
    }

    Ok(report)
}
