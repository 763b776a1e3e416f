use ndarray::Array3;
use std::path::Path;
use tracing::info;

use crate::core::params::StretchParams;
use crate::io::sentinel2::TileMetadata;
use crate::io::writers::jpeg::write_rgb_jpeg;
use crate::io::writers::metadata::create_metadata_sidecar_with_extras;
use crate::io::writers::png::write_rgb_png;
use crate::types::OutputFormat;

/// Save a stacked RGB composite to disk in the requested format, together
/// with a JSON metadata sidecar when tile metadata is available.
///
/// The composite must be a `(rows, cols, 3)` array; the innermost axis is
/// interpreted as interleaved R, G, B.
pub fn save_composite(
    rgb: &Array3<u8>,
    output: &Path,
    format: OutputFormat,
    metadata: Option<&TileMetadata>,
    stretch: &StretchParams,
) -> Result<(), Box<dyn std::error::Error>> {
    let (rows, cols, channels) = rgb.dim();
    if channels != 3 {
        return Err(format!("expected 3 channels in RGB composite, got {}", channels).into());
    }

    // Standard layout keeps the channel axis innermost, which is exactly the
    // interleaved ordering the encoders want. Fall back to an iterator copy
    // for non-contiguous views.
    let flat: Vec<u8> = match rgb.as_slice() {
        Some(slice) => slice.to_vec(),
        None => rgb.iter().copied().collect(),
    };

    match format {
        OutputFormat::Png => write_rgb_png(output, cols, rows, &flat)?,
        OutputFormat::Jpeg => write_rgb_jpeg(output, cols, rows, &flat)?,
    }
    info!("Saved {} composite: {:?} ({}x{})", format, output, cols, rows);

    if let Some(meta) = metadata {
        let extras = [
            ("stretch_low_percentile", stretch.low_percentile.to_string()),
            ("stretch_high_percentile", stretch.high_percentile.to_string()),
        ];
        create_metadata_sidecar_with_extras(output, meta, Some(&extras))?;
    }

    Ok(())
}
