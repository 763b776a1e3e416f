use image::{ImageFormat, RgbImage};
use std::path::Path;

/// Write an interleaved RGB buffer as a PNG file.
pub fn write_rgb_png(
    output: &Path,
    cols: usize,
    rows: usize,
    rgb_data: &[u8],
) -> Result<(), Box<dyn std::error::Error>> {
    let img = RgbImage::from_raw(cols as u32, rows as u32, rgb_data.to_vec())
        .ok_or("RGB buffer does not match the given dimensions")?;
    img.save_with_format(output, ImageFormat::Png)?;
    Ok(())
}
