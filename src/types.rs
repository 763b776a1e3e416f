//! Shared types and enums used across s2rgb.
//! Includes the output image format and the Sentinel-2 spectral band
//! identifiers the composer works with.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
pub enum OutputFormat {
    Png,
    Jpeg, // Lossy, preview only
}

impl OutputFormat {
    /// File extension for this format, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OutputFormat::Png => "PNG",
            OutputFormat::Jpeg => "JPEG",
        };
        write!(f, "{}", s)
    }
}

/// The three 10 m visible bands of a Sentinel-2 L2A product.
///
/// Only these bands participate in true-color composition; the NIR and
/// lower-resolution bands of a product are ignored.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
pub enum SpectralBand {
    B02,
    B03,
    B04,
}

impl SpectralBand {
    /// All bands a composite needs, in wavelength order.
    pub const ALL: [SpectralBand; 3] = [SpectralBand::B02, SpectralBand::B03, SpectralBand::B04];

    /// File-name suffix of this band's 10 m JP2 raster inside a product.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            SpectralBand::B02 => "_B02_10m.jp2",
            SpectralBand::B03 => "_B03_10m.jp2",
            SpectralBand::B04 => "_B04_10m.jp2",
        }
    }

    /// Conventional color name of this band in a true-color composite.
    pub fn color_name(&self) -> &'static str {
        match self {
            SpectralBand::B02 => "blue",
            SpectralBand::B03 => "green",
            SpectralBand::B04 => "red",
        }
    }
}

impl std::fmt::Display for SpectralBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SpectralBand::B02 => "B02",
            SpectralBand::B03 => "B03",
            SpectralBand::B04 => "B04",
        };
        write!(f, "{}", s)
    }
}
