use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{OutputFormat, SpectralBand};

/// Percentile-stretch parameters suitable for config files and presets.
///
/// Both thresholds are percentages in [0,100] with `low < high`. The
/// defaults (2/98) clip the darkest and brightest 2% of valid pixels,
/// which removes most sensor outliers without flattening the scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StretchParams {
    pub low_percentile: f64,
    pub high_percentile: f64,
}

impl Default for StretchParams {
    fn default() -> Self {
        Self {
            low_percentile: 2.0,
            high_percentile: 98.0,
        }
    }
}

impl StretchParams {
    pub fn new(low_percentile: f64, high_percentile: f64) -> Self {
        Self {
            low_percentile,
            high_percentile,
        }
    }

    /// Check that both percentiles are in [0,100] and ordered.
    pub fn validate(&self) -> Result<()> {
        if !self.low_percentile.is_finite() || !(0.0..=100.0).contains(&self.low_percentile) {
            return Err(Error::InvalidArgument {
                arg: "low_percentile",
                value: self.low_percentile.to_string(),
            });
        }
        if !self.high_percentile.is_finite() || !(0.0..=100.0).contains(&self.high_percentile) {
            return Err(Error::InvalidArgument {
                arg: "high_percentile",
                value: self.high_percentile.to_string(),
            });
        }
        if self.low_percentile >= self.high_percentile {
            return Err(Error::InvalidArgument {
                arg: "low_percentile",
                value: format!(
                    "{} (must be below high_percentile={})",
                    self.low_percentile, self.high_percentile
                ),
            });
        }
        Ok(())
    }
}

/// Band-to-channel assignment for the composite.
///
/// The default is the conventional true-color mapping: B04 to red, B03 to
/// green, B02 to blue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMap {
    pub red: SpectralBand,
    pub green: SpectralBand,
    pub blue: SpectralBand,
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self {
            red: SpectralBand::B04,
            green: SpectralBand::B03,
            blue: SpectralBand::B02,
        }
    }
}

/// Composition parameters suitable for config files and presets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeParams {
    pub format: OutputFormat,
    pub stretch: StretchParams,
    pub channels: ChannelMap,
}

impl Default for ComposeParams {
    fn default() -> Self {
        Self {
            format: OutputFormat::Png,
            stretch: StretchParams::default(),
            channels: ChannelMap::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let stretch = StretchParams::default();
        assert_eq!(stretch.low_percentile, 2.0);
        assert_eq!(stretch.high_percentile, 98.0);

        let channels = ChannelMap::default();
        assert_eq!(channels.red, SpectralBand::B04);
        assert_eq!(channels.green, SpectralBand::B03);
        assert_eq!(channels.blue, SpectralBand::B02);

        let params = ComposeParams::default();
        assert_eq!(params.format, OutputFormat::Png);
    }

    #[test]
    fn validate_accepts_ordered_percentiles() {
        assert!(StretchParams::new(0.0, 100.0).validate().is_ok());
        assert!(StretchParams::new(2.0, 98.0).validate().is_ok());
        assert!(StretchParams::new(49.9, 50.1).validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_or_inverted() {
        assert!(StretchParams::new(-1.0, 98.0).validate().is_err());
        assert!(StretchParams::new(2.0, 101.0).validate().is_err());
        assert!(StretchParams::new(98.0, 2.0).validate().is_err());
        assert!(StretchParams::new(50.0, 50.0).validate().is_err());
        assert!(StretchParams::new(f64::NAN, 98.0).validate().is_err());
    }

    #[test]
    fn params_round_trip_through_json() {
        let params = ComposeParams::default();
        let json = serde_json::to_string(&params).unwrap();
        let back: ComposeParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back.format, params.format);
        assert_eq!(back.stretch, params.stretch);
        assert_eq!(back.channels, params.channels);
    }
}
