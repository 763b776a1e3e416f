use ndarray::{Array2, Zip};
use tracing::{debug, warn};

use crate::core::params::StretchParams;
use crate::error::Result;

/// Output level assigned to valid pixels when the stretch window collapses
/// (high percentile == low percentile). A mid-gray keeps such pixels
/// distinguishable from the no-data value 0.
const FLAT_WINDOW_LEVEL: u8 = 128;

/// Number of distinct values a u16 reflectance sample can take. The
/// histogram spans the whole domain, so percentiles are exact order
/// statistics, not binned estimates.
const HISTOGRAM_BINS: usize = u16::MAX as usize + 1;

/// Percentile window and basic statistics over the valid (non-zero) pixels
/// of one band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandStats {
    pub valid_count: u64,
    pub min: u16,
    pub max: u16,
    pub p_low: f64,
    pub p_high: f64,
}

/// Compute the percentile window over valid pixels via a counting histogram.
///
/// Pixels equal to 0 carry no data and never enter the statistics. The
/// percentile definition matches the conventional linear interpolation
/// between the two nearest order statistics at rank `p/100 * (n-1)`.
pub fn compute_band_stats(band: &Array2<u16>, low_percentile: f64, high_percentile: f64) -> BandStats {
    let mut hist = vec![0u64; HISTOGRAM_BINS];
    let mut count: u64 = 0;

    for &v in band.iter() {
        if v > 0 {
            hist[v as usize] += 1;
            count += 1;
        }
    }

    if count == 0 {
        return BandStats {
            valid_count: 0,
            min: 0,
            max: 0,
            p_low: 0.0,
            p_high: 0.0,
        };
    }

    let mut min = u16::MAX;
    let mut max = 0u16;
    for (value, &n) in hist.iter().enumerate() {
        if n > 0 {
            if (value as u16) < min {
                min = value as u16;
            }
            if (value as u16) > max {
                max = value as u16;
            }
        }
    }

    BandStats {
        valid_count: count,
        min,
        max,
        p_low: percentile_from_histogram(&hist, count, low_percentile),
        p_high: percentile_from_histogram(&hist, count, high_percentile),
    }
}

/// k-th smallest valid value (0-based) read off the counting histogram.
fn order_statistic(hist: &[u64], k: u64) -> u16 {
    let mut cumsum: u64 = 0;
    for (value, &n) in hist.iter().enumerate() {
        cumsum += n;
        if k < cumsum {
            return value as u16;
        }
    }
    u16::MAX
}

/// Exact percentile with linear interpolation between adjacent order
/// statistics. `count` must be the total number of samples in `hist`.
fn percentile_from_histogram(hist: &[u64], count: u64, p: f64) -> f64 {
    let rank = (p / 100.0) * ((count - 1) as f64);
    let lower = rank.floor() as u64;
    let frac = rank - lower as f64;

    let lower_value = order_statistic(hist, lower) as f64;
    if frac == 0.0 {
        return lower_value;
    }
    let upper_value = order_statistic(hist, lower + 1) as f64;
    lower_value + (upper_value - lower_value) * frac
}

/// Percentile-stretch one band to u8.
///
/// The valid mask is the set of pixels greater than 0; no-data pixels stay 0
/// in the output and never influence the percentile window. Valid pixels are
/// clipped to the window and rescaled linearly to [0,255] (truncating
/// division, so only pixels at or above the high cut reach 255).
///
/// A band with no valid pixels is not an error: the result is all zeros and
/// a warning is emitted, so a tile with one empty band still composes into a
/// usable (dark-channel) quicklook.
pub fn stretch_band(band: &Array2<u16>, params: &StretchParams) -> Result<Array2<u8>> {
    params.validate()?;

    let stats = compute_band_stats(band, params.low_percentile, params.high_percentile);
    let mut out = Array2::<u8>::zeros(band.raw_dim());

    if stats.valid_count == 0 {
        warn!(
            "band has no valid pixels ({} total, all no-data); emitting an all-zero channel",
            band.len()
        );
        return Ok(out);
    }

    debug!(
        "stretch: valid={}/{} range=[{},{}] window=[{:.2},{:.2}]",
        stats.valid_count,
        band.len(),
        stats.min,
        stats.max,
        stats.p_low,
        stats.p_high
    );

    let low = stats.p_low;
    let high = stats.p_high;

    if high <= low {
        warn!(
            "degenerate stretch window [{:.2},{:.2}]; mapping valid pixels to constant {}",
            low, high, FLAT_WINDOW_LEVEL
        );
        Zip::from(&mut out).and(band).for_each(|o, &v| {
            if v > 0 {
                *o = FLAT_WINDOW_LEVEL;
            }
        });
        return Ok(out);
    }

    Zip::from(&mut out).and(band).for_each(|o, &v| {
        if v > 0 {
            let clipped = (v as f64).clamp(low, high);
            *o = ((clipped - low) / (high - low) * 255.0) as u8;
        }
    });

    Ok(out)
}
