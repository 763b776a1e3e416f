use ndarray::{Array2, Array3, s};

use crate::error::{Error, Result};

/// Stack three normalized bands into an (H,W,3) composite, channel order
/// R,G,B. Each channel is an independent copy of its input band.
///
/// All three bands must share one shape; a mismatch aborts the current
/// tile's conversion (the error names the offending channel against the red
/// band's shape). The output is a fresh standard-layout array, so callers
/// can flatten it to an interleaved RGB byte stream without copying.
pub fn compose_rgb(
    red: &Array2<u8>,
    green: &Array2<u8>,
    blue: &Array2<u8>,
) -> Result<Array3<u8>> {
    let (rows, cols) = red.dim();

    for (channel, band) in [("green", green), ("blue", blue)] {
        let (actual_rows, actual_cols) = band.dim();
        if (actual_rows, actual_cols) != (rows, cols) {
            return Err(Error::ShapeMismatch {
                channel,
                expected_rows: rows,
                expected_cols: cols,
                actual_rows,
                actual_cols,
            });
        }
    }

    let mut rgb = Array3::<u8>::zeros((rows, cols, 3));
    rgb.slice_mut(s![.., .., 0]).assign(red);
    rgb.slice_mut(s![.., .., 1]).assign(green);
    rgb.slice_mut(s![.., .., 2]).assign(blue);
    Ok(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn compose_stacks_channels_in_rgb_order() {
        let red = array![[10u8, 20], [30, 40]];
        let green = array![[50u8, 60], [70, 80]];
        let blue = array![[90u8, 100], [110, 120]];

        let rgb = compose_rgb(&red, &green, &blue).unwrap();
        assert_eq!(rgb.dim(), (2, 2, 3));
        assert_eq!(rgb.slice(s![.., .., 0]), red);
        assert_eq!(rgb.slice(s![.., .., 1]), green);
        assert_eq!(rgb.slice(s![.., .., 2]), blue);
    }

    #[test]
    fn compose_rejects_mismatched_green() {
        let red = Array2::<u8>::zeros((2, 2));
        let green = Array2::<u8>::zeros((2, 3));
        let blue = Array2::<u8>::zeros((2, 2));

        let err = compose_rgb(&red, &green, &blue).unwrap_err();
        match err {
            Error::ShapeMismatch { channel, .. } => assert_eq!(channel, "green"),
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn compose_rejects_mismatched_blue() {
        let red = Array2::<u8>::zeros((4, 4));
        let green = Array2::<u8>::zeros((4, 4));
        let blue = Array2::<u8>::zeros((3, 4));

        assert!(matches!(
            compose_rgb(&red, &green, &blue),
            Err(Error::ShapeMismatch { channel: "blue", .. })
        ));
    }

    #[test]
    fn compose_output_flattens_to_interleaved_rgb() {
        let red = array![[1u8, 4]];
        let green = array![[2u8, 5]];
        let blue = array![[3u8, 6]];

        let rgb = compose_rgb(&red, &green, &blue).unwrap();
        let flat = rgb.as_slice().expect("composite must be standard layout");
        assert_eq!(flat, &[1, 2, 3, 4, 5, 6]);
    }
}
