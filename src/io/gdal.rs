use gdal::{Dataset, errors::GdalError as GdalCrateError};
use ndarray::Array2;
use std::path::Path;
use thiserror::Error;

/// Errors encountered when using the GDAL reader
#[derive(Debug, Error)]
pub enum GdalError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] GdalCrateError),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Dimension mismatch: expected {expected_x}x{expected_y}, got {got} samples")]
    DimensionMismatch {
        expected_x: usize,
        expected_y: usize,
        got: usize,
    },
}

/// Metadata extracted from a GDAL-supported dataset
#[derive(Debug, Clone)]
pub struct GdalMetadata {
    /// Width (pixels) of the raster
    pub size_x: usize,
    /// Height (lines) of the raster
    pub size_y: usize,
    /// Number of raster bands
    pub bands: usize,
    /// Affine geotransform coefficients ([origin_x, pixel_width, rot_x, origin_y, rot_y, pixel_height])
    pub geotransform: [f64; 6],
    /// Projection, canonicalized to `EPSG:XXXX` when the WKT carries an
    /// authority tag (Sentinel-2 JP2 rasters always do)
    pub projection: String,
}

/// Reader for single-band reflectance rasters via GDAL. Sentinel-2 products
/// ship JPEG2000, but any GDAL-supported format with a u16 band works.
pub struct GdalBandReader {
    pub dataset: Dataset,
    pub metadata: GdalMetadata,
}

// Helper to extract EPSG code from WKT authority tag
fn parse_epsg(wkt: &str) -> Option<String> {
    const KEY: &str = "AUTHORITY[\"EPSG\",\"";
    if let Some(idx) = wkt.rfind(KEY) {
        let start = idx + KEY.len();
        if let Some(end) = wkt[start..].find('"') {
            let code = &wkt[start..start + end];
            return Some(format!("EPSG:{}", code));
        }
    }
    None
}

impl GdalBandReader {
    /// Open a GDAL-supported raster dataset (e.g., JP2, GeoTIFF)
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GdalError> {
        let dataset = Dataset::open(path.as_ref())?;
        let (size_x, size_y) = dataset.raster_size();
        let bands = dataset.raster_count() as usize;
        if bands == 0 {
            return Err(GdalError::UnsupportedFormat("No raster bands found".into()));
        }
        let geotransform = match dataset.geo_transform() {
            Ok(gt) => gt,
            Err(_) => [0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        };
        let proj = dataset.projection();
        let projection = if proj.starts_with("EPSG:") {
            proj
        } else if let Some(code) = parse_epsg(&proj) {
            code
        } else {
            proj
        };
        Ok(GdalBandReader {
            dataset,
            metadata: GdalMetadata {
                size_x: size_x as usize,
                size_y: size_y as usize,
                bands,
                geotransform,
                projection,
            },
        })
    }

    /// Read a single band (1-based index) as a u16 ndarray of shape (height, width)
    pub fn read_band(&self, index: usize) -> Result<Array2<u16>, GdalError> {
        if index == 0 || index > self.metadata.bands {
            return Err(GdalError::UnsupportedFormat(format!(
                "Band index {} out of range",
                index
            )));
        }
        let band = self.dataset.rasterband(index)?;
        // Full window at native resolution
        let window = (self.metadata.size_x, self.metadata.size_y);
        let buf = band.read_as::<u16>((0, 0), window, window, None)?;
        let data_vec = buf.data().to_vec();
        let got = data_vec.len();
        let array = Array2::from_shape_vec((self.metadata.size_y, self.metadata.size_x), data_vec)
            .map_err(|_| GdalError::DimensionMismatch {
                expected_x: self.metadata.size_x,
                expected_y: self.metadata.size_y,
                got,
            })?;
        Ok(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epsg_is_parsed_from_the_last_authority_tag() {
        let wkt = r#"PROJCS["WGS 84 / UTM zone 30N",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],AUTHORITY["EPSG","4326"]],PROJECTION["Transverse_Mercator"],AUTHORITY["EPSG","32630"]]"#;
        assert_eq!(parse_epsg(wkt), Some("EPSG:32630".to_string()));
    }

    #[test]
    fn epsg_parse_requires_an_authority_tag() {
        assert_eq!(parse_epsg("LOCAL_CS[\"arbitrary\"]"), None);
        assert_eq!(parse_epsg(""), None);
    }

    #[test]
    fn dimension_mismatch_reports_the_actual_sample_count() {
        let err = GdalError::DimensionMismatch {
            expected_x: 4,
            expected_y: 3,
            got: 10,
        };
        assert_eq!(err.to_string(), "Dimension mismatch: expected 4x3, got 10 samples");
    }
}
