use chrono;
use ndarray::Array2;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::fs;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{info, warn};
use zip::ZipArchive;

use crate::io::gdal::GdalBandReader;
use crate::types::SpectralBand;

/// Errors encountered when reading Sentinel-2 products
#[derive(Debug, Error)]
pub enum ProductError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("GDAL error: {0}")]
    Gdal(#[from] crate::io::gdal::GdalError),
    #[error("Missing {band} file (no R10m entry ending with {suffix})", suffix = .band.file_suffix())]
    MissingBand { band: SpectralBand },
    #[error("Unsupported product: {0}")]
    UnsupportedProduct(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Metadata extracted from a Sentinel-2 L2A product
#[derive(Debug, Clone)]
pub struct TileMetadata {
    // Product identity
    pub product_name: String,
    pub platform: String,
    pub product_type: String,
    pub processing_level: String,

    // Acquisition
    pub sensing_start: String,
    pub sensing_stop: String,
    pub orbit_number: u64,
    pub orbit_direction: Option<String>,
    pub generation_time: Option<String>,
    pub cloud_cover: Option<f64>,

    // Raster characteristics
    pub bands: Vec<String>,
    pub lines: usize,
    pub samples: usize,

    // Georeferencing information
    pub geotransform: Option<[f64; 6]>,
    pub crs: Option<String>,

    // Conversion provenance
    pub conversion_tool: String,
    pub conversion_version: String,
    pub conversion_timestamp: String,
}

impl TileMetadata {
    /// Metadata skeleton carrying only the product name and conversion
    /// provenance. Everything else is filled in from MTD_MSIL2A.xml and the
    /// band rasters as they are read.
    pub fn new(product_name: impl Into<String>) -> Self {
        TileMetadata {
            product_name: product_name.into(),
            platform: String::new(),
            product_type: String::new(),
            processing_level: String::new(),
            sensing_start: String::new(),
            sensing_stop: String::new(),
            orbit_number: 0,
            orbit_direction: None,
            generation_time: None,
            cloud_cover: None,
            bands: Vec::new(),
            lines: 0,
            samples: 0,
            geotransform: None,
            crs: None,
            conversion_tool: "s2rgb".to_string(),
            conversion_version: env!("CARGO_PKG_VERSION").to_string(),
            conversion_timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// True when a zip entry name points at one of the 10 m visible-band
/// rasters. Band files live under `GRANULE/<id>/IMG_DATA/R10m/` and end
/// with `_Bxx_10m.jp2`; the R10m check keeps the 20 m and 60 m copies of
/// the same bands out.
pub(crate) fn is_band_entry(name: &str, band: SpectralBand) -> bool {
    name.contains("R10m") && name.ends_with(band.file_suffix())
}

/// Reader for Sentinel-2 L2A products, either zipped as downloaded from the
/// Copernicus Data Space or already unpacked as a `.SAFE` directory.
pub struct ProductReader {
    pub source: PathBuf,
    pub metadata: TileMetadata,
    band_paths: Vec<(SpectralBand, PathBuf)>,
    // Keeps zip-extracted rasters alive for the lifetime of the reader
    _extracted: Option<TempDir>,
}

impl ProductReader {
    /// Open a product and locate its 10 m B02/B03/B04 rasters.
    ///
    /// Zip archives are opened in place; only the three band files and the
    /// product metadata XML are extracted, into a temporary directory that
    /// lives as long as the reader.
    pub fn open<P: AsRef<Path>>(source: P) -> Result<Self, ProductError> {
        let source = source.as_ref().to_path_buf();
        info!("Opening product: {:?}", source);

        let (mut metadata, band_paths, extracted) = if source.is_dir() {
            Self::open_directory(&source)?
        } else if is_zip(&source) {
            Self::open_archive(&source)?
        } else {
            return Err(ProductError::UnsupportedProduct(format!(
                "{:?} is neither a .SAFE directory nor a zip archive",
                source
            )));
        };

        if band_paths.is_empty() {
            return Err(ProductError::UnsupportedProduct(format!(
                "no 10 m B02/B03/B04 rasters found in {:?}",
                source
            )));
        }
        for band in SpectralBand::ALL {
            if !band_paths.iter().any(|(found, _)| *found == band) {
                return Err(ProductError::MissingBand { band });
            }
        }
        metadata.bands = band_paths.iter().map(|(band, _)| band.to_string()).collect();

        Ok(ProductReader {
            source,
            metadata,
            band_paths,
            _extracted: extracted,
        })
    }

    /// Open a product, downgrading an unsupported layout to a warning.
    /// This is useful for batch processing where you want to continue with
    /// the remaining products.
    pub fn open_with_warnings<P: AsRef<Path>>(source: P) -> Result<Option<Self>, ProductError> {
        let source = source.as_ref();
        match Self::open(source) {
            Ok(reader) => Ok(Some(reader)),
            Err(ProductError::UnsupportedProduct(reason)) => {
                warn!("Skipping {:?}: {}", source, reason);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Read one band as a full-resolution u16 array, updating the raster
    /// dimensions and georeferencing in the product metadata.
    pub fn read_band(&mut self, band: SpectralBand) -> Result<Array2<u16>, ProductError> {
        let path = self
            .band_paths
            .iter()
            .find(|(found, _)| *found == band)
            .map(|(_, path)| path.clone())
            .ok_or(ProductError::MissingBand { band })?;

        info!("Reading {} ({} channel) from {:?}", band, band.color_name(), path);
        let reader = GdalBandReader::open(&path)?;
        let data = reader.read_band(1)?;

        self.metadata.lines = data.nrows();
        self.metadata.samples = data.ncols();
        if self.metadata.geotransform.is_none() {
            self.metadata.geotransform = Some(reader.metadata.geotransform);
        }
        if self.metadata.crs.is_none() && !reader.metadata.projection.is_empty() {
            self.metadata.crs = Some(reader.metadata.projection.clone());
        }

        Ok(data)
    }

    /// Access parsed metadata
    pub fn metadata(&self) -> &TileMetadata {
        &self.metadata
    }

    fn open_directory(
        base: &Path,
    ) -> Result<(TileMetadata, Vec<(SpectralBand, PathBuf)>, Option<TempDir>), ProductError> {
        let mtd_path = base.join("MTD_MSIL2A.xml");
        let metadata = Self::read_tile_metadata(base, Some(&mtd_path))?;

        let mut candidates = Vec::new();
        let granule = base.join("GRANULE");
        if granule.is_dir() {
            for entry in fs::read_dir(&granule)? {
                let r10m = entry?.path().join("IMG_DATA").join("R10m");
                if !r10m.is_dir() {
                    continue;
                }
                for file in fs::read_dir(&r10m)? {
                    candidates.push(file?.path());
                }
            }
        }

        let mut band_paths = Vec::new();
        for band in SpectralBand::ALL {
            let hit = candidates.iter().find(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| name.ends_with(band.file_suffix()))
                    .unwrap_or(false)
            });
            if let Some(path) = hit {
                info!("Found {} file: {:?}", band, path);
                band_paths.push((band, path.clone()));
            }
        }

        Ok((metadata, band_paths, None))
    }

    fn open_archive(
        source: &Path,
    ) -> Result<(TileMetadata, Vec<(SpectralBand, PathBuf)>, Option<TempDir>), ProductError> {
        let file = File::open(source)?;
        let mut archive = ZipArchive::new(file)?;
        let names: Vec<String> = archive.file_names().map(str::to_string).collect();

        let dest = tempfile::tempdir()?;

        let mut band_paths = Vec::new();
        for band in SpectralBand::ALL {
            if let Some(name) = names.iter().find(|name| is_band_entry(name.as_str(), band)) {
                info!("Found {} entry: {}", band, name);
                let extracted = Self::extract_entry(&mut archive, name, dest.path())?;
                band_paths.push((band, extracted));
            }
        }

        let mtd_entry = names.iter().find(|name| name.ends_with("MTD_MSIL2A.xml"));
        let metadata = match mtd_entry {
            Some(name) => {
                let mtd_path = Self::extract_entry(&mut archive, name, dest.path())?;
                Self::read_tile_metadata(source, Some(&mtd_path))?
            }
            None => Self::read_tile_metadata(source, None)?,
        };

        Ok((metadata, band_paths, Some(dest)))
    }

    /// Extract one archive member into `dest_dir`, flattening its path.
    fn extract_entry(
        archive: &mut ZipArchive<File>,
        name: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, ProductError> {
        let mut entry = archive.by_name(name)?;
        let file_name = Path::new(name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ProductError::Parse(format!("zip entry has no file name: {}", name)))?;
        let dest = dest_dir.join(file_name);
        let mut out = File::create(&dest)?;
        io::copy(&mut entry, &mut out)?;
        Ok(dest)
    }

    fn read_tile_metadata(
        source: &Path,
        mtd_path: Option<&Path>,
    ) -> Result<TileMetadata, ProductError> {
        let meta = TileMetadata::new(product_name_from_source(source));
        match mtd_path {
            Some(path) if path.is_file() => Self::parse_tile_metadata(path, meta),
            _ => {
                warn!(
                    "No MTD_MSIL2A.xml found in {:?}; product metadata will be minimal",
                    source
                );
                Ok(meta)
            }
        }
    }

    fn parse_tile_metadata(path: &Path, mut meta: TileMetadata) -> Result<TileMetadata, ProductError> {
        let mut reader = Reader::from_file(path)?;
        reader.trim_text(true);
        let mut buf = Vec::new();
        let mut curr = String::new();
        let mut in_datatake = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    curr = tag.clone();
                    if tag == "Datatake" {
                        in_datatake = true;
                    }
                }
                Event::End(ref e) => {
                    let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    if tag == "Datatake" {
                        in_datatake = false;
                    }
                }
                Event::Text(e) => {
                    let txt = e.unescape()?;
                    match curr.as_str() {
                        "PRODUCT_URI" => {
                            let uri = txt.to_string();
                            meta.product_name =
                                uri.strip_suffix(".SAFE").unwrap_or(&uri).to_string();
                        }
                        "PRODUCT_START_TIME" => meta.sensing_start = txt.to_string(),
                        "PRODUCT_STOP_TIME" => meta.sensing_stop = txt.to_string(),
                        "PRODUCT_TYPE" => meta.product_type = txt.to_string(),
                        "PROCESSING_LEVEL" => meta.processing_level = txt.to_string(),
                        "GENERATION_TIME" => meta.generation_time = Some(txt.to_string()),
                        "SPACECRAFT_NAME" if in_datatake => meta.platform = txt.to_string(),
                        "SENSING_ORBIT_NUMBER" if in_datatake => {
                            meta.orbit_number = txt.parse().unwrap_or(0)
                        }
                        "SENSING_ORBIT_DIRECTION" if in_datatake => {
                            meta.orbit_direction = Some(txt.to_string())
                        }
                        "Cloud_Coverage_Assessment" => meta.cloud_cover = txt.parse().ok(),
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(meta)
    }
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

/// Product name from the source path, without the `.SAFE` suffix the
/// archives carry.
fn product_name_from_source(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.strip_suffix(".SAFE") {
        Some(bare) => bare.to_string(),
        None => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    const PRODUCT: &str = "S2B_MSIL2A_20240806T105619_N0511_R094_T30TXM_20240806T121747";

    const MTD_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<n1:Level-2A_User_Product xmlns:n1="https://psd-14.sentinel2.eo.esa.int/PSD/User_Product_Level-2A.xsd">
  <n1:General_Info>
    <Product_Info>
      <PRODUCT_START_TIME>2024-08-06T10:56:19.024Z</PRODUCT_START_TIME>
      <PRODUCT_STOP_TIME>2024-08-06T10:56:19.024Z</PRODUCT_STOP_TIME>
      <PRODUCT_URI>S2B_MSIL2A_20240806T105619_N0511_R094_T30TXM_20240806T121747.SAFE</PRODUCT_URI>
      <PROCESSING_LEVEL>Level-2A</PROCESSING_LEVEL>
      <PRODUCT_TYPE>S2MSI2A</PRODUCT_TYPE>
      <GENERATION_TIME>2024-08-06T12:17:47.000000Z</GENERATION_TIME>
      <Datatake datatakeIdentifier="GS2B_20240806T105619_038616_N05.11">
        <SPACECRAFT_NAME>Sentinel-2B</SPACECRAFT_NAME>
        <SENSING_ORBIT_NUMBER>94</SENSING_ORBIT_NUMBER>
        <SENSING_ORBIT_DIRECTION>DESCENDING</SENSING_ORBIT_DIRECTION>
      </Datatake>
    </Product_Info>
  </n1:General_Info>
  <n1:Quality_Indicators_Info>
    <Cloud_Coverage_Assessment>23.452766</Cloud_Coverage_Assessment>
  </n1:Quality_Indicators_Info>
</n1:Level-2A_User_Product>
"#;

    fn band_entry_name(band: SpectralBand) -> String {
        format!(
            "{}.SAFE/GRANULE/L2A_T30TXM_A038616_20240806T105955/IMG_DATA/R10m/T30TXM_20240806T105619{}",
            PRODUCT,
            band.file_suffix()
        )
    }

    fn write_product_zip(path: &Path, bands: &[SpectralBand], with_mtd: bool) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();

        if with_mtd {
            writer
                .start_file(format!("{}.SAFE/MTD_MSIL2A.xml", PRODUCT), options)
                .unwrap();
            writer.write_all(MTD_XML.as_bytes()).unwrap();
        }
        for &band in bands {
            writer.start_file(band_entry_name(band), options).unwrap();
            writer.write_all(b"not a real jp2").unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn band_entries_require_the_10m_directory() {
        let ten = "x.SAFE/GRANULE/g/IMG_DATA/R10m/T30TXM_20240806T105619_B04_10m.jp2";
        let twenty = "x.SAFE/GRANULE/g/IMG_DATA/R20m/T30TXM_20240806T105619_B04_20m.jp2";
        assert!(is_band_entry(ten, SpectralBand::B04));
        assert!(!is_band_entry(ten, SpectralBand::B02));
        assert!(!is_band_entry(twenty, SpectralBand::B04));
    }

    #[test]
    fn opens_zip_and_extracts_bands_and_metadata() {
        let dir = tempdir().unwrap();
        let zip_path = dir.path().join(format!("{}.zip", PRODUCT));
        write_product_zip(&zip_path, &SpectralBand::ALL, true);

        let reader = ProductReader::open(&zip_path).unwrap();

        assert_eq!(reader.band_paths.len(), 3);
        for (_, path) in &reader.band_paths {
            assert!(path.exists());
        }

        let meta = reader.metadata();
        assert_eq!(meta.product_name, PRODUCT);
        assert_eq!(meta.platform, "Sentinel-2B");
        assert_eq!(meta.product_type, "S2MSI2A");
        assert_eq!(meta.processing_level, "Level-2A");
        assert_eq!(meta.orbit_number, 94);
        assert_eq!(meta.orbit_direction.as_deref(), Some("DESCENDING"));
        assert!((meta.cloud_cover.unwrap() - 23.452766).abs() < 1e-9);
        assert_eq!(meta.bands, vec!["B02", "B03", "B04"]);
        assert_eq!(meta.conversion_tool, "s2rgb");
    }

    #[test]
    fn missing_single_band_is_a_hard_error() {
        let dir = tempdir().unwrap();
        let zip_path = dir.path().join("partial.zip");
        write_product_zip(&zip_path, &[SpectralBand::B02, SpectralBand::B04], true);

        match ProductReader::open(&zip_path) {
            Err(ProductError::MissingBand { band }) => assert_eq!(band, SpectralBand::B03),
            other => panic!("expected MissingBand, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn product_without_10m_bands_is_unsupported() {
        let dir = tempdir().unwrap();
        let zip_path = dir.path().join("no_bands.zip");
        write_product_zip(&zip_path, &[], true);

        assert!(matches!(
            ProductReader::open(&zip_path),
            Err(ProductError::UnsupportedProduct(_))
        ));
        // Batch mode downgrades the same product to a skip
        assert!(ProductReader::open_with_warnings(&zip_path).unwrap().is_none());
    }

    #[test]
    fn missing_band_is_not_downgraded_in_batch_mode() {
        let dir = tempdir().unwrap();
        let zip_path = dir.path().join("partial.zip");
        write_product_zip(&zip_path, &[SpectralBand::B03], true);

        assert!(ProductReader::open_with_warnings(&zip_path).is_err());
    }

    #[test]
    fn opens_safe_directory() {
        let dir = tempdir().unwrap();
        let base = dir.path().join(format!("{}.SAFE", PRODUCT));
        let r10m = base
            .join("GRANULE")
            .join("L2A_T30TXM_A038616_20240806T105955")
            .join("IMG_DATA")
            .join("R10m");
        fs::create_dir_all(&r10m).unwrap();
        fs::write(base.join("MTD_MSIL2A.xml"), MTD_XML).unwrap();
        for band in SpectralBand::ALL {
            fs::write(
                r10m.join(format!("T30TXM_20240806T105619{}", band.file_suffix())),
                b"not a real jp2",
            )
            .unwrap();
        }

        let reader = ProductReader::open(&base).unwrap();
        assert_eq!(reader.metadata().product_name, PRODUCT);
        assert_eq!(reader.metadata().bands, vec!["B02", "B03", "B04"]);
        assert!(reader._extracted.is_none());
    }

    #[test]
    fn zip_without_metadata_still_opens() {
        let dir = tempdir().unwrap();
        let zip_path = dir.path().join(format!("{}.SAFE.zip", PRODUCT));
        write_product_zip(&zip_path, &SpectralBand::ALL, false);

        let reader = ProductReader::open(&zip_path).unwrap();
        // Name comes from the file name, with the .SAFE suffix stripped
        assert_eq!(reader.metadata().product_name, PRODUCT);
        assert!(reader.metadata().sensing_start.is_empty());
    }

    #[test]
    fn non_product_path_is_unsupported() {
        let dir = tempdir().unwrap();
        let stray = dir.path().join("notes.txt");
        fs::write(&stray, "hello").unwrap();

        assert!(matches!(
            ProductReader::open(&stray),
            Err(ProductError::UnsupportedProduct(_))
        ));
    }
}
