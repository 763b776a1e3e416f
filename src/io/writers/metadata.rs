use serde_json;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::io::sentinel2::TileMetadata;

/// Extract all metadata fields from TileMetadata into a HashMap
pub fn extract_metadata_fields(meta: &TileMetadata) -> HashMap<String, String> {
    let mut metadata = HashMap::new();

    // Product identity
    metadata.insert("PRODUCT_NAME".to_string(), meta.product_name.clone());
    metadata.insert("PLATFORM".to_string(), meta.platform.clone());
    metadata.insert("PRODUCT_TYPE".to_string(), meta.product_type.clone());
    metadata.insert(
        "PROCESSING_LEVEL".to_string(),
        meta.processing_level.clone(),
    );

    // Acquisition
    metadata.insert("SENSING_START".to_string(), meta.sensing_start.clone());
    metadata.insert("SENSING_STOP".to_string(), meta.sensing_stop.clone());
    metadata.insert("ORBIT_NUMBER".to_string(), meta.orbit_number.to_string());
    if let Some(direction) = &meta.orbit_direction {
        metadata.insert("ORBIT_DIRECTION".to_string(), direction.clone());
    }
    if let Some(generated) = &meta.generation_time {
        metadata.insert("GENERATION_TIME".to_string(), generated.clone());
    }
    if let Some(cloud) = meta.cloud_cover {
        metadata.insert("CLOUD_COVER".to_string(), cloud.to_string());
    }

    // Raster characteristics
    metadata.insert("BANDS".to_string(), meta.bands.join(","));
    if meta.lines > 0 && meta.samples > 0 {
        metadata.insert("LINES".to_string(), meta.lines.to_string());
        metadata.insert("SAMPLES".to_string(), meta.samples.to_string());
    }

    // Conversion provenance
    metadata.insert("CONVERSION_TOOL".to_string(), meta.conversion_tool.clone());
    metadata.insert(
        "CONVERSION_VERSION".to_string(),
        meta.conversion_version.clone(),
    );
    metadata.insert(
        "CONVERSION_TIMESTAMP".to_string(),
        meta.conversion_timestamp.clone(),
    );

    metadata
}

/// Convert metadata HashMap to JSON format, lowercasing keys and turning
/// numeric strings into JSON numbers.
pub fn convert_metadata_to_json(
    metadata: &HashMap<String, String>,
) -> HashMap<String, serde_json::Value> {
    let mut json_metadata = HashMap::new();

    for (key, value) in metadata {
        let json_key = key.to_lowercase();

        // Integers first so orbit numbers and dimensions stay integral
        if let Ok(num) = value.parse::<u64>() {
            json_metadata.insert(
                json_key,
                serde_json::Value::Number(serde_json::Number::from(num)),
            );
        } else if let Ok(num) = value.parse::<f64>() {
            if let Some(json_num) = serde_json::Number::from_f64(num) {
                json_metadata.insert(json_key, serde_json::Value::Number(json_num));
            } else {
                json_metadata.insert(json_key, serde_json::Value::String(value.clone()));
            }
        } else {
            json_metadata.insert(json_key, serde_json::Value::String(value.clone()));
        }
    }

    json_metadata
}

/// Handle special JSON fields that need structured values
pub fn add_special_json_fields(
    json_metadata: &mut HashMap<String, serde_json::Value>,
    meta: &TileMetadata,
) {
    if let Some(geotransform) = meta.geotransform {
        json_metadata.insert(
            "geotransform".to_string(),
            serde_json::Value::Array(
                geotransform
                    .iter()
                    .map(|&v| {
                        serde_json::Number::from_f64(v)
                            .map(serde_json::Value::Number)
                            .unwrap_or(serde_json::Value::Null)
                    })
                    .collect(),
            ),
        );
    }

    if let Some(crs) = meta.crs.as_deref() {
        if !crs.is_empty() {
            json_metadata.insert(
                "crs".to_string(),
                serde_json::Value::String(crs.to_string()),
            );
        }
    }
}

/// Create a sidecar metadata file next to an output image
pub fn create_metadata_sidecar(
    output_path: &Path,
    meta: &TileMetadata,
) -> Result<(), Box<dyn std::error::Error>> {
    create_metadata_sidecar_with_extras(output_path, meta, None)
}

/// Create a sidecar metadata file with extra conversion-specific entries
/// (e.g. the stretch percentiles an image was produced with).
pub fn create_metadata_sidecar_with_extras(
    output_path: &Path,
    meta: &TileMetadata,
    extras: Option<&[(&str, String)]>,
) -> Result<(), Box<dyn std::error::Error>> {
    let metadata = extract_metadata_fields(meta);
    let mut json_metadata = convert_metadata_to_json(&metadata);
    add_special_json_fields(&mut json_metadata, meta);

    if let Some(extras) = extras {
        for (key, value) in extras {
            // Extras follow the same numeric-or-string conversion
            let mut single = HashMap::new();
            single.insert(key.to_string(), value.clone());
            json_metadata.extend(convert_metadata_to_json(&single));
        }
    }

    let sidecar_path = output_path.with_extension("json");
    let json_string = serde_json::to_string_pretty(&json_metadata)?;
    std::fs::write(&sidecar_path, json_string)?;

    info!("Created metadata sidecar: {:?}", sidecar_path);
    Ok(())
}
