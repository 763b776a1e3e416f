use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use super::CdseError;

/// OData products endpoint of the CDSE catalog.
const CATALOG_URL: &str = "https://catalogue.dataspace.copernicus.eu/odata/v1/Products";

/// Page size for catalog queries, the maximum the service allows.
const PAGE_SIZE: u32 = 1000;

/// Search filters for a catalog query.
#[derive(Debug, Clone)]
pub struct ProductQuery {
    pub collection: String,
    /// Area of interest as `[west, south, east, north]` in WGS84 degrees
    pub bbox: [f64; 4],
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Upper cloud cover bound, percent
    pub max_cloud_cover: f64,
    /// Keep only the newest N products
    pub limit: usize,
}

impl ProductQuery {
    /// WKT polygon of the bounding box, closed back to its first vertex.
    pub fn footprint_wkt(&self) -> String {
        let [west, south, east, north] = self.bbox;
        format!(
            "POLYGON(({west} {south}, {east} {south}, {east} {north}, {west} {north}, {west} {south}))"
        )
    }

    /// OData `$filter` expression for this query.
    pub fn odata_filter(&self) -> String {
        format!(
            "Collection/Name eq '{}' and OData.CSC.Intersects(area=geography'SRID=4326;{}') \
             and ContentDate/Start gt {}T00:00:00.000Z \
             and ContentDate/Start lt {}T00:00:00.000Z \
             and Attributes/OData.CSC.DoubleAttribute/any(att:att/Name eq 'cloudCover' \
             and att/OData.CSC.DoubleAttribute/Value lt {})",
            self.collection,
            self.footprint_wkt(),
            self.start_date.format("%Y-%m-%d"),
            self.end_date.format("%Y-%m-%d"),
            self.max_cloud_cover
        )
    }
}

/// One product row from the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductEntry {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "ContentDate")]
    pub content_date: ContentDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentDate {
    #[serde(rename = "Start")]
    pub start: DateTime<Utc>,
}

impl ProductEntry {
    /// Product identifier without the `.SAFE` suffix, used as the local
    /// file stem.
    pub fn file_stem(&self) -> &str {
        self.name.strip_suffix(".SAFE").unwrap_or(&self.name)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CatalogResponse {
    #[serde(rename = "@odata.count", default)]
    pub count: Option<u64>,
    pub value: Vec<ProductEntry>,
}

/// Run a catalog search and return the matching products, newest first,
/// truncated to the query limit.
///
/// L1C products intersect the same cloud cover attribute and are dropped
/// by name; the collection filter alone returns both processing levels.
pub fn search_products(
    client: &reqwest::blocking::Client,
    query: &ProductQuery,
) -> Result<Vec<ProductEntry>, CdseError> {
    let filter = query.odata_filter();
    debug!("Catalog filter: {}", filter);

    let top = PAGE_SIZE.to_string();
    let response = client
        .get(CATALOG_URL)
        .query(&[
            ("$filter", filter.as_str()),
            ("$count", "True"),
            ("$top", top.as_str()),
        ])
        .send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(CdseError::Query {
            status: status.as_u16(),
            body: response.text().unwrap_or_default(),
        });
    }

    let catalog: CatalogResponse = response.json()?;
    if let Some(count) = catalog.count {
        debug!("Catalog reports {} matching products", count);
    }

    let selected = select_products(catalog.value, query.limit);
    info!("Found {} L2A products matching the search filters", selected.len());
    Ok(selected)
}

/// Drop L1C products, sort newest first, and keep at most `limit` entries.
pub(crate) fn select_products(mut products: Vec<ProductEntry>, limit: usize) -> Vec<ProductEntry> {
    products.retain(|product| !product.name.contains("L1C"));
    products.sort_by(|a, b| b.content_date.start.cmp(&a.content_date.start));
    products.truncate(limit);
    products
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_query() -> ProductQuery {
        ProductQuery {
            collection: "SENTINEL-2".to_string(),
            bbox: [-1.830597, 42.719777, -1.483154, 42.88804],
            start_date: NaiveDate::from_ymd_opt(2024, 4, 28).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 8, 6).unwrap(),
            max_cloud_cover: 90.0,
            limit: 1,
        }
    }

    fn entry(id: &str, name: &str, start: &str) -> ProductEntry {
        ProductEntry {
            id: id.to_string(),
            name: name.to_string(),
            content_date: ContentDate {
                start: start.parse().unwrap(),
            },
        }
    }

    #[test]
    fn footprint_polygon_is_closed() {
        let wkt = sample_query().footprint_wkt();
        assert_eq!(
            wkt,
            "POLYGON((-1.830597 42.719777, -1.483154 42.719777, -1.483154 42.88804, \
             -1.830597 42.88804, -1.830597 42.719777))"
        );
    }

    #[test]
    fn filter_carries_every_clause() {
        let filter = sample_query().odata_filter();
        assert_eq!(
            filter,
            "Collection/Name eq 'SENTINEL-2' and OData.CSC.Intersects(area=geography'SRID=4326;\
             POLYGON((-1.830597 42.719777, -1.483154 42.719777, -1.483154 42.88804, \
             -1.830597 42.88804, -1.830597 42.719777))') \
             and ContentDate/Start gt 2024-04-28T00:00:00.000Z \
             and ContentDate/Start lt 2024-08-06T00:00:00.000Z \
             and Attributes/OData.CSC.DoubleAttribute/any(att:att/Name eq 'cloudCover' \
             and att/OData.CSC.DoubleAttribute/Value lt 90)"
        );
    }

    #[test]
    fn catalog_rows_deserialize() {
        let body = r#"{
            "@odata.count": 2,
            "value": [
                {
                    "Id": "f2c4b4a0-0001-4c3e-9f7a-aaaaaaaaaaaa",
                    "Name": "S2B_MSIL2A_20240806T105619_N0511_R094_T30TXM_20240806T121747.SAFE",
                    "ContentDate": {
                        "Start": "2024-08-06T10:56:19.024Z",
                        "End": "2024-08-06T10:56:19.024Z"
                    },
                    "Footprint": "geography'SRID=4326;POLYGON((...))'"
                },
                {
                    "Id": "f2c4b4a0-0002-4c3e-9f7a-bbbbbbbbbbbb",
                    "Name": "S2B_MSIL1C_20240806T105619_N0511_R094_T30TXM_20240806T112734.SAFE",
                    "ContentDate": {
                        "Start": "2024-08-06T10:56:19.024Z"
                    }
                }
            ]
        }"#;
        let catalog: CatalogResponse = serde_json::from_str(body).unwrap();
        assert_eq!(catalog.count, Some(2));
        assert_eq!(catalog.value.len(), 2);
        assert_eq!(
            catalog.value[0].file_stem(),
            "S2B_MSIL2A_20240806T105619_N0511_R094_T30TXM_20240806T121747"
        );
    }

    #[test]
    fn selection_drops_l1c_sorts_newest_first_and_truncates() {
        let products = vec![
            entry("a", "S2B_MSIL2A_A.SAFE", "2024-08-01T10:00:00Z"),
            entry("b", "S2B_MSIL1C_B.SAFE", "2024-08-05T10:00:00Z"),
            entry("c", "S2B_MSIL2A_C.SAFE", "2024-08-04T10:00:00Z"),
            entry("d", "S2A_MSIL2A_D.SAFE", "2024-07-30T10:00:00Z"),
        ];

        let selected = select_products(products.clone(), 10);
        assert_eq!(selected.len(), 3);
        assert_eq!(selected[0].id, "c");
        assert_eq!(selected[1].id, "a");
        assert_eq!(selected[2].id, "d");

        let limited = select_products(products, 1);
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, "c");
    }
}
