//! Municipality boundary polygons and point-in-polygon lookup.

use crate::error::{PrepError, Result};
use crate::geojoin::crs::{self, Crs};
use crate::schema::{MUNICIPALITY_KEY, MUNICIPALITY_NAME};
use geo::{BoundingRect, Contains, Coord, MapCoords, MultiPolygon, Point, Rect};
use geojson::{FeatureCollection, GeoJson};
use std::path::Path;
use tracing::{debug, warn};

/// One municipality: its code, Dutch name, and boundary geometry.
#[derive(Debug)]
pub struct Region {
    pub refnis: i64,
    pub name: Option<String>,
    geometry: MultiPolygon<f64>,
    bbox: Rect<f64>,
}

/// The full boundary set, ready for containment queries.
#[derive(Debug)]
pub struct RegionSet {
    regions: Vec<Region>,
}

impl RegionSet {
    /// Load boundaries from a GeoJSON file, reprojecting to WGS84 if the
    /// file declares another supported system.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_geojson_str(&raw)
    }

    /// Parse boundaries from GeoJSON text.
    pub fn from_geojson_str(raw: &str) -> Result<Self> {
        let geojson: GeoJson = raw.parse()?;
        let collection = FeatureCollection::try_from(geojson)?;
        let crs = crs::declared_crs(&collection)?;

        let mut regions = Vec::with_capacity(collection.features.len());
        for feature in collection.features {
            let refnis = feature
                .properties
                .as_ref()
                .and_then(|p| p.get(MUNICIPALITY_KEY))
                .and_then(property_as_code)
                .ok_or_else(|| PrepError::SchemaMismatch {
                    column: MUNICIPALITY_KEY.to_string(),
                    table: "municipality boundaries".to_string(),
                })?;

            let name = feature
                .properties
                .as_ref()
                .and_then(|p| p.get(MUNICIPALITY_NAME))
                .and_then(|v| v.as_str())
                .map(str::to_string);

            let Some(geometry) = feature.geometry else {
                warn!("Boundary feature {refnis} has no geometry; it will never match");
                continue;
            };
            let geometry: geo::Geometry<f64> = geometry.try_into()?;
            let multi = match geometry {
                geo::Geometry::Polygon(p) => MultiPolygon(vec![p]),
                geo::Geometry::MultiPolygon(mp) => mp,
                other => {
                    warn!(
                        "Boundary feature {refnis} has non-areal geometry ({other:?} kind); skipped"
                    );
                    continue;
                }
            };

            let multi = match crs {
                Crs::Wgs84 => multi,
                projected => multi.map_coords(|c: Coord<f64>| {
                    let (lon, lat) = projected.to_wgs84(c.x, c.y);
                    Coord { x: lon, y: lat }
                }),
            };

            let Some(bbox) = multi.bounding_rect() else {
                warn!("Boundary feature {refnis} has an empty geometry; skipped");
                continue;
            };

            regions.push(Region {
                refnis,
                name,
                geometry: multi,
                bbox,
            });
        }

        debug!("Loaded {} municipality boundaries", regions.len());
        Ok(Self { regions })
    }

    /// All municipalities containing the point, in file order. Normally at
    /// most one; overlapping boundary files yield several.
    pub fn locate(&self, lon: f64, lat: f64) -> Vec<&Region> {
        let point = Point::new(lon, lat);
        self.regions
            .iter()
            .filter(|r| r.bbox.contains(&point) && r.geometry.contains(&point))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Municipality codes appear as JSON numbers or as numeric strings
/// depending on the export.
fn property_as_code(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64)),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
