//! Coordinate reference system handling for the boundary file.
//!
//! The listings carry WGS84 latitude/longitude, so the boundary polygons
//! must be in WGS84 before containment testing. RFC 7946 GeoJSON already is;
//! files with a legacy `crs` member declaring Belgian Lambert 72
//! (EPSG:31370) are reprojected here. Any other declared system is a
//! structural error.

use crate::error::{PrepError, Result};
use geojson::FeatureCollection;

/// Coordinate reference systems the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    /// WGS84 geographic coordinates (EPSG:4326 / OGC CRS84).
    Wgs84,
    /// Belgian Lambert 72 projected coordinates (EPSG:31370).
    BelgianLambert72,
}

impl Crs {
    /// Resolve a legacy GeoJSON `crs` name.
    pub fn from_name(name: &str) -> Result<Crs> {
        if name.contains("4326") || name.contains("CRS84") {
            Ok(Crs::Wgs84)
        } else if name.contains("31370") {
            Ok(Crs::BelgianLambert72)
        } else {
            Err(PrepError::UnsupportedCrs(name.to_string()))
        }
    }

    /// Convert a coordinate pair in this system to WGS84 `(lon, lat)` degrees.
    pub fn to_wgs84(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Crs::Wgs84 => (x, y),
            Crs::BelgianLambert72 => lambert72_to_wgs84(x, y),
        }
    }
}

/// Read the CRS a feature collection declares.
///
/// RFC 7946 dropped the `crs` member and fixed the system to WGS84, so an
/// absent member means WGS84. Older exports (the national boundary files
/// among them) still declare one as a foreign member.
pub fn declared_crs(collection: &FeatureCollection) -> Result<Crs> {
    let Some(foreign) = &collection.foreign_members else {
        return Ok(Crs::Wgs84);
    };
    let Some(crs) = foreign.get("crs") else {
        return Ok(Crs::Wgs84);
    };
    let name = crs
        .get("properties")
        .and_then(|p| p.get("name"))
        .and_then(|n| n.as_str())
        .ok_or_else(|| PrepError::UnsupportedCrs(crs.to_string()))?;
    Crs::from_name(name)
}

// International 1924 ellipsoid (Hayford), the Lambert 72 datum surface.
const INTL_A: f64 = 6_378_388.0;
const INTL_F: f64 = 1.0 / 297.0;

// WGS84 ellipsoid.
const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;

// EPSG:31370 projection parameters: Lambert conformal conic, two standard
// parallels, false origin at the pole meridian 4°22'02.952"E.
const LAT_1_DEG: f64 = 51.166_667_233_33; // 51°10'00.00204"N
const LAT_2_DEG: f64 = 49.833_333_9; // 49°50'00.00204"N
const LON_0_DEG: f64 = 4.367_486_666_67; // 4°22'02.952"E
const FALSE_EASTING: f64 = 150_000.013;
const FALSE_NORTHING: f64 = 5_400_088.438;

// BD72 -> WGS84 seven-parameter transformation (position vector convention):
// translations in metres, rotations in arcseconds, scale in ppm.
const HELMERT_DX: f64 = -106.8686;
const HELMERT_DY: f64 = 52.2978;
const HELMERT_DZ: f64 = -103.7239;
const HELMERT_RX_AS: f64 = 0.3366;
const HELMERT_RY_AS: f64 = -0.457;
const HELMERT_RZ_AS: f64 = 1.8422;
const HELMERT_DS_PPM: f64 = -1.2747;

const ARCSEC_TO_RAD: f64 = std::f64::consts::PI / (180.0 * 3600.0);

fn isometric_t(lat: f64, e: f64) -> f64 {
    let es = e * lat.sin();
    (std::f64::consts::FRAC_PI_4 - lat / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}

fn parallel_m(lat: f64, e2: f64) -> f64 {
    lat.cos() / (1.0 - e2 * lat.sin().powi(2)).sqrt()
}

/// Inverse Lambert conformal conic on the International 1924 ellipsoid,
/// followed by the BD72 -> WGS84 Helmert shift. Returns `(lon, lat)` degrees.
fn lambert72_to_wgs84(easting: f64, northing: f64) -> (f64, f64) {
    let e2 = 2.0 * INTL_F - INTL_F * INTL_F;
    let e = e2.sqrt();

    let lat1 = LAT_1_DEG.to_radians();
    let lat2 = LAT_2_DEG.to_radians();
    let lon0 = LON_0_DEG.to_radians();

    let m1 = parallel_m(lat1, e2);
    let m2 = parallel_m(lat2, e2);
    let t1 = isometric_t(lat1, e);
    let t2 = isometric_t(lat2, e);
    let n = (m1.ln() - m2.ln()) / (t1.ln() - t2.ln());
    let f = m1 / (n * t1.powf(n));

    // Latitude of the false origin is the pole, so its radius is zero and the
    // inverse collapses to the offsets below.
    let dx = easting - FALSE_EASTING;
    let dy = FALSE_NORTHING - northing;
    let rho = (dx * dx + dy * dy).sqrt();
    let theta = dx.atan2(dy);

    let t = (rho / (INTL_A * f)).powf(1.0 / n);
    let lon = theta / n + lon0;

    let mut lat = std::f64::consts::FRAC_PI_2 - 2.0 * t.atan();
    for _ in 0..8 {
        let es = e * lat.sin();
        lat = std::f64::consts::FRAC_PI_2
            - 2.0 * (t * ((1.0 - es) / (1.0 + es)).powf(e / 2.0)).atan();
    }

    helmert_bd72_to_wgs84(lon, lat)
}

/// Apply the seven-parameter datum shift to geodetic BD72 coordinates and
/// return WGS84 `(lon, lat)` degrees.
fn helmert_bd72_to_wgs84(lon: f64, lat: f64) -> (f64, f64) {
    let e2_intl = 2.0 * INTL_F - INTL_F * INTL_F;

    // Geodetic to geocentric on International 1924 (ellipsoidal height 0).
    let nu = INTL_A / (1.0 - e2_intl * lat.sin().powi(2)).sqrt();
    let x = nu * lat.cos() * lon.cos();
    let y = nu * lat.cos() * lon.sin();
    let z = nu * (1.0 - e2_intl) * lat.sin();

    // Position-vector Helmert transformation.
    let rx = HELMERT_RX_AS * ARCSEC_TO_RAD;
    let ry = HELMERT_RY_AS * ARCSEC_TO_RAD;
    let rz = HELMERT_RZ_AS * ARCSEC_TO_RAD;
    let scale = 1.0 + HELMERT_DS_PPM * 1.0e-6;

    let xw = HELMERT_DX + scale * (x - rz * y + ry * z);
    let yw = HELMERT_DY + scale * (rz * x + y - rx * z);
    let zw = HELMERT_DZ + scale * (-ry * x + rx * y + z);

    // Geocentric back to geodetic on WGS84.
    let e2_wgs = 2.0 * WGS84_F - WGS84_F * WGS84_F;
    let p = (xw * xw + yw * yw).sqrt();
    let lon_w = yw.atan2(xw);
    let mut lat_w = zw.atan2(p * (1.0 - e2_wgs));
    for _ in 0..8 {
        let nu_w = WGS84_A / (1.0 - e2_wgs * lat_w.sin().powi(2)).sqrt();
        lat_w = (zw + e2_wgs * nu_w * lat_w.sin()).atan2(p);
    }

    (lon_w.to_degrees(), lat_w.to_degrees())
}
