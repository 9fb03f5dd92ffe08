//! Pure-Rust WGS84 ↔ UTM reprojection (Snyder 1987, USGS formulas).
//!
//! Supports EPSG:4326 and the UTM zones EPSG 326xx (north) / 327xx (south).
//! Distances and buffers are computed in UTM metres, everything handed back
//! to callers is in EPSG:4326.

use geo::Coord;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ImpactError, Result};

// ── WGS84 ellipsoid constants ────────────────────────────────────────────

const A: f64 = 6_378_137.0; // semi-major axis (m)
const F: f64 = 1.0 / 298.257_223_563; // flattening
const E2: f64 = 2.0 * F - F * F; // eccentricity squared
const E_PRIME2: f64 = E2 / (1.0 - E2); // second eccentricity squared
const K0: f64 = 0.9996; // UTM scale factor
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

pub const WGS84_EPSG: u32 = 4326;

/// WGS 84 / UTM zone 18S, covering central Peru.
pub const DEFAULT_PROJECTED_EPSG: u32 = 32718;

pub const UTM_18S: Crs = Crs::Utm {
    zone: 18,
    north: false,
};

/// Coordinate reference declared by a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Crs {
    /// Longitude/latitude in degrees (EPSG:4326).
    Geographic,
    /// Easting/northing in metres.
    Utm { zone: u32, north: bool },
}

impl Crs {
    pub fn from_epsg(code: u32) -> Result<Self> {
        if code == WGS84_EPSG {
            return Ok(Crs::Geographic);
        }
        match parse_utm_epsg(code) {
            Some((zone, north)) => Ok(Crs::Utm { zone, north }),
            None => Err(ImpactError::UnsupportedCrs(code)),
        }
    }

    pub fn epsg(&self) -> u32 {
        match *self {
            Crs::Geographic => WGS84_EPSG,
            Crs::Utm { zone, north: true } => 32600u32.saturating_add(zone),
            Crs::Utm { zone, north: false } => 32700u32.saturating_add(zone),
        }
    }

    /// Rejects UTM zones outside 1..=60. `from_epsg` never builds one, but
    /// the variant fields are public.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Crs::Utm { zone, .. } if !(1..=60).contains(&zone) => {
                Err(ImpactError::UnsupportedCrs(self.epsg()))
            }
            _ => Ok(()),
        }
    }

    /// Whether coordinates in this frame are linear metres.
    pub fn is_metric(&self) -> bool {
        matches!(self, Crs::Utm { .. })
    }

    fn unproject(self, c: Coord<f64>) -> Coord<f64> {
        match self {
            Crs::Geographic => c,
            Crs::Utm { zone, north } => {
                let (lon, lat) = utm_to_wgs84(c.x, c.y, zone, north);
                Coord { x: lon, y: lat }
            }
        }
    }

    fn project(self, c: Coord<f64>) -> Coord<f64> {
        match self {
            Crs::Geographic => c,
            Crs::Utm { zone, north } => {
                let (e, n) = wgs84_to_utm(c.x, c.y, zone, north);
                Coord { x: e, y: n }
            }
        }
    }
}

impl Default for Crs {
    fn default() -> Self {
        Crs::Geographic
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// Coordinate transform between two supported references.
///
/// UTM to UTM goes through geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    from: Crs,
    to: Crs,
}

impl Transform {
    pub fn new(from: Crs, to: Crs) -> Self {
        Self { from, to }
    }

    pub fn source(&self) -> Crs {
        self.from
    }

    pub fn target(&self) -> Crs {
        self.to
    }

    pub fn is_identity(&self) -> bool {
        self.from == self.to
    }

    pub fn apply(&self, c: Coord<f64>) -> Coord<f64> {
        if self.is_identity() {
            return c;
        }
        self.to.project(self.from.unproject(c))
    }
}

/// Parse an EPSG code into UTM zone info: `Some((zone, is_north))`.
pub fn parse_utm_epsg(epsg: u32) -> Option<(u32, bool)> {
    if (32601..=32660).contains(&epsg) {
        Some((epsg - 32600, true))
    } else if (32701..=32760).contains(&epsg) {
        Some((epsg - 32700, false))
    } else {
        None
    }
}

fn central_meridian(zone: u32) -> f64 {
    ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians()
}

// ── Forward projection (Snyder 1987, pp. 61-64) ─────────────────────────

/// Convert WGS84 (longitude, latitude) in degrees to UTM (easting, northing).
pub fn wgs84_to_utm(lon_deg: f64, lat_deg: f64, zone: u32, north: bool) -> (f64, f64) {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let lon0 = central_meridian(zone);

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();

    let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = E_PRIME2 * cos_lat * cos_lat;
    let a_coeff = cos_lat * (lon - lon0);
    let m = meridional_arc(lat);

    let a2 = a_coeff * a_coeff;
    let a4 = a2 * a2;
    let a6 = a4 * a2;

    // Snyder eq. 8-9
    let easting = K0
        * n
        * (a_coeff
            + (1.0 - t + c) * a2 * a_coeff / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * E_PRIME2) * a4 * a_coeff / 120.0)
        + FALSE_EASTING;

    // Snyder eq. 8-10
    let northing = K0
        * (m + n
            * tan_lat
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * E_PRIME2) * a6 / 720.0));

    if north {
        (easting, northing)
    } else {
        (easting, northing + FALSE_NORTHING_SOUTH)
    }
}

// ── Inverse projection (Snyder 1987, eqs. 8-12 to 8-25) ─────────────────

/// Convert UTM (easting, northing) to WGS84 (longitude, latitude) in degrees.
pub fn utm_to_wgs84(easting: f64, northing: f64, zone: u32, north: bool) -> (f64, f64) {
    let x = easting - FALSE_EASTING;
    let y = if north {
        northing
    } else {
        northing - FALSE_NORTHING_SOUTH
    };

    let e4 = E2 * E2;
    let e6 = e4 * E2;
    let m = y / K0;
    let mu = m / (A * (1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

    let sqrt_1_e2 = (1.0 - E2).sqrt();
    let e1 = (1.0 - sqrt_1_e2) / (1.0 + sqrt_1_e2);
    let e1_2 = e1 * e1;
    let e1_3 = e1_2 * e1;
    let e1_4 = e1_3 * e1;

    // Footpoint latitude (eq. 3-26)
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();

    let c1 = E_PRIME2 * cos_phi1 * cos_phi1;
    let t1 = tan_phi1 * tan_phi1;
    let denom = 1.0 - E2 * sin_phi1 * sin_phi1;
    let n1 = A / denom.sqrt();
    let r1 = A * (1.0 - E2) / (denom * denom.sqrt());
    let d = x / (n1 * K0);

    let d2 = d * d;
    let d3 = d2 * d;
    let d4 = d2 * d2;
    let d5 = d4 * d;
    let d6 = d4 * d2;

    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * E_PRIME2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                    - 252.0 * E_PRIME2
                    - 3.0 * c1 * c1)
                    * d6
                    / 720.0);

    let lon = central_meridian(zone)
        + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * E_PRIME2 + 24.0 * t1 * t1)
                * d5
                / 120.0)
            / cos_phi1;

    (lon.to_degrees(), lat.to_degrees())
}

/// Meridional arc from equator to latitude `lat` (radians). Snyder eq. 3-21.
fn meridional_arc(lat: f64) -> f64 {
    let e4 = E2 * E2;
    let e6 = e4 * E2;

    A * ((1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * E2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}
