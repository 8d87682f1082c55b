//! Contracts for the geographic backends: geocoding and isochrone datasets.
//!
//! Both services are consumed as black boxes behind traits so that search
//! strategies can be unit-tested against fixture implementations. A failing
//! geocoder is treated as "no match" by the location resolver; a missing
//! isochrone entry degrades the search to zero results rather than an error.

use serde::{Deserialize, Serialize};

pub use error::GeoError;
use crate::{filters::TravelMode, location::Location};

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum GeoError {
        #[error("Geographic backend unavailable: {0}")]
        Unavailable(String),
        #[error(transparent)]
        Other(#[from] anyhow::Error),
    }
}

/// One forward-geocoding candidate, best match first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeCandidate {
    pub latitude: f64,
    pub longitude: f64,
    pub zipcode: String,
    pub city: String,
    pub label: String,
    pub city_code: Option<String>,
}

/// A reverse-geocoded address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub zipcode: String,
    pub city: String,
    pub label: String,
    pub city_code: Option<String>,
}

/// Forward and reverse geocoding backend.
pub trait Geocoder: Send + Sync {
    /// Ordered candidates for a free-text location, best first.
    fn forward(&self, text: &str, limit: usize) -> Result<Vec<GeocodeCandidate>, GeoError>;

    /// Addresses at a coordinate, best first.
    fn reverse(&self, latitude: f64, longitude: f64) -> Result<Vec<Address>, GeoError>;
}

/// A geocoder with no data. Resolution strategies that need geocoding simply
/// fall through when this backend is in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeocoder;

impl Geocoder for NoGeocoder {
    fn forward(&self, _text: &str, _limit: usize) -> Result<Vec<GeocodeCandidate>, GeoError> {
        Ok(Vec::new())
    }

    fn reverse(&self, _latitude: f64, _longitude: f64) -> Result<Vec<Address>, GeoError> {
        Ok(Vec::new())
    }
}

/// A travel-time-bounded area around an origin, as a closed polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Isochrone {
    /// Polygon vertices as `(latitude, longitude)` pairs; the last vertex
    /// connects back to the first.
    vertices: Vec<(f64, f64)>,
}

impl Isochrone {
    #[must_use]
    pub fn new(vertices: Vec<(f64, f64)>) -> Self {
        Self { vertices }
    }

    /// Point-in-polygon membership by ray casting.
    #[must_use]
    pub fn contains(&self, point: Location) -> bool {
        let (px, py) = (point.longitude, point.latitude);
        let mut inside = false;
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        let mut j = n - 1;
        for i in 0..n {
            let (yi, xi) = self.vertices[i];
            let (yj, xj) = self.vertices[j];
            if ((yi > py) != (yj > py))
                && (px < (xj - xi) * (py - yi) / (yj - yi) + xi)
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// Precomputed isochrone dataset.
///
/// Returns `Ok(None)` when no polygon exists for the requested
/// location/mode/duration combination, which callers must treat as "this
/// search matches nothing" rather than a failure.
pub trait IsochroneProvider: Send + Sync {
    fn isochrone(
        &self,
        origin: Location,
        mode: TravelMode,
        duration_minutes: u16,
    ) -> Result<Option<Isochrone>, GeoError>;
}

/// An isochrone dataset with no entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIsochrones;

impl IsochroneProvider for NoIsochrones {
    fn isochrone(
        &self,
        _origin: Location,
        _mode: TravelMode,
        _duration_minutes: u16,
    ) -> Result<Option<Isochrone>, GeoError> {
        Ok(None)
    }
}

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points, in kilometers.
#[must_use]
pub fn haversine_km(a: Location, b: Location) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}
