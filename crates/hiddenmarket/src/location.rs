//! Location value types and the resolution chain that turns heterogeneous
//! request input (department list, coordinates, zipcode + slug, free text)
//! into a canonical geo-point and display name.
//!
//! Resolution runs an ordered chain of strategies, first success wins. Each
//! strategy is a pure function over the injected backends, so each can be
//! tested with a fixture geocoder. Any malformed input or backend failure is
//! "no match" and falls through to the next strategy; "no location at all" is
//! a legitimate final state that downstream components must accept.

use hiddenmarket_catalogs::{CityBook, CityEntry};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{geo::Geocoder, params::SearchParams};

/// A geographic point. Constructed per request, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Human-readable identity of a resolved location.
///
/// May exist without a [`Location`] (department-scoped searches) and a
/// `Location` may exist without it (reverse geocoding failed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedLocation {
    pub zipcode: String,
    pub city: String,
    /// Full display label, e.g. `"Metz (57050)"` or a street-level address.
    pub name: String,
    pub city_code: Option<String>,
}

/// A zipcode (+ optional slug) validated against the city catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CityLocation {
    zipcode: String,
    entry: Option<CityEntry>,
}

impl CityLocation {
    /// Validate a zipcode and optional city slug against the catalog.
    ///
    /// An unknown zipcode, or a slug that does not denote a city of that
    /// zipcode, yields an incorrect (but still constructible) value.
    #[must_use]
    pub fn new(zipcode: &str, slug: Option<&str>, cities: &CityBook) -> Self {
        Self {
            zipcode: zipcode.to_string(),
            entry: cities.by_zipcode(zipcode, slug).cloned(),
        }
    }

    /// Parse the combined `"slug-zipcode"` form used in shared URLs.
    #[must_use]
    pub fn from_combined_slug(combined: &str, cities: &CityBook) -> Self {
        let zipcode = combined.rsplit('-').next().unwrap_or_default();
        Self::new(zipcode, Some(combined), cities)
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.entry.is_some()
    }

    #[must_use]
    pub fn location(&self) -> Option<Location> {
        self.entry
            .as_ref()
            .map(|entry| Location::new(entry.latitude, entry.longitude))
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.entry.as_ref().map(|entry| entry.name.as_str())
    }

    /// Display label, e.g. `"Metz (57050)"`.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        self.entry
            .as_ref()
            .map(|entry| format!("{} ({})", entry.name, entry.zipcode))
    }

    #[must_use]
    pub fn city_code(&self) -> Option<&str> {
        self.entry.as_ref().map(|entry| entry.city_code.as_str())
    }

    #[must_use]
    pub fn zipcode(&self) -> &str {
        &self.zipcode
    }
}

/// Outcome of the resolution chain.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ResolvedLocation {
    pub location: Option<Location>,
    pub named: Option<NamedLocation>,
    pub departments: Option<Vec<String>>,
}

/// Run the resolution chain over normalized request parameters.
///
/// Order, first success wins: department list, then latitude/longitude with
/// reverse geocoding, then zipcode (+ optional slug) against the city
/// catalog, then free text through the geocoder.
#[must_use]
pub fn resolve_location(
    params: &SearchParams,
    geocoder: &dyn Geocoder,
    cities: &CityBook,
) -> ResolvedLocation {
    if let Some(departments) = &params.departments {
        return from_departments(departments, params.location_text.as_deref());
    }

    if let (Some(latitude), Some(longitude)) = (params.latitude, params.longitude) {
        return from_coordinates(Location::new(latitude, longitude), geocoder);
    }

    if let Some(zipcode) = &params.zipcode {
        let resolved = from_zipcode(zipcode, params.city_slug.as_deref(), cities);
        if resolved.location.is_some() {
            return resolved;
        }
        debug!(zipcode, "Zipcode did not resolve, falling through");
    }

    if let Some(text) = &params.location_text {
        return from_free_text(text, geocoder);
    }

    ResolvedLocation::default()
}

/// Department-scoped search: no point location, display name straight from
/// the request, first department code stands in for the zipcode.
fn from_departments(departments: &[String], display: Option<&str>) -> ResolvedLocation {
    let named = display.map(|name| NamedLocation {
        zipcode: departments.first().cloned().unwrap_or_default(),
        city: name.to_string(),
        name: name.to_string(),
        city_code: None,
    });
    ResolvedLocation {
        location: None,
        named,
        departments: Some(departments.to_vec()),
    }
}

/// Coordinates are authoritative; reverse geocoding only fills in the name.
/// On geocoder failure the point is kept and the name stays unset.
fn from_coordinates(location: Location, geocoder: &dyn Geocoder) -> ResolvedLocation {
    let named = match geocoder.reverse(location.latitude, location.longitude) {
        Ok(addresses) => addresses.into_iter().next().map(|address| NamedLocation {
            zipcode: address.zipcode,
            city: address.city,
            name: address.label,
            city_code: address.city_code,
        }),
        Err(err) => {
            warn!(%err, "Reverse geocoding failed, keeping bare coordinates");
            None
        }
    };
    ResolvedLocation {
        location: Some(location),
        named,
        departments: None,
    }
}

fn from_zipcode(zipcode: &str, slug: Option<&str>, cities: &CityBook) -> ResolvedLocation {
    let city = CityLocation::new(zipcode, slug, cities);
    let named = city.entry.as_ref().map(|entry| NamedLocation {
        zipcode: entry.zipcode.clone(),
        city: entry.name.clone(),
        name: format!("{} ({})", entry.name, entry.zipcode),
        city_code: Some(entry.city_code.clone()),
    });
    ResolvedLocation {
        location: city.location(),
        named,
        departments: None,
    }
}

fn from_free_text(text: &str, geocoder: &dyn Geocoder) -> ResolvedLocation {
    let candidate = match geocoder.forward(text, 1) {
        Ok(candidates) => candidates.into_iter().next(),
        Err(err) => {
            warn!(%err, text, "Forward geocoding failed");
            None
        }
    };
    candidate.map_or_else(ResolvedLocation::default, |c| ResolvedLocation {
        location: Some(Location::new(c.latitude, c.longitude)),
        named: Some(NamedLocation {
            zipcode: c.zipcode,
            city: c.city,
            name: c.label,
            city_code: c.city_code,
        }),
        departments: None,
    })
}

#[cfg(test)]
mod tests {
    use hiddenmarket_catalogs::Catalogs;

    use super::*;
    use crate::geo::{Address, GeoError, GeocodeCandidate, NoGeocoder};

    struct FixtureGeocoder;

    impl Geocoder for FixtureGeocoder {
        fn forward(&self, text: &str, _limit: usize) -> Result<Vec<GeocodeCandidate>, GeoError> {
            if text.to_lowercase().contains("metz") {
                Ok(vec![GeocodeCandidate {
                    latitude: 49.119146,
                    longitude: 6.176026,
                    zipcode: "57050".into(),
                    city: "Metz".into(),
                    label: "Metz (57050)".into(),
                    city_code: Some("57463".into()),
                }])
            } else {
                Ok(Vec::new())
            }
        }

        fn reverse(&self, latitude: f64, _longitude: f64) -> Result<Vec<Address>, GeoError> {
            if (latitude - 49.119146).abs() < 0.01 {
                Ok(vec![Address {
                    zipcode: "57050".into(),
                    city: "Metz".into(),
                    label: "2 Rue des Clercs, Metz".into(),
                    city_code: Some("57463".into()),
                }])
            } else {
                Ok(Vec::new())
            }
        }
    }

    struct BrokenGeocoder;

    impl Geocoder for BrokenGeocoder {
        fn forward(&self, _: &str, _: usize) -> Result<Vec<GeocodeCandidate>, GeoError> {
            Err(GeoError::Unavailable("down".into()))
        }

        fn reverse(&self, _: f64, _: f64) -> Result<Vec<Address>, GeoError> {
            Err(GeoError::Unavailable("down".into()))
        }
    }

    fn cities() -> &'static CityBook {
        &Catalogs::embedded().cities
    }

    fn params() -> SearchParams {
        SearchParams::default()
    }

    #[test]
    fn departments_short_circuit_everything_else() {
        let mut p = params();
        p.departments = Some(vec!["57".into()]);
        p.location_text = Some("Moselle".into());
        p.latitude = Some(49.0);
        p.longitude = Some(6.0);

        let resolved = resolve_location(&p, &FixtureGeocoder, cities());
        assert!(resolved.location.is_none());
        assert_eq!(resolved.departments.as_deref(), Some(&["57".to_string()][..]));
        let named = resolved.named.unwrap();
        assert_eq!(named.name, "Moselle");
        assert_eq!(named.zipcode, "57");
    }

    #[test]
    fn coordinates_resolve_and_reverse_geocode() {
        let mut p = params();
        p.latitude = Some(49.119146);
        p.longitude = Some(6.176026);

        let resolved = resolve_location(&p, &FixtureGeocoder, cities());
        assert!(resolved.location.is_some());
        let named = resolved.named.unwrap();
        assert_eq!(named.city, "Metz");
        assert_eq!(named.city_code.as_deref(), Some("57463"));
    }

    #[test]
    fn reverse_geocoder_failure_keeps_coordinates() {
        let mut p = params();
        p.latitude = Some(49.119146);
        p.longitude = Some(6.176026);

        let resolved = resolve_location(&p, &BrokenGeocoder, cities());
        assert!(resolved.location.is_some());
        assert!(resolved.named.is_none());
    }

    #[test]
    fn zipcode_and_slug_resolve_through_city_catalog() {
        let mut p = params();
        p.zipcode = Some("57050".into());
        p.city_slug = Some("metz".into());

        let resolved = resolve_location(&p, &NoGeocoder, cities());
        let location = resolved.location.unwrap();
        assert!((location.latitude - 49.119146).abs() < 1e-6);
        assert_eq!(resolved.named.unwrap().name, "Metz (57050)");
    }

    #[test]
    fn incorrect_slug_falls_through_to_free_text() {
        let mut p = params();
        p.zipcode = Some("57050".into());
        p.city_slug = Some("nancy".into());
        p.location_text = Some("Metz".into());

        let resolved = resolve_location(&p, &FixtureGeocoder, cities());
        // The zipcode stage failed, the free-text stage matched.
        assert!(resolved.location.is_some());
        assert_eq!(resolved.named.unwrap().city, "Metz");
    }

    #[test]
    fn free_text_without_match_is_no_location() {
        let mut p = params();
        p.location_text = Some("Atlantis".into());

        let resolved = resolve_location(&p, &FixtureGeocoder, cities());
        assert_eq!(resolved, ResolvedLocation::default());
    }

    #[test]
    fn broken_geocoder_is_no_match_not_an_error() {
        let mut p = params();
        p.location_text = Some("Metz".into());

        let resolved = resolve_location(&p, &BrokenGeocoder, cities());
        assert!(resolved.location.is_none());
        assert!(resolved.named.is_none());
    }

    #[test]
    fn resolution_is_deterministic() {
        let mut p = params();
        p.zipcode = Some("57050".into());
        p.city_slug = Some("metz".into());

        let a = resolve_location(&p, &FixtureGeocoder, cities());
        let b = resolve_location(&p, &FixtureGeocoder, cities());
        assert_eq!(a, b);
    }

    #[test]
    fn combined_slug_form_parses() {
        let city = CityLocation::from_combined_slug("metz-57050", cities());
        assert!(city.is_correct());
        assert_eq!(city.name(), Some("Metz"));
        assert_eq!(city.full_name().as_deref(), Some("Metz (57050)"));
        assert_eq!(city.city_code(), Some("57463"));

        let wrong = CityLocation::from_combined_slug("nancy-57050", cities());
        assert!(!wrong.is_correct());
        assert!(wrong.location().is_none());
    }
}
