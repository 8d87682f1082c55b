//! The fetcher: one request's worth of index queries.
//!
//! A fetcher is constructed from normalized parameters plus the resolved
//! location, then asked for the primary result window. On top of the single
//! backend query it adds two orchestration layers:
//!
//! - **Radius widening**: when the primary count is below the usability
//!   threshold, count-only queries are re-issued over an ascending ladder of
//!   radii (or travel durations) and each tried radius is recorded with its
//!   count. The primary result set is never replaced by a widened one.
//! - **Facet recomputation**: the backend counts facets under every active
//!   filter, so each facet whose own filter is active is recomputed with
//!   that one filter removed. Facet counts must answer "what would I get if
//!   I changed only this filter".

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::SearchError;
use crate::{
    config::Settings,
    filters::{Audience, Facet, HeadcountBand, SortKey, TravelMode},
    geo::IsochroneProvider,
    index::{Aggregations, Geography, IndexResponse, OfficeIndex, OfficeQuery, OfficeResult},
    location::{Location, ResolvedLocation},
    params::SearchParams,
};

/// A widened search radius: plain distance or travel time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Radius {
    Km(f64),
    Minutes(u16),
}

/// Result count observed at one widened radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlternativeCount {
    pub radius: Radius,
    pub count: u64,
}

/// Orchestrates the index queries for a single search request.
#[derive(Debug, Clone)]
pub struct HiddenMarketFetcher {
    romes: Vec<String>,
    location: Option<Location>,
    departments: Option<Vec<String>>,
    distance_km: f64,
    duration_minutes: Option<u16>,
    travel_mode: TravelMode,
    headcount: HeadcountBand,
    naf: Option<String>,
    audience: Audience,
    sort: SortKey,
    from_number: u64,
    to_number: u64,
    aggregate_by: Vec<Facet>,
    settings: Settings,

    /// Total match count of the last primary query.
    pub office_count: u64,
    /// Counts observed at each widened radius, ascending.
    pub alternative_distances: Vec<AlternativeCount>,
}

impl HiddenMarketFetcher {
    /// Build a fetcher for one request.
    #[must_use]
    pub fn new(
        params: &SearchParams,
        resolved: &ResolvedLocation,
        romes: Vec<String>,
        aggregate_by: Vec<Facet>,
        settings: Settings,
    ) -> Self {
        Self {
            romes,
            location: resolved.location,
            departments: resolved.departments.clone(),
            distance_km: params.distance_km,
            duration_minutes: params.duration_minutes,
            travel_mode: params.travel_mode,
            headcount: params.headcount,
            naf: params.naf.clone(),
            audience: params.audience,
            sort: params.sort,
            from_number: params.from_number,
            to_number: params.to_number,
            aggregate_by,
            settings,
            office_count: 0,
            alternative_distances: Vec::new(),
        }
    }

    #[must_use]
    pub fn from_number(&self) -> u64 {
        self.from_number
    }

    #[must_use]
    pub fn to_number(&self) -> u64 {
        self.to_number
    }

    #[must_use]
    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }

    #[must_use]
    pub fn naf(&self) -> Option<&str> {
        self.naf.as_deref()
    }

    #[must_use]
    pub fn headcount(&self) -> HeadcountBand {
        self.headcount
    }

    /// Resolve the geographic restriction for this request.
    ///
    /// `Ok(None)` means the search matches nothing: either no location was
    /// resolved at all, or a travel-time search has no isochrone entry for
    /// this location/mode/duration.
    fn geography(
        &self,
        isochrones: &dyn IsochroneProvider,
        radius: Radius,
    ) -> Result<Option<Geography>, SearchError> {
        if let Some(departments) = &self.departments {
            return Ok(Some(Geography::Departments(departments.clone())));
        }
        let Some(origin) = self.location else {
            return Ok(None);
        };
        match radius {
            Radius::Minutes(duration) => {
                match isochrones.isochrone(origin, self.travel_mode, duration)? {
                    Some(area) => Ok(Some(Geography::Within { origin, area })),
                    None => {
                        warn!(
                            duration,
                            mode = ?self.travel_mode,
                            "No isochrone for this location, degrading to zero results"
                        );
                        Ok(None)
                    }
                }
            }
            Radius::Km(radius_km) => Ok(Some(Geography::Around { origin, radius_km })),
        }
    }

    /// The radius the request actually asked for.
    fn requested_radius(&self) -> Radius {
        match self.duration_minutes {
            Some(duration) if self.travel_mode != TravelMode::DepartmentWide => {
                Radius::Minutes(duration)
            }
            _ => Radius::Km(self.distance_km),
        }
    }

    fn query(&self, geography: Geography, aggregate_by: Vec<Facet>) -> OfficeQuery {
        OfficeQuery {
            romes: self.romes.clone(),
            geography,
            headcount: self.headcount,
            naf: self.naf.clone(),
            audience: self.audience,
            sort: self.sort,
            from_number: self.from_number,
            to_number: self.to_number,
            aggregate_by,
        }
    }

    /// Run the primary query and, when asked, the widening pass.
    ///
    /// Returns the requested result window and the backend's aggregations
    /// (which still include every active filter; see
    /// [`update_aggregations`](Self::update_aggregations)). A backend
    /// failure surfaces as an error so callers can distinguish "no matches"
    /// from "search failed".
    #[instrument(skip_all, fields(romes = ?self.romes))]
    pub fn get_offices(
        &mut self,
        index: &dyn OfficeIndex,
        isochrones: &dyn IsochroneProvider,
        add_suggestions: bool,
    ) -> Result<(Vec<OfficeResult>, Aggregations), SearchError> {
        let radius = self.requested_radius();
        let Some(geography) = self.geography(isochrones, radius)? else {
            self.office_count = 0;
            return Ok((Vec::new(), Aggregations::default()));
        };

        let response = index.search(&self.query(geography, self.aggregate_by.clone()))?;
        self.office_count = response.office_count;
        debug!(count = self.office_count, "Primary query done");

        if add_suggestions && self.office_count < self.settings.suggestion_threshold {
            self.alternative_distances = self.widen(index, isochrones, radius)?;
        }

        let IndexResponse {
            offices,
            aggregations,
            ..
        } = response;
        Ok((offices, aggregations))
    }

    /// Total match count for a different occupation under this request's
    /// location and filters. Used to annotate related-occupation suggestions
    /// with how many offices each one would surface.
    pub fn count_for_rome(
        &self,
        index: &dyn OfficeIndex,
        isochrones: &dyn IsochroneProvider,
        rome: &str,
    ) -> Result<u64, SearchError> {
        let Some(geography) = self.geography(isochrones, self.requested_radius())? else {
            return Ok(0);
        };
        let mut query = self.query(geography, Vec::new());
        query.romes = vec![rome.to_string()];
        query.from_number = 1;
        query.to_number = 1;
        Ok(index.search(&query)?.office_count)
    }

    /// Count-only queries over the radius ladder, strictly wider than the
    /// requested radius, stopping once a radius reaches the threshold.
    fn widen(
        &self,
        index: &dyn OfficeIndex,
        isochrones: &dyn IsochroneProvider,
        current: Radius,
    ) -> Result<Vec<AlternativeCount>, SearchError> {
        if self.departments.is_some() || self.location.is_none() {
            return Ok(Vec::new());
        }
        let candidates: Vec<Radius> = match current {
            Radius::Km(km) => self
                .settings
                .distance_ladder_km
                .iter()
                .copied()
                .filter(|&candidate| candidate > km)
                .map(Radius::Km)
                .collect(),
            Radius::Minutes(minutes) => self
                .settings
                .duration_ladder_minutes
                .iter()
                .copied()
                .filter(|&candidate| candidate > minutes)
                .map(Radius::Minutes)
                .collect(),
        };

        let mut alternatives = Vec::new();
        for candidate in candidates {
            let Some(geography) = self.geography(isochrones, candidate)? else {
                // Travel-time candidate with no isochrone entry; try wider.
                continue;
            };
            let mut query = self.query(geography, Vec::new());
            query.from_number = 1;
            query.to_number = 1;
            let count = index.search(&query)?.office_count;
            debug!(?candidate, count, "Widened count");
            alternatives.push(AlternativeCount {
                radius: candidate,
                count,
            });
            if count >= self.settings.suggestion_threshold {
                break;
            }
        }
        Ok(alternatives)
    }

    /// Recompute every facet whose own filter is active, with that one
    /// filter removed, so the counts describe the one-filter-changed result
    /// set. One extra query per active facet, issued in parallel. Idempotent
    /// for a fixed filter set.
    #[instrument(skip_all)]
    pub fn update_aggregations(
        &self,
        index: &dyn OfficeIndex,
        isochrones: &dyn IsochroneProvider,
        aggregations: &mut Aggregations,
    ) -> Result<(), SearchError> {
        let Some(geography) = self.geography(isochrones, self.requested_radius())? else {
            return Ok(());
        };

        let mut active: Vec<Facet> = Vec::new();
        if self.naf.is_some() {
            active.push(Facet::Naf);
        }
        if self.headcount != HeadcountBand::All {
            active.push(Facet::Headcount);
        }
        let active: Vec<Facet> = active
            .into_iter()
            .filter(|facet| self.aggregate_by.contains(facet))
            .collect();
        if active.is_empty() {
            return Ok(());
        }

        let recomputed = active
            .par_iter()
            .map(|&facet| {
                let mut query = self.query(geography.clone(), vec![facet]);
                query.from_number = 1;
                query.to_number = 1;
                match facet {
                    Facet::Naf => query.naf = None,
                    Facet::Headcount => query.headcount = HeadcountBand::All,
                }
                let response = index.search(&query)?;
                let counts = response
                    .aggregations
                    .get(&facet)
                    .cloned()
                    .unwrap_or_default();
                Ok((facet, counts))
            })
            .collect::<Result<Vec<_>, SearchError>>()?;

        for (facet, counts) in recomputed {
            aggregations.insert(facet, counts);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        geo::{GeoError, Isochrone, NoIsochrones},
        index::{FacetCount, IndexError, InMemoryOfficeIndex, OfficeDocument},
    };

    const METZ: Location = Location {
        latitude: 49.119146,
        longitude: 6.176026,
    };

    fn document(siret: &str, naf: &str, headcount: &str, lat: f64, lon: f64) -> OfficeDocument {
        OfficeDocument {
            siret: siret.to_string(),
            name: format!("Office {siret}"),
            naf: naf.to_string(),
            headcount: headcount.to_string(),
            department: "57".to_string(),
            latitude: lat,
            longitude: lon,
            score: 50.0,
            romes: vec!["M1203".to_string()],
            audiences: Vec::new(),
        }
    }

    /// Three offices close to Metz, two more 20-40 km out.
    fn index() -> InMemoryOfficeIndex {
        InMemoryOfficeIndex::new(vec![
            document("00000000000001", "6920Z", "03", 49.12, 6.18),
            document("00000000000002", "6920Z", "22", 49.11, 6.17),
            document("00000000000003", "4711D", "12", 49.13, 6.19),
            document("00000000000004", "6920Z", "03", 49.35, 6.17),
            document("00000000000005", "4711D", "22", 49.45, 6.20),
        ])
    }

    fn resolved() -> ResolvedLocation {
        ResolvedLocation {
            location: Some(METZ),
            named: None,
            departments: None,
        }
    }

    fn fetcher(params: &SearchParams) -> HiddenMarketFetcher {
        HiddenMarketFetcher::new(
            params,
            &resolved(),
            vec!["M1203".to_string()],
            vec![Facet::Naf, Facet::Headcount],
            Settings::builder().suggestion_threshold(5).build(),
        )
    }

    #[test]
    fn primary_query_returns_offices_in_radius() {
        let params = SearchParams::default();
        let mut fetcher = fetcher(&params);
        let (offices, aggregations) = fetcher
            .get_offices(&index(), &NoIsochrones, false)
            .unwrap();
        assert_eq!(fetcher.office_count, 3);
        assert_eq!(offices.len(), 3);
        assert_eq!(aggregations[&Facet::Naf].len(), 2);
    }

    #[test]
    fn widening_walks_the_distance_ladder() {
        let params = SearchParams::default();
        let mut fetcher = fetcher(&params);
        fetcher
            .get_offices(&index(), &NoIsochrones, true)
            .unwrap();

        // 3 primary results < threshold 5; the ladder tried 30 km (4), then
        // 50 km (5) which reached the threshold, stopping before 100 km.
        let counts: Vec<(Radius, u64)> = fetcher
            .alternative_distances
            .iter()
            .map(|alt| (alt.radius, alt.count))
            .collect();
        assert_eq!(
            counts,
            vec![(Radius::Km(30.0), 4), (Radius::Km(50.0), 5)]
        );
        // Monotonic: each wider radius sees at least as many offices.
        assert!(
            fetcher
                .alternative_distances
                .windows(2)
                .all(|w| w[0].count <= w[1].count)
        );
        // The primary result set was not replaced.
        assert_eq!(fetcher.office_count, 3);
    }

    #[test]
    fn no_widening_when_enough_results() {
        let params = SearchParams::default();
        let mut fetcher = HiddenMarketFetcher::new(
            &params,
            &resolved(),
            vec!["M1203".to_string()],
            Vec::new(),
            Settings::builder().suggestion_threshold(2).build(),
        );
        fetcher
            .get_offices(&index(), &NoIsochrones, true)
            .unwrap();
        assert!(fetcher.alternative_distances.is_empty());
    }

    struct FixtureIsochrones;

    impl IsochroneProvider for FixtureIsochrones {
        fn isochrone(
            &self,
            _origin: Location,
            _mode: TravelMode,
            duration_minutes: u16,
        ) -> Result<Option<Isochrone>, GeoError> {
            // Bigger durations reach further north of Metz.
            let reach = match duration_minutes {
                15 => 0.05,
                30 => 0.25,
                45 => 0.40,
                _ => return Ok(None),
            };
            Ok(Some(Isochrone::new(vec![
                (49.119146 - 0.05, 6.0),
                (49.119146 - 0.05, 6.4),
                (49.119146 + reach, 6.4),
                (49.119146 + reach, 6.0),
            ])))
        }
    }

    #[test]
    fn duration_search_uses_isochrones() {
        let mut params = SearchParams::default();
        params.duration_minutes = Some(15);
        let mut fetcher = fetcher(&params);
        fetcher
            .get_offices(&index(), &FixtureIsochrones, true)
            .unwrap();
        assert_eq!(fetcher.office_count, 3);

        // The widening ladder switched to durations.
        let radii: Vec<Radius> = fetcher
            .alternative_distances
            .iter()
            .map(|alt| alt.radius)
            .collect();
        assert_eq!(radii, vec![Radius::Minutes(30), Radius::Minutes(45)]);
        assert_eq!(fetcher.alternative_distances[0].count, 4);
        assert_eq!(fetcher.alternative_distances[1].count, 5);
    }

    #[test]
    fn missing_isochrone_degrades_to_zero_results() {
        let mut params = SearchParams::default();
        params.duration_minutes = Some(15);
        let mut fetcher = fetcher(&params);
        let (offices, aggregations) = fetcher
            .get_offices(&index(), &NoIsochrones, false)
            .unwrap();
        assert!(offices.is_empty());
        assert_eq!(fetcher.office_count, 0);
        assert!(aggregations.is_empty());
    }

    #[test]
    fn unreachable_backend_is_an_error_not_an_empty_page() {
        struct DownIndex;
        impl OfficeIndex for DownIndex {
            fn search(&self, _: &OfficeQuery) -> Result<IndexResponse, IndexError> {
                Err(IndexError::Unavailable("connection refused".into()))
            }
        }

        let params = SearchParams::default();
        let mut fetcher = fetcher(&params);
        let err = fetcher
            .get_offices(&DownIndex, &NoIsochrones, false)
            .unwrap_err();
        assert!(matches!(err, SearchError::Index(IndexError::Unavailable(_))));
    }

    #[test]
    fn count_for_rome_swaps_the_occupation_but_keeps_the_geography() {
        let mut secretarial = document("00000000000006", "6920Z", "03", 49.12, 6.18);
        secretarial.romes = vec!["M1608".to_string()];
        let mut far = document("00000000000007", "6920Z", "03", 49.45, 6.20);
        far.romes = vec!["M1608".to_string()];
        let index = InMemoryOfficeIndex::new(vec![secretarial, far]);

        let params = SearchParams::default();
        let fetcher = fetcher(&params);
        // Only the close office counts: the far one sits outside the radius.
        let count = fetcher.count_for_rome(&index, &NoIsochrones, "M1608").unwrap();
        assert_eq!(count, 1);
        assert_eq!(fetcher.count_for_rome(&index, &NoIsochrones, "M1203").unwrap(), 0);
    }

    #[test]
    fn facet_counts_exclude_their_own_filter() {
        let mut params = SearchParams::default();
        params.naf = Some("4711D".to_string());
        params.headcount = HeadcountBand::Small;
        let mut fetcher = fetcher(&params);
        let (_, mut aggregations) = fetcher
            .get_offices(&index(), &NoIsochrones, false)
            .unwrap();

        fetcher
            .update_aggregations(&index(), &NoIsochrones, &mut aggregations)
            .unwrap();

        // Naf counts: headcount=small still applied, naf filter removed.
        // In radius: 01 (6920Z/03), 03 (4711D/12) are small; 02 is big.
        let naf = &aggregations[&Facet::Naf];
        assert!(naf.contains(&FacetCount { value: "6920Z".into(), count: 1 }));
        assert!(naf.contains(&FacetCount { value: "4711D".into(), count: 1 }));

        // Headcount counts: naf=4711D still applied, headcount removed.
        let headcount = &aggregations[&Facet::Headcount];
        let small = headcount.iter().find(|c| c.value == "small").unwrap();
        assert_eq!(small.count, 1);
    }

    #[test]
    fn update_aggregations_is_idempotent() {
        let mut params = SearchParams::default();
        params.naf = Some("4711D".to_string());
        let mut fetcher = fetcher(&params);
        let (_, mut aggregations) = fetcher
            .get_offices(&index(), &NoIsochrones, false)
            .unwrap();

        fetcher
            .update_aggregations(&index(), &NoIsochrones, &mut aggregations)
            .unwrap();
        let first = aggregations.clone();
        fetcher
            .update_aggregations(&index(), &NoIsochrones, &mut aggregations)
            .unwrap();
        assert_eq!(first, aggregations);
    }

    #[test]
    fn no_active_facet_filter_issues_no_queries() {
        struct CountingIndex {
            inner: InMemoryOfficeIndex,
            calls: AtomicUsize,
        }
        impl OfficeIndex for CountingIndex {
            fn search(&self, query: &OfficeQuery) -> Result<IndexResponse, IndexError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.inner.search(query)
            }
        }

        let counting = CountingIndex {
            inner: index(),
            calls: AtomicUsize::new(0),
        };
        let params = SearchParams::default();
        let mut fetcher = fetcher(&params);
        let (_, mut aggregations) = fetcher
            .get_offices(&counting, &NoIsochrones, false)
            .unwrap();
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);

        fetcher
            .update_aggregations(&counting, &NoIsochrones, &mut aggregations)
            .unwrap();
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn department_search_skips_widening() {
        let params = SearchParams::default();
        let resolved = ResolvedLocation {
            location: None,
            named: None,
            departments: Some(vec!["57".to_string()]),
        };
        let mut fetcher = HiddenMarketFetcher::new(
            &params,
            &resolved,
            vec!["M1203".to_string()],
            Vec::new(),
            Settings::builder().suggestion_threshold(100).build(),
        );
        let (offices, _) = fetcher
            .get_offices(&index(), &NoIsochrones, true)
            .unwrap();
        assert_eq!(offices.len(), 5);
        assert!(offices.iter().all(|o| o.distance_km.is_none()));
        assert!(fetcher.alternative_distances.is_empty());
    }
}
