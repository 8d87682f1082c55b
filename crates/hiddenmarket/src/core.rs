//! The search service: one entry point wiring the normalizer, the location
//! resolver, the advisor, the fetcher and the pagination manager together
//! over injected backends.

use std::{fmt, sync::Arc};

use hiddenmarket_catalogs::{Catalogs, slugify};
use tracing::{debug, info, instrument};

use crate::{
    config::Settings,
    error::{HiddenMarketError, Result},
    filters::{Facet, HeadcountBand, SortKey},
    geo::{Geocoder, IsochroneProvider, NoGeocoder, NoIsochrones},
    index::{Aggregations, OfficeIndex, OfficeResult},
    location::{Location, NamedLocation, ResolvedLocation, resolve_location},
    pagination::{Page, PaginationManager},
    params::SearchParams,
    related::{RelatedOccupationAdvisor, RelatedSuggestions},
    search::{AlternativeCount, HiddenMarketFetcher},
};

/// A suggested alternate occupation together with how many offices it would
/// surface under the same location and filters.
#[derive(Debug, Clone, PartialEq)]
pub struct AlternativeOccupation {
    pub rome: String,
    /// Catalog description; empty when the catalog has no entry.
    pub description: String,
    pub count: u64,
}

/// Everything a caller needs to render one search result page.
#[derive(Debug, Clone)]
pub struct SearchResponse {
    /// The requested result window, in sort order.
    pub offices: Vec<OfficeResult>,
    /// Total matches, independent of the window.
    pub office_count: u64,
    /// Facet counts, each facet computed with its own filter excluded.
    pub aggregations: Aggregations,
    /// `(code, "label (count)")` pairs for the industry filter widget,
    /// sorted by label.
    pub naf_choices: Vec<(String, String)>,
    /// Counts observed at widened radii when the primary count was low.
    pub alternative_distances: Vec<AlternativeCount>,
    /// Suggested occupations that do have matches here, computed when the
    /// primary count was low; zero-count occupations are dropped.
    pub alternative_occupations: Vec<AlternativeOccupation>,
    pub related: RelatedSuggestions,
    /// Echo of the `ij` parameter: the occupation a related-occupation
    /// suggestion was followed from.
    pub related_rome_initial: Option<String>,
    pub page: Page,
    pub pagination: PaginationManager,
    /// The requested occupation is not in the catalog; no query was run.
    pub job_doesnt_exist: bool,
    pub rome: Option<String>,
    pub rome_description: Option<String>,
    pub location: Option<Location>,
    pub named_location: Option<NamedLocation>,
    pub departments: Option<Vec<String>>,
    pub distance_km: f64,
    pub headcount: HeadcountBand,
    pub sort: SortKey,
    pub naf: Option<String>,
}

/// Job-seeker office search over pluggable backends.
///
/// Construct with [`SearchService::builder`]; only the office index is
/// mandatory, the geographic backends default to empty implementations and
/// the catalogs to the embedded dataset.
pub struct SearchService {
    catalogs: Arc<Catalogs>,
    geocoder: Arc<dyn Geocoder>,
    isochrones: Arc<dyn IsochroneProvider>,
    index: Arc<dyn OfficeIndex>,
    settings: Settings,
    advisor: RelatedOccupationAdvisor,
}

// The backends are trait objects, so Debug is spelled out by hand.
impl fmt::Debug for SearchService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchService")
            .field("catalogs", &self.catalogs)
            .field("settings", &self.settings)
            .field("advisor", &self.advisor)
            .finish_non_exhaustive()
    }
}

impl SearchService {
    #[must_use]
    pub fn builder() -> SearchServiceBuilder {
        SearchServiceBuilder::new()
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    /// Run one search from raw query-string pairs.
    ///
    /// Bad input never fails the request: unknown filter values fall back to
    /// defaults, an unresolvable location searches nowhere and an unknown
    /// occupation short-circuits to an empty response with
    /// `job_doesnt_exist` set, without touching the index. Only backend
    /// failures surface as errors.
    #[instrument(skip_all, fields(path = current_path))]
    pub fn search<'a, I>(
        &self,
        pairs: I,
        authorized_for_restricted: bool,
        current_path: &str,
    ) -> Result<SearchResponse>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let params = SearchParams::from_pairs(pairs, authorized_for_restricted, &self.settings);
        let resolved = resolve_location(&params, self.geocoder.as_ref(), &self.catalogs.cities);

        let Some(rome) = self.resolve_rome(&params) else {
            info!("Occupation not recognized, short-circuiting");
            return Ok(self.job_not_found_response(&params, resolved, current_path));
        };
        let rome_description = self
            .catalogs
            .occupations
            .description(&rome)
            .map(ToString::to_string);

        let related = self.advisor.suggest(resolved.named.as_ref(), &rome);

        let mut fetcher = HiddenMarketFetcher::new(
            &params,
            &resolved,
            vec![rome.clone()],
            vec![Facet::Naf, Facet::Headcount],
            self.settings.clone(),
        );
        let (offices, mut aggregations) =
            fetcher.get_offices(self.index.as_ref(), self.isochrones.as_ref(), true)?;
        if !aggregations.is_empty() {
            fetcher.update_aggregations(
                self.index.as_ref(),
                self.isochrones.as_ref(),
                &mut aggregations,
            )?;
        }
        let naf_choices = self.naf_choices(&aggregations);

        let alternative_occupations = if fetcher.office_count < self.settings.suggestion_threshold {
            self.alternative_occupations(&fetcher, &related)?
        } else {
            Vec::new()
        };

        let pagination = PaginationManager::new(
            fetcher.office_count,
            params.from_number,
            params.to_number,
            current_path,
            &self.settings,
        );
        let page = pagination.current_page();
        debug!(
            count = fetcher.office_count,
            page_from = page.from_number,
            "Search done"
        );

        Ok(SearchResponse {
            offices,
            office_count: fetcher.office_count,
            aggregations,
            naf_choices,
            alternative_distances: fetcher.alternative_distances.clone(),
            alternative_occupations,
            related,
            related_rome_initial: params.related_rome_initial,
            page,
            pagination,
            job_doesnt_exist: false,
            rome: Some(rome),
            rome_description,
            location: resolved.location,
            named_location: resolved.named,
            departments: resolved.departments,
            distance_km: params.distance_km,
            headcount: params.headcount,
            sort: params.sort,
            naf: params.naf,
        })
    }

    /// Occupation resolution: explicit code, then slug, then slugified free
    /// text. Anything that does not land on a catalog entry is "not found".
    fn resolve_rome(&self, params: &SearchParams) -> Option<String> {
        if let Some(rome) = &params.rome {
            if self.catalogs.occupations.contains(rome) {
                return Some(rome.clone());
            }
        }
        if let Some(slug) = &params.occupation_slug {
            if let Some(code) = self.catalogs.occupations.code_for_slug(slug) {
                return Some(code.to_string());
            }
        }
        let label = params.job_label.as_deref()?;
        self.catalogs
            .occupations
            .code_for_slug(&slugify(label))
            .map(ToString::to_string)
    }

    /// Match counts for each suggested alternate occupation, under the same
    /// location and filters. Occupations with nothing to show are dropped;
    /// the suggestion order (descending relatedness) is kept.
    fn alternative_occupations(
        &self,
        fetcher: &HiddenMarketFetcher,
        related: &RelatedSuggestions,
    ) -> Result<Vec<AlternativeOccupation>> {
        let mut alternatives = Vec::new();
        for suggestion in &related.related {
            let count = fetcher.count_for_rome(
                self.index.as_ref(),
                self.isochrones.as_ref(),
                &suggestion.rome,
            )?;
            if count == 0 {
                continue;
            }
            alternatives.push(AlternativeOccupation {
                rome: suggestion.rome.clone(),
                description: suggestion.description.clone(),
                count,
            });
        }
        Ok(alternatives)
    }

    fn job_not_found_response(
        &self,
        params: &SearchParams,
        resolved: ResolvedLocation,
        current_path: &str,
    ) -> SearchResponse {
        let pagination = PaginationManager::new(
            0,
            params.from_number,
            params.to_number,
            current_path,
            &self.settings,
        );
        let page = pagination.current_page();
        SearchResponse {
            offices: Vec::new(),
            office_count: 0,
            aggregations: Aggregations::default(),
            naf_choices: Vec::new(),
            alternative_distances: Vec::new(),
            alternative_occupations: Vec::new(),
            related: RelatedSuggestions::default(),
            related_rome_initial: params.related_rome_initial.clone(),
            page,
            pagination,
            job_doesnt_exist: true,
            rome: None,
            rome_description: None,
            location: resolved.location,
            named_location: resolved.named,
            departments: resolved.departments,
            distance_km: params.distance_km,
            headcount: params.headcount,
            sort: params.sort,
            naf: params.naf.clone(),
        }
    }

    /// `(code, "label (count)")` choices for the industry filter, sorted by
    /// label. An industry missing from the catalog keeps its raw code.
    fn naf_choices(&self, aggregations: &Aggregations) -> Vec<(String, String)> {
        let Some(counts) = aggregations.get(&Facet::Naf) else {
            return Vec::new();
        };
        let mut choices: Vec<(String, String)> = counts
            .iter()
            .map(|facet| {
                let label = self
                    .catalogs
                    .naf
                    .label(&facet.value)
                    .unwrap_or(&facet.value);
                (facet.value.clone(), format!("{label} ({})", facet.count))
            })
            .collect();
        choices.sort_by(|a, b| a.1.cmp(&b.1));
        choices
    }
}

/// Builder for [`SearchService`]. The office index is the only mandatory
/// component.
pub struct SearchServiceBuilder {
    catalogs: Option<Arc<Catalogs>>,
    geocoder: Option<Arc<dyn Geocoder>>,
    isochrones: Option<Arc<dyn IsochroneProvider>>,
    index: Option<Arc<dyn OfficeIndex>>,
    settings: Settings,
}

impl SearchServiceBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            catalogs: None,
            geocoder: None,
            isochrones: None,
            index: None,
            settings: Settings::default(),
        }
    }

    #[must_use]
    pub fn catalogs(mut self, catalogs: Arc<Catalogs>) -> Self {
        self.catalogs = Some(catalogs);
        self
    }

    #[must_use]
    pub fn geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    #[must_use]
    pub fn isochrones(mut self, isochrones: Arc<dyn IsochroneProvider>) -> Self {
        self.isochrones = Some(isochrones);
        self
    }

    #[must_use]
    pub fn index(mut self, index: Arc<dyn OfficeIndex>) -> Self {
        self.index = Some(index);
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Result<SearchService> {
        let index = self
            .index
            .ok_or_else(|| HiddenMarketError::Config("an office index is required".to_string()))?;
        let catalogs = self
            .catalogs
            .unwrap_or_else(|| Arc::new(Catalogs::embedded().clone()));
        let advisor = RelatedOccupationAdvisor::new(
            Arc::clone(&catalogs),
            self.settings.max_related_occupations,
        );
        Ok(SearchService {
            catalogs,
            geocoder: self.geocoder.unwrap_or_else(|| Arc::new(NoGeocoder)),
            isochrones: self.isochrones.unwrap_or_else(|| Arc::new(NoIsochrones)),
            index,
            settings: self.settings,
            advisor,
        })
    }
}

impl Default for SearchServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
