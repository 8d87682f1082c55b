//! Office index contract and the in-memory reference backend.
//!
//! The production index (full-text/geo search cluster) is consumed as a black
//! box behind [`OfficeIndex`]: a structured query in, matching records plus
//! per-requested-facet counts out. The backend computes facet counts under
//! *all* active filters; the own-filter-excluded recomputation lives in the
//! search orchestrator, which issues one extra query per active facet.
//!
//! [`InMemoryOfficeIndex`] implements the same contract over a plain vector
//! of documents. It is the fixture backend for tests and demos and the
//! reference semantics for ordering (total order: sort key, then siret).

use std::cmp::Ordering;

use ahash::AHashMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use error::IndexError;
use crate::{
    filters::{Audience, Facet, HeadcountBand, SortKey},
    geo::{Isochrone, haversine_km},
    location::Location,
};

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum IndexError {
        /// The backend could not be reached or errored out. Distinguishable
        /// from a legitimate zero-result search.
        #[error("Office index unavailable: {0}")]
        Unavailable(String),
        #[error(transparent)]
        Other(#[from] anyhow::Error),
    }
}

/// One indexed office record, as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficeDocument {
    /// Business registration id; unique, and the stable ordering tie-break.
    pub siret: String,
    pub name: String,
    /// Industry code, e.g. `"6920Z"`.
    pub naf: String,
    /// INSEE headcount code, e.g. `"03"`.
    pub headcount: String,
    pub department: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Hiring-potential score used by the smart sort.
    pub score: f64,
    /// Occupation codes this office is indexed under.
    pub romes: Vec<String>,
    /// Restricted audience segments the office is flagged for. The
    /// unrestricted segment always matches.
    pub audiences: Vec<Audience>,
}

/// Read-only projection of an office returned by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficeResult {
    pub siret: String,
    pub name: String,
    pub naf: String,
    pub headcount: String,
    pub location: Location,
    pub score: f64,
    /// Distance from the search origin; absent for department searches.
    pub distance_km: Option<f64>,
    /// Travel time from the search origin when the backend can compute it.
    pub duration_minutes: Option<u16>,
}

/// Geographic restriction of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Geography {
    /// Fixed radius around a point.
    Around { origin: Location, radius_km: f64 },
    /// Travel-time polygon membership around a point.
    Within { origin: Location, area: Isochrone },
    /// Whole departments, no point origin.
    Departments(Vec<String>),
}

/// Structured query accepted by the index backend.
#[derive(Debug, Clone, PartialEq)]
pub struct OfficeQuery {
    pub romes: Vec<String>,
    pub geography: Geography,
    pub headcount: HeadcountBand,
    pub naf: Option<String>,
    pub audience: Audience,
    pub sort: SortKey,
    /// 1-based inclusive row range.
    pub from_number: u64,
    pub to_number: u64,
    pub aggregate_by: Vec<Facet>,
}

/// One facet value with its match count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCount {
    pub value: String,
    pub count: u64,
}

/// Facet → counts, as returned by the backend for the requested facets.
pub type Aggregations = AHashMap<Facet, Vec<FacetCount>>;

/// Headcount facet values reported by the reference backend.
pub const HEADCOUNT_FACET_SMALL: &str = "small";
pub const HEADCOUNT_FACET_BIG: &str = "big";

/// Response to an [`OfficeQuery`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexResponse {
    /// The requested row window, in query order.
    pub offices: Vec<OfficeResult>,
    /// Total matches, independent of the window.
    pub office_count: u64,
    pub aggregations: Aggregations,
}

/// Black-box contract of the office search backend.
pub trait OfficeIndex: Send + Sync {
    fn search(&self, query: &OfficeQuery) -> Result<IndexResponse, IndexError>;
}

/// In-process office index over a plain document vector.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOfficeIndex {
    documents: Vec<OfficeDocument>,
}

impl InMemoryOfficeIndex {
    #[must_use]
    pub fn new(documents: Vec<OfficeDocument>) -> Self {
        Self { documents }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn matches(document: &OfficeDocument, query: &OfficeQuery) -> bool {
        if !document.romes.iter().any(|rome| query.romes.contains(rome)) {
            return false;
        }
        if !query.headcount.matches_code(&document.headcount) {
            return false;
        }
        if let Some(naf) = &query.naf {
            if &document.naf != naf {
                return false;
            }
        }
        match query.audience {
            Audience::All => {}
            restricted => {
                if !document.audiences.contains(&restricted) {
                    return false;
                }
            }
        }
        let at = Location::new(document.latitude, document.longitude);
        match &query.geography {
            Geography::Around { origin, radius_km } => haversine_km(*origin, at) <= *radius_km,
            Geography::Within { area, .. } => area.contains(at),
            Geography::Departments(departments) => departments.contains(&document.department),
        }
    }

    fn to_result(document: &OfficeDocument, geography: &Geography) -> OfficeResult {
        let at = Location::new(document.latitude, document.longitude);
        let distance_km = match geography {
            Geography::Around { origin, .. } | Geography::Within { origin, .. } => {
                Some(haversine_km(*origin, at))
            }
            Geography::Departments(_) => None,
        };
        OfficeResult {
            siret: document.siret.clone(),
            name: document.name.clone(),
            naf: document.naf.clone(),
            headcount: document.headcount.clone(),
            location: at,
            score: document.score,
            distance_km,
            duration_minutes: None,
        }
    }

    /// Total order over results: sort key first, siret as the stable
    /// tie-break, so identical queries always return identical ordering.
    fn compare(sort: SortKey, a: &OfficeResult, b: &OfficeResult) -> Ordering {
        let primary = match sort {
            SortKey::Smart => b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal),
            SortKey::Distance => a
                .distance_km
                .partial_cmp(&b.distance_km)
                .unwrap_or(Ordering::Equal),
        };
        primary.then_with(|| a.siret.cmp(&b.siret))
    }

    fn aggregate(matched: &[&OfficeDocument], facets: &[Facet]) -> Aggregations {
        let mut aggregations = Aggregations::default();
        for facet in facets {
            let counts = match facet {
                Facet::Naf => matched
                    .iter()
                    .map(|document| document.naf.as_str())
                    .counts()
                    .into_iter()
                    .map(|(value, count)| FacetCount {
                        value: value.to_string(),
                        count: count as u64,
                    })
                    .sorted_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)))
                    .collect(),
                Facet::Headcount => {
                    let small = matched
                        .iter()
                        .filter(|d| HeadcountBand::Small.matches_code(&d.headcount))
                        .count() as u64;
                    let big = matched
                        .iter()
                        .filter(|d| HeadcountBand::Big.matches_code(&d.headcount))
                        .count() as u64;
                    vec![
                        FacetCount {
                            value: HEADCOUNT_FACET_SMALL.to_string(),
                            count: small,
                        },
                        FacetCount {
                            value: HEADCOUNT_FACET_BIG.to_string(),
                            count: big,
                        },
                    ]
                }
            };
            aggregations.insert(*facet, counts);
        }
        aggregations
    }
}

impl OfficeIndex for InMemoryOfficeIndex {
    fn search(&self, query: &OfficeQuery) -> Result<IndexResponse, IndexError> {
        let matched: Vec<&OfficeDocument> = self
            .documents
            .iter()
            .filter(|document| Self::matches(document, query))
            .collect();
        debug!(matched = matched.len(), "In-memory index query");

        let aggregations = Self::aggregate(&matched, &query.aggregate_by);

        let mut results: Vec<OfficeResult> = matched
            .iter()
            .map(|document| Self::to_result(document, &query.geography))
            .collect();
        results.sort_by(|a, b| Self::compare(query.sort, a, b));

        let office_count = results.len() as u64;
        let offices = if query.to_number < query.from_number || query.from_number == 0 {
            Vec::new()
        } else {
            let skip = (query.from_number - 1) as usize;
            let take = (query.to_number - query.from_number + 1) as usize;
            results.into_iter().skip(skip).take(take).collect()
        };

        Ok(IndexResponse {
            offices,
            office_count,
            aggregations,
        })
    }
}
