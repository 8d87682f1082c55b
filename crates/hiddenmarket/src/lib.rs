//! `HiddenMarket` - Job-Seeker Office Search Library
//!
//! `HiddenMarket` surfaces companies likely to hire in a given occupation
//! near a given place, even when they have published no job offer. It wires
//! together location resolution, an office index, faceted filtering with
//! radius widening, related-occupation suggestions and pagination, all over
//! pluggable backends.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use hiddenmarket::{InMemoryOfficeIndex, SearchService};
//!
//! // Build a service over an in-memory index (use your own backend in
//! // production).
//! let service = SearchService::builder()
//!     .index(Arc::new(InMemoryOfficeIndex::default()))
//!     .build()?;
//!
//! // Search accountant-hiring companies around Metz.
//! let response = service.search(
//!     [
//!         ("zipcode", "57050"),
//!         ("city", "metz"),
//!         ("occupation", "comptabilite"),
//!     ],
//!     false,
//!     "/search?zipcode=57050&city=metz&occupation=comptabilite",
//! )?;
//!
//! println!("{} matching offices", response.office_count);
//! for office in &response.offices {
//!     println!("{} ({})", office.name, office.naf);
//! }
//! # Ok::<(), hiddenmarket::error::HiddenMarketError>(())
//! ```
//!
//! # Features
//!
//! - **Lenient input**: malformed filters fall back to defaults, bad
//!   locations fall through a resolution chain, unknown occupations
//!   short-circuit to an explicit "job not found" response.
//! - **Honest facets**: every facet count is computed with that facet's own
//!   filter excluded, so counts answer "what if I changed only this".
//! - **Radius widening**: thin result sets trigger count-only probes over an
//!   ascending radius ladder, reported as "N more within M".
//! - **Pluggable backends**: the office index, geocoder and isochrone
//!   dataset are traits; embedded reference catalogs ship with the crate.

use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod config;
mod core;
pub mod error;
mod filters;
mod geo;
mod index;
mod location;
mod pagination;
mod params;
mod related;
mod search;

pub use crate::core::{
    AlternativeOccupation, SearchResponse, SearchService, SearchServiceBuilder,
};

pub use config::{Settings, SettingsBuilder};
pub use filters::{Audience, Facet, HeadcountBand, SortKey, TravelMode};
pub use geo::{
    Address, GeoError, GeocodeCandidate, Geocoder, Isochrone, IsochroneProvider, NoGeocoder,
    NoIsochrones, haversine_km,
};
// Re-export the catalog subcrate.
pub use hiddenmarket_catalogs as catalogs;
pub use hiddenmarket_catalogs::Catalogs;
pub use index::{
    Aggregations, FacetCount, Geography, InMemoryOfficeIndex, IndexError, IndexResponse,
    OfficeDocument, OfficeIndex, OfficeQuery, OfficeResult,
};
pub use location::{
    CityLocation, Location, NamedLocation, ResolvedLocation, resolve_location,
};
pub use pagination::{Page, PaginationManager};
pub use params::SearchParams;
pub use related::{RelatedOccupation, RelatedOccupationAdvisor, RelatedSuggestions};
pub use search::{AlternativeCount, HiddenMarketFetcher, Radius, SearchError};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for the `HiddenMarket` library.
///
/// Sets up structured logging with configurable levels and filtering. Call
/// this once at the start of your application; `RUST_LOG` overrides the
/// given level.
///
/// # Examples
///
/// ```rust
/// use hiddenmarket::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), hiddenmarket::error::HiddenMarketError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::HiddenMarketError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?;

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .init();
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn service_smoke_test() {
        let service = SearchService::builder()
            .index(Arc::new(InMemoryOfficeIndex::default()))
            .build()
            .unwrap();
        let response = service
            .search([("occupation", "comptabilite"), ("zipcode", "57050")], false, "/search")
            .unwrap();
        assert_eq!(response.office_count, 0);
        assert!(!response.job_doesnt_exist);
    }

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(tracing::Level::WARN).unwrap();
        init_logging(tracing::Level::DEBUG).unwrap();
    }
}
