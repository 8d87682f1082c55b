//! Office search orchestration: query construction, facet recomputation and
//! radius widening over the index backend.

mod fetcher;

pub use error::SearchError;
pub use fetcher::{AlternativeCount, HiddenMarketFetcher, Radius};

mod error {
    use thiserror::Error;

    use crate::{geo::GeoError, index::IndexError};

    #[derive(Error, Debug)]
    pub enum SearchError {
        #[error("Index backend error: {0}")]
        Index(#[from] IndexError),
        #[error("Geographic backend error: {0}")]
        Geo(#[from] GeoError),
        #[error(transparent)]
        Other(#[from] anyhow::Error),
    }
}
