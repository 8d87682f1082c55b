use thiserror::Error;

#[derive(Error, Debug)]
pub enum HiddenMarketError {
    #[error("Search error: {0}")]
    Search(#[from] crate::search::SearchError),
    #[error("Index error: {0}")]
    Index(#[from] crate::index::IndexError),
    #[error("Geo error: {0}")]
    Geo(#[from] crate::geo::GeoError),
    #[error("Catalog error: {0}")]
    Catalog(#[from] hiddenmarket_catalogs::CatalogError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Init Logging error: {0}")]
    InitLogging(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, HiddenMarketError>;
