//! Reference catalogs for the hiddenmarket search library.
//!
//! Everything in this crate is read-only data loaded once at startup and then
//! shared freely between concurrent searches: the occupation catalog (codes,
//! descriptions and URL slugs), the city/zipcode table, industry-code labels
//! and the related-occupation tables keyed by geographic area.
//!
//! Catalogs can be loaded from a directory of JSON files (production data) or
//! taken from the embedded fixture dataset that ships with the crate, which is
//! what the test suites use.

use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::info;

pub mod cities;
pub mod embedded;
pub mod naf;
pub mod occupations;
pub mod related;

pub use cities::{CityBook, CityEntry};
pub use error::CatalogError;
pub use naf::NafBook;
pub use occupations::{OccupationCatalog, slugify};
pub use related::{RelatedEntry, RelatedRomeTables};

/// File names expected inside a catalog directory.
pub const ROMES_FILE: &str = "romes.json";
pub const CITIES_FILE: &str = "cities.json";
pub const NAF_FILE: &str = "naf.json";
pub const RELATED_ROMES_FILE: &str = "related_romes.json";

mod error {
    use std::path::PathBuf;

    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum CatalogError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Serialization error: {0}")]
        Serde(#[from] serde_json::Error),
        #[error("Catalog file not found: {0}")]
        FileNotFound(PathBuf),
    }

    pub type Result<T> = std::result::Result<T, CatalogError>;
}

use error::Result;

/// The full set of reference catalogs a search process needs.
#[derive(Debug, Clone)]
pub struct Catalogs {
    pub occupations: OccupationCatalog,
    pub cities: CityBook,
    pub naf: NafBook,
    pub related: RelatedRomeTables,
}

impl Catalogs {
    /// Load every catalog from a directory of JSON files.
    ///
    /// The directory must contain [`ROMES_FILE`], [`CITIES_FILE`],
    /// [`NAF_FILE`] and [`RELATED_ROMES_FILE`].
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        info!(dir = %dir.display(), "Loading reference catalogs");

        let occupations = OccupationCatalog::new(read_json(&dir.join(ROMES_FILE))?);
        let cities = CityBook::new(read_json(&dir.join(CITIES_FILE))?);
        let naf = NafBook::new(read_json(&dir.join(NAF_FILE))?);
        let related = read_json::<related::RelatedRomeFile>(&dir.join(RELATED_ROMES_FILE))?.into();

        Ok(Self {
            occupations,
            cities,
            naf,
            related,
        })
    }

    /// The embedded fixture catalogs that ship with the crate.
    #[must_use]
    pub fn embedded() -> &'static Self {
        embedded::catalogs()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.is_file() {
        return Err(CatalogError::FileNotFound(path.to_path_buf()));
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn embedded_catalogs_are_consistent() {
        let catalogs = Catalogs::embedded();

        // Every related occupation must resolve against the occupation catalog,
        // otherwise the fixture data itself carries a data-integrity gap.
        for area in catalogs.related.areas() {
            for (_, entries) in catalogs.related.occupations_for_area(area) {
                for entry in entries {
                    assert!(
                        catalogs.occupations.description(&entry.rome).is_some(),
                        "related occupation {} has no catalog description",
                        entry.rome
                    );
                }
            }
        }

        // Every area key must come from a known city code.
        for city in catalogs.cities.entries() {
            let _ = catalogs.related.area_of(&city.city_code);
        }
    }

    #[test]
    fn from_dir_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");

        fs::write(dir.path().join(ROMES_FILE), r#"{"M1203": "Comptabilité"}"#).unwrap();
        fs::write(
            dir.path().join(CITIES_FILE),
            r#"[{"slug": "metz", "name": "Metz", "zipcode": "57050",
                 "city_code": "57463", "latitude": 49.119146, "longitude": 6.176026}]"#,
        )
        .unwrap();
        fs::write(dir.path().join(NAF_FILE), r#"{"6920Z": "Activités comptables"}"#).unwrap();
        fs::write(
            dir.path().join(RELATED_ROMES_FILE),
            r#"{"areas": {"57463": "metz-metropole"},
                "related": {"metz-metropole": {"M1203": [{"rome": "M1203", "score": 1.0}]}}}"#,
        )
        .unwrap();

        let catalogs = Catalogs::from_dir(dir.path()).expect("catalogs should load");
        assert_eq!(catalogs.occupations.description("M1203"), Some("Comptabilité"));
        assert!(catalogs.cities.by_zipcode("57050", None).is_some());
        assert_eq!(catalogs.naf.label("6920Z"), Some("Activités comptables"));
        assert_eq!(catalogs.related.area_of("57463"), Some("metz-metropole"));
    }

    #[test]
    fn from_dir_reports_missing_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = Catalogs::from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, CatalogError::FileNotFound(_)));
    }
}
