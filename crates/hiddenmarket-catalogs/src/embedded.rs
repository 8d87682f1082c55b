//! Embedded fixture catalogs that ship with the crate.
//!
//! The JSON under `data/` is compiled into the binary and parsed exactly once
//! on first access. It covers the Moselle test area (Metz and neighbours) and
//! a handful of occupation and industry codes, enough for test suites and
//! demos to run without external data.

use once_cell::sync::Lazy;
use tracing::info;

use crate::{Catalogs, CityBook, NafBook, OccupationCatalog, related::RelatedRomeFile};

const EMBEDDED_ROMES: &str = include_str!("../data/romes.json");
const EMBEDDED_CITIES: &str = include_str!("../data/cities.json");
const EMBEDDED_NAF: &str = include_str!("../data/naf.json");
const EMBEDDED_RELATED: &str = include_str!("../data/related_romes.json");

// The expects below hold by construction: the JSON is compiled into the
// binary and the `embedded_fixture_loads` test parses all four files.
static CATALOGS: Lazy<Catalogs> = Lazy::new(|| {
    info!("Parsing embedded reference catalogs");
    let occupations = OccupationCatalog::new(
        serde_json::from_str(EMBEDDED_ROMES).expect("embedded romes.json is valid"),
    );
    let cities =
        CityBook::new(serde_json::from_str(EMBEDDED_CITIES).expect("embedded cities.json is valid"));
    let naf =
        NafBook::new(serde_json::from_str(EMBEDDED_NAF).expect("embedded naf.json is valid"));
    let related: RelatedRomeFile =
        serde_json::from_str(EMBEDDED_RELATED).expect("embedded related_romes.json is valid");

    Catalogs {
        occupations,
        cities,
        naf,
        related: related.into(),
    }
});

/// The embedded catalogs, parsed on first use.
#[must_use]
pub fn catalogs() -> &'static Catalogs {
    &CATALOGS
}
