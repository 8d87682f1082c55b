//! City/zipcode table: validated lookups by zipcode (+ optional slug) and by
//! city code (commune identifier).

use ahash::AHashMap as HashMap;
use serde::{Deserialize, Serialize};

/// One city row of the reference table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityEntry {
    pub slug: String,
    pub name: String,
    pub zipcode: String,
    pub city_code: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Read-only city lookup table.
///
/// A zipcode can cover several cities, so zipcode lookups return the slugged
/// match when a slug is given and the first candidate otherwise. An incorrect
/// zipcode/slug pairing is `None`, never an error.
#[derive(Debug, Clone, Default)]
pub struct CityBook {
    entries: Vec<CityEntry>,
    by_zipcode: HashMap<String, Vec<usize>>,
    by_city_code: HashMap<String, usize>,
}

impl CityBook {
    #[must_use]
    pub fn new(entries: Vec<CityEntry>) -> Self {
        let mut by_zipcode: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_city_code = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            by_zipcode.entry(entry.zipcode.clone()).or_default().push(idx);
            by_city_code.insert(entry.city_code.clone(), idx);
        }
        Self {
            entries,
            by_zipcode,
            by_city_code,
        }
    }

    /// Look up a city by zipcode, optionally narrowed by slug.
    ///
    /// The slug may be the bare city slug (`"metz"`) or the combined
    /// `"slug-zipcode"` form (`"metz-57050"`) used in shared URLs. A slug that
    /// does not denote a city of that zipcode yields `None`.
    #[must_use]
    pub fn by_zipcode(&self, zipcode: &str, slug: Option<&str>) -> Option<&CityEntry> {
        let candidates = self.by_zipcode.get(zipcode)?;
        match slug {
            None | Some("") => candidates.first().map(|&idx| &self.entries[idx]),
            Some(slug) => candidates
                .iter()
                .map(|&idx| &self.entries[idx])
                .find(|entry| {
                    slug == entry.slug || slug == format!("{}-{}", entry.slug, entry.zipcode)
                }),
        }
    }

    /// Look up a city by its commune identifier.
    #[must_use]
    pub fn by_city_code(&self, city_code: &str) -> Option<&CityEntry> {
        self.by_city_code
            .get(city_code)
            .map(|&idx| &self.entries[idx])
    }

    #[must_use]
    pub fn entries(&self) -> &[CityEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
