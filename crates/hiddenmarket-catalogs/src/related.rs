//! Related-occupation tables: `area → occupation → [related occupations]`,
//! where areas are keyed by city code.

use ahash::AHashMap as HashMap;
use serde::{Deserialize, Serialize};

/// One related occupation with its statistical relevance for the area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedEntry {
    pub rome: String,
    pub score: f64,
}

/// On-disk shape of the related-occupation file.
#[derive(Debug, Clone, Deserialize)]
pub struct RelatedRomeFile {
    pub areas: std::collections::HashMap<String, String>,
    pub related:
        std::collections::HashMap<String, std::collections::HashMap<String, Vec<RelatedEntry>>>,
}

/// Read-only related-occupation lookup tables.
#[derive(Debug, Clone, Default)]
pub struct RelatedRomeTables {
    /// city code → area identifier
    areas: HashMap<String, String>,
    /// area identifier → occupation code → related occupations
    related: HashMap<String, HashMap<String, Vec<RelatedEntry>>>,
}

impl RelatedRomeTables {
    /// The area an occupation-suggestion table exists for, if any covers the
    /// given city code.
    #[must_use]
    pub fn area_of(&self, city_code: &str) -> Option<&str> {
        self.areas.get(city_code).map(String::as_str)
    }

    /// Related occupations for an occupation code within an area.
    #[must_use]
    pub fn related(&self, area: &str, rome: &str) -> Option<&[RelatedEntry]> {
        self.related.get(area)?.get(rome).map(Vec::as_slice)
    }

    /// Whether any table exists for the area at all.
    #[must_use]
    pub fn has_area(&self, area: &str) -> bool {
        self.related.contains_key(area)
    }

    /// Iterate over all known area identifiers.
    pub fn areas(&self) -> impl Iterator<Item = &str> {
        self.related.keys().map(String::as_str)
    }

    /// Iterate over the per-occupation tables of an area.
    pub fn occupations_for_area(
        &self,
        area: &str,
    ) -> impl Iterator<Item = (&str, &[RelatedEntry])> {
        self.related
            .get(area)
            .into_iter()
            .flat_map(|table| table.iter().map(|(rome, entries)| (rome.as_str(), entries.as_slice())))
    }
}

impl From<RelatedRomeFile> for RelatedRomeTables {
    fn from(file: RelatedRomeFile) -> Self {
        Self {
            areas: file.areas.into_iter().collect(),
            related: file
                .related
                .into_iter()
                .map(|(area, table)| (area, table.into_iter().collect()))
                .collect(),
        }
    }
}
