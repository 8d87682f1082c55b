//! Related-occupation suggestions for a resolved location.
//!
//! The relatedness tables are keyed by commuting area; an area is looked up
//! from the resolved city code. Suggestions are sorted by descending score
//! and capped. A suggestion whose occupation has no catalog description is
//! kept with an empty description and logged for operators, never dropped.

use std::sync::Arc;

use hiddenmarket_catalogs::Catalogs;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::location::NamedLocation;

/// One suggested alternate occupation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedOccupation {
    pub rome: String,
    /// Catalog description; empty when the catalog has no entry.
    pub description: String,
    pub score: f64,
}

/// Suggestions plus the flag telling the caller whether generic suggestion
/// UI should be hidden.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RelatedSuggestions {
    pub related: Vec<RelatedOccupation>,
    /// Set whenever the location belongs to a covered commuting area, even
    /// when that area has no entries for the requested occupation. Covered
    /// areas get curated suggestions or nothing.
    pub hide_suggestions: bool,
}

/// Looks up ranked alternate occupations for a location/occupation pair.
#[derive(Debug, Clone)]
pub struct RelatedOccupationAdvisor {
    catalogs: Arc<Catalogs>,
    max_results: usize,
}

impl RelatedOccupationAdvisor {
    #[must_use]
    pub fn new(catalogs: Arc<Catalogs>, max_results: usize) -> Self {
        Self {
            catalogs,
            max_results,
        }
    }

    /// Suggestions for an occupation near a resolved location.
    ///
    /// No location, or a location outside every covered area, yields no
    /// suggestions with `hide_suggestions` unset.
    #[instrument(skip(self, named), fields(city_code))]
    #[must_use]
    pub fn suggest(&self, named: Option<&NamedLocation>, rome: &str) -> RelatedSuggestions {
        let Some(city_code) = named.and_then(|named| named.city_code.as_deref()) else {
            return RelatedSuggestions::default();
        };
        let Some(area) = self.catalogs.related.area_of(city_code) else {
            debug!(city_code, "No commuting area for city");
            return RelatedSuggestions::default();
        };

        let mut related: Vec<RelatedOccupation> = self
            .catalogs
            .related
            .related(area, rome)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| RelatedOccupation {
                        rome: entry.rome.clone(),
                        description: self.description_for(&entry.rome),
                        score: entry.score,
                    })
                    .collect()
            })
            .unwrap_or_default();

        related.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.rome.cmp(&b.rome))
        });
        related.truncate(self.max_results);

        RelatedSuggestions {
            related,
            hide_suggestions: true,
        }
    }

    fn description_for(&self, rome: &str) -> String {
        match self.catalogs.occupations.description(rome) {
            Some(description) => description.to_string(),
            None => {
                warn!(rome, "Related occupation missing from catalog");
                String::new()
            }
        }
    }
}
