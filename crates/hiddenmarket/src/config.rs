//! Search tuning knobs, with a fluent builder for overriding defaults.

use serde::{Deserialize, Serialize};

/// Default number of offices per result page.
pub const OFFICES_PER_PAGE: u64 = 20;
/// Hard ceiling on a requested page window.
pub const OFFICES_MAXIMUM_PAGE_SIZE: u64 = 100;
/// Default search radius when no usable distance is requested.
pub const DISTANCE_DEFAULT_KM: f64 = 10.0;

const DISTANCE_LADDER_KM: [f64; 6] = [5.0, 10.0, 30.0, 50.0, 100.0, 3000.0];
const DURATION_LADDER_MINUTES: [u16; 3] = [15, 30, 45];

/// Tuning parameters for the search pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Rows per page when the request does not pin a window.
    pub offices_per_page: u64,
    /// Largest window a request may ask for; larger windows are clamped.
    pub max_page_size: u64,
    /// Radius used when the distance parameter is absent or malformed.
    pub distance_default_km: f64,
    /// Ascending candidate radii for the widening pass, in kilometers.
    pub distance_ladder_km: Vec<f64>,
    /// Ascending candidate travel times for the widening pass, in minutes.
    pub duration_ladder_minutes: Vec<u16>,
    /// Widening kicks in when the primary result count is below this.
    pub suggestion_threshold: u64,
    /// Cap on related-occupation suggestions.
    pub max_related_occupations: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            offices_per_page: OFFICES_PER_PAGE,
            max_page_size: OFFICES_MAXIMUM_PAGE_SIZE,
            distance_default_km: DISTANCE_DEFAULT_KM,
            distance_ladder_km: DISTANCE_LADDER_KM.to_vec(),
            duration_ladder_minutes: DURATION_LADDER_MINUTES.to_vec(),
            suggestion_threshold: 10,
            max_related_occupations: 5,
        }
    }
}

impl Settings {
    #[must_use]
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }
}

/// Fluent builder over [`Settings`] defaults.
#[derive(Debug, Clone, Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    #[must_use]
    pub fn offices_per_page(mut self, n: u64) -> Self {
        self.settings.offices_per_page = n;
        self
    }

    #[must_use]
    pub fn max_page_size(mut self, n: u64) -> Self {
        self.settings.max_page_size = n;
        self
    }

    #[must_use]
    pub fn distance_default_km(mut self, km: f64) -> Self {
        self.settings.distance_default_km = km;
        self
    }

    #[must_use]
    pub fn distance_ladder_km(mut self, ladder: impl Into<Vec<f64>>) -> Self {
        self.settings.distance_ladder_km = ladder.into();
        self
    }

    #[must_use]
    pub fn duration_ladder_minutes(mut self, ladder: impl Into<Vec<u16>>) -> Self {
        self.settings.duration_ladder_minutes = ladder.into();
        self
    }

    #[must_use]
    pub fn suggestion_threshold(mut self, threshold: u64) -> Self {
        self.settings.suggestion_threshold = threshold;
        self
    }

    #[must_use]
    pub fn max_related_occupations(mut self, cap: usize) -> Self {
        self.settings.max_related_occupations = cap;
        self
    }

    #[must_use]
    pub fn build(self) -> Settings {
        self.settings
    }
}
