//! Request parameter normalization.
//!
//! Turns raw query-string pairs into a [`SearchParams`] with every field
//! populated: malformed or missing values fall back to configured defaults
//! rather than rejecting the request. The page window is fixed up here so
//! everything downstream can assume `from_number >= 1`,
//! `to_number >= from_number` and a window no larger than the configured
//! maximum.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::Settings,
    filters::{Audience, HeadcountBand, SortKey, TravelMode},
};

/// Short query-string keys and the fields they populate.
///
/// | key           | field            |
/// |---------------|------------------|
/// | `r`           | `rome`           |
/// | `j`           | `job_label`      |
/// | `ij`          | `related_rome_initial` |
/// | `occupation`  | `occupation_slug`|
/// | `l`           | `location_text`  |
/// | `lat` / `lon` | coordinates      |
/// | `zipcode`     | `zipcode`        |
/// | `city`        | `city_slug`      |
/// | `departments` | `departments`    |
/// | `d`           | `distance_km`    |
/// | `dur`         | `duration_minutes`|
/// | `tr`          | `travel_mode`    |
/// | `h`           | `headcount`      |
/// | `naf`         | `naf`            |
/// | `sort`        | `sort`           |
/// | `from` / `to` | page window      |
/// | `p`           | `audience`       |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Occupation code, e.g. `"M1203"`.
    pub rome: Option<String>,
    /// Free-text job label, slugified when no code or slug is given.
    pub job_label: Option<String>,
    /// Occupation slug, e.g. `"comptabilite"`.
    pub occupation_slug: Option<String>,
    /// Occupation the user followed a related-occupation suggestion from;
    /// echoed back untouched.
    pub related_rome_initial: Option<String>,
    pub location_text: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub zipcode: Option<String>,
    pub city_slug: Option<String>,
    pub departments: Option<Vec<String>>,
    pub distance_km: f64,
    pub duration_minutes: Option<u16>,
    pub travel_mode: TravelMode,
    pub headcount: HeadcountBand,
    pub naf: Option<String>,
    pub sort: SortKey,
    pub audience: Audience,
    /// 1-based inclusive row range.
    pub from_number: u64,
    pub to_number: u64,
}

impl Default for SearchParams {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            rome: None,
            job_label: None,
            occupation_slug: None,
            related_rome_initial: None,
            location_text: None,
            latitude: None,
            longitude: None,
            zipcode: None,
            city_slug: None,
            departments: None,
            distance_km: settings.distance_default_km,
            duration_minutes: None,
            travel_mode: TravelMode::default(),
            headcount: HeadcountBand::default(),
            naf: None,
            sort: SortKey::default(),
            audience: Audience::default(),
            from_number: 1,
            to_number: settings.offices_per_page,
        }
    }
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

impl SearchParams {
    /// Normalize raw query-string pairs.
    ///
    /// `authorized_for_restricted` gates the audience parameter: without it
    /// the audience is always forced back to the unrestricted segment.
    #[must_use]
    pub fn from_pairs<'a, I>(pairs: I, authorized_for_restricted: bool, settings: &Settings) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let pairs: Vec<(&str, &str)> = pairs.into_iter().collect();
        let value = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| *v)
        };

        let mut params = Self {
            rome: non_empty(value("r")),
            job_label: non_empty(value("j")),
            occupation_slug: non_empty(value("occupation")),
            related_rome_initial: non_empty(value("ij")),
            location_text: non_empty(value("l")),
            latitude: value("lat").and_then(|raw| raw.trim().parse().ok()),
            longitude: value("lon").and_then(|raw| raw.trim().parse().ok()),
            zipcode: non_empty(value("zipcode")),
            city_slug: non_empty(value("city")),
            departments: non_empty(value("departments")).map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(ToString::to_string)
                    .collect()
            }),
            ..Self::default()
        };
        // A lone coordinate is as good as none.
        if params.latitude.is_none() || params.longitude.is_none() {
            params.latitude = None;
            params.longitude = None;
        }
        if params
            .departments
            .as_ref()
            .is_some_and(Vec::is_empty)
        {
            params.departments = None;
        }

        params.distance_km = match value("d").map(|raw| raw.trim().parse::<f64>()) {
            Some(Ok(km)) if km > 0.0 => km,
            None => settings.distance_default_km,
            Some(_) => {
                debug!("Malformed distance parameter, using default");
                settings.distance_default_km
            }
        };
        params.duration_minutes = value("dur").and_then(|raw| raw.trim().parse().ok());

        let (travel_mode, fell_back) = TravelMode::from_param(value("tr").unwrap_or_default());
        if fell_back && value("tr").is_some_and(|raw| !raw.is_empty()) {
            debug!(raw = value("tr"), "Unknown travel mode, using default");
        }
        params.travel_mode = travel_mode;
        params.headcount = HeadcountBand::from_param(value("h").unwrap_or_default()).0;
        params.naf = non_empty(value("naf"));
        params.sort = SortKey::from_param(value("sort").unwrap_or_default()).0;

        // Distance ordering is meaningless without a point origin.
        if params.sort == SortKey::Distance && params.departments.is_some() {
            params.sort = SortKey::Smart;
        }

        params.audience = if authorized_for_restricted {
            Audience::from_param(value("p").unwrap_or_default()).0
        } else {
            Audience::All
        };

        params.from_number = value("from")
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(1);
        // A missing `to` parses as 0; fix_window turns the inverted window
        // into the default page size.
        params.to_number = value("to")
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0);
        params.fix_window(settings);

        params
    }

    /// Enforce the window invariants: `from >= 1`, non-positive windows reset
    /// to the default page size, oversized windows are clamped.
    pub fn fix_window(&mut self, settings: &Settings) {
        // Cap the start row first so the window arithmetic below stays in
        // range even for `from=u64::MAX`.
        let headroom = settings.max_page_size.max(settings.offices_per_page).max(1);
        self.from_number = self.from_number.clamp(1, u64::MAX - headroom);
        if self.to_number < self.from_number {
            self.to_number = self.from_number + settings.offices_per_page - 1;
        }
        if self.to_number - self.from_number + 1 > settings.max_page_size {
            self.to_number = self.from_number + settings.max_page_size - 1;
        }
    }
}
