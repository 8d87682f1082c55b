//! Filter vocabulary shared by the request surface and the office index:
//! travel modes, audience segments, headcount bands, sort keys and facets.
//!
//! Every enum parses leniently: an unknown or malformed parameter value falls
//! back to the documented default instead of rejecting the request. Parsers
//! return the value together with a flag saying whether the fallback was
//! taken, so callers never rely on errors for routine defaulting.

use serde::{Deserialize, Serialize};

/// How the job seeker travels to work.
///
/// `Car` is the default and pairs with a plain distance radius; the other
/// point-based modes pair with a travel-time isochrone when a duration is
/// requested. `DepartmentWide` means the search covers whole departments and
/// carries no point geography at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    Foot,
    Bike,
    #[default]
    Car,
    PublicTransit,
    DepartmentWide,
}

impl TravelMode {
    /// Parse a query-string value, falling back to [`TravelMode::Car`].
    #[must_use]
    pub fn from_param(raw: &str) -> (Self, bool) {
        match raw {
            "foot" => (Self::Foot, false),
            "bike" => (Self::Bike, false),
            "car" => (Self::Car, false),
            "public" | "public_transit" | "public-transit" => (Self::PublicTransit, false),
            "department" | "department_wide" | "department-wide" => (Self::DepartmentWide, false),
            _ => (Self::Car, true),
        }
    }

    #[must_use]
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Foot => "foot",
            Self::Bike => "bike",
            Self::Car => "car",
            Self::PublicTransit => "public",
            Self::DepartmentWide => "department",
        }
    }
}

/// Audience segmentation: which subset of offices the caller may see.
///
/// `All` is the public, unrestricted segment. The restricted segments are
/// only honored for authorized callers; everyone else is forced back to
/// `All` during parameter normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    #[default]
    All,
    Junior,
    Senior,
}

impl Audience {
    /// Parse the numeric query-string value, falling back to [`Audience::All`].
    #[must_use]
    pub fn from_param(raw: &str) -> (Self, bool) {
        match raw.parse::<u8>() {
            Ok(0) => (Self::All, false),
            Ok(1) => (Self::Junior, false),
            Ok(2) => (Self::Senior, false),
            _ => (Self::All, true),
        }
    }

    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::All => 0,
            Self::Junior => 1,
            Self::Senior => 2,
        }
    }
}

/// Company headcount bands, matching the INSEE headcount code ranges.
///
/// Codes up to `"12"` are at most 49 employees; codes from `"21"` upwards are
/// 50 or more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadcountBand {
    #[default]
    All,
    Small,
    Big,
}

const HEADCOUNT_SMALL_MAX_CODE: u32 = 12;
const HEADCOUNT_BIG_MIN_CODE: u32 = 21;

impl HeadcountBand {
    /// Parse the numeric query-string value (1 = all, 2 = small, 3 = big),
    /// falling back to [`HeadcountBand::All`].
    #[must_use]
    pub fn from_param(raw: &str) -> (Self, bool) {
        match raw.parse::<u8>() {
            Ok(1) => (Self::All, false),
            Ok(2) => (Self::Small, false),
            Ok(3) => (Self::Big, false),
            _ => (Self::All, true),
        }
    }

    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::All => 1,
            Self::Small => 2,
            Self::Big => 3,
        }
    }

    /// Whether an office's INSEE headcount code falls inside this band.
    ///
    /// An unparseable code only matches the unrestricted band.
    #[must_use]
    pub fn matches_code(self, insee_code: &str) -> bool {
        match self {
            Self::All => true,
            Self::Small => insee_code
                .parse::<u32>()
                .is_ok_and(|code| code <= HEADCOUNT_SMALL_MAX_CODE),
            Self::Big => insee_code
                .parse::<u32>()
                .is_ok_and(|code| code >= HEADCOUNT_BIG_MIN_CODE),
        }
    }
}

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Hiring-potential score, descending. The default.
    #[default]
    Smart,
    /// Distance from the search origin, ascending. Unavailable for
    /// department-scoped searches.
    Distance,
}

impl SortKey {
    /// Parse a query-string value, falling back to [`SortKey::Smart`].
    #[must_use]
    pub fn from_param(raw: &str) -> (Self, bool) {
        match raw {
            "score" | "smart" => (Self::Smart, false),
            "distance" => (Self::Distance, false),
            _ => (Self::Smart, true),
        }
    }

    #[must_use]
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Smart => "score",
            Self::Distance => "distance",
        }
    }
}

/// A categorical field the index can aggregate result counts over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Naf,
    Headcount,
}

impl Facet {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Naf => "naf",
            Self::Headcount => "headcount",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn travel_mode_parses_with_fallback() {
        assert_eq!(TravelMode::from_param("car"), (TravelMode::Car, false));
        assert_eq!(TravelMode::from_param("public"), (TravelMode::PublicTransit, false));
        assert_eq!(TravelMode::from_param("hoverboard"), (TravelMode::Car, true));
        assert_eq!(TravelMode::from_param(""), (TravelMode::Car, true));
    }

    #[test]
    fn audience_parses_numeric_values_only() {
        assert_eq!(Audience::from_param("0"), (Audience::All, false));
        assert_eq!(Audience::from_param("1"), (Audience::Junior, false));
        assert_eq!(Audience::from_param("7"), (Audience::All, true));
        assert_eq!(Audience::from_param("junior"), (Audience::All, true));
    }

    #[test]
    fn headcount_band_matches_insee_codes() {
        assert!(HeadcountBand::All.matches_code("03"));
        assert!(HeadcountBand::Small.matches_code("12"));
        assert!(!HeadcountBand::Small.matches_code("21"));
        assert!(HeadcountBand::Big.matches_code("53"));
        assert!(!HeadcountBand::Big.matches_code("03"));
        // Unparseable codes only match the unrestricted band.
        assert!(HeadcountBand::All.matches_code("NN"));
        assert!(!HeadcountBand::Small.matches_code("NN"));
    }

    #[test]
    fn sort_key_round_trips() {
        assert_eq!(SortKey::from_param("score"), (SortKey::Smart, false));
        assert_eq!(SortKey::from_param("distance"), (SortKey::Distance, false));
        assert_eq!(SortKey::from_param("relevance"), (SortKey::Smart, true));
        assert_eq!(SortKey::Smart.as_param(), "score");
    }
}
