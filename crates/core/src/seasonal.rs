//! Seasonal fruit and vegetable reference data.
//!
//! Each food carries per-region month arrays: `inSeason_<REGION>` (12 slots,
//! non-zero when harvested that month) and optionally `stored_<REGION>`
//! (non-zero when still available from storage). Unknown regions fall back
//! to `HU`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

const SEASONAL_FOODS_JSON: &str = include_str!("../data/seasonal_foods.json");

const FALLBACK_LOCATION: &str = "HU";

/// Errors raised by seasonal lookups.
#[derive(thiserror::Error, Debug)]
pub enum SeasonalError {
    #[error("unknown month: {0}")]
    UnknownMonth(String),
    #[error("invalid seasonal data: {0}")]
    InvalidData(#[from] serde_json::Error),
}

/// Calendar month, named the way the client shows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Self; 12] = [
        Self::January,
        Self::February,
        Self::March,
        Self::April,
        Self::May,
        Self::June,
        Self::July,
        Self::August,
        Self::September,
        Self::October,
        Self::November,
        Self::December,
    ];

    /// Zero-based index into the month arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::January => "january",
            Self::February => "february",
            Self::March => "march",
            Self::April => "april",
            Self::May => "may",
            Self::June => "june",
            Self::July => "july",
            Self::August => "august",
            Self::September => "september",
            Self::October => "october",
            Self::November => "november",
            Self::December => "december",
        }
    }

    /// The current month in UTC.
    #[must_use]
    pub fn current() -> Self {
        let month0 = chrono::Utc::now().month0() as usize;
        Self::ALL.get(month0).copied().unwrap_or(Self::January)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Month {
    type Err = SeasonalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.name() == lowered)
            .ok_or_else(|| SeasonalError::UnknownMonth(s.to_owned()))
    }
}

/// A single fruit or vegetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Food {
    pub id: String,
    #[serde(flatten)]
    pub months: HashMap<String, Vec<u8>>,
}

impl Food {
    /// Read `<prefix>_<LOCATION>`, falling back to `<prefix>_HU`.
    #[must_use]
    pub fn data_by_location(&self, prefix: &str, location: &str) -> &[u8] {
        let key = format!("{prefix}_{}", location.to_uppercase());
        let fallback = format!("{prefix}_{FALLBACK_LOCATION}");
        self.months
            .get(&key)
            .or_else(|| self.months.get(&fallback))
            .map_or(&[], Vec::as_slice)
    }

    /// In season or available from storage in `month`.
    #[must_use]
    pub fn available_in(&self, month: Month, location: &str) -> bool {
        let slot = |data: &[u8]| data.get(month.index()).is_some_and(|v| *v != 0);
        slot(self.data_by_location("inSeason", location))
            || slot(self.data_by_location("stored", location))
    }
}

/// The full dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodList {
    pub fruits: Vec<Food>,
    pub vegetables: Vec<Food>,
}

impl FoodList {
    /// Parse the bundled dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded JSON is malformed.
    pub fn bundled() -> Result<Self, SeasonalError> {
        Ok(serde_json::from_str(SEASONAL_FOODS_JSON)?)
    }

    /// Foods available in `month` for `location`, each list sorted by id.
    #[must_use]
    pub fn by_month(&self, month: Month, location: &str) -> Self {
        let pick = |foods: &[Food]| {
            let mut picked: Vec<Food> = foods
                .iter()
                .filter(|f| f.available_in(month, location))
                .cloned()
                .collect();
            picked.sort_by(|a, b| a.id.cmp(&b.id));
            picked
        };
        Self {
            fruits: pick(&self.fruits),
            vegetables: pick(&self.vegetables),
        }
    }
}

/// Convenience over the bundled dataset.
///
/// # Errors
///
/// Returns an error if the month name is unknown or the dataset is malformed.
pub fn foods_by_month(month: &str, location: &str) -> Result<FoodList, SeasonalError> {
    let month: Month = month.parse()?;
    Ok(FoodList::bundled()?.by_month(month, location))
}
