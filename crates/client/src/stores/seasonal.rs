//! Seasonal fruit and vegetable lookup over the bundled dataset.

use cookbook_core::seasonal::{FoodList, Month, SeasonalError};

/// Region used when none is chosen.
pub const DEFAULT_LOCATION: &str = "HU";

#[derive(Debug, Clone)]
pub struct SeasonalStore {
    foods: FoodList,
    location: String,
}

impl SeasonalStore {
    /// Load the bundled dataset for `location` (e.g. `HU`, `UK`).
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled dataset is malformed.
    pub fn new(location: impl Into<String>) -> Result<Self, SeasonalError> {
        Ok(Self {
            foods: FoodList::bundled()?,
            location: location.into(),
        })
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn set_location(&mut self, location: impl Into<String>) {
        self.location = location.into();
    }

    /// Foods available in `month` for the current location.
    #[must_use]
    pub fn by_month(&self, month: Month) -> FoodList {
        self.foods.by_month(month, &self.location)
    }

    /// Foods available by month name (`january`..`december`).
    ///
    /// # Errors
    ///
    /// Returns an error if the month name is unknown.
    pub fn by_month_name(&self, month: &str) -> Result<FoodList, SeasonalError> {
        Ok(self.by_month(month.parse()?))
    }

    /// Foods available this month.
    #[must_use]
    pub fn this_month(&self) -> FoodList {
        self.by_month(Month::current())
    }
}
