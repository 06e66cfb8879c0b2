//! Statistical indicator records attached one-to-one to a country.

use serde::{Deserialize, Serialize};

/// Population structure indicators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemographicRecord {
    /// Urban population as a percentage of the total.
    pub urban_ratio: Option<f64>,
    /// Life expectancy at birth in years.
    pub life_expectancy: Option<f64>,
    /// Crude births per 1,000 people.
    pub birth_rate: Option<f64>,
    /// Median age indicator.
    pub median_age: Option<f64>,
    /// Sex ratio at birth (males per female).
    pub gender_ratio: Option<f64>,
}

impl DemographicRecord {
    /// Whether every indicator is missing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.urban_ratio.is_none()
            && self.life_expectancy.is_none()
            && self.birth_rate.is_none()
            && self.median_age.is_none()
            && self.gender_ratio.is_none()
    }
}

/// Economic indicators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EconomyRecord {
    /// GDP per capita in current US dollars.
    pub gdp_per_capita: Option<f64>,
    /// Annual GDP growth in percent.
    pub gdp_growth: Option<f64>,
    /// Internet users as a percentage of the population.
    pub internet_penetration: Option<f64>,
}

impl EconomyRecord {
    /// Whether every indicator is missing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.gdp_per_capita.is_none()
            && self.gdp_growth.is_none()
            && self.internet_penetration.is_none()
    }
}

/// Education indicators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationRecord {
    /// Adult literacy rate in percent.
    pub literacy_rate: Option<f64>,
}

impl EducationRecord {
    /// Whether every indicator is missing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.literacy_rate.is_none()
    }
}

/// Everything the statistical upstream knows about one country.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    /// Economic section.
    pub economy: EconomyRecord,
    /// Demographic section.
    pub demographics: DemographicRecord,
    /// Education section.
    pub education: EducationRecord,
}

impl IndicatorSnapshot {
    /// Whether no section holds a value.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.economy.is_empty() && self.demographics.is_empty() && self.education.is_empty()
    }
}
