//! Country identity records and their completeness scoring.

use serde::{Deserialize, Serialize};

use crate::CountryCode;

/// Number of identity fields considered by [`CountryRecord::completeness`].
pub const REQUIRED_FIELD_COUNT: u32 = 5;

/// Normalised basic facts for one country as returned by the facts upstream.
///
/// Every attribute besides the code may be missing; the orchestrator turns
/// this partial record into a [`CountryRecord`] before persisting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicFacts {
    /// Alpha-2 country code.
    pub code: CountryCode,
    /// Common display name.
    pub name: Option<String>,
    /// Official long-form name.
    pub official_name: Option<String>,
    /// Resident population.
    pub population: Option<u64>,
    /// Capital city name.
    pub capital: Option<String>,
    /// Longitude in decimal degrees.
    pub longitude: Option<f64>,
    /// Latitude in decimal degrees.
    pub latitude: Option<f64>,
    /// Spoken languages.
    pub languages: Vec<String>,
    /// Time zones, e.g. `UTC+01:00`.
    pub timezones: Vec<String>,
    /// Most recent Gini coefficient.
    pub gini: Option<f64>,
}

impl BasicFacts {
    /// Create an empty fact sheet for `code`.
    #[must_use]
    pub const fn new(code: CountryCode) -> Self {
        Self {
            code,
            name: None,
            official_name: None,
            population: None,
            capital: None,
            longitude: None,
            latitude: None,
            languages: Vec::new(),
            timezones: Vec::new(),
            gini: None,
        }
    }
}

/// Persisted identity record for one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRecord {
    /// Immutable alpha-2 key.
    pub code: CountryCode,
    /// Common display name.
    pub name: Option<String>,
    /// Resident population.
    pub population: Option<u64>,
    /// Capital city name.
    pub capital: Option<String>,
    /// Longitude in decimal degrees.
    pub longitude: Option<f64>,
    /// Latitude in decimal degrees.
    pub latitude: Option<f64>,
    /// Spoken languages.
    pub languages: Vec<String>,
    /// Time zones.
    pub timezones: Vec<String>,
    /// Most recent Gini coefficient.
    pub gini: Option<f64>,
    /// Share of required identity fields present, in `[0, 1]`.
    pub completeness: f64,
}

impl CountryRecord {
    /// Assemble a record from a fact sheet, computing its completeness score.
    ///
    /// # Examples
    ///
    /// ```
    /// use worldsync_core::{BasicFacts, CountryCode, CountryRecord};
    ///
    /// let mut facts = BasicFacts::new(CountryCode::parse("IS").expect("valid code"));
    /// facts.name = Some("Iceland".into());
    /// facts.capital = Some("Reykjavik".into());
    /// let record = CountryRecord::from_facts(facts);
    /// assert_eq!(record.completeness, 0.4);
    /// ```
    #[must_use]
    pub fn from_facts(facts: BasicFacts) -> Self {
        let mut record = Self {
            code: facts.code,
            name: facts.name,
            population: facts.population,
            capital: facts.capital,
            longitude: facts.longitude,
            latitude: facts.latitude,
            languages: facts.languages,
            timezones: facts.timezones,
            gini: facts.gini,
            completeness: 0.0,
        };
        record.completeness = record.completeness_score();
        record
    }

    /// Count the required identity fields that carry a value.
    ///
    /// Blank strings count as missing.
    #[must_use]
    pub fn present_required_fields(&self) -> u32 {
        let present = [
            has_text(self.name.as_deref()),
            self.population.is_some(),
            has_text(self.capital.as_deref()),
            self.longitude.is_some(),
            self.latitude.is_some(),
        ];
        present.into_iter().map(u32::from).sum()
    }

    /// Fraction of required identity fields that are present.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "completeness is a ratio of present fields"
    )]
    pub fn completeness_score(&self) -> f64 {
        f64::from(self.present_required_fields()) / f64::from(REQUIRED_FIELD_COUNT)
    }
}

fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|text| !text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn complete_facts() -> BasicFacts {
        let mut facts = BasicFacts::new(CountryCode::parse("NZ").expect("valid code"));
        facts.name = Some("New Zealand".into());
        facts.population = Some(5_100_000);
        facts.capital = Some("Wellington".into());
        facts.longitude = Some(174.0);
        facts.latitude = Some(-41.0);
        facts
    }

    #[rstest]
    fn complete_record_scores_one(complete_facts: BasicFacts) {
        let record = CountryRecord::from_facts(complete_facts);
        assert_eq!(record.present_required_fields(), 5);
        assert_eq!(record.completeness, 1.0);
    }

    #[rstest]
    #[case::no_name(|f: &mut BasicFacts| f.name = None, 4)]
    #[case::blank_capital(|f: &mut BasicFacts| f.capital = Some("  ".into()), 4)]
    #[case::no_coordinates(|f: &mut BasicFacts| { f.longitude = None; f.latitude = None; }, 3)]
    #[case::only_code(|f: &mut BasicFacts| *f = BasicFacts::new(f.code.clone()), 0)]
    fn missing_fields_lower_the_score(
        complete_facts: BasicFacts,
        #[case] strip: fn(&mut BasicFacts),
        #[case] expected: u32,
    ) {
        let mut facts = complete_facts;
        strip(&mut facts);
        let record = CountryRecord::from_facts(facts);
        assert_eq!(record.present_required_fields(), expected);
        assert_eq!(
            record.completeness,
            f64::from(expected) / f64::from(REQUIRED_FIELD_COUNT)
        );
    }

    #[rstest]
    fn zero_population_still_counts_as_present(complete_facts: BasicFacts) {
        let mut facts = complete_facts;
        facts.population = Some(0);
        let record = CountryRecord::from_facts(facts);
        assert_eq!(record.present_required_fields(), 5);
    }
}
