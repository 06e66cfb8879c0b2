//! Weighted random selection of a country.
//!
//! Countries are drawn in proportion to their expected annual births, so large
//! and young populations are favoured over small or ageing ones.

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use serde::Serialize;
use thiserror::Error;

use crate::CountryCode;

/// Births per 1,000 people assumed when a country has no birth rate.
pub const DEFAULT_BIRTH_RATE: f64 = 15.0;

/// The fields of a stored country that drive weighted selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionCandidate {
    /// Country code.
    pub code: CountryCode,
    /// Resident population.
    pub population: u64,
    /// Crude births per 1,000 people.
    pub birth_rate: Option<f64>,
}

impl SelectionCandidate {
    /// Selection weight, or `None` when the country is not eligible.
    ///
    /// The weight is `(birth_rate / 1000) * population / 10000`. Countries with
    /// no population, or a non-positive birth rate, have no weight.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "weights are derived from rates and populations"
    )]
    #[expect(
        clippy::cast_precision_loss,
        reason = "world populations are far below f64's exact integer range"
    )]
    pub fn weight(&self) -> Option<f64> {
        if self.population == 0 {
            return None;
        }
        let birth_rate = self.birth_rate.unwrap_or(DEFAULT_BIRTH_RATE);
        if !(birth_rate.is_finite() && birth_rate > 0.0) {
            return None;
        }
        let weight = (birth_rate / 1000.0) * self.population as f64 / 10_000.0;
        (weight.is_finite() && weight > 0.0).then_some(weight)
    }
}

/// Errors returned by [`select_weighted`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectionError {
    /// No candidate carried a positive weight.
    #[error("no eligible countries to choose from")]
    NoEligibleCountries,
}

/// Draw one country, weighting every eligible candidate.
///
/// # Errors
///
/// Returns [`SelectionError::NoEligibleCountries`] when no candidate has a
/// positive weight.
///
/// # Examples
///
/// ```
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
/// use worldsync_core::{CountryCode, SelectionCandidate, select_weighted};
///
/// let candidates = vec![SelectionCandidate {
///     code: CountryCode::parse("NE").expect("valid code"),
///     population: 25_000_000,
///     birth_rate: Some(45.0),
/// }];
/// let mut rng = StdRng::seed_from_u64(7);
/// let chosen = select_weighted(&candidates, &mut rng).expect("one eligible country");
/// assert_eq!(chosen.as_str(), "NE");
/// ```
pub fn select_weighted<'a, R>(
    candidates: &'a [SelectionCandidate],
    rng: &mut R,
) -> Result<&'a CountryCode, SelectionError>
where
    R: Rng + ?Sized,
{
    let (eligible, weights): (Vec<&SelectionCandidate>, Vec<f64>) = candidates
        .iter()
        .filter_map(|candidate| candidate.weight().map(|weight| (candidate, weight)))
        .unzip();
    let distribution =
        WeightedIndex::new(&weights).map_err(|_| SelectionError::NoEligibleCountries)?;
    eligible
        .get(distribution.sample(rng))
        .map(|candidate| &candidate.code)
        .ok_or(SelectionError::NoEligibleCountries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rstest::rstest;

    fn candidate(code: &str, population: u64, birth_rate: Option<f64>) -> SelectionCandidate {
        SelectionCandidate {
            code: CountryCode::parse(code).expect("valid code"),
            population,
            birth_rate,
        }
    }

    #[rstest]
    #[case(candidate("AA", 1000, Some(30.0)), Some(0.003))]
    #[case(candidate("AA", 1000, None), Some(0.0015))]
    #[case(candidate("AA", 0, Some(30.0)), None)]
    #[case(candidate("AA", 1000, Some(0.0)), None)]
    #[case(candidate("AA", 1000, Some(-2.0)), None)]
    #[case(candidate("AA", 1000, Some(f64::NAN)), None)]
    fn weights_follow_expected_births(
        #[case] candidate: SelectionCandidate,
        #[case] expected: Option<f64>,
    ) {
        match (candidate.weight(), expected) {
            (Some(actual), Some(wanted)) => assert!((actual - wanted).abs() < 1e-12),
            (actual, wanted) => assert_eq!(actual, wanted),
        }
    }

    #[rstest]
    fn zero_weight_countries_are_never_drawn() {
        let candidates = vec![
            candidate("AA", 1000, Some(30.0)),
            candidate("BB", 1000, Some(0.0)),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..500 {
            let chosen = select_weighted(&candidates, &mut rng).expect("eligible pool");
            assert_eq!(chosen.as_str(), "AA");
        }
    }

    #[rstest]
    fn heavier_countries_are_drawn_more_often() {
        let candidates = vec![
            candidate("AA", 9_000_000, Some(20.0)),
            candidate("BB", 1_000_000, Some(20.0)),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let heavy = (0..2000)
            .filter(|_| {
                select_weighted(&candidates, &mut rng)
                    .expect("eligible pool")
                    .as_str()
                    == "AA"
            })
            .count();
        assert!(heavy > 1600, "expected roughly 90% heavy draws, got {heavy}");
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec![candidate("AA", 0, Some(10.0)), candidate("BB", 10, Some(0.0))])]
    fn empty_pools_are_reported(#[case] candidates: Vec<SelectionCandidate>) {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(
            select_weighted(&candidates, &mut rng),
            Err(SelectionError::NoEligibleCountries)
        );
    }
}
