//! Behavioural tests for weighted random country selection.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use worldsync_core::{CountryCode, SelectionCandidate, SelectionError, select_weighted};

#[derive(Debug, Default)]
struct SelectionWorld {
    candidates: RefCell<Vec<SelectionCandidate>>,
    draws: RefCell<Vec<Result<String, SelectionError>>>,
}

impl SelectionWorld {
    fn add(&self, code: &str, population: u64, birth_rate: Option<f64>) {
        self.candidates.borrow_mut().push(SelectionCandidate {
            code: CountryCode::parse(code).expect("valid code"),
            population,
            birth_rate,
        });
    }
}

#[fixture]
fn world() -> SelectionWorld {
    SelectionWorld::default()
}

#[given("country {code} with population {population} and birth rate {rate}")]
fn country_with_birth_rate(
    #[from(world)] world: &SelectionWorld,
    code: String,
    population: u64,
    rate: f64,
) {
    world.add(code.trim_matches('"'), population, Some(rate));
}

#[given("country {code} with population {population} and no birth rate")]
fn country_without_birth_rate(
    #[from(world)] world: &SelectionWorld,
    code: String,
    population: u64,
) {
    world.add(code.trim_matches('"'), population, None);
}

#[when("I draw {count} countries")]
fn draw_countries(#[from(world)] world: &SelectionWorld, count: usize) {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let candidates = world.candidates.borrow();
    let draws = (0..count)
        .map(|_| select_weighted(&candidates, &mut rng).map(|code| code.as_str().to_owned()))
        .collect();
    world.draws.replace(draws);
}

#[then("every draw selects {code}")]
fn every_draw_selects(#[from(world)] world: &SelectionWorld, code: String) {
    let expected = code.trim_matches('"');
    let draws = world.draws.borrow();
    assert!(!draws.is_empty(), "no draws recorded");
    for draw in draws.iter() {
        assert_eq!(draw.as_deref().expect("eligible pool"), expected);
    }
}

#[then("the draw reports no eligible countries")]
fn draw_reports_empty_pool(#[from(world)] world: &SelectionWorld) {
    let draws = world.draws.borrow();
    assert_eq!(
        draws.first(),
        Some(&Err(SelectionError::NoEligibleCountries))
    );
}

#[scenario(path = "tests/features/weighted_selection.feature", index = 0)]
fn zero_birth_rate_is_never_drawn(world: SelectionWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/weighted_selection.feature", index = 1)]
fn missing_birth_rate_uses_default(world: SelectionWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/weighted_selection.feature", index = 2)]
fn empty_pool_is_reported(world: SelectionWorld) {
    let _ = world;
}
