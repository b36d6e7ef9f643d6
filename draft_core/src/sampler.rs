//! Cumulative-weight random selection.

use rand::Rng;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct WeightedOption<T> {
    pub weight: f64,
    pub value: T,
}

impl<T> WeightedOption<T> {
    pub const fn new(weight: f64, value: T) -> Self {
        Self { weight, value }
    }
}

/// Draw one value with probability `weight / total`.
///
/// Options are walked in order; the first whose weight covers what remains of
/// the uniform draw wins.
///
/// # Panics
/// If `options` is empty, any weight is negative or not finite, or the total
/// weight is not positive.
pub fn choose<'a, T, R: Rng + ?Sized>(options: &'a [WeightedOption<T>], rng: &mut R) -> &'a T {
    let index = pick(options.iter().map(|option| option.weight), rng);
    &options[index].value
}

/// Index form of [`choose`] for callers that score candidates in place.
pub fn choose_index<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> usize {
    pick(weights.iter().copied(), rng)
}

fn pick<R: Rng + ?Sized>(weights: impl Iterator<Item = f64> + Clone, rng: &mut R) -> usize {
    let mut total = 0.0;
    let mut count = 0usize;
    for weight in weights.clone() {
        assert!(
            weight.is_finite() && weight >= 0.0,
            "weighted choice given invalid weight {}",
            weight
        );
        total += weight;
        count += 1;
    }
    assert!(count > 0, "weighted choice needs at least one option");
    assert!(total > 0.0, "weighted choice needs a positive total weight");

    let mut target = rng.gen_range(0.0..total);
    let mut last_positive = 0;
    for (index, weight) in weights.enumerate() {
        if weight <= 0.0 {
            continue;
        }
        if target <= weight {
            return index;
        }
        target -= weight;
        last_positive = index;
    }
    // Float rounding can leave a sliver of target past the final option.
    last_positive
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn single_option_always_wins() {
        let mut rng = SmallRng::seed_from_u64(1);
        let options = [WeightedOption::new(0.5, "only")];
        for _ in 0..32 {
            assert_eq!(*choose(&options, &mut rng), "only");
        }
    }

    #[test]
    fn zero_weight_options_are_never_drawn() {
        let mut rng = SmallRng::seed_from_u64(7);
        let options = [
            WeightedOption::new(0.0, 'a'),
            WeightedOption::new(1.0, 'b'),
            WeightedOption::new(0.0, 'c'),
        ];
        for _ in 0..500 {
            assert_eq!(*choose(&options, &mut rng), 'b');
        }
    }

    #[test]
    fn heavier_option_dominates() {
        let mut rng = SmallRng::seed_from_u64(0x5eed);
        let options = [WeightedOption::new(1.0, 'a'), WeightedOption::new(3.0, 'b')];
        let mut a = 0;
        let mut b = 0;
        for _ in 0..1000 {
            match choose(&options, &mut rng) {
                'a' => a += 1,
                _ => b += 1,
            }
        }
        assert!(b > 2 * a, "expected b to dominate, got a={} b={}", a, b);
    }

    #[test]
    fn index_choice_respects_near_zero_weights() {
        let mut rng = SmallRng::seed_from_u64(3);
        let weights = [0.001, 10.0];
        let hits = (0..1000)
            .filter(|_| choose_index(&weights, &mut rng) == 0)
            .count();
        assert!(hits < 10, "near-zero option drawn {} times", hits);
    }

    #[test]
    #[should_panic(expected = "at least one option")]
    fn empty_options_panic() {
        let mut rng = SmallRng::seed_from_u64(1);
        let options: [WeightedOption<u8>; 0] = [];
        choose(&options, &mut rng);
    }

    #[test]
    #[should_panic(expected = "positive total weight")]
    fn all_zero_weights_panic() {
        let mut rng = SmallRng::seed_from_u64(1);
        choose_index(&[0.0, 0.0], &mut rng);
    }
}
