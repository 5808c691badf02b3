//! Rotation policies: which content unit is active at a given step.
//!
//! The RNG is always supplied by the caller so that production code can use
//! `rand::rng()` while tests use a seeded `StdRng`.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Weights are considered to "add up to 100" within this tolerance.
pub const WEIGHT_TOTAL_TOLERANCE: f64 = 0.01;

/// The expected total of a campaign's weights, in percent.
pub const WEIGHT_TARGET_TOTAL: f64 = 100.0;

/// How the active unit is chosen on each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationPolicy {
    /// `items[step mod N]`.
    #[default]
    Sequential,
    /// Uniform draw on every step; repeats are allowed.
    Random,
    /// Draw proportional to the normalized weights.
    Weighted,
}

/// Advisory result of checking a weight vector against 100%.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "total", rename_all = "snake_case")]
pub enum WeightWarning {
    Over(f64),
    Under(f64),
}

/// Negative and non-finite weights count as zero.
fn sanitize(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}

/// Normalize weights into probabilities summing to 1.
///
/// Returns `None` when no weight is positive.
pub fn normalized_weights(weights: &[f64]) -> Option<Vec<f64>> {
    let total: f64 = weights.iter().copied().map(sanitize).sum();
    if total <= 0.0 {
        return None;
    }
    Some(weights.iter().map(|w| sanitize(*w) / total).collect())
}

/// Compare the raw weight total with 100%. Never blocks rotation.
pub fn weight_total_warning(weights: &[f64]) -> Option<WeightWarning> {
    let total: f64 = weights.iter().copied().map(sanitize).sum();
    if total > WEIGHT_TARGET_TOTAL + WEIGHT_TOTAL_TOLERANCE {
        Some(WeightWarning::Over(total))
    } else if total < WEIGHT_TARGET_TOTAL - WEIGHT_TOTAL_TOLERANCE {
        Some(WeightWarning::Under(total))
    } else {
        None
    }
}

/// Pick the active index among `len` items at `step`.
///
/// `weights` is only consulted by [`RotationPolicy::Weighted`]; entries
/// missing from the end of the slice count as zero. When every weight is zero
/// the weighted policy falls back to sequential.
pub fn select_index<R: Rng>(
    policy: RotationPolicy,
    len: usize,
    weights: &[f64],
    step: u64,
    rng: &mut R,
) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let sequential = (step % len as u64) as usize;

    match policy {
        RotationPolicy::Sequential => Some(sequential),
        RotationPolicy::Random => Some(rng.random_range(0..len)),
        RotationPolicy::Weighted => {
            let padded: Vec<f64> = (0..len)
                .map(|i| weights.get(i).copied().unwrap_or(0.0))
                .collect();
            match normalized_weights(&padded) {
                Some(probabilities) => Some(weighted_draw(&probabilities, rng)),
                None => {
                    tracing::debug!(
                        len,
                        step,
                        "All rotation weights are zero, using sequential order"
                    );
                    Some(sequential)
                }
            }
        }
    }
}

/// Cumulative-distribution sampling over probabilities that sum to 1.
fn weighted_draw<R: Rng>(probabilities: &[f64], rng: &mut R) -> usize {
    let r: f64 = rng.random();
    let mut cumulative = 0.0;
    for (i, p) in probabilities.iter().enumerate() {
        cumulative += p;
        if r < cumulative {
            return i;
        }
    }
    // Rounding can leave the cumulative sum a hair under 1.0.
    probabilities
        .iter()
        .rposition(|p| *p > 0.0)
        .unwrap_or(probabilities.len() - 1)
}

/// [`select_index`] returning the item itself.
pub fn select<'a, T, R: Rng>(
    items: &'a [T],
    policy: RotationPolicy,
    weights: &[f64],
    step: u64,
    rng: &mut R,
) -> Option<&'a T> {
    select_index(policy, items.len(), weights, step, rng).map(|i| &items[i])
}

// ---------------------------------------------------------------------------
// Rotator
// ---------------------------------------------------------------------------

/// A list of content units with a policy and a step counter.
///
/// The step advances once per playback cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Rotator<T> {
    items: Vec<T>,
    policy: RotationPolicy,
    weights: Vec<f64>,
    step: u64,
}

impl<T> Rotator<T> {
    pub fn new(items: Vec<T>, policy: RotationPolicy) -> Self {
        Self {
            items,
            policy,
            weights: Vec::new(),
            step: 0,
        }
    }

    /// Weights aligned with the item list.
    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = weights;
        self
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Active item for the current step, then advance the step.
    pub fn next_item<R: Rng>(&mut self, rng: &mut R) -> Option<&T> {
        let index = select_index(self.policy, self.items.len(), &self.weights, self.step, rng)?;
        self.step += 1;
        self.items.get(index)
    }

    /// Start over from step 0.
    pub fn reset(&mut self) {
        self.step = 0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn sequential_cycles_with_period_n() {
        let items = ["A", "B", "C"];
        let mut r = rng();
        let picks: Vec<_> = (0..7)
            .map(|k| {
                *select(&items, RotationPolicy::Sequential, &[], k, &mut r).expect("non-empty")
            })
            .collect();
        assert_eq!(picks, vec!["A", "B", "C", "A", "B", "C", "A"]);
    }

    #[test]
    fn empty_list_selects_nothing() {
        let items: [&str; 0] = [];
        let mut r = rng();
        for policy in [
            RotationPolicy::Sequential,
            RotationPolicy::Random,
            RotationPolicy::Weighted,
        ] {
            assert!(select(&items, policy, &[], 0, &mut r).is_none());
        }
    }

    #[test]
    fn random_stays_in_range_and_covers_all() {
        let mut r = rng();
        let mut seen = [false; 4];
        for k in 0..500 {
            let i = select_index(RotationPolicy::Random, 4, &[], k, &mut r).expect("non-empty");
            seen[i] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn weighted_frequencies_follow_weights() {
        let items = ["A", "B", "C"];
        let weights = [25.0, 25.0, 50.0];
        let mut r = rng();
        let mut counts = [0usize; 3];
        const SAMPLES: u64 = 10_000;
        for k in 0..SAMPLES {
            let i = select_index(RotationPolicy::Weighted, items.len(), &weights, k, &mut r)
                .expect("non-empty");
            counts[i] += 1;
        }
        let freq: Vec<f64> = counts.iter().map(|c| *c as f64 / SAMPLES as f64).collect();
        assert!((freq[0] - 0.25).abs() < 0.03, "A frequency {}", freq[0]);
        assert!((freq[1] - 0.25).abs() < 0.03, "B frequency {}", freq[1]);
        assert!((freq[2] - 0.50).abs() < 0.03, "C frequency {}", freq[2]);
    }

    #[test]
    fn weighted_normalizes_totals_other_than_100() {
        let weights = [1.0, 3.0];
        let mut r = rng();
        let mut second = 0;
        for k in 0..4_000 {
            if select_index(RotationPolicy::Weighted, 2, &weights, k, &mut r) == Some(1) {
                second += 1;
            }
        }
        let freq = second as f64 / 4_000.0;
        assert!((freq - 0.75).abs() < 0.04, "frequency {freq}");
    }

    #[test]
    fn zero_weights_fall_back_to_sequential() {
        let items = ["A", "B"];
        let mut r = rng();
        let picks: Vec<_> = (0..3)
            .map(|k| select(&items, RotationPolicy::Weighted, &[0.0, 0.0], k, &mut r))
            .map(|pick| *pick.expect("non-empty"))
            .collect();
        assert_eq!(picks, vec!["A", "B", "A"]);
    }

    #[test]
    fn zero_weight_item_is_never_drawn() {
        let mut r = rng();
        for k in 0..1_000 {
            let index = select_index(RotationPolicy::Weighted, 3, &[50.0, 0.0, 50.0], k, &mut r);
            assert_ne!(index, Some(1));
        }
    }

    #[test]
    fn missing_and_invalid_weights_count_as_zero() {
        assert_eq!(normalized_weights(&[f64::NAN, -5.0, 10.0]), Some(vec![0.0, 0.0, 1.0]));
        assert_eq!(normalized_weights(&[0.0, -1.0]), None);
        let mut r = rng();
        for k in 0..200 {
            assert_eq!(select_index(RotationPolicy::Weighted, 3, &[0.0, 4.0], k, &mut r), Some(1));
        }
    }

    #[test]
    fn weight_warning_is_advisory() {
        assert_eq!(weight_total_warning(&[50.0, 50.0]), None);
        assert_eq!(weight_total_warning(&[60.0, 50.0]), Some(WeightWarning::Over(110.0)));
        assert_eq!(weight_total_warning(&[20.0, 30.0]), Some(WeightWarning::Under(50.0)));
    }

    #[test]
    fn rotator_advances_and_resets() {
        let mut rot = Rotator::new(vec!["A", "B", "C"], RotationPolicy::Sequential);
        let mut r = rng();
        let picks: Vec<_> = (0..4).map(|_| *rot.next_item(&mut r).expect("non-empty")).collect();
        assert_eq!(picks, vec!["A", "B", "C", "A"]);
        assert_eq!(rot.step(), 4);
        rot.reset();
        assert_eq!(rot.next_item(&mut r).copied(), Some("A"));
    }
}
