// ============================================================
// Layer 4 - Train / Validation / Test Splitter
// ============================================================
// Shuffles all pairs ONCE and cuts them into three partitions:
//
//   [ ─────────── train ─────────── | ── val ── | ── test ── ]
//
//   n_val   = floor(n * val_fraction)
//   n_test  = floor(n * test_fraction)
//   n_train = n - n_val - n_test
//
// Corpora such as the Tatoeba exports are sorted by sentence length,
// so without the shuffle the validation and test sets would only
// contain the longest sentences.
//
// The RNG is seeded so a run can be reproduced: the same corpus and
// seed always give the same partitions, and therefore the same
// vocabulary.
//
// Reference: rand crate documentation (SliceRandom, SeedableRng)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// The three partitions produced by [`split_three_way`].
#[derive(Debug, Clone, PartialEq)]
pub struct Splits<T> {
    pub train: Vec<T>,
    pub val:   Vec<T>,
    pub test:  Vec<T>,
}

/// Shuffle `samples` with `seed` and split off validation and test sets.
pub fn split_three_way<T>(
    mut samples:   Vec<T>,
    val_fraction:  f64,
    test_fraction: f64,
    seed:          u64,
) -> Splits<T> {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total  = samples.len();
    let n_val  = ((total as f64) * val_fraction).floor() as usize;
    let n_test = ((total as f64) * test_fraction).floor() as usize;

    // Clamp so tiny corpora (or fractions summing past 1.0) never panic
    let n_val   = n_val.min(total);
    let n_test  = n_test.min(total - n_val);
    let n_train = total - n_val - n_test;

    let mut val = samples.split_off(n_train);
    let test    = val.split_off(n_val);

    tracing::debug!(
        "Dataset split: {} train, {} validation, {} test",
        samples.len(),
        val.len(),
        test.len(),
    );

    Splits { train: samples, val, test }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let s = split_three_way(items, 0.15, 0.15, 7);
        assert_eq!(s.train.len(), 70);
        assert_eq!(s.val.len(), 15);
        assert_eq!(s.test.len(), 15);
    }

    #[test]
    fn test_all_items_preserved() {
        let items: Vec<usize> = (0..57).collect();
        let s = split_three_way(items, 0.2, 0.1, 1);

        let mut all: Vec<usize> = s.train.into_iter().chain(s.val).chain(s.test).collect();
        all.sort_unstable();
        assert_eq!(all, (0..57).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = split_three_way((0..40).collect::<Vec<u32>>(), 0.25, 0.25, 42);
        let b = split_three_way((0..40).collect::<Vec<u32>>(), 0.25, 0.25, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_dataset() {
        let s = split_three_way(Vec::<usize>::new(), 0.15, 0.15, 0);
        assert!(s.train.is_empty());
        assert!(s.val.is_empty());
        assert!(s.test.is_empty());
    }

    #[test]
    fn test_oversized_fractions_are_clamped() {
        let s = split_three_way((0..10).collect::<Vec<u8>>(), 0.8, 0.8, 3);
        assert_eq!(s.val.len(), 8);
        assert_eq!(s.test.len(), 2);
        assert!(s.train.is_empty());
    }
}
