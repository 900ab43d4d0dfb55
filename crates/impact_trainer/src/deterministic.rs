//! Deterministic utilities for reproducible training
//!
//! Seeded random source, index shuffling, sampling and the train/validation
//! split, so that a given seed always yields the same model and report.

/// xoshiro256** generator seeded through splitmix64
#[derive(Clone, Debug)]
pub struct DeterministicRng {
    state: [u64; 4],
}

impl DeterministicRng {
    pub fn new(seed: i64) -> Self {
        let mut x = seed as u64;
        let mut state = [0u64; 4];
        for slot in &mut state {
            x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
            let mut z = x;
            z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
            *slot = z ^ (z >> 31);
        }
        Self { state }
    }

    pub fn next_u64(&mut self) -> u64 {
        let result = self.state[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    /// Uniform value in [0.0, 1.0)
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform value in [low, high)
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// Uniform index in [0, max); 0 when `max` is 0
    pub fn next_range(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        (self.next_u64() % max as u64) as usize
    }

    /// Fisher-Yates shuffle in place
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_range(i + 1);
            items.swap(i, j);
        }
    }

    /// A random ordering of `0..n`
    pub fn permutation(&mut self, n: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..n).collect();
        self.shuffle(&mut indices);
        indices
    }
}

/// Row indices of the training and held-out partitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` and hold out `ceil(n * test_fraction)` rows.
///
/// The training partition is never left empty: when the held-out share would
/// consume every row, nothing is held out.
pub fn train_test_split(n: usize, test_fraction: f64, seed: i64) -> Split {
    let mut rng = DeterministicRng::new(seed);
    let order = rng.permutation(n);

    let mut n_test = (n as f64 * test_fraction).ceil() as usize;
    if n_test >= n {
        n_test = 0;
    }

    let (test, train) = order.split_at(n_test);
    Split {
        train: train.to_vec(),
        test: test.to_vec(),
    }
}

/// Pick `k` distinct row indices out of `0..n`, or all of them when `n <= k`
pub fn sample_indices(n: usize, k: usize, seed: i64) -> Vec<usize> {
    if n <= k {
        return (0..n).collect();
    }
    let mut rng = DeterministicRng::new(seed);
    let mut order = rng.permutation(n);
    order.truncate(k);
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rng_determinism() {
        let mut rng1 = DeterministicRng::new(42);
        let mut rng2 = DeterministicRng::new(42);

        for _ in 0..100 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut rng1 = DeterministicRng::new(42);
        let mut rng2 = DeterministicRng::new(43);
        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_unit_range() {
        let mut rng = DeterministicRng::new(7);
        for _ in 0..1000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v));
            let idx = rng.next_range(10);
            assert!(idx < 10);
        }
    }

    #[test]
    fn test_permutation_covers_every_index() {
        let mut rng = DeterministicRng::new(42);
        let mut perm = rng.permutation(50);
        perm.sort_unstable();
        assert_eq!(perm, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_sizes() {
        let split = train_test_split(10, 0.2, 42);
        assert_eq!(split.test.len(), 2);
        assert_eq!(split.train.len(), 8);

        let split = train_test_split(11, 0.2, 42);
        assert_eq!(split.test.len(), 3);

        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..11).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_never_empties_training() {
        let split = train_test_split(1, 0.2, 42);
        assert_eq!(split.train, vec![0]);
        assert!(split.test.is_empty());
    }

    #[test]
    fn test_split_determinism() {
        assert_eq!(train_test_split(30, 0.2, 42), train_test_split(30, 0.2, 42));
    }

    #[test]
    fn test_sample_indices() {
        assert_eq!(sample_indices(3, 10, 42), vec![0, 1, 2]);

        let sample = sample_indices(100, 10, 42);
        assert_eq!(sample.len(), 10);
        let mut unique = sample.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 10);
        assert_eq!(sample, sample_indices(100, 10, 42));
    }

    proptest! {
        #[test]
        fn split_partitions_all_rows(
            n in 1usize..200,
            fraction in 0.0f64..0.95,
            seed in any::<i64>()
        ) {
            let split = train_test_split(n, fraction, seed);
            prop_assert!(!split.train.is_empty());

            let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
            all.sort_unstable();
            prop_assert_eq!(all, (0..n).collect::<Vec<_>>());
        }

        #[test]
        fn sample_is_distinct_and_in_range(
            n in 0usize..200,
            k in 0usize..50,
            seed in any::<i64>()
        ) {
            let sample = sample_indices(n, k, seed);
            prop_assert_eq!(sample.len(), n.min(k));
            prop_assert!(sample.iter().all(|&i| i < n));

            let mut unique = sample.clone();
            unique.sort_unstable();
            unique.dedup();
            prop_assert_eq!(unique.len(), sample.len());
        }
    }
}
