//! Randomized pacing primitives.
//!
//! Every sleep and every random choice in a batch run flows through a
//! [`PacingRng`], a shared handle over a seeded ChaCha8 generator. The base
//! seed is taken from configuration (or OS entropy) and logged, so a fixed
//! seed reproduces the launch permutation, task plans, and pause sequence of
//! an entire run.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::info;

/// An inclusive `[min, max]` range sampled uniformly.
///
/// Used both for pause durations (seconds) and for small counts such as the
/// number of quest items per account. Deserializes from a two-element YAML
/// sequence, e.g. `pause_between_attempts: [5, 10]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "(u64, u64)")]
pub struct SampleRange {
    min: u64,
    max: u64,
}

impl SampleRange {
    /// Creates a range, rejecting `min > max`.
    pub fn new(min: u64, max: u64) -> Result<Self, String> {
        if min > max {
            return Err(format!("invalid range: min {min} is greater than max {max}"));
        }
        Ok(Self { min, max })
    }

    /// A degenerate range that always samples the same value.
    pub fn fixed(value: u64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Lower bound (inclusive).
    pub fn min(&self) -> u64 {
        self.min
    }

    /// Upper bound (inclusive).
    pub fn max(&self) -> u64 {
        self.max
    }
}

impl TryFrom<(u64, u64)> for SampleRange {
    type Error = String;

    fn try_from(value: (u64, u64)) -> Result<Self, Self::Error> {
        Self::new(value.0, value.1)
    }
}

/// Cloneable handle over a seeded generator.
///
/// The inner mutex is locked only for the duration of a single sample, never
/// across an await point, so concurrent users of a shared handle cannot
/// deadlock the runtime.
#[derive(Clone)]
pub struct PacingRng {
    inner: Arc<Mutex<ChaCha8Rng>>,
}

impl PacingRng {
    /// Creates a generator from an explicit seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ChaCha8Rng> {
        // A poisoned lock only means another sampler panicked mid-draw; the
        // generator state is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Samples a value uniformly from `range`.
    pub fn sample(&self, range: SampleRange) -> u64 {
        self.lock().random_range(range.min..=range.max)
    }

    /// Picks one element of `items` uniformly, or `None` if empty.
    pub fn pick<T: Copy>(&self, items: &[T]) -> Option<T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.lock().random_range(0..items.len());
        Some(items[idx])
    }
}

impl std::fmt::Debug for PacingRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PacingRng")
    }
}

/// Sleeps for a duration sampled from `range`, logging the pause.
pub async fn random_pause(rng: &PacingRng, range: SampleRange, context: &str) {
    let secs = rng.sample(range);
    info!("{context} | Sleeping for {secs} seconds...");
    sleep(Duration::from_secs(secs)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_range_rejects_inverted_bounds() {
        assert!(SampleRange::new(10, 5).is_err());
        assert!(SampleRange::new(5, 5).is_ok());
    }

    #[test]
    fn test_sample_stays_in_bounds() {
        let rng = PacingRng::seeded(7);
        let range = SampleRange::new(3, 9).expect("valid range");
        for _ in 0..200 {
            let v = rng.sample(range);
            assert!((3..=9).contains(&v));
        }
    }

    #[test]
    fn test_fixed_range_is_constant() {
        let rng = PacingRng::seeded(0);
        for _ in 0..10 {
            assert_eq!(rng.sample(SampleRange::fixed(4)), 4);
        }
    }

    #[test]
    fn test_same_seed_same_stream() {
        let a = PacingRng::seeded(42);
        let b = PacingRng::seeded(42);
        let range = SampleRange::new(0, 1000).expect("valid range");
        for _ in 0..50 {
            assert_eq!(a.sample(range), b.sample(range));
        }
    }

    #[test]
    fn test_pick_from_empty_slice() {
        let rng = PacingRng::seeded(1);
        let empty: [u8; 0] = [];
        assert_eq!(rng.pick(&empty), None);
    }

    #[test]
    fn test_deserialize_from_pair() {
        let range: SampleRange = serde_yaml::from_str("[5, 10]").expect("valid yaml");
        assert_eq!(range.min(), 5);
        assert_eq!(range.max(), 10);

        let bad: Result<SampleRange, _> = serde_yaml::from_str("[10, 5]");
        assert!(bad.is_err());
    }
}
