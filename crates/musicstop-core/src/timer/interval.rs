//! Randomized phase durations.
//!
//! Every phase draws its length independently and uniformly from an
//! inclusive range of whole seconds. The random source is injected so tests
//! can replay a fixed sequence.

use rand::{Rng, SeedableRng};
use rand_pcg::Mcg128Xsl64;
use tracing::debug;

use crate::error::ValidationError;

/// Inclusive range of whole seconds with `min_secs <= max_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalRange {
    min_secs: u32,
    max_secs: u32,
}

impl IntervalRange {
    pub fn new(min_secs: u32, max_secs: u32) -> Result<Self, ValidationError> {
        if min_secs > max_secs {
            return Err(ValidationError::InvalidRange {
                min: min_secs,
                max: max_secs,
            });
        }
        Ok(Self { min_secs, max_secs })
    }

    /// A degenerate range that always yields `secs`.
    pub fn fixed(secs: u32) -> Self {
        Self {
            min_secs: secs,
            max_secs: secs,
        }
    }

    pub fn min_secs(&self) -> u32 {
        self.min_secs
    }

    pub fn max_secs(&self) -> u32 {
        self.max_secs
    }
}

/// Source of uniformly distributed integers.
pub trait RandomSource: Send {
    /// Uniform value in `low..=high`. Callers guarantee `low <= high`.
    fn next_in_range(&mut self, low: u32, high: u32) -> u32;
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn next_in_range(&mut self, low: u32, high: u32) -> u32 {
        (**self).next_in_range(low, high)
    }
}

/// PCG-backed source. Seed it for reproducible games.
#[derive(Debug, Clone)]
pub struct PcgSource(Mcg128Xsl64);

impl PcgSource {
    pub fn from_seed(seed: u64) -> Self {
        Self(Mcg128Xsl64::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self(Mcg128Xsl64::from_entropy())
    }
}

impl Default for PcgSource {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl RandomSource for PcgSource {
    fn next_in_range(&mut self, low: u32, high: u32) -> u32 {
        self.0.gen_range(low..=high)
    }
}

/// Replays a fixed list of values, cycling when exhausted.
///
/// Each value is clamped into the requested range, so a sequence written for
/// one range never produces an out-of-bounds draw for another.
#[derive(Debug, Clone)]
pub struct SequenceSource {
    values: Vec<u32>,
    cursor: usize,
}

impl SequenceSource {
    pub fn new(values: impl Into<Vec<u32>>) -> Self {
        Self {
            values: values.into(),
            cursor: 0,
        }
    }
}

impl RandomSource for SequenceSource {
    fn next_in_range(&mut self, low: u32, high: u32) -> u32 {
        if self.values.is_empty() {
            return low;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor = self.cursor.wrapping_add(1);
        value.clamp(low, high)
    }
}

/// Draws phase durations from an injected [`RandomSource`].
#[derive(Debug, Clone)]
pub struct IntervalGenerator<R> {
    source: R,
}

impl<R: RandomSource> IntervalGenerator<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    /// Duration in milliseconds, in `[min * 1000, max * 1000]`.
    pub fn draw(&mut self, range: &IntervalRange) -> u64 {
        let secs = self.source.next_in_range(range.min_secs, range.max_secs);
        debug!(
            min = range.min_secs,
            max = range.max_secs,
            secs,
            "drew phase duration"
        );
        u64::from(secs) * 1000
    }
}
