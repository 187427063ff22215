//! Price-Gap Pair Finder
//!
//! Finds the lexicographically smallest index pair `(i, j)` with `i < j`
//! whose values differ by exactly a non-negative gap, in a single pass.

use anyhow::{anyhow, Result};
use std::collections::{hash_map::Entry, HashMap};
use std::fmt;

/// Required absolute difference between two values. Never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Gap(i64);

impl Gap {
    /// Rejects negative gaps instead of clamping them.
    pub fn new(k: i64) -> Result<Self> {
        if k < 0 {
            return Err(anyhow!("gap must be non-negative, got {k}"));
        }
        Ok(Self(k))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

/// Index pair `(earlier, later)` with `earlier < later`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GapPair {
    pub earlier: usize,
    pub later: usize,
}

impl GapPair {
    pub fn as_array(self) -> [usize; 2] {
        [self.earlier, self.later]
    }

    /// Values at both indices of `nums`, if they are in bounds.
    pub fn values(self, nums: &[i64]) -> Option<[i64; 2]> {
        Some([*nums.get(self.earlier)?, *nums.get(self.later)?])
    }
}

impl From<GapPair> for (usize, usize) {
    fn from(p: GapPair) -> Self {
        (p.earlier, p.later)
    }
}

impl fmt::Display for GapPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.earlier, self.later)
    }
}

/// Find the smallest `(i, j)` with `|nums[i] - nums[j]| == gap`.
///
/// Scans left to right keeping the first index of every value seen so far.
/// Each position is checked against `value - gap` and `value + gap`; the
/// running best is only replaced by a strictly smaller pair. O(n) time and
/// space.
pub fn find_price_gap_pair(nums: &[i64], gap: Gap) -> Option<GapPair> {
    let k = gap.get();
    let mut first_seen: HashMap<i64, usize> = HashMap::with_capacity(nums.len());
    let mut best: Option<GapPair> = None;

    for (j, &value) in nums.iter().enumerate() {
        // k == 0 collapses both targets to the same key
        let targets = [value.checked_sub(k), value.checked_add(k)];
        let lookups = if k == 0 { &targets[..1] } else { &targets[..] };

        for target in lookups.iter().flatten() {
            if let Some(&i) = first_seen.get(target) {
                let candidate = GapPair { earlier: i, later: j };
                if best.map_or(true, |b| candidate < b) {
                    best = Some(candidate);
                }
            }
        }

        if let Entry::Vacant(slot) = first_seen.entry(value) {
            slot.insert(j);
        }
    }

    best
}
