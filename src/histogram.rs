//! Sparse, ordered latency histograms.
//!
//! Backed by `BTreeMap` so that median (partial sum over ordered keys) and
//! max (last key) are cheap without pre-allocating a dense array sized to
//! the largest possible latency.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct LatencyHistogram {
    counts: BTreeMap<u64, u64>,
    total: u64,
}

impl LatencyHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, latency: u64) {
        *self.counts.entry(latency).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn count_at(&self, latency: u64) -> u64 {
        self.counts.get(&latency).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Largest recorded latency, or 0 if no samples were recorded.
    pub fn max(&self) -> u64 {
        self.counts.keys().next_back().copied().unwrap_or(0)
    }

    /// The first bucket (by ascending latency) whose cumulative count
    /// reaches half the total sample count.
    pub fn median(&self) -> u64 {
        if self.total == 0 {
            return 0;
        }
        let half = self.total / 2;
        let mut running = 0u64;
        for (&latency, &count) in &self.counts {
            running += count;
            if running >= half {
                return latency;
            }
        }
        // Unreachable in practice (running reaches total >= half), but keep
        // a defined fallback for an empty-map edge case.
        self.max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_histogram_has_zero_median_and_max() {
        let h = LatencyHistogram::new();
        assert_eq!(h.median(), 0);
        assert_eq!(h.max(), 0);
    }

    #[test]
    fn single_sample() {
        let mut h = LatencyHistogram::new();
        h.record(3);
        assert_eq!(h.median(), 3);
        assert_eq!(h.max(), 3);
        assert_eq!(h.count_at(3), 1);
    }

    #[test]
    fn median_walks_ordered_buckets() {
        let mut h = LatencyHistogram::new();
        for lat in [1, 1, 1, 5, 5, 9] {
            h.record(lat);
        }
        // total=6, half=3, running reaches 3 at latency 1
        assert_eq!(h.median(), 1);
        assert_eq!(h.max(), 9);
    }

    #[test]
    fn median_skews_toward_dense_bucket() {
        let mut h = LatencyHistogram::new();
        for _ in 0..10 {
            h.record(2);
        }
        h.record(100);
        // total=11, half=5, running reaches 10 at latency 2 already
        assert_eq!(h.median(), 2);
        assert_eq!(h.max(), 100);
    }
}
