#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

/// A counted, optionally binned, aggregation of scalar observations.
///
/// Bins are half-open intervals `[lo, hi)`. Without explicit bins, each
/// observation is classified into an implicit unit-width bin by rounding to
/// the nearest integer, and the bin key doubles as its representative value.
/// With explicit bins, the key is the bin's index and the representative
/// value is the bin midpoint.
///
/// Observations that fall outside every defined bin (and non-finite values)
/// are silently dropped.
///
/// # Example
///
/// ```rust
/// use mixfit::data::Histogram;
///
/// let mut hist = Histogram::from_data(&[1.2, 1.6, 2.4]);
/// hist.add(2.0);
///
/// assert_eq!(hist.total(), 4);
/// assert_eq!(hist.count(2), 3);
/// assert_eq!(hist.flatten(), vec![1.0, 2.0, 2.0, 2.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct Histogram {
    /// Observation count per bin key
    counts: BTreeMap<i64, u64>,
    /// Explicit half-open `[lo, hi)` bins, keyed by index
    bins: Option<Vec<(f64, f64)>>,
    /// Running total of classified observations
    total: u64,
}

impl Histogram {
    /// An empty histogram with implicit unit-width bins.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Histogram {
            counts: BTreeMap::new(),
            bins: None,
            total: 0,
        }
    }

    /// An empty histogram over explicit half-open `[lo, hi)` bins.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use mixfit::data::Histogram;
    /// let mut hist = Histogram::with_bins(vec![(0.0, 2.0), (2.0, 4.0)]);
    /// hist.add(0.5);
    /// hist.add(3.1);
    /// hist.add(9.0); // outside every bin, dropped
    ///
    /// assert_eq!(hist.total(), 2);
    /// assert_eq!(hist.value(1), 3.0);
    /// ```
    #[inline]
    #[must_use]
    pub fn with_bins(bins: Vec<(f64, f64)>) -> Self {
        Histogram {
            counts: BTreeMap::new(),
            bins: Some(bins),
            total: 0,
        }
    }

    /// Build a histogram from raw observations with implicit unit-width bins.
    #[must_use]
    pub fn from_data(xs: &[f64]) -> Self {
        let mut hist = Histogram::new();
        for &x in xs {
            hist.add(x);
        }
        hist
    }

    /// Build a histogram from raw observations over explicit bins.
    #[must_use]
    pub fn from_data_binned(xs: &[f64], bins: Vec<(f64, f64)>) -> Self {
        let mut hist = Histogram::with_bins(bins);
        for &x in xs {
            hist.add(x);
        }
        hist
    }

    fn key_of(&self, x: f64) -> Option<i64> {
        if !x.is_finite() {
            return None;
        }
        match &self.bins {
            Some(bins) => bins
                .iter()
                .position(|&(lo, hi)| lo <= x && x < hi)
                .map(|ix| ix as i64),
            None => Some(x.round() as i64),
        }
    }

    /// Classify `x` into a bin and count it.
    ///
    /// Drops `x` silently if it falls outside every defined bin.
    pub fn add(&mut self, x: f64) {
        if let Some(key) = self.key_of(x) {
            *self.counts.entry(key).or_insert(0) += 1;
            self.total += 1;
        }
    }

    /// The representative value for a bin key: the bin midpoint when bins
    /// are explicit, the key itself otherwise.
    ///
    /// Panics if `key` does not name a defined explicit bin.
    #[inline]
    #[must_use]
    pub fn value(&self, key: i64) -> f64 {
        match &self.bins {
            Some(bins) => {
                let (lo, hi) = bins[key as usize];
                0.5 * (lo + hi)
            }
            None => key as f64,
        }
    }

    /// Observation count for a bin key.
    #[inline]
    #[must_use]
    pub fn count(&self, key: i64) -> u64 {
        self.counts.get(&key).copied().unwrap_or(0)
    }

    /// Total number of classified observations.
    #[inline]
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of distinct occupied bins.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// `(representative value, count)` pairs in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        self.counts.iter().map(move |(&key, &ct)| (self.value(key), ct))
    }

    /// Expand the counts back into a flat list of representative values,
    /// grouped by bin in ascending key order.
    #[must_use]
    pub fn flatten(&self) -> Vec<f64> {
        let mut xs = Vec::with_capacity(self.total as usize);
        for (value, ct) in self.iter() {
            for _ in 0..ct {
                xs.push(value);
            }
        }
        xs
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Histogram::new()
    }
}
