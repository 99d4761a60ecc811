//! Observation containers
mod histogram;

pub use self::histogram::Histogram;

/// Holds either raw observations or a histogram of them.
///
/// Every fitting operation accepts both shapes through this enum; algorithms
/// walk the shared `(value, count)` view so the per-sample and binned
/// variants share one code path, with the binned variant doing work
/// proportional to the number of distinct bins rather than the number of
/// observations.
///
/// # Example
///
/// ```rust
/// use mixfit::data::{DataOrHistogram, Histogram};
///
/// let xs = vec![0.1, 0.2, 0.2];
/// let flat: DataOrHistogram = (&xs).into();
/// assert_eq!(flat.n(), 3);
///
/// let hist = Histogram::from_data(&xs);
/// let binned: DataOrHistogram = (&hist).into();
/// assert_eq!(binned.n(), 3);
/// ```
#[derive(Debug, Clone, Copy)]
pub enum DataOrHistogram<'a> {
    /// A flat sequence of raw observations
    Data(&'a [f64]),
    /// A counted, binned aggregation of observations
    Histogram(&'a Histogram),
}

impl<'a> DataOrHistogram<'a> {
    /// Total number of observations.
    #[must_use]
    pub fn n(&self) -> usize {
        match self {
            DataOrHistogram::Data(xs) => xs.len(),
            DataOrHistogram::Histogram(hist) => hist.total() as usize,
        }
    }

    /// The `(value, multiplicity)` view shared by all fitting operations:
    /// one entry per raw observation, or one entry per occupied bin.
    #[must_use]
    pub fn weighted_values(&self) -> Vec<(f64, f64)> {
        match self {
            DataOrHistogram::Data(xs) => {
                xs.iter().map(|&x| (x, 1.0)).collect()
            }
            DataOrHistogram::Histogram(hist) => {
                hist.iter().map(|(v, ct)| (v, ct as f64)).collect()
            }
        }
    }
}

impl<'a> From<&'a [f64]> for DataOrHistogram<'a> {
    fn from(xs: &'a [f64]) -> Self {
        DataOrHistogram::Data(xs)
    }
}

impl<'a> From<&'a Vec<f64>> for DataOrHistogram<'a> {
    fn from(xs: &'a Vec<f64>) -> Self {
        DataOrHistogram::Data(xs.as_slice())
    }
}

impl<'a> From<&'a Histogram> for DataOrHistogram<'a> {
    fn from(hist: &'a Histogram) -> Self {
        DataOrHistogram::Histogram(hist)
    }
}
