//! K-means++ seeding for the mixture means.
use rand::Rng;

use super::{GaussianMixture, MixtureError};
use crate::data::DataOrHistogram;
use crate::misc::pflip;

fn n_distinct(pts: &[(f64, f64)]) -> usize {
    let mut values: Vec<f64> = pts.iter().map(|&(v, _)| v).collect();
    values.sort_unstable_by(f64::total_cmp);
    values.dedup();
    values.len()
}

/// Choose `k` seed values from the weighted observations.
///
/// The first seed is drawn in proportion to multiplicity alone; each later
/// seed is drawn in proportion to `multiplicity * d²` where `d` is the
/// distance to the nearest already-chosen seed, so already-chosen values
/// carry zero weight and well separated values are favored.
pub(crate) fn seeds<R: Rng>(
    pts: &[(f64, f64)],
    k: usize,
    rng: &mut R,
) -> Result<Vec<f64>, MixtureError> {
    let n_distinct = n_distinct(pts);
    if n_distinct < k {
        return Err(MixtureError::InsufficientData {
            n_distinct,
            n_components: k,
        });
    }

    let mut seeds: Vec<f64> = Vec::with_capacity(k);

    let counts: Vec<f64> = pts.iter().map(|&(_, ct)| ct).collect();
    seeds.push(pts[pflip(&counts, rng)].0);

    while seeds.len() < k {
        let weights: Vec<f64> = pts
            .iter()
            .map(|&(v, ct)| {
                let d2 = seeds
                    .iter()
                    .map(|&s| (v - s) * (v - s))
                    .fold(f64::INFINITY, f64::min);
                ct * d2
            })
            .collect();
        seeds.push(pts[pflip(&weights, rng)].0);
    }

    Ok(seeds)
}

impl GaussianMixture {
    /// Seed the component means with k-means++ over the observations.
    ///
    /// The chosen seeds are sorted ascending before they replace the means,
    /// keeping components index-ordered by mean as the separation prior
    /// expects. Weights and variances are left untouched.
    ///
    /// Returns the seeded means. Fails with
    /// [`MixtureError::InsufficientData`] when the observations hold fewer
    /// distinct values (or occupied bins) than the mixture has components.
    pub fn initialize<'a, O, R>(
        &mut self,
        obs: O,
        rng: &mut R,
    ) -> Result<Vec<f64>, MixtureError>
    where
        O: Into<DataOrHistogram<'a>>,
        R: Rng,
    {
        let pts = obs.into().weighted_values();
        let mut seeds = seeds(&pts, self.k(), rng)?;
        seeds.sort_unstable_by(f64::total_cmp);
        self.means.clone_from(&seeds);
        Ok(seeds)
    }
}
