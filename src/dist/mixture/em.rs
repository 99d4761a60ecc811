//! Expectation-maximization over a Gaussian mixture.
//!
//! All routines run over the `(value, multiplicity)` view of the
//! observations, so raw data costs one pass per observation while a
//! histogram costs one pass per occupied bin.
use itertools::izip;
use rand::Rng;

use super::{GaussianMixture, MixtureError};
use crate::consts::{EM_CONVERGENCE_TOL, EM_MAX_ITERS, VAR_EPS};
use crate::data::DataOrHistogram;
use crate::dist::Gaussian;
use crate::misc::barycenter;
use crate::traits::HasDensity;

/// Per-row component densities, before normalization. Shared by the
/// responsibility and log-likelihood computations within one iteration so
/// the component primitives are built once.
fn density_rows(
    pts: &[(f64, f64)],
    components: &[Gaussian],
) -> Vec<Vec<f64>> {
    pts.iter()
        .map(|&(v, _)| components.iter().map(|g| g.f(&v)).collect())
        .collect()
}

fn normalize_rows(rows: &mut [Vec<f64>]) {
    for row in rows.iter_mut() {
        let z: f64 = row.iter().sum();
        row.iter_mut().for_each(|r| *r /= z);
    }
}

/// `Σ_i count_i · ln(Σ_k weight_k · density_ik)`, short-circuiting to -∞ on
/// an exactly-zero mixture density.
fn ln_likelihood_rows(
    pts: &[(f64, f64)],
    weights: &[f64],
    rows: &[Vec<f64>],
) -> f64 {
    let mut ll = 0.0;
    for (&(_, ct), row) in pts.iter().zip(rows.iter()) {
        let p: f64 = izip!(weights, row).map(|(&w, &d)| w * d).sum();
        if p == 0.0 {
            return f64::NEG_INFINITY;
        }
        ll = ct.mul_add(p.ln(), ll);
    }
    ll
}

/// Pull `means` toward equally spaced positions `k * separation`, recentered
/// on the weighted barycenter of the raw means.
fn blend_toward_separated(
    means: &mut [f64],
    weights: &[f64],
    separation: f64,
    relevance: f64,
) {
    let prior_means: Vec<f64> =
        (0..means.len()).map(|k| k as f64 * separation).collect();
    let center = barycenter(means, weights);
    let prior_center = barycenter(&prior_means, weights);
    for (m, &w, &pm) in izip!(means.iter_mut(), weights, &prior_means) {
        let alpha = w / (w + relevance);
        *m = center
            + alpha * (*m - center)
            + (1.0 - alpha) * (pm - prior_center);
    }
}

impl GaussianMixture {
    /// One EM parameter update from the observations' own responsibilities.
    ///
    /// Runs a fresh E-step against the current parameters, then replaces the
    /// weights, means, and variances. See
    /// [`update_with`](Self::update_with) for the shape of the update.
    pub fn update<'a, O>(&mut self, obs: O) -> Result<(), MixtureError>
    where
        O: Into<DataOrHistogram<'a>>,
    {
        let obs = obs.into();
        self.step(&obs.weighted_values(), obs.n() as f64, None)
    }

    /// One EM parameter update from precomputed responsibilities.
    ///
    /// `resp` must hold one row per entry of the observations' weighted
    /// view, in the same order as [`memberships`](Self::memberships)
    /// produces them.
    ///
    /// A component whose responsibility mass is (near) zero divides by
    /// (near) zero here; the resulting non-finite parameters are left to
    /// propagate rather than being silently repaired.
    pub fn update_with<'a, O>(
        &mut self,
        obs: O,
        resp: &[Vec<f64>],
    ) -> Result<(), MixtureError>
    where
        O: Into<DataOrHistogram<'a>>,
    {
        let obs = obs.into();
        self.step(&obs.weighted_values(), obs.n() as f64, Some(resp))
    }

    /// The M-step. Computes the full replacement parameter set before
    /// mutating anything, so errors surface with the previous parameters
    /// intact.
    fn step(
        &mut self,
        pts: &[(f64, f64)],
        total: f64,
        resp: Option<&[Vec<f64>]>,
    ) -> Result<(), MixtureError> {
        let k = self.k();

        let resp_owned: Vec<Vec<f64>>;
        let resp: &[Vec<f64>] = match resp {
            Some(rows) => rows,
            None => {
                let components = self.components()?;
                resp_owned = pts
                    .iter()
                    .map(|&(v, _)| self.membership_with(v, &components))
                    .collect();
                &resp_owned
            }
        };
        debug_assert_eq!(resp.len(), pts.len());

        // responsibility mass per component
        let mut mass = vec![0.0; k];
        for (row, &(_, ct)) in resp.iter().zip(pts.iter()) {
            for (acc, &r) in mass.iter_mut().zip(row.iter()) {
                *acc = r.mul_add(ct, *acc);
            }
        }

        let weights: Vec<f64> = mass.iter().map(|&m| m / total).collect();

        let mut means = vec![0.0; k];
        for (row, &(v, ct)) in resp.iter().zip(pts.iter()) {
            for (acc, &r) in means.iter_mut().zip(row.iter()) {
                *acc = (r * ct).mul_add(v, *acc);
            }
        }
        for (m, &cw) in means.iter_mut().zip(mass.iter()) {
            *m /= cw;
        }

        // the separation prior blends after the raw mean update and before
        // the variance update, which therefore sees the blended means
        if let Some(separation) = self.options.separation_prior {
            blend_toward_separated(
                &mut means,
                &weights,
                separation,
                self.options.separation_prior_relevance,
            );
        }

        let mut vars = vec![VAR_EPS; k];
        for (row, &(v, ct)) in resp.iter().zip(pts.iter()) {
            for ((acc, &r), &m) in
                vars.iter_mut().zip(row.iter()).zip(means.iter())
            {
                let dev = v - m;
                *acc = (r * ct * dev).mul_add(dev, *acc);
            }
        }
        for (var, &cw) in vars.iter_mut().zip(mass.iter()) {
            *var /= cw;
        }

        if let Some(prior) = self.options.variance_prior {
            let relevance = self.options.variance_prior_relevance;
            for (var, &w) in vars.iter_mut().zip(weights.iter()) {
                let alpha = w / (w + relevance);
                *var = alpha.mul_add(*var, (1.0 - alpha) * prior);
            }
        }

        self.weights = weights;
        self.means = means;
        self.vars = vars;
        Ok(())
    }

    /// Log-likelihood of the observations under the current parameters:
    /// `Σ ln(Σ_k weight_k · pdf_k(x))`, with each histogram bin's term
    /// scaled by its count.
    ///
    /// Returns -∞ as soon as any observation's mixture density is exactly
    /// zero.
    #[must_use]
    pub fn ln_likelihood<'a, O>(&self, obs: O) -> f64
    where
        O: Into<DataOrHistogram<'a>>,
    {
        let pts = obs.into().weighted_values();
        let components = self.components_unchecked();
        let mut ll = 0.0;
        for &(v, ct) in &pts {
            let p: f64 = izip!(&self.weights, &components)
                .map(|(&w, g)| w * g.f(&v))
                .sum();
            if p == 0.0 {
                return f64::NEG_INFINITY;
            }
            ll = ct.mul_add(p.ln(), ll);
        }
        ll
    }

    /// Fit the mixture by EM with the default iteration cap and tolerance.
    ///
    /// The random source is only consulted when
    /// [`MixtureOptions::initialize`] asks for k-means++ seeding.
    pub fn fit<'a, O, R>(
        &mut self,
        obs: O,
        rng: &mut R,
    ) -> Result<usize, MixtureError>
    where
        O: Into<DataOrHistogram<'a>>,
        R: Rng,
    {
        self.fit_with(obs, EM_MAX_ITERS, EM_CONVERGENCE_TOL, rng)
    }

    /// Fit the mixture by EM.
    ///
    /// Each iteration runs the M-step on the previous iteration's
    /// responsibilities (iteration zero computes them inside the M-step),
    /// then refreshes the responsibilities and the log-likelihood under the
    /// new parameters. Iteration stops when the absolute log-likelihood
    /// change is within `tol`, or at `max_iters`.
    ///
    /// Returns the number of iterations executed; a return value equal to
    /// `max_iters` signals that the tolerance was never reached.
    pub fn fit_with<'a, O, R>(
        &mut self,
        obs: O,
        max_iters: usize,
        tol: f64,
        rng: &mut R,
    ) -> Result<usize, MixtureError>
    where
        O: Into<DataOrHistogram<'a>>,
        R: Rng,
    {
        let obs = obs.into();
        if self.options.initialize {
            self.initialize(obs, rng)?;
        }

        let pts = obs.weighted_values();
        let total = obs.n() as f64;

        let mut resp: Option<Vec<Vec<f64>>> = None;
        let mut ln_l = f64::NEG_INFINITY;
        for iter in 0..max_iters {
            self.step(&pts, total, resp.as_deref())?;

            let components = self.components()?;
            let mut rows = density_rows(&pts, &components);
            let ln_l_next = ln_likelihood_rows(&pts, &self.weights, &rows);
            normalize_rows(&mut rows);
            resp = Some(rows);

            if (ln_l_next - ln_l).abs() <= tol {
                return Ok(iter + 1);
            }
            ln_l = ln_l_next;
        }
        Ok(max_iters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Histogram;
    use crate::dist::MixtureOptions;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    const TOL: f64 = 1E-12;

    // eight observations in each of two well separated clusters
    fn two_cluster_data() -> Vec<f64> {
        vec![
            -1.1, -0.6, -0.2, 0.0, 0.3, 0.7, 1.1, 1.4, //
            8.8, 9.2, 9.6, 10.0, 10.1, 10.5, 10.9, 11.3,
        ]
    }

    #[test]
    fn single_component_update_recovers_sample_moments() {
        let mut gmm =
            GaussianMixture::new(vec![1.0], vec![0.0], vec![1.0]).unwrap();
        gmm.update(&vec![0.0, 1.0]).unwrap();

        assert::close(gmm.weights()[0], 1.0, TOL);
        assert::close(gmm.means()[0], 0.5, TOL);
        // (VAR_EPS + 0.25 + 0.25) / 2
        assert::close(gmm.vars()[0], 0.250_000_5, TOL);
    }

    #[test]
    fn update_on_a_histogram_matches_update_on_flat_data() {
        let xs = vec![0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 9.0, 10.0, 10.0, 11.0];
        let hist = Histogram::from_data(&xs);

        let mut flat = GaussianMixture::uniform(2).unwrap();
        let mut binned = flat.clone();
        flat.update(&xs).unwrap();
        binned.update(&hist).unwrap();

        for (a, b) in flat.weights().iter().zip(binned.weights()) {
            assert::close(*a, *b, 1E-12);
        }
        for (a, b) in flat.means().iter().zip(binned.means()) {
            assert::close(*a, *b, 1E-12);
        }
        for (a, b) in flat.vars().iter().zip(binned.vars()) {
            assert::close(*a, *b, 1E-12);
        }
    }

    #[test]
    fn update_with_precomputed_responsibilities_matches_fresh_estep() {
        let xs = two_cluster_data();
        let mut fresh = GaussianMixture::uniform(2).unwrap();
        let mut precomputed = fresh.clone();

        let resp = precomputed.memberships(&xs);
        fresh.update(&xs).unwrap();
        precomputed.update_with(&xs, &resp).unwrap();

        assert_eq!(fresh, precomputed);
    }

    #[test]
    fn update_propagates_factory_errors_without_mutating() {
        let mut gmm = GaussianMixture::new_unchecked(
            vec![0.5, 0.5],
            vec![0.0, 1.0],
            vec![1.0, -1.0],
        );
        let before = gmm.clone();
        let res = gmm.update(&vec![0.0, 1.0]);
        assert!(matches!(
            res,
            Err(MixtureError::InvalidComponent { index: 1, .. })
        ));
        assert_eq!(gmm, before);
    }

    #[test]
    fn strong_variance_prior_pins_the_variance() {
        let options = MixtureOptions {
            variance_prior: Some(4.0),
            variance_prior_relevance: 1e6,
            ..MixtureOptions::default()
        };
        let mut gmm = GaussianMixture::new(vec![1.0], vec![0.0], vec![1.0])
            .unwrap()
            .with_options(options);
        gmm.update(&vec![0.0, 1.0]).unwrap();
        assert::close(gmm.vars()[0], 4.0, 1E-3);
    }

    #[test]
    fn strong_separation_prior_spaces_the_means() {
        let options = MixtureOptions {
            separation_prior: Some(3.0),
            separation_prior_relevance: 1e6,
            ..MixtureOptions::default()
        };
        let mut gmm = GaussianMixture::uniform(2)
            .unwrap()
            .with_options(options);
        gmm.update(&vec![0.0, 1.0]).unwrap();

        let means = gmm.means();
        assert::close(means[1] - means[0], 3.0, 1E-3);
        // recentered on the barycenter of the raw updated means
        assert::close(means[0], -1.0, 1E-3);
        assert::close(means[1], 2.0, 1E-3);
    }

    #[test]
    fn zero_relevance_priors_change_nothing() {
        let options = MixtureOptions {
            variance_prior: Some(4.0),
            variance_prior_relevance: 0.0,
            separation_prior: Some(100.0),
            separation_prior_relevance: 0.0,
            ..MixtureOptions::default()
        };
        let xs = two_cluster_data();
        let mut plain = GaussianMixture::uniform(2).unwrap();
        let mut with_priors = plain.clone().with_options(options);

        plain.update(&xs).unwrap();
        with_priors.update(&xs).unwrap();

        for (a, b) in plain.means().iter().zip(with_priors.means()) {
            assert::close(*a, *b, 1E-12);
        }
        for (a, b) in plain.vars().iter().zip(with_priors.vars()) {
            assert::close(*a, *b, 1E-12);
        }
    }

    #[test]
    fn ln_likelihood_is_count_weighted() {
        let gmm = GaussianMixture::uniform(2).unwrap();
        let xs = vec![2.0, 2.0, 2.0];
        let hist = Histogram::from_data(&xs);
        assert::close(
            gmm.ln_likelihood(&xs),
            gmm.ln_likelihood(&hist),
            1E-12,
        );
        assert::close(
            gmm.ln_likelihood(&xs),
            3.0 * gmm.ln_likelihood(&vec![2.0]),
            1E-12,
        );
    }

    #[test]
    fn ln_likelihood_of_an_impossible_observation_is_neg_infinity() {
        let gmm =
            GaussianMixture::new(vec![1.0], vec![0.0], vec![1.0]).unwrap();
        assert_eq!(gmm.ln_likelihood(&vec![1000.0]), f64::NEG_INFINITY);
    }

    #[test]
    fn ln_likelihood_never_decreases_across_updates() {
        let xs = two_cluster_data();
        let mut gmm = GaussianMixture::uniform(2).unwrap();
        let mut prev = gmm.ln_likelihood(&xs);
        for _ in 0..25 {
            gmm.update(&xs).unwrap();
            let next = gmm.ln_likelihood(&xs);
            assert!(
                next - prev >= -1e-5,
                "log-likelihood fell from {} to {}",
                prev,
                next
            );
            prev = next;
        }
    }

    #[test]
    fn fit_converges_on_separated_clusters() {
        let mut rng = Xoshiro256Plus::seed_from_u64(0x00F1);
        let xs = two_cluster_data();
        let mut gmm = GaussianMixture::uniform(2).unwrap();
        let iters = gmm.fit(&xs, &mut rng).unwrap();

        assert!(iters > 1);
        assert!(iters < EM_MAX_ITERS);
        assert::close(gmm.weights().iter().sum::<f64>(), 1.0, 1E-9);
        assert::close(gmm.means()[0], 0.2, 0.25);
        assert::close(gmm.means()[1], 10.05, 0.25);
    }

    #[test]
    fn fit_against_a_histogram_matches_fit_against_flat_data() {
        let xs = vec![
            0.0, 0.0, 0.0, 1.0, 1.0, 2.0, 9.0, 9.0, 10.0, 10.0, 10.0, 11.0,
        ];
        let hist = Histogram::from_data(&xs);
        let mut rng = Xoshiro256Plus::seed_from_u64(0x00F2);

        let mut flat = GaussianMixture::uniform(2).unwrap();
        let mut binned = flat.clone();
        flat.fit(&xs, &mut rng).unwrap();
        binned.fit(&hist, &mut rng).unwrap();

        for (a, b) in flat.weights().iter().zip(binned.weights()) {
            assert::close(*a, *b, 1E-5);
        }
        for (a, b) in flat.means().iter().zip(binned.means()) {
            assert::close(*a, *b, 1E-5);
        }
        for (a, b) in flat.vars().iter().zip(binned.vars()) {
            assert::close(*a, *b, 1E-5);
        }
    }

    #[test]
    fn fit_reports_the_cap_when_it_cannot_converge() {
        let mut rng = Xoshiro256Plus::seed_from_u64(0x00F3);
        let xs = two_cluster_data();
        let mut gmm = GaussianMixture::uniform(2).unwrap();
        // an unattainable tolerance never stops early
        let iters = gmm.fit_with(&xs, 3, 0.0, &mut rng).unwrap();
        assert_eq!(iters, 3);
    }

    #[test]
    fn fit_with_initialization_seeds_and_converges() {
        let mut rng = Xoshiro256Plus::seed_from_u64(0x1234);
        let xs = two_cluster_data();
        let mut gmm = GaussianMixture::uniform(2).unwrap().with_options(
            MixtureOptions {
                initialize: true,
                ..MixtureOptions::default()
            },
        );
        let iters = gmm.fit(&xs, &mut rng).unwrap();
        assert!(iters < EM_MAX_ITERS);
        assert!(gmm.means()[0] < 3.0);
        assert!(gmm.means()[1] > 7.0);
    }

    #[test]
    fn strong_variance_prior_drives_fitted_variances_to_it() {
        let mut rng = Xoshiro256Plus::seed_from_u64(0x00F4);
        let xs = two_cluster_data();
        let mut gmm = GaussianMixture::uniform(2).unwrap().with_options(
            MixtureOptions {
                variance_prior: Some(2.5),
                variance_prior_relevance: 1e6,
                ..MixtureOptions::default()
            },
        );
        gmm.fit(&xs, &mut rng).unwrap();
        for &var in gmm.vars() {
            assert::close(var, 2.5, 0.1);
        }
    }
}
