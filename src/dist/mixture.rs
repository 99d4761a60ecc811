//! Mixture of one-dimensional Gaussians, with EM fitting
#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use itertools::izip;
use rand::distributions::Open01;
use rand::Rng;
use std::fmt;

use crate::data::DataOrHistogram;
use crate::dist::gaussian::GaussianError;
use crate::dist::Gaussian;
use crate::misc::{barycenter, logsumexp, pflip};
use crate::traits::{
    ContinuousDistr, HasDensity, InverseCdf, Mean, Parameterized, Sampleable,
    Support, Variance,
};

mod em;
mod kmeanspp;

/// Regularizers and initialization behavior for fitting.
///
/// Priors are applied only when set; a relevance of zero leaves the
/// corresponding parameters untouched, and a very large relevance pins them
/// to the prior.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct MixtureOptions {
    /// Target variance toward which fitted variances are pulled
    pub variance_prior: Option<f64>,
    /// Strength of the pull toward `variance_prior`
    pub variance_prior_relevance: f64,
    /// Spacing of the synthetic, equally separated target means. Component
    /// `k` is pulled toward position `k * separation_prior` relative to the
    /// weighted barycenter, which assumes components are index-ordered by
    /// ascending mean.
    pub separation_prior: Option<f64>,
    /// Strength of the pull toward the separated positions
    pub separation_prior_relevance: f64,
    /// Seed the means with k-means++ before the first EM step of
    /// [`fit`](GaussianMixture::fit)
    pub initialize: bool,
}

/// Flat parameter record for persistence.
///
/// Holds everything needed to rebuild a [`GaussianMixture`] except its
/// fitting options.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct MixtureParameters {
    pub n_components: usize,
    pub weights: Vec<f64>,
    pub means: Vec<f64>,
    pub vars: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum MixtureError {
    /// The weights, means, and vars vectors have differing lengths
    LengthMismatch {
        n_weights: usize,
        n_means: usize,
        n_vars: usize,
    },
    /// The mixture has no components
    EmptyMixture,
    /// A declared component count disagrees with the parameter vectors
    ComponentCountMismatch { n_components: usize, n_params: usize },
    /// A (mean, var) pair does not form a valid Gaussian
    InvalidComponent { index: usize, source: GaussianError },
    /// Fewer distinct observations than components were given to the
    /// initializer
    InsufficientData { n_distinct: usize, n_components: usize },
}

/// Mixture of one-dimensional Gaussians.
///
/// The model owns one `(weight, mean, var)` triple per component. The
/// parameter vectors are mutated in place by [`update`](Self::update) and
/// [`fit`](Self::fit); each update computes the full replacement parameter
/// set first and swaps it in whole, so a failed update leaves the previous
/// parameters visible.
///
/// Serialized models carry only the parameter record
/// ([`MixtureParameters`]); restore fitting options with
/// [`with_options`](Self::with_options).
///
/// # Examples
///
/// ```
/// use mixfit::prelude::*;
///
/// let gmm = GaussianMixture::new(
///     vec![0.6, 0.4],
///     vec![0.0, 8.0],
///     vec![1.0, 2.0],
/// ).unwrap();
///
/// // mixture moments
/// let m: f64 = gmm.mean().unwrap();
/// assert!((m - 3.2).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
#[cfg_attr(feature = "serde1", serde(try_from = "MixtureParameters"))]
#[cfg_attr(feature = "serde1", serde(into = "MixtureParameters"))]
pub struct GaussianMixture {
    /// Mixing weights, one per component
    weights: Vec<f64>,
    /// Component means
    means: Vec<f64>,
    /// Component variances
    vars: Vec<f64>,
    /// Fitting configuration
    options: MixtureOptions,
}

impl GaussianMixture {
    /// Create a mixture from explicit parameter vectors.
    ///
    /// The vectors must be non-empty and of equal length. Weights are
    /// expected to sum to one but this is not enforced here; the M-step
    /// renormalizes them on every update.
    pub fn new(
        weights: Vec<f64>,
        means: Vec<f64>,
        vars: Vec<f64>,
    ) -> Result<Self, MixtureError> {
        if weights.len() != means.len() || weights.len() != vars.len() {
            Err(MixtureError::LengthMismatch {
                n_weights: weights.len(),
                n_means: means.len(),
                n_vars: vars.len(),
            })
        } else if weights.is_empty() {
            Err(MixtureError::EmptyMixture)
        } else {
            Ok(GaussianMixture {
                weights,
                means,
                vars,
                options: MixtureOptions::default(),
            })
        }
    }

    /// Create a mixture without validating the parameter vectors.
    #[inline]
    #[must_use]
    pub fn new_unchecked(
        weights: Vec<f64>,
        means: Vec<f64>,
        vars: Vec<f64>,
    ) -> Self {
        GaussianMixture {
            weights,
            means,
            vars,
            options: MixtureOptions::default(),
        }
    }

    /// The default `k`-component mixture: uniform weights, means
    /// `0, 1, .., k-1`, and unit variances.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use mixfit::dist::GaussianMixture;
    /// let gmm = GaussianMixture::uniform(3).unwrap();
    /// assert_eq!(gmm.means(), &[0.0, 1.0, 2.0]);
    /// ```
    pub fn uniform(k: usize) -> Result<Self, MixtureError> {
        if k == 0 {
            return Err(MixtureError::EmptyMixture);
        }
        Ok(GaussianMixture {
            weights: vec![(k as f64).recip(); k],
            means: (0..k).map(|i| i as f64).collect(),
            vars: vec![1.0; k],
            options: MixtureOptions::default(),
        })
    }

    /// Replace the fitting options.
    #[inline]
    #[must_use]
    pub fn with_options(mut self, options: MixtureOptions) -> Self {
        self.options = options;
        self
    }

    /// Rebuild a mixture from a parameter record and fitting options.
    pub fn from_parameters(
        params: MixtureParameters,
        options: MixtureOptions,
    ) -> Result<Self, MixtureError> {
        Self::try_from(params).map(|gmm| gmm.with_options(options))
    }

    /// Number of components
    #[inline]
    #[must_use]
    pub fn k(&self) -> usize {
        self.weights.len()
    }

    /// Mixing weights
    #[inline]
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Component means
    #[inline]
    #[must_use]
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Component variances
    #[inline]
    #[must_use]
    pub fn vars(&self) -> &[f64] {
        &self.vars
    }

    /// Fitting options
    #[inline]
    #[must_use]
    pub fn options(&self) -> &MixtureOptions {
        &self.options
    }

    /// Build one Gaussian primitive per component from the current
    /// `(mean, var)` pairs.
    ///
    /// The primitives snapshot the current parameters; they must be rebuilt
    /// after any update. Fails if any component's parameters are invalid,
    /// before any primitive is handed out.
    pub fn components(&self) -> Result<Vec<Gaussian>, MixtureError> {
        izip!(&self.means, &self.vars)
            .enumerate()
            .map(|(index, (&mean, &var))| {
                Gaussian::new(mean, var).map_err(|source| {
                    MixtureError::InvalidComponent { index, source }
                })
            })
            .collect()
    }

    /// Component primitives without parameter validation. Invalid variances
    /// produce NaN densities downstream rather than an error.
    pub(crate) fn components_unchecked(&self) -> Vec<Gaussian> {
        izip!(&self.means, &self.vars)
            .map(|(&mean, &var)| Gaussian::new_unchecked(mean, var))
            .collect()
    }

    /// Posterior probability that `x` was generated by each component,
    /// conditioned on the current parameters.
    ///
    /// The per-component densities are normalized by their sum. If every
    /// density underflows to zero the normalization divides zero by zero and
    /// the result is NaN; callers scoring points impossibly far from every
    /// component must guard for this.
    ///
    /// # Example
    ///
    /// ```rust
    /// use mixfit::prelude::*;
    ///
    /// let gmm = GaussianMixture::new(
    ///     vec![0.5, 0.5],
    ///     vec![0.0, 4.0],
    ///     vec![1.0, 1.0],
    /// ).unwrap();
    ///
    /// let resp = gmm.membership(2.0);
    /// assert!((resp[0] - resp[1]).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn membership(&self, x: f64) -> Vec<f64> {
        self.membership_with(x, &self.components_unchecked())
    }

    /// [`membership`](Self::membership) against precomputed component
    /// primitives, so many points can be scored under one parameter
    /// snapshot.
    #[must_use]
    pub fn membership_with(
        &self,
        x: f64,
        components: &[Gaussian],
    ) -> Vec<f64> {
        debug_assert_eq!(components.len(), self.k());
        let mut dens: Vec<f64> =
            components.iter().map(|g| g.f(&x)).collect();
        let z: f64 = dens.iter().sum();
        dens.iter_mut().for_each(|d| *d /= z);
        dens
    }

    /// The responsibility matrix: one row per observation (or per occupied
    /// histogram bin), one column per component, rows summing to one.
    #[must_use]
    pub fn memberships<'a, O>(&self, obs: O) -> Vec<Vec<f64>>
    where
        O: Into<DataOrHistogram<'a>>,
    {
        self.memberships_with(obs, &self.components_unchecked())
    }

    /// [`memberships`](Self::memberships) against precomputed component
    /// primitives.
    #[must_use]
    pub fn memberships_with<'a, O>(
        &self,
        obs: O,
        components: &[Gaussian],
    ) -> Vec<Vec<f64>>
    where
        O: Into<DataOrHistogram<'a>>,
    {
        obs.into()
            .weighted_values()
            .iter()
            .map(|&(v, _)| self.membership_with(v, components))
            .collect()
    }
}

impl TryFrom<MixtureParameters> for GaussianMixture {
    type Error = MixtureError;

    fn try_from(params: MixtureParameters) -> Result<Self, Self::Error> {
        let gmm =
            GaussianMixture::new(params.weights, params.means, params.vars)?;
        if gmm.k() != params.n_components {
            Err(MixtureError::ComponentCountMismatch {
                n_components: params.n_components,
                n_params: gmm.k(),
            })
        } else {
            Ok(gmm)
        }
    }
}

impl From<GaussianMixture> for MixtureParameters {
    fn from(gmm: GaussianMixture) -> Self {
        MixtureParameters {
            n_components: gmm.k(),
            weights: gmm.weights,
            means: gmm.means,
            vars: gmm.vars,
        }
    }
}

impl Parameterized for GaussianMixture {
    type Parameters = MixtureParameters;

    fn emit_params(&self) -> Self::Parameters {
        self.clone().into()
    }

    fn from_params(params: Self::Parameters) -> Self {
        GaussianMixture::new_unchecked(
            params.weights,
            params.means,
            params.vars,
        )
    }
}

impl HasDensity<f64> for GaussianMixture {
    fn ln_f(&self, x: &f64) -> f64 {
        let components = self.components_unchecked();
        let lfs: Vec<f64> = izip!(&self.weights, &components)
            .map(|(&w, cpnt)| w.ln() + cpnt.ln_f(x))
            .collect();
        logsumexp(&lfs)
    }

    fn f(&self, x: &f64) -> f64 {
        let components = self.components_unchecked();
        izip!(&self.weights, &components)
            .fold(0.0, |acc, (&w, cpnt)| w.mul_add(cpnt.f(x), acc))
    }
}

impl Sampleable<f64> for GaussianMixture {
    /// Draw by scanning the cumulative weights with one uniform draw (the
    /// last component absorbs any rounding shortfall), then pushing a second
    /// uniform draw through that component's quantile function.
    fn draw<R: Rng>(&self, rng: &mut R) -> f64 {
        let k = pflip(&self.weights, rng);
        let cpnt =
            Gaussian::new_unchecked(self.means[k], self.vars[k]);
        let u: f64 = rng.sample(Open01);
        cpnt.invcdf(u)
    }

    fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<f64> {
        let components = self.components_unchecked();
        (0..n)
            .map(|_| {
                let k = pflip(&self.weights, rng);
                let u: f64 = rng.sample(Open01);
                components[k].invcdf(u)
            })
            .collect()
    }
}

impl ContinuousDistr<f64> for GaussianMixture {}

impl Support<f64> for GaussianMixture {
    fn supports(&self, x: &f64) -> bool {
        x.is_finite()
    }
}

impl Mean<f64> for GaussianMixture {
    fn mean(&self) -> Option<f64> {
        Some(barycenter(&self.means, &self.weights))
    }
}

impl Variance<f64> for GaussianMixture {
    fn variance(&self) -> Option<f64> {
        let mu = barycenter(&self.means, &self.weights);
        let ex2: f64 = izip!(&self.weights, &self.means, &self.vars)
            .map(|(&w, &m, &v)| w * m.mul_add(m, v))
            .sum();
        Some(mu.mul_add(-mu, ex2))
    }
}

impl std::error::Error for MixtureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidComponent { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for MixtureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch {
                n_weights,
                n_means,
                n_vars,
            } => write!(
                f,
                "weights ({n_weights}), means ({n_means}), and vars \
                 ({n_vars}) must have equal lengths"
            ),
            Self::EmptyMixture => {
                write!(f, "mixture must have at least one component")
            }
            Self::ComponentCountMismatch {
                n_components,
                n_params,
            } => write!(
                f,
                "declared {n_components} components but parameter vectors \
                 hold {n_params}"
            ),
            Self::InvalidComponent { index, source } => {
                write!(f, "component {index} is not a valid gaussian: {source}")
            }
            Self::InsufficientData {
                n_distinct,
                n_components,
            } => write!(
                f,
                "initialization needs at least {n_components} distinct \
                 observations, got {n_distinct}"
            ),
        }
    }
}
