//! Gaussian/Normal distribution over x in (-∞, ∞), parameterized by mean and
//! variance
#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use rand::Rng;
use rand_distr::Normal;
use special::Error as _;
use std::f64::consts::SQRT_2;
use std::fmt;

use crate::consts::HALF_LN_2PI;
use crate::traits::{
    Cdf, ContinuousDistr, HasDensity, InverseCdf, Parameterized, Sampleable,
    Support,
};

/// Gaussian / [Normal distribution](https://en.wikipedia.org/wiki/Normal_distribution),
/// N(μ, σ²) over real values.
///
/// Unlike the usual (mean, std-dev) convention, this type is constructed from
/// the **variance**, which is the quantity the mixture M-step estimates.
///
/// # Examples
///
/// ```
/// use mixfit::prelude::*;
///
/// let g = Gaussian::new(2.0, 4.0).unwrap(); // mean 2, variance 4
/// assert!((g.sigma() - 2.0).abs() < 1e-12);
///
/// // the quantile function inverts the cdf
/// let p = g.cdf(&3.3_f64);
/// let x: f64 = g.quantile(p);
/// assert!((x - 3.3).abs() < 1e-10);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
#[cfg_attr(feature = "serde1", serde(try_from = "GaussianParameters"))]
#[cfg_attr(feature = "serde1", serde(into = "GaussianParameters"))]
pub struct Gaussian {
    /// Mean
    mean: f64,
    /// Variance
    var: f64,
    /// Cached standard deviation
    sigma: f64,
    /// Cached log standard deviation
    ln_sigma: f64,
}

impl PartialEq for Gaussian {
    fn eq(&self, other: &Gaussian) -> bool {
        self.mean == other.mean && self.var == other.var
    }
}

/// Flat (mean, variance) record for persistence
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct GaussianParameters {
    pub mean: f64,
    pub var: f64,
}

impl TryFrom<GaussianParameters> for Gaussian {
    type Error = GaussianError;

    fn try_from(params: GaussianParameters) -> Result<Self, Self::Error> {
        Gaussian::new(params.mean, params.var)
    }
}

impl From<Gaussian> for GaussianParameters {
    fn from(gauss: Gaussian) -> Self {
        GaussianParameters {
            mean: gauss.mean,
            var: gauss.var,
        }
    }
}

impl Parameterized for Gaussian {
    type Parameters = GaussianParameters;

    fn emit_params(&self) -> Self::Parameters {
        Self::Parameters {
            mean: self.mean(),
            var: self.var(),
        }
    }

    fn from_params(params: Self::Parameters) -> Self {
        Self::new_unchecked(params.mean, params.var)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum GaussianError {
    /// The mean parameter is infinite or NaN
    MeanNotFinite { mean: f64 },
    /// The variance parameter is less than or equal to zero
    VarianceTooLow { var: f64 },
    /// The variance parameter is infinite or NaN
    VarianceNotFinite { var: f64 },
}

impl Gaussian {
    /// Create a new Gaussian distribution
    ///
    /// # Arguments
    /// - mean: mean
    /// - var: variance
    pub fn new(mean: f64, var: f64) -> Result<Self, GaussianError> {
        if !mean.is_finite() {
            Err(GaussianError::MeanNotFinite { mean })
        } else if var <= 0.0 {
            Err(GaussianError::VarianceTooLow { var })
        } else if !var.is_finite() {
            Err(GaussianError::VarianceNotFinite { var })
        } else {
            Ok(Gaussian::new_unchecked(mean, var))
        }
    }

    /// Creates a new Gaussian without checking whether the parameters are
    /// valid.
    #[inline]
    #[must_use]
    pub fn new_unchecked(mean: f64, var: f64) -> Self {
        let sigma = var.sqrt();
        Gaussian {
            mean,
            var,
            sigma,
            ln_sigma: sigma.ln(),
        }
    }

    /// Standard normal
    ///
    /// # Example
    ///
    /// ```rust
    /// # use mixfit::dist::Gaussian;
    /// let gauss = Gaussian::standard();
    ///
    /// assert_eq!(gauss, Gaussian::new(0.0, 1.0).unwrap());
    /// ```
    #[inline]
    #[must_use]
    pub fn standard() -> Self {
        Gaussian {
            mean: 0.0,
            var: 1.0,
            sigma: 1.0,
            ln_sigma: 0.0,
        }
    }

    /// Get the mean
    #[inline]
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Get the variance
    #[inline]
    #[must_use]
    pub fn var(&self) -> f64 {
        self.var
    }

    /// Get the standard deviation
    #[inline]
    #[must_use]
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Set the value of the mean
    ///
    /// # Example
    ///
    /// ```rust
    /// # use mixfit::dist::Gaussian;
    /// let mut gauss = Gaussian::new(2.0, 1.5).unwrap();
    /// assert_eq!(gauss.mean(), 2.0);
    ///
    /// gauss.set_mean(1.3).unwrap();
    /// assert_eq!(gauss.mean(), 1.3);
    ///
    /// assert!(gauss.set_mean(f64::INFINITY).is_err());
    /// assert!(gauss.set_mean(f64::NAN).is_err());
    /// ```
    #[inline]
    pub fn set_mean(&mut self, mean: f64) -> Result<(), GaussianError> {
        if mean.is_finite() {
            self.set_mean_unchecked(mean);
            Ok(())
        } else {
            Err(GaussianError::MeanNotFinite { mean })
        }
    }

    /// Set the value of the mean without input validation
    #[inline]
    pub fn set_mean_unchecked(&mut self, mean: f64) {
        self.mean = mean;
    }

    /// Set the value of the variance
    ///
    /// # Example
    ///
    /// ```rust
    /// # use mixfit::dist::Gaussian;
    /// let mut gauss = Gaussian::standard();
    ///
    /// gauss.set_var(4.0).unwrap();
    /// assert_eq!(gauss.sigma(), 2.0);
    ///
    /// assert!(gauss.set_var(0.0).is_err());
    /// assert!(gauss.set_var(-1.0).is_err());
    /// assert!(gauss.set_var(f64::INFINITY).is_err());
    /// assert!(gauss.set_var(f64::NAN).is_err());
    /// ```
    #[inline]
    pub fn set_var(&mut self, var: f64) -> Result<(), GaussianError> {
        if var <= 0.0 {
            Err(GaussianError::VarianceTooLow { var })
        } else if !var.is_finite() {
            Err(GaussianError::VarianceNotFinite { var })
        } else {
            self.set_var_unchecked(var);
            Ok(())
        }
    }

    /// Set the value of the variance without input validation
    #[inline]
    pub fn set_var_unchecked(&mut self, var: f64) {
        self.var = var;
        self.sigma = var.sqrt();
        self.ln_sigma = self.sigma.ln();
    }
}

impl Default for Gaussian {
    fn default() -> Self {
        Gaussian::standard()
    }
}

impl From<&Gaussian> for String {
    fn from(gauss: &Gaussian) -> String {
        format!("N(μ: {}, σ²: {})", gauss.mean, gauss.var)
    }
}

impl fmt::Display for Gaussian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from(self))
    }
}

macro_rules! impl_traits {
    ($kind:ty) => {
        impl HasDensity<$kind> for Gaussian {
            fn ln_f(&self, x: &$kind) -> f64 {
                let k = (f64::from(*x) - self.mean) / self.sigma;
                (0.5 * k).mul_add(-k, -self.ln_sigma) - HALF_LN_2PI
            }
        }

        impl Sampleable<$kind> for Gaussian {
            fn draw<R: Rng>(&self, rng: &mut R) -> $kind {
                let g = Normal::new(self.mean, self.sigma).unwrap();
                rng.sample(g) as $kind
            }

            fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<$kind> {
                let g = Normal::new(self.mean, self.sigma).unwrap();
                (0..n).map(|_| rng.sample(g) as $kind).collect()
            }
        }

        impl ContinuousDistr<$kind> for Gaussian {}

        impl Support<$kind> for Gaussian {
            fn supports(&self, x: &$kind) -> bool {
                x.is_finite()
            }
        }

        impl Cdf<$kind> for Gaussian {
            fn cdf(&self, x: &$kind) -> f64 {
                let errf =
                    ((f64::from(*x) - self.mean) / (self.sigma * SQRT_2))
                        .error();
                0.5 * (1.0 + errf)
            }
        }

        impl InverseCdf<$kind> for Gaussian {
            fn invcdf(&self, p: f64) -> $kind {
                assert!((0.0..=1.0).contains(&p), "P out of range");

                let x = (self.sigma * SQRT_2)
                    .mul_add(2.0_f64.mul_add(p, -1.0).inv_error(), self.mean);
                x as $kind
            }
        }
    };
}

impl_traits!(f32);
impl_traits!(f64);

impl std::error::Error for GaussianError {}

impl fmt::Display for GaussianError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MeanNotFinite { mean } => {
                write!(f, "non-finite mean: {mean}")
            }
            Self::VarianceTooLow { var } => {
                write!(f, "variance ({var}) must be greater than zero")
            }
            Self::VarianceNotFinite { var } => {
                write!(f, "non-finite variance: {var}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    const TOL: f64 = 1E-12;

    #[test]
    fn should_impl_debug_clone_and_partialeq() {
        let gauss = Gaussian::new(1.0, 2.0).unwrap();
        assert_eq!(gauss, gauss.clone());
        let _s = format!("{:?}", gauss);
    }

    #[test]
    fn new() {
        let gauss = Gaussian::new(1.2, 3.0).unwrap();
        assert::close(gauss.mean(), 1.2, TOL);
        assert::close(gauss.var(), 3.0, TOL);
        assert::close(gauss.sigma(), 3.0_f64.sqrt(), TOL);
    }

    #[test]
    fn new_rejects_bad_parameters() {
        assert!(Gaussian::new(f64::INFINITY, 1.0).is_err());
        assert!(Gaussian::new(f64::NAN, 1.0).is_err());
        assert!(Gaussian::new(0.0, 0.0).is_err());
        assert!(Gaussian::new(0.0, -1.0).is_err());
        assert!(Gaussian::new(0.0, f64::INFINITY).is_err());
        assert!(Gaussian::new(0.0, f64::NAN).is_err());
    }

    #[test]
    fn standard() {
        let gauss = Gaussian::standard();
        assert::close(gauss.mean(), 0.0, TOL);
        assert::close(gauss.var(), 1.0, TOL);
    }

    #[test]
    fn standard_ln_pdf_at_zero() {
        let gauss = Gaussian::standard();
        assert::close(gauss.ln_pdf(&0.0_f64), -0.918_938_533_204_672_7, TOL);
    }

    #[test]
    fn standard_ln_pdf_off_zero() {
        let gauss = Gaussian::standard();
        assert::close(gauss.ln_pdf(&2.1_f64), -3.123_938_533_204_672_7, TOL);
    }

    #[test]
    fn nonstandard_ln_pdf_on_mean() {
        // sigma = 0.33, var = 0.1089
        let gauss = Gaussian::new(-1.2, 0.1089).unwrap();
        assert::close(gauss.ln_pdf(&-1.2_f64), 0.189_724_091_316_938_46, 1E-10);
    }

    #[test]
    fn ln_pdf_agrees_for_f32_and_f64() {
        let gauss = Gaussian::new(0.5, 2.0).unwrap();
        assert::close(gauss.ln_pdf(&1.5_f32), gauss.ln_pdf(&1.5_f64), TOL);
    }

    #[test]
    fn draws_should_be_finite() {
        let mut rng = rand::thread_rng();
        let gauss = Gaussian::standard();
        for _ in 0..100 {
            let x: f64 = gauss.draw(&mut rng);
            assert!(x.is_finite());
        }
    }

    #[test]
    fn sample_length() {
        let mut rng = rand::thread_rng();
        let gauss = Gaussian::standard();
        let xs: Vec<f64> = gauss.sample(10, &mut rng);
        assert_eq!(xs.len(), 10);
    }

    #[test]
    fn should_contain_finite_values() {
        let gauss = Gaussian::standard();
        assert!(gauss.supports(&0.0_f32));
        assert!(gauss.supports(&10E8_f64));
        assert!(!gauss.supports(&f64::NAN));
        assert!(!gauss.supports(&f64::INFINITY));
    }

    #[test]
    fn cdf_at_mean_should_be_one_half() {
        let mean: f64 = 2.3;
        let gauss = Gaussian::new(mean, 0.04).unwrap();
        assert::close(gauss.cdf(&mean), 0.5, TOL);
    }

    #[test]
    fn cdf_value_at_one() {
        let gauss = Gaussian::standard();
        assert::close(gauss.cdf(&1.0_f64), 0.841_344_746_068_542_9, TOL);
    }

    #[test]
    fn quantile_at_one_half_should_be_the_mean() {
        let mean = 1.2315;
        let gauss = Gaussian::new(mean, 1.0).unwrap();
        let x: f64 = gauss.quantile(0.5);
        assert::close(x, mean, TOL);
    }

    #[test]
    fn quantile_agree_with_cdf() {
        let mut rng = rand::thread_rng();
        let gauss = Gaussian::standard();
        let xs: Vec<f64> = gauss.sample(100, &mut rng);

        for x in &xs {
            let p = gauss.cdf(x);
            let y: f64 = gauss.quantile(p);
            assert::close(y, *x, 1E-9);
        }
    }

    #[test]
    fn ln_f_after_set_var_works() {
        let mut gauss = Gaussian::new(-1.2, 5.0).unwrap();

        gauss.set_var(0.1089).unwrap();
        assert::close(gauss.ln_pdf(&-1.2_f64), 0.189_724_091_316_938_46, 1E-10);
    }

    #[test]
    fn emit_params_round_trips() {
        let gauss = Gaussian::new(-0.3, 2.33).unwrap();
        let params = gauss.emit_params();
        assert_eq!(Gaussian::from_params(params), gauss);
    }

    #[cfg(feature = "serde1")]
    #[test]
    fn serde_round_trip() {
        let gauss = Gaussian::new(-1.3, 2.4).unwrap();
        let ser = serde_json::to_string(&gauss).unwrap();
        let de: Gaussian = serde_json::from_str(&ser).unwrap();
        assert_eq!(de, gauss);
    }

    #[cfg(feature = "serde1")]
    #[test]
    fn serde_rejects_invalid_variance() {
        use indoc::indoc;
        let res: Result<Gaussian, _> =
            serde_json::from_str(indoc! {r#"
                {
                    "mean": 0.0,
                    "var": -1.0
                }
            "#});
        assert!(res.is_err());
    }
}
