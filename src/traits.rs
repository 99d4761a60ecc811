//! Distribution traits
use rand::Rng;

/// Evaluate the probability density of a distribution.
pub trait HasDensity<X> {
    /// Probability function at `x`
    fn f(&self, x: &X) -> f64 {
        self.ln_f(x).exp()
    }

    /// Log probability function at `x`
    fn ln_f(&self, x: &X) -> f64;
}

/// Draw random values from a distribution.
pub trait Sampleable<X> {
    /// Single draw
    fn draw<R: Rng>(&self, rng: &mut R) -> X;

    /// Multiple draws
    fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<X> {
        (0..n).map(|_| self.draw(rng)).collect()
    }
}

/// Continuous probability distributions
pub trait ContinuousDistr<X>: HasDensity<X> {
    /// The value of the Probability Density Function (PDF) at `x`
    fn pdf(&self, x: &X) -> f64 {
        self.ln_pdf(x).exp()
    }

    /// The value of the log PDF at `x`
    fn ln_pdf(&self, x: &X) -> f64 {
        self.ln_f(x)
    }
}

/// Identifies the support of a distribution
pub trait Support<X> {
    /// Returns `true` if `x` is in the support
    fn supports(&self, x: &X) -> bool;
}

/// Cumulative distribution function
pub trait Cdf<X>: HasDensity<X> {
    /// The value of the Cumulative Density Function at `x`
    fn cdf(&self, x: &X) -> f64;

    /// Survival function
    fn sf(&self, x: &X) -> f64 {
        1.0 - self.cdf(x)
    }
}

/// Quantile function
pub trait InverseCdf<X>: HasDensity<X> {
    /// The value of `x` at the given probability in the CDF
    fn invcdf(&self, p: f64) -> X;

    /// Alias for `invcdf`
    fn quantile(&self, p: f64) -> X {
        self.invcdf(p)
    }
}

pub trait Mean<M> {
    fn mean(&self) -> Option<M>;
}

pub trait Variance<V> {
    fn variance(&self) -> Option<V>;
}

/// A distribution defined by a flat record of parameters
pub trait Parameterized {
    type Parameters;

    /// Copy the parameters out as a flat record
    fn emit_params(&self) -> Self::Parameters;

    /// Rebuild the distribution from a flat record
    fn from_params(params: Self::Parameters) -> Self;
}
