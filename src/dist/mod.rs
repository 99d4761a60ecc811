//! Distribution types
pub mod gaussian;
pub mod mixture;

pub use self::gaussian::{Gaussian, GaussianError, GaussianParameters};
pub use self::mixture::{
    GaussianMixture, MixtureError, MixtureOptions, MixtureParameters,
};
