//! Re-imports for convenience
#[doc(no_inline)]
pub use crate::data::{DataOrHistogram, Histogram};
#[doc(no_inline)]
pub use crate::dist::{
    Gaussian, GaussianError, GaussianMixture, MixtureError, MixtureOptions,
    MixtureParameters,
};
#[doc(no_inline)]
pub use crate::traits::*;
