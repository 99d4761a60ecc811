//! One-dimensional Gaussian mixture models fit by expectation-maximization.
//!
//! A [`GaussianMixture`](crate::dist::GaussianMixture) holds mixing weights,
//! means, and variances for `k` Gaussian components. The E-step
//! ([`membership`](crate::dist::GaussianMixture::membership)) soft-assigns
//! observations to components, the M-step
//! ([`update`](crate::dist::GaussianMixture::update)) re-estimates the
//! parameters from those assignments, and
//! [`fit`](crate::dist::GaussianMixture::fit) iterates the two until the
//! log-likelihood stabilizes. Fitting can be regularized by a variance prior
//! and a separation prior, and seeded by k-means++.
//!
//! Large or heavily repeated datasets can be aggregated into a
//! [`Histogram`](crate::data::Histogram) first; every operation then runs
//! once per distinct bin instead of once per raw observation.
//!
//! # Examples
//!
//! Soft assignment of a point to each component:
//!
//! ```
//! use mixfit::prelude::*;
//!
//! let gmm = GaussianMixture::new(
//!     vec![0.5, 0.5],
//!     vec![-3.0, 3.0],
//!     vec![1.0, 1.0],
//! ).unwrap();
//!
//! let resp = gmm.membership(-2.5);
//! assert!(resp[0] > 0.99);
//! assert!((resp.iter().sum::<f64>() - 1.0).abs() < 1e-12);
//! ```
//!
//! Fitting a two-component mixture:
//!
//! ```
//! use mixfit::prelude::*;
//! use rand::rngs::SmallRng;
//! use rand::SeedableRng;
//!
//! let mut rng = SmallRng::seed_from_u64(0x6A55);
//! let data = vec![-1.2, -0.8, 0.1, 0.4, 7.6, 8.1, 8.3, 9.0];
//!
//! let mut gmm = GaussianMixture::uniform(2).unwrap();
//! let iters = gmm.fit(&data, &mut rng).unwrap();
//! assert!(iters <= 200);
//! ```
#![warn(clippy::all)]
#![warn(clippy::imprecise_flops)]

#[cfg(doctest)]
doc_comment::doctest!("../README.md");

pub mod consts;
pub mod data;
pub mod dist;
pub mod misc;
pub mod prelude;
pub mod traits;
