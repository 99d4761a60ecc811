//! Mathematical and algorithmic constants

/// 0.5 ln(2π)
pub const HALF_LN_2PI: f64 = 0.918_938_533_204_672_7;

/// Default cap on the number of EM iterations
pub const EM_MAX_ITERS: usize = 200;

/// Default absolute log-likelihood tolerance for EM convergence
pub const EM_CONVERGENCE_TOL: f64 = 1e-7;

/// Seed for the variance accumulator in the M-step, so a component that
/// captures a single distinct value cannot collapse to zero variance
pub const VAR_EPS: f64 = 1e-6;
