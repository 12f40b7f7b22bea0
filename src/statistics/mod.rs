//! Statistical building blocks.
//!
//! - Covariance estimation with Welford accumulation and Ledoit-Wolf shrinkage
//! - Counter-based seed derivation for reproducible per-split randomness

mod covariance;
mod seed;

pub use covariance::{shrunk_covariance, CovarianceEstimate, WelfordCovariance};
pub use seed::counter_rng_seed;
