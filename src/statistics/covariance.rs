//! Channel covariance estimation with Ledoit-Wolf shrinkage.
//!
//! Samples are channel vectors: every time point of every trial inside the
//! requested window contributes one sample. The empirical covariance is
//! accumulated in a single pass with Welford's algorithm, then shrunk toward
//! a scaled identity with the Ledoit-Wolf (2004) optimal intensity.

use nalgebra::{DMatrix, DVector};

/// Result of covariance estimation including diagnostics.
#[derive(Debug, Clone)]
pub struct CovarianceEstimate {
    /// The shrunk `channels x channels` covariance matrix.
    pub matrix: DMatrix<f64>,

    /// Number of channel vectors the estimate is based on.
    pub n_samples: usize,

    /// Shrinkage intensity in [0, 1] (0 = empirical, 1 = scaled identity).
    pub shrinkage: f64,
}

/// Online covariance accumulator using Welford's algorithm.
///
/// Keeps the running mean and the sum of centered outer products, so the
/// samples never have to be materialized as one large matrix.
#[derive(Debug, Clone)]
pub struct WelfordCovariance {
    n: usize,
    mean: DVector<f64>,
    m2: DMatrix<f64>,
}

impl WelfordCovariance {
    /// Create an empty accumulator for `dim`-dimensional vectors.
    pub fn new(dim: usize) -> Self {
        Self {
            n: 0,
            mean: DVector::zeros(dim),
            m2: DMatrix::zeros(dim, dim),
        }
    }

    /// Add one vector.
    ///
    /// ```text
    /// δ = x - μₙ₋₁
    /// μₙ = μₙ₋₁ + δ/n
    /// M2ₙ = M2ₙ₋₁ + δ·(x - μₙ)ᵀ
    /// ```
    pub fn update<S>(&mut self, x: &nalgebra::Matrix<f64, nalgebra::Dyn, nalgebra::U1, S>)
    where
        S: nalgebra::Storage<f64, nalgebra::Dyn, nalgebra::U1>,
    {
        self.n += 1;
        let n = self.n as f64;

        let delta = x - &self.mean;
        self.mean += &delta / n;
        let delta2 = x - &self.mean;

        self.m2 += delta * delta2.transpose();
    }

    /// Number of vectors accumulated.
    pub fn count(&self) -> usize {
        self.n
    }

    /// Running mean.
    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Maximum-likelihood covariance `M2 / n`, or `None` when empty.
    pub fn population_covariance(&self) -> Option<DMatrix<f64>> {
        if self.n == 0 {
            return None;
        }
        let mut cov = &self.m2 / self.n as f64;
        // M2 is symmetric up to rounding; make it exactly so.
        let transposed = cov.transpose();
        cov = (cov + transposed) * 0.5;
        Some(cov)
    }
}

/// Ledoit-Wolf shrunk covariance of a set of channel vectors.
///
/// `samples` is called twice: once to accumulate the empirical covariance
/// and once more to compute the shrinkage intensity from the centered
/// samples. Returns `None` if there are no samples.
pub fn shrunk_covariance<'a, F, I>(dim: usize, samples: F) -> Option<CovarianceEstimate>
where
    F: Fn() -> I,
    I: Iterator<Item = nalgebra::DVectorView<'a, f64>>,
{
    let mut acc = WelfordCovariance::new(dim);
    for x in samples() {
        acc.update(&x);
    }
    let emp_cov = acc.population_covariance()?;
    let n = acc.count() as f64;
    let p = dim as f64;

    // Σ_k ‖x_k − μ‖⁴
    let fourth_moment: f64 = samples()
        .map(|x| {
            let sq = (&x - acc.mean()).norm_squared();
            sq * sq
        })
        .sum();

    let trace = emp_cov.trace();
    let mu = trace / p;
    let frob_sq = emp_cov.norm_squared();

    let beta = (fourth_moment / n - frob_sq) / (p * n);
    let delta = (frob_sq - 2.0 * mu * trace + p * mu * mu) / p;
    let beta = beta.min(delta);
    let shrinkage = if beta <= 0.0 || delta == 0.0 {
        0.0
    } else {
        beta / delta
    };

    let matrix = &emp_cov * (1.0 - shrinkage) + DMatrix::identity(dim, dim) * (shrinkage * mu);

    Some(CovarianceEstimate {
        matrix,
        n_samples: acc.count(),
        shrinkage,
    })
}

/// Population covariance of a batch of vectors (test reference).
#[cfg(test)]
fn batch_covariance(vectors: &[DVector<f64>]) -> DMatrix<f64> {
    let n = vectors.len();
    let dim = vectors[0].len();
    let mut mean = DVector::zeros(dim);
    for v in vectors {
        mean += v;
    }
    mean /= n as f64;

    let mut cov = DMatrix::zeros(dim, dim);
    for v in vectors {
        let centered = v - &mean;
        cov += &centered * centered.transpose();
    }
    cov / n as f64
}
