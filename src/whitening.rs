//! Multivariate noise normalization.
//!
//! A [`Whitener`] is fitted on the training trials of a fold and produces a
//! linear [`Whitening`] transform, which the fold processor then applies to
//! both training and testing trials. Fitting never sees testing trials.

use nalgebra::{DMatrix, SymmetricEigen};

use crate::epochs::EpochsView;
use crate::error::{Result, RsaError};
use crate::statistics::shrunk_covariance;
use crate::types::TimeWindow;

/// Linear map over the channel dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Whitening {
    /// `channels x channels` transform.
    pub matrix: DMatrix<f64>,
    /// Channels the transform was estimated on, in column order.
    pub channel_names: Vec<String>,
}

impl Whitening {
    /// Transform one `channels x times` trial.
    ///
    /// # Errors
    ///
    /// Returns [`RsaError::ShapeMismatch`] if the trial's channel count does
    /// not match the transform.
    pub fn apply(&self, trial: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if trial.nrows() != self.matrix.ncols() {
            return Err(RsaError::ShapeMismatch {
                what: "whitening channels",
                expected: self.matrix.ncols(),
                got: trial.nrows(),
            });
        }
        Ok(&self.matrix * trial)
    }
}

/// Estimates a whitening transform from training trials.
pub trait Whitener: Send + Sync {
    /// Fit on the samples of `train` that fall inside `window`.
    fn fit(&self, train: &EpochsView<'_>, window: TimeWindow) -> Result<Whitening>;
}

/// Whitener built on the Ledoit-Wolf shrunk channel covariance.
///
/// The covariance is pooled over every in-window time sample of every
/// training trial. The transform is the symmetric inverse square root
/// `V diag(λ^-1/2) Vᵀ` over the eigenpairs whose eigenvalue exceeds
/// `rank_tolerance` times the largest one. Its output is indexed by channel;
/// directions below the tolerance are projected out.
#[derive(Debug, Clone, Copy)]
pub struct ShrinkageWhitener {
    /// Relative eigenvalue cutoff for rank reduction.
    pub rank_tolerance: f64,
}

impl Default for ShrinkageWhitener {
    fn default() -> Self {
        Self {
            rank_tolerance: 1e-10,
        }
    }
}

impl Whitener for ShrinkageWhitener {
    fn fit(&self, train: &EpochsView<'_>, window: TimeWindow) -> Result<Whitening> {
        let samples = window.select(train.times());
        if samples.is_empty() || train.is_empty() {
            return Err(RsaError::Whitening {
                reason: format!(
                    "no samples in window {:?}..{:?} across {} training trials",
                    window.tmin,
                    window.tmax,
                    train.len()
                ),
            });
        }

        let n_channels = train.n_channels();
        let estimate = shrunk_covariance(n_channels, || {
            train
                .trials()
                .flat_map(|trial| samples.iter().map(move |&t| trial.column(t)))
        })
        .ok_or_else(|| RsaError::Whitening {
            reason: "covariance estimate is empty".to_string(),
        })?;

        if estimate.matrix.iter().any(|v| !v.is_finite()) {
            return Err(RsaError::Whitening {
                reason: "covariance contains non-finite values".to_string(),
            });
        }

        tracing::debug!(
            n_samples = estimate.n_samples,
            shrinkage = estimate.shrinkage,
            "estimated shrunk covariance"
        );

        let eigen = SymmetricEigen::new(estimate.matrix);
        let max_eig = eigen.eigenvalues.max();
        if max_eig <= 0.0 {
            return Err(RsaError::Whitening {
                reason: "covariance has no positive eigenvalue".to_string(),
            });
        }

        let kept: Vec<usize> = (0..n_channels)
            .filter(|&k| eigen.eigenvalues[k] > max_eig * self.rank_tolerance)
            .collect();

        // V_kept diag(λ^-1/2) V_keptᵀ: whitened rows stay in channel space.
        let mut matrix = DMatrix::zeros(n_channels, n_channels);
        for &k in &kept {
            let v = eigen.eigenvectors.column(k);
            matrix += &v * v.transpose() / eigen.eigenvalues[k].sqrt();
        }

        Ok(Whitening {
            matrix,
            channel_names: train.channel_names().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epochs::Epochs;
    use crate::statistics::shrunk_covariance;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn noisy_epochs(n_trials: usize, seed: u64) -> Epochs {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let trials = (0..n_trials)
            .map(|_| {
                DMatrix::from_fn(3, 20, |c, _| {
                    let shared: f64 = rng.random_range(-1.0..1.0);
                    shared * (c as f64 + 1.0) + rng.random_range(-0.5..0.5)
                })
            })
            .collect();
        let times = (0..20).map(|i| -0.1 + i as f64 * 0.01).collect();
        Epochs::new(trials, times).unwrap()
    }

    #[test]
    fn test_whitener_inverts_covariance() {
        let epochs = noisy_epochs(10, 1);
        let view = epochs.view();
        let whitening = ShrinkageWhitener::default()
            .fit(&view, TimeWindow::full())
            .unwrap();
        assert_eq!(whitening.matrix.shape(), (3, 3));

        let samples = TimeWindow::full().select(epochs.times());
        let cov = shrunk_covariance(3, || {
            view.trials()
                .flat_map(|trial| samples.iter().map(move |&t| trial.column(t)))
        })
        .unwrap()
        .matrix;

        let identity = &whitening.matrix * cov * whitening.matrix.transpose();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((identity[(i, j)] - expected).abs() < 1e-8);
            }
        }
    }

    #[test]
    fn test_whitener_is_inverse_square_root_in_channel_space() {
        let epochs = noisy_epochs(10, 4);
        let view = epochs.view();
        let whitening = ShrinkageWhitener::default()
            .fit(&view, TimeWindow::full())
            .unwrap();
        let w = &whitening.matrix;
        assert_eq!(w.shape(), (3, 3));
        assert_eq!(whitening.channel_names, epochs.channel_names());
        assert_eq!(w, &w.transpose());
        assert!(SymmetricEigen::new(w.clone()).eigenvalues.min() > 0.0);

        let samples = TimeWindow::full().select(epochs.times());
        let cov = shrunk_covariance(3, || {
            view.trials()
                .flat_map(|trial| samples.iter().map(move |&t| trial.column(t)))
        })
        .unwrap()
        .matrix;

        // a symmetric positive definite W with W W cov = I is cov^{-1/2}
        let identity = w * w * cov;
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((identity[(i, j)] - expected).abs() < 1e-8);
            }
        }
    }

    #[test]
    fn test_empty_window_fails() {
        let epochs = noisy_epochs(4, 2);
        let err = ShrinkageWhitener::default()
            .fit(&epochs.view(), TimeWindow::until(-1.0))
            .unwrap_err();
        assert!(matches!(err, RsaError::Whitening { .. }));
    }

    #[test]
    fn test_constant_data_fails() {
        let trials = vec![DMatrix::from_element(2, 4, 3.0); 3];
        let epochs = Epochs::new(trials, vec![0.0, 0.1, 0.2, 0.3]).unwrap();
        let err = ShrinkageWhitener::default()
            .fit(&epochs.view(), TimeWindow::full())
            .unwrap_err();
        assert!(matches!(err, RsaError::Whitening { .. }));
    }

    #[test]
    fn test_apply_checks_channels() {
        let whitening = Whitening {
            matrix: DMatrix::identity(2, 2) * 2.0,
            channel_names: vec!["a".into(), "b".into()],
        };
        let trial = DMatrix::from_element(2, 3, 1.5);
        assert_eq!(whitening.apply(&trial).unwrap(), DMatrix::from_element(2, 3, 3.0));
        assert!(matches!(
            whitening.apply(&DMatrix::zeros(3, 3)),
            Err(RsaError::ShapeMismatch { .. })
        ));
    }
}
