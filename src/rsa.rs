//! Main `TemporalRsa` entry point and builder.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::epochs::Epochs;
use crate::error::{Result, RsaError};
use crate::fold::compute_fold;
use crate::metric::Metric;
use crate::preflight::run_all_checks;
use crate::rdm::Rdm;
use crate::split::{Split, Splitter, StratifiedShuffleSplit};
use crate::thread_pool;
use crate::types::{ensure_scalar_labels, unique_sorted, Label, Normalization};
use crate::whitening::{ShrinkageWhitener, Whitener};

/// Cross-validated, time-resolved RDM computation.
///
/// Use the builder methods to configure, then call [`compute`](Self::compute)
/// (default stratified splits) or
/// [`compute_with_splitter`](Self::compute_with_splitter).
///
/// # Example
///
/// ```ignore
/// use temporal_rsa::{Correlation, Normalization, TemporalRsa};
///
/// let rdm = TemporalRsa::new()
///     .n_splits(20)
///     .normalization(Normalization::Baseline)
///     .parallelism(4)
///     .seed(42)
///     .compute(&epochs, &labels, &Correlation)?;
///
/// let (n_pairs, n_times, _) = rdm.shape();
/// ```
#[derive(Clone)]
pub struct TemporalRsa {
    config: Config,
    whitener: Arc<dyn Whitener>,
}

impl fmt::Debug for TemporalRsa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporalRsa")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for TemporalRsa {
    fn default() -> Self {
        Self::new()
    }
}

impl TemporalRsa {
    /// Create with default configuration.
    ///
    /// 10 stratified splits holding out half of the trials, no
    /// normalization, sequential execution and a shrinkage whitener for
    /// when normalization is switched on.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            whitener: Arc::new(ShrinkageWhitener::default()),
        }
    }

    /// Create from an explicit configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            ..Self::new()
        }
    }

    /// Set the number of stratified splits.
    pub fn n_splits(mut self, n: usize) -> Self {
        self.config.n_splits = n;
        self
    }

    /// Set the held-out fraction of each split.
    pub fn test_size(mut self, fraction: f64) -> Self {
        self.config.test_size = fraction;
        self
    }

    /// Set the noise normalization mode.
    pub fn normalization(mut self, normalization: Normalization) -> Self {
        self.config.normalization = normalization;
        self
    }

    /// Set the maximum number of concurrently computed folds.
    pub fn parallelism(mut self, workers: usize) -> Self {
        self.config.parallelism = workers;
        self
    }

    /// Fix the seed of the default splitter.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Enable or disable preflight checks.
    pub fn preflight(mut self, enabled: bool) -> Self {
        self.config.preflight = enabled;
        self
    }

    /// Replace the whitening collaborator.
    pub fn whitener<W: Whitener + 'static>(mut self, whitener: W) -> Self {
        self.whitener = Arc::new(whitener);
        self
    }

    /// Get the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The splitter [`compute`](Self::compute) uses.
    pub fn default_splitter(&self) -> StratifiedShuffleSplit {
        let splitter = StratifiedShuffleSplit::new(self.config.n_splits, self.config.test_size);
        match self.config.seed {
            Some(seed) => splitter.seed(seed),
            None => splitter,
        }
    }

    /// Compute the RDM with stratified shuffle splits.
    ///
    /// # Errors
    ///
    /// See [`compute_with_splitter`](Self::compute_with_splitter).
    pub fn compute<M>(&self, epochs: &Epochs, labels: &[Label], metric: &M) -> Result<Rdm>
    where
        M: Metric + ?Sized,
    {
        self.compute_with_splitter(epochs, labels, metric, &self.default_splitter())
    }

    /// Compute the RDM with a caller-provided splitter.
    ///
    /// Every split is processed by [`compute_fold`]; the per-fold tensors
    /// are averaged in split order. The call fails as soon as any fold
    /// fails and never returns a partial result.
    ///
    /// # Errors
    ///
    /// - [`RsaError::Configuration`] for zero parallelism, splitter
    ///   rejection or an empty split sequence.
    /// - [`RsaError::ContractViolation`] / [`RsaError::ShapeMismatch`] for
    ///   invalid labels or splits, as raised by [`compute_fold`].
    /// - [`RsaError::Whitening`] if the whitener fails on any fold.
    pub fn compute_with_splitter<M, S>(
        &self,
        epochs: &Epochs,
        labels: &[Label],
        metric: &M,
        splitter: &S,
    ) -> Result<Rdm>
    where
        M: Metric + ?Sized,
        S: Splitter + ?Sized,
    {
        let config = &self.config;
        if config.parallelism == 0 {
            return Err(RsaError::Configuration {
                reason: "parallelism must be at least 1".to_string(),
            });
        }
        ensure_scalar_labels(labels)?;
        if labels.len() != epochs.len() {
            return Err(RsaError::ShapeMismatch {
                what: "labels per trial",
                expected: epochs.len(),
                got: labels.len(),
            });
        }

        let start = Instant::now();

        let warnings = if config.preflight {
            run_all_checks(epochs, labels, metric)
        } else {
            Vec::new()
        };
        for warning in &warnings {
            tracing::warn!("{}", warning.description());
        }

        let splits: Vec<Split> = splitter.split(labels)?.collect();
        if splits.is_empty() {
            return Err(RsaError::Configuration {
                reason: "splitter produced no splits".to_string(),
            });
        }

        tracing::info!(
            n_folds = splits.len(),
            n_trials = epochs.len(),
            n_labels = unique_sorted(labels).len(),
            n_times = epochs.n_times(),
            parallelism = config.parallelism,
            normalization = %config.normalization,
            metric = metric.name(),
            "computing cross-validated RDM"
        );

        let whitener = self.whitener.as_ref();
        let folds = thread_pool::try_map(config.parallelism, &splits, |k, split| {
            tracing::debug!(
                fold = k,
                n_train = split.train.len(),
                n_test = split.test.len(),
                "computing fold"
            );
            compute_fold(epochs, labels, split, metric, config.normalization, whitener)
        })?;

        let mut rdm = Rdm::mean(folds)?;
        rdm.metadata_mut().warnings = warnings;

        tracing::info!(
            n_folds = rdm.metadata().n_folds,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "cross-validated RDM complete"
        );

        Ok(rdm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let rsa = TemporalRsa::new();
        assert_eq!(rsa.config(), &Config::default());
        assert_eq!(rsa.config().n_splits, 10);
        assert_eq!(rsa.config().test_size, 0.5);
        assert_eq!(rsa.config().parallelism, 1);
    }

    #[test]
    fn test_builder() {
        let rsa = TemporalRsa::new()
            .n_splits(4)
            .test_size(0.25)
            .normalization(Normalization::Epoch)
            .parallelism(3)
            .seed(9)
            .preflight(false);
        let config = rsa.config();
        assert_eq!(config.n_splits, 4);
        assert_eq!(config.test_size, 0.25);
        assert_eq!(config.normalization, Normalization::Epoch);
        assert_eq!(config.parallelism, 3);
        assert_eq!(config.seed, Some(9));
        assert!(!config.preflight);
        assert_eq!(rsa.default_splitter().n_splits(), 4);
    }

    #[test]
    fn test_zero_parallelism_rejected() {
        let epochs = Epochs::new(Vec::new(), vec![0.0]).unwrap();
        let err = TemporalRsa::new()
            .parallelism(0)
            .compute(&epochs, &[], &crate::metric::Euclidean)
            .unwrap_err();
        assert!(matches!(err, RsaError::Configuration { .. }));
    }
}
