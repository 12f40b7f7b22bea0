//! Configuration for cross-validated RDM computation.

use crate::types::Normalization;

/// Configuration options for [`TemporalRsa`](crate::TemporalRsa).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Number of stratified random splits (default: 10).
    pub n_splits: usize,

    /// Fraction of trials held out for testing in each split (default: 0.5).
    pub test_size: f64,

    /// Noise normalization applied inside each fold (default: none).
    pub normalization: Normalization,

    /// Maximum number of folds computed concurrently (default: 1).
    ///
    /// Values above 1 only take effect with the `parallel` feature.
    pub parallelism: usize,

    /// Seed for the default splitter. `None` draws a fresh seed per call.
    pub seed: Option<u64>,

    /// Run preflight checks before dispatching folds (default: true).
    pub preflight: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            n_splits: 10,
            test_size: 0.5,
            normalization: Normalization::None,
            parallelism: 1,
            seed: None,
            preflight: true,
        }
    }
}
