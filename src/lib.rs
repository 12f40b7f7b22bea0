//! # temporal-rsa
//!
//! Cross-validated, time-resolved representational dissimilarity matrices.
//!
//! Given trial-structured recordings (channels x time samples per trial) and
//! one condition label per trial, this crate computes for every pair of
//! conditions and every pair of time samples how dissimilar the two
//! conditions' activity patterns are. Dissimilarities are cross-validated:
//! the first condition of each pair is read from training trials, the second
//! from held-out testing trials, and the per-fold results are averaged.
//!
//! - Pluggable metrics ([`Correlation`], [`Euclidean`], or any closure)
//! - Optional noise normalization, fitted on training trials only
//! - Stratified shuffle splits or caller-provided splits
//! - Parallel fold dispatch with results identical to sequential runs
//!
//! ## Quick Start
//!
//! ```ignore
//! use temporal_rsa::{Correlation, Epochs, Label, Normalization, TemporalRsa};
//!
//! let epochs = Epochs::new(trials, times)?;
//! let labels: Vec<Label> = conditions.iter().map(|&c| Label::Int(c)).collect();
//!
//! let rdm = TemporalRsa::new()
//!     .n_splits(20)
//!     .normalization(Normalization::Epoch)
//!     .parallelism(4)
//!     .seed(42)
//!     .compute(&epochs, &labels, &Correlation)?;
//!
//! println!("{}", temporal_rsa::output::to_json(&rdm)?);
//! ```
//!
//! ## Symmetric metrics only
//!
//! Each fold evaluates only `t1 <= t2` and mirrors the value. A metric whose
//! value changes when its arguments are swapped yields a wrong tensor; the
//! preflight checks flag such metrics with
//! [`PreflightWarning::AsymmetricMetric`](preflight::PreflightWarning).

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod config;
mod epochs;
mod error;
mod rdm;
mod rsa;
mod thread_pool;
mod types;

// Functional modules
pub mod fold;
pub mod metric;
pub mod output;
pub mod preflight;
pub mod split;
pub mod statistics;
pub mod whitening;

// Re-exports for public API
pub use config::Config;
pub use epochs::{Epochs, EpochsView};
pub use error::{Result, RsaError};
pub use fold::compute_fold;
pub use metric::{Correlation, Euclidean, Metric, SignalSet};
pub use rdm::{condition_pairs, Metadata, Rdm};
pub use rsa::TemporalRsa;
pub use split::{ExplicitSplits, Split, Splitter, StratifiedShuffleSplit};
pub use types::{Label, Normalization, TimeWindow};
pub use whitening::{ShrinkageWhitener, Whitener, Whitening};

/// Compute a cross-validated RDM with default settings and a given splitter.
///
/// `normalization` is one of `"none"`, `"epoch"` (alias `"whole-epoch"`) or
/// `"baseline"`. It is parsed before anything else happens, so an unknown
/// mode fails without consulting the splitter or reading any trial.
///
/// # Errors
///
/// Returns [`RsaError::Configuration`] for an unknown normalization string or
/// zero parallelism, plus everything
/// [`TemporalRsa::compute_with_splitter`] can return.
pub fn compute_temporal_rdm<M, S>(
    epochs: &Epochs,
    labels: &[Label],
    metric: &M,
    splitter: &S,
    normalization: &str,
    parallelism: usize,
) -> Result<Rdm>
where
    M: Metric + ?Sized,
    S: Splitter + ?Sized,
{
    let normalization: Normalization = normalization.parse()?;
    TemporalRsa::new()
        .normalization(normalization)
        .parallelism(parallelism)
        .compute_with_splitter(epochs, labels, metric, splitter)
}
