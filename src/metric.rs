//! Symmetric dissimilarity metrics between condition prototypes.
//!
//! A metric compares the trials of one condition (drawn from the training
//! partition) with the trials of another condition (drawn from the testing
//! partition) at a single pair of time samples. The built-in metrics work on
//! the condition prototypes, i.e. the trial average of each set.
//!
//! Metrics must be symmetric: `evaluate(a, b) == evaluate(b, a)`. The fold
//! processor only evaluates the upper triangle of each time-by-time matrix
//! and mirrors it, so an asymmetric metric silently yields a wrong RDM. The
//! preflight check [`crate::preflight::symmetry_check`] probes this.

use nalgebra::{DMatrix, DVector};

use crate::types::Label;

/// Channel vectors of one condition at one time sample.
///
/// Columns are trials, rows are channels. The prototype (trial mean) is
/// computed once on construction and shared by every metric evaluation
/// involving this set.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSet {
    trials: DMatrix<f64>,
    prototype: DVector<f64>,
}

impl SignalSet {
    /// Wrap a `channels x trials` matrix.
    pub fn new(trials: DMatrix<f64>) -> Self {
        let prototype = if trials.ncols() == 0 {
            DVector::zeros(trials.nrows())
        } else {
            trials.column_mean()
        };
        Self { trials, prototype }
    }

    /// Gather column `t` of every trial in `trials`.
    pub fn at_time<'a, I>(trials: I, n_channels: usize, t: usize) -> Self
    where
        I: IntoIterator<Item = &'a DMatrix<f64>>,
    {
        let columns: Vec<DVector<f64>> = trials
            .into_iter()
            .map(|trial| trial.column(t).into_owned())
            .collect();
        let data = if columns.is_empty() {
            DMatrix::zeros(n_channels, 0)
        } else {
            DMatrix::from_columns(&columns)
        };
        Self::new(data)
    }

    /// Per-trial channel vectors (`channels x trials`).
    pub fn trials(&self) -> &DMatrix<f64> {
        &self.trials
    }

    /// Trial-averaged channel vector.
    pub fn prototype(&self) -> &DVector<f64> {
        &self.prototype
    }

    /// Number of trials in the set.
    pub fn n_trials(&self) -> usize {
        self.trials.ncols()
    }
}

/// Symmetric dissimilarity between two condition signal sets.
///
/// `train_labels` and `test_labels` are the labels of the whole training and
/// testing partitions of the current fold, for metrics that need them (for
/// instance a classifier-based distance). The built-in metrics ignore them.
///
/// Any `Fn(&SignalSet, &SignalSet, &[Label], &[Label]) -> f64` closure that
/// is `Send + Sync` implements this trait.
pub trait Metric: Send + Sync {
    /// Dissimilarity between `a` (training trials) and `b` (testing trials).
    fn evaluate(
        &self,
        a: &SignalSet,
        b: &SignalSet,
        train_labels: &[Label],
        test_labels: &[Label],
    ) -> f64;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> Metric for F
where
    F: Fn(&SignalSet, &SignalSet, &[Label], &[Label]) -> f64 + Send + Sync,
{
    fn evaluate(
        &self,
        a: &SignalSet,
        b: &SignalSet,
        train_labels: &[Label],
        test_labels: &[Label],
    ) -> f64 {
        self(a, b, train_labels, test_labels)
    }
}

/// Fisher-transformed Pearson correlation between prototypes.
///
/// Computes `atanh(1 - d)` where `d` is the correlation distance between the
/// two prototypes. Identical prototypes give `d = 0` and therefore `+inf`;
/// this value is passed through unclamped. A constant prototype has no
/// defined correlation and yields NaN.
#[derive(Debug, Clone, Copy, Default)]
pub struct Correlation;

impl Metric for Correlation {
    fn evaluate(&self, a: &SignalSet, b: &SignalSet, _: &[Label], _: &[Label]) -> f64 {
        (1.0 - correlation_distance(a.prototype(), b.prototype())).atanh()
    }

    fn name(&self) -> &str {
        "correlation"
    }
}

/// Euclidean distance between prototypes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Euclidean;

impl Metric for Euclidean {
    fn evaluate(&self, a: &SignalSet, b: &SignalSet, _: &[Label], _: &[Label]) -> f64 {
        (a.prototype() - b.prototype()).norm()
    }

    fn name(&self) -> &str {
        "euclidean"
    }
}

/// Correlation distance `1 - r` between two vectors.
///
/// Both vectors are centered on their own mean first. For `u == v` the
/// result is exactly zero: `sqrt(x * x) == x` in IEEE arithmetic, so the
/// normalized dot product is exactly one.
pub fn correlation_distance(u: &DVector<f64>, v: &DVector<f64>) -> f64 {
    let u = u.add_scalar(-u.mean());
    let v = v.add_scalar(-v.mean());
    let uv = u.dot(&v);
    let uu = u.dot(&u);
    let vv = v.dot(&v);
    1.0 - uv / (uu * vv).sqrt()
}
