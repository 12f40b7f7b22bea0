//! Time-resolved RDM tensor.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RsaError};
use crate::preflight::PreflightWarning;
use crate::types::{Label, Normalization};

/// Dissimilarity tensor of shape `(n_condition_pairs, n_times, n_times)`.
///
/// Condition pairs are the upper triangle (diagonal included) of the sorted
/// unique labels, enumerated row by row: `(l0, l0), (l0, l1), ..., (l1, l1),
/// ...`. For pair `(a, b)` the first label's trials come from the training
/// partition and the second label's from the testing partition; the row
/// time index refers to `a` and the column time index to `b`.
///
/// Every `n_times x n_times` slice is symmetric.
#[derive(Debug, Clone, PartialEq)]
pub struct Rdm {
    pairs: Vec<(Label, Label)>,
    times: Vec<f64>,
    values: Vec<DMatrix<f64>>,
    metadata: Metadata,
}

/// How an RDM was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Number of folds averaged.
    pub n_folds: usize,
    /// Number of trials in the input collection.
    pub n_trials: usize,
    /// Normalization applied inside each fold.
    pub normalization: Normalization,
    /// Name of the metric.
    pub metric: String,
    /// Non-fatal warnings raised before dispatch.
    pub warnings: Vec<PreflightWarning>,
}

/// Condition pairs `(labels[i], labels[j])` for `i <= j`, row by row.
pub fn condition_pairs(labels: &[Label]) -> Vec<(Label, Label)> {
    let mut pairs = Vec::with_capacity(labels.len() * (labels.len() + 1) / 2);
    for (i, a) in labels.iter().enumerate() {
        for b in &labels[i..] {
            pairs.push((a.clone(), b.clone()));
        }
    }
    pairs
}

impl Rdm {
    /// Zero-initialized tensor for the given pairs and time axis.
    pub(crate) fn zeros(pairs: Vec<(Label, Label)>, times: Vec<f64>, metadata: Metadata) -> Self {
        let n_times = times.len();
        let values = vec![DMatrix::zeros(n_times, n_times); pairs.len()];
        Self {
            pairs,
            times,
            values,
            metadata,
        }
    }

    /// Store `value` at `(pair, t1, t2)` and `(pair, t2, t1)`.
    pub(crate) fn set_symmetric(&mut self, pair: usize, t1: usize, t2: usize, value: f64) {
        let m = &mut self.values[pair];
        m[(t1, t2)] = value;
        m[(t2, t1)] = value;
    }

    /// Elementwise mean of fold tensors, summed in the order given.
    ///
    /// # Errors
    ///
    /// Returns [`RsaError::Configuration`] for an empty fold list and
    /// [`RsaError::ShapeMismatch`] if the folds disagree in shape.
    pub fn mean(folds: Vec<Rdm>) -> Result<Rdm> {
        let n_folds = folds.len();
        let mut iter = folds.into_iter();
        let mut acc = iter.next().ok_or_else(|| RsaError::Configuration {
            reason: "no folds to average".to_string(),
        })?;

        for fold in iter {
            if fold.values.len() != acc.values.len() {
                return Err(RsaError::ShapeMismatch {
                    what: "fold condition pairs",
                    expected: acc.values.len(),
                    got: fold.values.len(),
                });
            }
            if fold.n_times() != acc.n_times() {
                return Err(RsaError::ShapeMismatch {
                    what: "fold time samples",
                    expected: acc.n_times(),
                    got: fold.n_times(),
                });
            }
            for (sum, m) in acc.values.iter_mut().zip(&fold.values) {
                *sum += m;
            }
        }

        for m in &mut acc.values {
            *m /= n_folds as f64;
        }
        acc.metadata.n_folds = n_folds;
        Ok(acc)
    }

    /// `(n_condition_pairs, n_times, n_times)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.values.len(), self.n_times(), self.n_times())
    }

    /// Number of condition pairs.
    pub fn n_pairs(&self) -> usize {
        self.values.len()
    }

    /// Number of time samples.
    pub fn n_times(&self) -> usize {
        self.times.len()
    }

    /// Value at `(pair, t1, t2)`.
    pub fn get(&self, pair: usize, t1: usize, t2: usize) -> f64 {
        self.values[pair][(t1, t2)]
    }

    /// Time-by-time matrix of one condition pair.
    pub fn matrix(&self, pair: usize) -> &DMatrix<f64> {
        &self.values[pair]
    }

    /// All time-by-time matrices, in condition-pair order.
    pub fn matrices(&self) -> &[DMatrix<f64>] {
        &self.values
    }

    /// Labels of each condition pair.
    pub fn condition_pairs(&self) -> &[(Label, Label)] {
        &self.pairs
    }

    /// Index of the pair `(a, b)`, if present.
    pub fn pair_index(&self, a: &Label, b: &Label) -> Option<usize> {
        self.pairs.iter().position(|(x, y)| x == a && y == b)
    }

    /// Time axis in seconds.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Provenance of this tensor.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub(crate) fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Whether every slice equals its transpose bit for bit (NaN == NaN).
    pub fn is_symmetric(&self) -> bool {
        self.values.iter().all(|m| {
            (0..m.nrows()).all(|i| (0..i).all(|j| m[(i, j)].to_bits() == m[(j, i)].to_bits()))
        })
    }

    /// Copy out as nested `[pair][t1][t2]` vectors.
    pub fn to_nested(&self) -> Vec<Vec<Vec<f64>>> {
        self.values
            .iter()
            .map(|m| {
                (0..m.nrows())
                    .map(|i| m.row(i).iter().copied().collect())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> Metadata {
        Metadata {
            n_folds: 1,
            n_trials: 4,
            normalization: Normalization::None,
            metric: "euclidean".into(),
            warnings: Vec::new(),
        }
    }

    fn labels(n: i64) -> Vec<Label> {
        (0..n).map(Label::Int).collect()
    }

    #[test]
    fn test_condition_pair_enumeration() {
        let pairs = condition_pairs(&labels(3));
        assert_eq!(pairs.len(), 6);
        assert_eq!(pairs[0], (Label::Int(0), Label::Int(0)));
        assert_eq!(pairs[2], (Label::Int(0), Label::Int(2)));
        assert_eq!(pairs[3], (Label::Int(1), Label::Int(1)));
        assert_eq!(pairs[5], (Label::Int(2), Label::Int(2)));
    }

    #[test]
    fn test_set_symmetric_and_shape() {
        let mut rdm = Rdm::zeros(condition_pairs(&labels(2)), vec![0.0, 0.1, 0.2], metadata());
        assert_eq!(rdm.shape(), (3, 3, 3));
        rdm.set_symmetric(1, 0, 2, 4.5);
        assert_eq!(rdm.get(1, 0, 2), 4.5);
        assert_eq!(rdm.get(1, 2, 0), 4.5);
        assert!(rdm.is_symmetric());
        assert_eq!(rdm.pair_index(&Label::Int(0), &Label::Int(1)), Some(1));
        assert_eq!(rdm.pair_index(&Label::Int(1), &Label::Int(0)), None);
        assert_eq!(rdm.to_nested()[1][2][0], 4.5);
    }

    #[test]
    fn test_mean_of_folds() {
        let pairs = condition_pairs(&labels(1));
        let mut a = Rdm::zeros(pairs.clone(), vec![0.0, 0.1], metadata());
        let mut b = Rdm::zeros(pairs, vec![0.0, 0.1], metadata());
        a.set_symmetric(0, 0, 1, 1.0);
        b.set_symmetric(0, 0, 1, 3.0);
        b.set_symmetric(0, 1, 1, f64::INFINITY);

        let mean = Rdm::mean(vec![a, b]).unwrap();
        assert_eq!(mean.get(0, 0, 1), 2.0);
        assert_eq!(mean.get(0, 1, 0), 2.0);
        assert_eq!(mean.get(0, 1, 1), f64::INFINITY);
        assert_eq!(mean.metadata().n_folds, 2);
    }

    #[test]
    fn test_mean_rejects_empty_and_mismatched() {
        assert!(matches!(Rdm::mean(Vec::new()), Err(RsaError::Configuration { .. })));

        let a = Rdm::zeros(condition_pairs(&labels(1)), vec![0.0], metadata());
        let b = Rdm::zeros(condition_pairs(&labels(2)), vec![0.0], metadata());
        assert!(matches!(Rdm::mean(vec![a, b]), Err(RsaError::ShapeMismatch { .. })));
    }
}
