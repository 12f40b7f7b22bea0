//! Dissimilarity tensor for a single train/test partition.

use std::borrow::Cow;

use nalgebra::DMatrix;

use crate::epochs::{Epochs, EpochsView};
use crate::error::{Result, RsaError};
use crate::metric::{Metric, SignalSet};
use crate::rdm::{condition_pairs, Metadata, Rdm};
use crate::split::Split;
use crate::types::{ensure_scalar_labels, unique_sorted, Label, Normalization};
use crate::whitening::{Whitener, Whitening};

/// Compute the `(condition pair, t1, t2)` tensor for one fold.
///
/// For each pair of sorted unique labels `(a, b)` with `a <= b`, the
/// training trials labelled `a` at time `t1` are compared with the testing
/// trials labelled `b` at time `t2` for every `t1 <= t2`; the value is
/// mirrored to `(t2, t1)`.
///
/// When `normalization` requests whitening, `whitener` is fitted on the
/// training trials only and the resulting transform is applied to training
/// and testing trials alike.
///
/// # Errors
///
/// - [`RsaError::ContractViolation`] for a composite label, or when a label
///   of the full label vector has no trial in the training or testing
///   partition.
/// - [`RsaError::ShapeMismatch`] when the label vector and trial collection
///   differ in length, or a split index is out of range.
/// - Whatever the whitener returns.
pub fn compute_fold<M, W>(
    epochs: &Epochs,
    labels: &[Label],
    split: &Split,
    metric: &M,
    normalization: Normalization,
    whitener: &W,
) -> Result<Rdm>
where
    M: Metric + ?Sized,
    W: Whitener + ?Sized,
{
    ensure_scalar_labels(labels)?;
    if labels.len() != epochs.len() {
        return Err(RsaError::ShapeMismatch {
            what: "labels per trial",
            expected: epochs.len(),
            got: labels.len(),
        });
    }

    let (train, train_labels) = partition(epochs, labels, &split.train)?;
    let (test, test_labels) = partition(epochs, labels, &split.test)?;

    let (train_data, test_data, n_channels) = match normalization.window() {
        Some(window) => {
            let whitening = whitener.fit(&train, window)?;
            let train_data = whiten(&train, &whitening)?;
            let test_data = whiten(&test, &whitening)?;
            (train_data, test_data, whitening.matrix.nrows())
        }
        None => (
            train.trials().map(Cow::Borrowed).collect(),
            test.trials().map(Cow::Borrowed).collect(),
            epochs.n_channels(),
        ),
    };

    let unique = unique_sorted(labels);
    let n_times = epochs.n_times();
    let train_sets = signal_sets(
        &unique,
        &train_data,
        &train_labels,
        n_channels,
        n_times,
        "training",
    )?;
    let test_sets = signal_sets(
        &unique,
        &test_data,
        &test_labels,
        n_channels,
        n_times,
        "testing",
    )?;

    let metadata = Metadata {
        n_folds: 1,
        n_trials: epochs.len(),
        normalization,
        metric: metric.name().to_string(),
        warnings: Vec::new(),
    };
    let mut rdm = Rdm::zeros(condition_pairs(&unique), epochs.times().to_vec(), metadata);

    let mut pair = 0;
    for (i, sets_a) in train_sets.iter().enumerate() {
        for sets_b in &test_sets[i..] {
            for t1 in 0..n_times {
                for t2 in t1..n_times {
                    let value =
                        metric.evaluate(&sets_a[t1], &sets_b[t2], &train_labels, &test_labels);
                    rdm.set_symmetric(pair, t1, t2, value);
                }
            }
            pair += 1;
        }
    }

    Ok(rdm)
}

/// Select trials and their labels by index.
fn partition<'a>(
    epochs: &'a Epochs,
    labels: &[Label],
    indices: &[usize],
) -> Result<(EpochsView<'a>, Vec<Label>)> {
    let view = epochs.select(indices)?;
    let selected: Vec<Label> = indices.iter().map(|&i| labels[i].clone()).collect();
    if view.len() != selected.len() {
        return Err(RsaError::ShapeMismatch {
            what: "partitioned labels",
            expected: view.len(),
            got: selected.len(),
        });
    }
    Ok((view, selected))
}

/// Apply a whitening transform to every trial of a view.
fn whiten<'a>(view: &EpochsView<'_>, whitening: &Whitening) -> Result<Vec<Cow<'a, DMatrix<f64>>>> {
    view.trials()
        .map(|trial| whitening.apply(trial).map(Cow::Owned))
        .collect()
}

/// Per-label, per-time signal sets: `result[label][t]`.
fn signal_sets(
    unique: &[Label],
    data: &[Cow<'_, DMatrix<f64>>],
    labels: &[Label],
    n_channels: usize,
    n_times: usize,
    side: &str,
) -> Result<Vec<Vec<SignalSet>>> {
    unique
        .iter()
        .map(|label| {
            let members: Vec<&DMatrix<f64>> = data
                .iter()
                .zip(labels)
                .filter(|(_, l)| *l == label)
                .map(|(trial, _)| &**trial)
                .collect();
            if members.is_empty() {
                return Err(RsaError::ContractViolation {
                    reason: format!(
                        "label {} has no trial in the {} partition of this split",
                        label, side
                    ),
                });
            }
            Ok((0..n_times)
                .map(|t| SignalSet::at_time(members.iter().copied(), n_channels, t))
                .collect())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{Correlation, Euclidean};
    use crate::types::TimeWindow;
    use std::sync::Mutex;

    /// Records which trials it was fitted on and returns a fixed scaling.
    struct RecordingWhitener {
        seen: Mutex<Vec<Vec<usize>>>,
        windows: Mutex<Vec<TimeWindow>>,
        scale: f64,
    }

    impl RecordingWhitener {
        fn new(scale: f64) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                windows: Mutex::new(Vec::new()),
                scale,
            }
        }
    }

    impl Whitener for RecordingWhitener {
        fn fit(&self, train: &EpochsView<'_>, window: TimeWindow) -> Result<Whitening> {
            self.seen.lock().unwrap().push(train.indices().to_vec());
            self.windows.lock().unwrap().push(window);
            Ok(Whitening {
                matrix: DMatrix::identity(train.n_channels(), train.n_channels()) * self.scale,
                channel_names: train.channel_names().to_vec(),
            })
        }
    }

    /// Two labels, two trials each, 2 channels x 3 times.
    fn small_epochs() -> (Epochs, Vec<Label>) {
        let trials = vec![
            DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 0.5, 0.1, 0.9]),
            DMatrix::from_row_slice(2, 3, &[1.2, 2.1, 2.5, 0.4, 0.3, 1.1]),
            DMatrix::from_row_slice(2, 3, &[-1.0, 0.2, 0.7, 2.0, 1.5, -0.3]),
            DMatrix::from_row_slice(2, 3, &[-0.8, 0.1, 0.9, 1.7, 1.2, -0.6]),
        ];
        let epochs = Epochs::new(trials, vec![-0.1, 0.0, 0.1]).unwrap();
        let labels = vec![Label::from("a"), Label::from("a"), Label::from("b"), Label::from("b")];
        (epochs, labels)
    }

    #[test]
    fn test_shape_and_symmetry() {
        let (epochs, labels) = small_epochs();
        let split = Split::new(vec![0, 2], vec![1, 3]);
        let rdm = compute_fold(
            &epochs,
            &labels,
            &split,
            &Euclidean,
            Normalization::None,
            &RecordingWhitener::new(1.0),
        )
        .unwrap();
        assert_eq!(rdm.shape(), (3, 3, 3));
        assert!(rdm.is_symmetric());
    }

    #[test]
    fn test_train_equals_test_correlation_diagonal_is_infinite() {
        let (epochs, labels) = small_epochs();
        let split = Split::new(vec![0, 1, 2, 3], vec![0, 1, 2, 3]);
        let rdm = compute_fold(
            &epochs,
            &labels,
            &split,
            &Correlation,
            Normalization::None,
            &RecordingWhitener::new(1.0),
        )
        .unwrap();
        // same-condition pairs are 0 (a, a) and 2 (b, b)
        for pair in [0, 2] {
            for t in 0..3 {
                assert_eq!(rdm.get(pair, t, t), f64::INFINITY);
            }
        }
    }

    #[test]
    fn test_whitener_sees_only_training_trials() {
        let (epochs, labels) = small_epochs();
        let whitener = RecordingWhitener::new(2.0);
        let split = Split::new(vec![3, 0], vec![1, 2]);
        compute_fold(
            &epochs,
            &labels,
            &split,
            &Euclidean,
            Normalization::Baseline,
            &whitener,
        )
        .unwrap();

        assert_eq!(*whitener.seen.lock().unwrap(), vec![vec![3, 0]]);
        assert_eq!(*whitener.windows.lock().unwrap(), vec![TimeWindow::until(0.0)]);
    }

    #[test]
    fn test_whitening_applied_to_both_partitions() {
        let (epochs, labels) = small_epochs();
        let split = Split::new(vec![0, 2], vec![1, 3]);
        let raw = compute_fold(
            &epochs,
            &labels,
            &split,
            &Euclidean,
            Normalization::None,
            &RecordingWhitener::new(3.0),
        )
        .unwrap();
        let scaled = compute_fold(
            &epochs,
            &labels,
            &split,
            &Euclidean,
            Normalization::Epoch,
            &RecordingWhitener::new(3.0),
        )
        .unwrap();
        for p in 0..3 {
            for t1 in 0..3 {
                for t2 in 0..3 {
                    let expected = raw.get(p, t1, t2) * 3.0;
                    assert!((scaled.get(p, t1, t2) - expected).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_no_whitening_when_not_requested() {
        let (epochs, labels) = small_epochs();
        let whitener = RecordingWhitener::new(1.0);
        let split = Split::new(vec![0, 2], vec![1, 3]);
        compute_fold(&epochs, &labels, &split, &Euclidean, Normalization::None, &whitener).unwrap();
        assert!(whitener.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_missing_label_in_test_partition() {
        let (epochs, labels) = small_epochs();
        let split = Split::new(vec![0, 2], vec![1]);
        let err = compute_fold(
            &epochs,
            &labels,
            &split,
            &Euclidean,
            Normalization::None,
            &RecordingWhitener::new(1.0),
        )
        .unwrap_err();
        match err {
            RsaError::ContractViolation { reason } => assert!(reason.contains("testing")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_label_length_mismatch() {
        let (epochs, mut labels) = small_epochs();
        labels.pop();
        let split = Split::new(vec![0], vec![1]);
        let err = compute_fold(
            &epochs,
            &labels,
            &split,
            &Euclidean,
            Normalization::None,
            &RecordingWhitener::new(1.0),
        )
        .unwrap_err();
        assert!(matches!(err, RsaError::ShapeMismatch { what: "labels per trial", .. }));
    }

    #[test]
    fn test_out_of_range_split() {
        let (epochs, labels) = small_epochs();
        let split = Split::new(vec![0, 2], vec![1, 9]);
        let err = compute_fold(
            &epochs,
            &labels,
            &split,
            &Euclidean,
            Normalization::None,
            &RecordingWhitener::new(1.0),
        )
        .unwrap_err();
        assert!(matches!(err, RsaError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_composite_label_rejected_before_whitening() {
        let (epochs, mut labels) = small_epochs();
        labels[1] = Label::Composite(vec![Label::from("a"), Label::Int(1)]);
        let whitener = RecordingWhitener::new(1.0);
        let split = Split::new(vec![0, 2], vec![1, 3]);
        let err = compute_fold(
            &epochs,
            &labels,
            &split,
            &Euclidean,
            Normalization::Epoch,
            &whitener,
        )
        .unwrap_err();
        assert!(matches!(err, RsaError::ContractViolation { .. }));
        assert!(whitener.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_euclidean_offset() {
        // label 1 is label 0 shifted by (3, 4) at every time sample
        let base = DMatrix::from_row_slice(2, 2, &[0.5, -1.0, 2.0, 0.25]);
        let offset = DMatrix::from_row_slice(2, 2, &[3.0, 3.0, 4.0, 4.0]);
        let trials = vec![base.clone(), base.clone(), &base + &offset, &base + &offset];
        let epochs = Epochs::new(trials, vec![0.0, 0.1]).unwrap();
        let labels: Vec<Label> = [0, 0, 1, 1].into_iter().map(Label::Int).collect();
        let split = Split::new(vec![0, 2], vec![1, 3]);

        let rdm = compute_fold(
            &epochs,
            &labels,
            &split,
            &Euclidean,
            Normalization::None,
            &RecordingWhitener::new(1.0),
        )
        .unwrap();
        let pair = rdm.pair_index(&Label::Int(0), &Label::Int(1)).unwrap();
        for t in 0..2 {
            assert!((rdm.get(pair, t, t) - 5.0).abs() < 1e-12);
        }
        assert_eq!(rdm.get(0, 0, 0), 0.0);
    }
}
