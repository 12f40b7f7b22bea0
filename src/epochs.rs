//! Trial collections and borrowed, index-selected views over them.

use nalgebra::DMatrix;

use crate::error::{Result, RsaError};

/// Trial-structured recording: one `channels x times` matrix per trial.
///
/// All trials share the same number of channels and time samples; this is
/// checked on construction.
#[derive(Debug, Clone)]
pub struct Epochs {
    trials: Vec<DMatrix<f64>>,
    times: Vec<f64>,
    channel_names: Vec<String>,
}

impl Epochs {
    /// Build a collection from trial matrices and the time axis in seconds.
    ///
    /// Channels are named `ch0`, `ch1`, ...
    ///
    /// # Errors
    ///
    /// Returns [`RsaError::ShapeMismatch`] if a trial's shape disagrees with
    /// the first trial or with `times`.
    pub fn new(trials: Vec<DMatrix<f64>>, times: Vec<f64>) -> Result<Self> {
        let n_channels = trials.first().map_or(0, |t| t.nrows());
        let channel_names = (0..n_channels).map(|c| format!("ch{}", c)).collect();
        Self::with_channel_names(trials, times, channel_names)
    }

    /// Build a collection with explicit channel names.
    ///
    /// # Errors
    ///
    /// Returns [`RsaError::ShapeMismatch`] on inconsistent trial shapes or a
    /// channel-name list of the wrong length.
    pub fn with_channel_names(
        trials: Vec<DMatrix<f64>>,
        times: Vec<f64>,
        channel_names: Vec<String>,
    ) -> Result<Self> {
        let n_channels = channel_names.len();
        for trial in &trials {
            if trial.nrows() != n_channels {
                return Err(RsaError::ShapeMismatch {
                    what: "trial channels",
                    expected: n_channels,
                    got: trial.nrows(),
                });
            }
            if trial.ncols() != times.len() {
                return Err(RsaError::ShapeMismatch {
                    what: "trial time samples",
                    expected: times.len(),
                    got: trial.ncols(),
                });
            }
        }
        Ok(Self {
            trials,
            times,
            channel_names,
        })
    }

    /// Number of trials.
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// Whether the collection holds no trials.
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Number of channels per trial.
    pub fn n_channels(&self) -> usize {
        self.channel_names.len()
    }

    /// Number of time samples per trial.
    pub fn n_times(&self) -> usize {
        self.times.len()
    }

    /// Time axis in seconds.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Channel identifiers.
    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    /// Trial `idx` as a `channels x times` matrix.
    pub fn trial(&self, idx: usize) -> &DMatrix<f64> {
        &self.trials[idx]
    }

    /// Every trial, in order.
    pub fn view(&self) -> EpochsView<'_> {
        EpochsView {
            epochs: self,
            indices: (0..self.len()).collect(),
        }
    }

    /// Borrowed view over the trials at `indices` (in that order).
    ///
    /// # Errors
    ///
    /// Returns [`RsaError::ShapeMismatch`] if an index is out of range.
    pub fn select(&self, indices: &[usize]) -> Result<EpochsView<'_>> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(RsaError::ShapeMismatch {
                what: "trial index range",
                expected: self.len(),
                got: bad + 1,
            });
        }
        Ok(EpochsView {
            epochs: self,
            indices: indices.to_vec(),
        })
    }
}

/// Read-only, index-selected view over an [`Epochs`] collection.
#[derive(Debug, Clone)]
pub struct EpochsView<'a> {
    epochs: &'a Epochs,
    indices: Vec<usize>,
}

impl<'a> EpochsView<'a> {
    /// Number of trials in the view.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether the view is empty.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Position of each trial in the parent collection.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// The `k`-th trial of the view.
    pub fn trial(&self, k: usize) -> &'a DMatrix<f64> {
        self.epochs.trial(self.indices[k])
    }

    /// Iterate over the trials of the view.
    pub fn trials(&self) -> impl Iterator<Item = &'a DMatrix<f64>> + '_ {
        self.indices.iter().map(move |&i| self.epochs.trial(i))
    }

    /// Time axis of the parent collection.
    pub fn times(&self) -> &'a [f64] {
        self.epochs.times()
    }

    /// Channel identifiers of the parent collection.
    pub fn channel_names(&self) -> &'a [String] {
        self.epochs.channel_names()
    }

    /// Number of channels.
    pub fn n_channels(&self) -> usize {
        self.epochs.n_channels()
    }
}
