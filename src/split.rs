//! Train/test split generation.
//!
//! A [`Splitter`] turns the label vector into a finite sequence of
//! [`Split`]s. Every call to [`Splitter::split`] starts the sequence over.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RsaError};
use crate::statistics::counter_rng_seed;
use crate::types::{unique_sorted, Label};

/// One train/test partition, as indices into the trial collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    /// Training trial indices.
    pub train: Vec<usize>,
    /// Testing trial indices.
    pub test: Vec<usize>,
}

impl Split {
    /// Create a split from explicit index lists.
    pub fn new(train: Vec<usize>, test: Vec<usize>) -> Self {
        Self { train, test }
    }
}

/// Lazily generated split sequence.
pub type SplitIter<'a> = Box<dyn Iterator<Item = Split> + 'a>;

/// Source of cross-validation splits.
pub trait Splitter: Sync {
    /// Start a fresh sequence of splits for `labels`.
    ///
    /// # Errors
    ///
    /// Returns [`RsaError::Configuration`] when the labels cannot be split
    /// with the splitter's parameters.
    fn split<'a>(&'a self, labels: &'a [Label]) -> Result<SplitIter<'a>>;
}

/// Fixed list of splits, replayed on every call.
#[derive(Debug, Clone, Default)]
pub struct ExplicitSplits {
    splits: Vec<Split>,
}

impl ExplicitSplits {
    /// Wrap a list of splits.
    pub fn new(splits: Vec<Split>) -> Self {
        Self { splits }
    }

    /// A single split that trains and tests on the same trials.
    pub fn train_equals_test(n_trials: usize) -> Self {
        let all: Vec<usize> = (0..n_trials).collect();
        Self::new(vec![Split::new(all.clone(), all)])
    }
}

impl Splitter for ExplicitSplits {
    fn split<'a>(&'a self, _labels: &'a [Label]) -> Result<SplitIter<'a>> {
        Ok(Box::new(self.splits.iter().cloned()))
    }
}

/// Stratified repeated random splits.
///
/// Each split holds out `ceil(test_size * n)` trials and keeps every
/// label's share of trials in both partitions as close as integer counts
/// allow (largest-remainder rounding). With a seed the sequence is
/// identical on every call; without one, each call draws a new base seed.
#[derive(Debug, Clone, Copy)]
pub struct StratifiedShuffleSplit {
    n_splits: usize,
    test_size: f64,
    seed: Option<u64>,
}

impl Default for StratifiedShuffleSplit {
    fn default() -> Self {
        Self::new(10, 0.5)
    }
}

impl StratifiedShuffleSplit {
    /// `n_splits` repetitions holding out `test_size` of the trials.
    pub fn new(n_splits: usize, test_size: f64) -> Self {
        Self {
            n_splits,
            test_size,
            seed: None,
        }
    }

    /// Fix the base seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Number of splits generated per call.
    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    fn validate(
        &self,
        labels: &[Label],
        classes: &[Label],
        counts: &[usize],
    ) -> Result<(usize, usize)> {
        let config_err = |reason: String| Err(RsaError::Configuration { reason });

        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return config_err(format!("test_size must be in (0, 1), got {}", self.test_size));
        }
        let n = labels.len();
        let n_test = (self.test_size * n as f64).ceil() as usize;
        let n_train = n.saturating_sub(n_test);

        if let Some((class, &count)) = classes.iter().zip(counts).find(|(_, &c)| c < 2) {
            return config_err(format!(
                "label {} has {} trial(s); stratified splitting needs at least 2 per label",
                class, count
            ));
        }
        if n_train < classes.len() {
            return config_err(format!(
                "train size {} is smaller than the number of labels {}",
                n_train,
                classes.len()
            ));
        }
        if n_test < classes.len() {
            return config_err(format!(
                "test size {} is smaller than the number of labels {}",
                n_test,
                classes.len()
            ));
        }
        Ok((n_train, n_test))
    }
}

impl Splitter for StratifiedShuffleSplit {
    fn split<'a>(&'a self, labels: &'a [Label]) -> Result<SplitIter<'a>> {
        let classes = unique_sorted(labels);
        let members: Vec<Vec<usize>> = classes
            .iter()
            .map(|class| {
                labels
                    .iter()
                    .enumerate()
                    .filter(|(_, l)| *l == class)
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect();
        let counts: Vec<usize> = members.iter().map(Vec::len).collect();
        let (n_train, n_test) = self.validate(labels, &classes, &counts)?;

        let base_seed = self.seed.unwrap_or_else(|| rand::rng().random());
        let train_per_class = allocate(&counts, n_train);
        let remaining: Vec<usize> = counts
            .iter()
            .zip(&train_per_class)
            .map(|(c, t)| c - t)
            .collect();
        let test_per_class = allocate(&remaining, n_test);

        Ok(Box::new((0..self.n_splits).map(move |k| {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(counter_rng_seed(base_seed, k as u64));
            let mut train = Vec::with_capacity(n_train);
            let mut test = Vec::with_capacity(n_test);
            for (class_idx, indices) in members.iter().enumerate() {
                let mut shuffled = indices.clone();
                shuffled.shuffle(&mut rng);
                let n_tr = train_per_class[class_idx];
                let n_te = test_per_class[class_idx];
                train.extend_from_slice(&shuffled[..n_tr]);
                test.extend_from_slice(&shuffled[n_tr..n_tr + n_te]);
            }
            train.shuffle(&mut rng);
            test.shuffle(&mut rng);
            Split { train, test }
        })))
    }
}

/// Distribute `n_draws` over classes proportionally to `counts`.
///
/// Floors the exact proportional share, then hands the leftover draws to
/// the classes with the largest fractional remainder (ties go to the
/// earlier class). Never allocates more than a class holds.
fn allocate(counts: &[usize], n_draws: usize) -> Vec<usize> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0; counts.len()];
    }
    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| c as f64 * n_draws as f64 / total as f64)
        .collect();
    let mut alloc: Vec<usize> = exact
        .iter()
        .zip(counts)
        .map(|(&e, &c)| (e.floor() as usize).min(c))
        .collect();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });

    let mut left = n_draws.saturating_sub(alloc.iter().sum());
    while left > 0 {
        let mut progressed = false;
        for &k in &order {
            if left == 0 {
                break;
            }
            if alloc[k] < counts[k] {
                alloc[k] += 1;
                left -= 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
    alloc
}
