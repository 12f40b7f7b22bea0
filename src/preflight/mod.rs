//! Preflight checks run once before any fold is dispatched.
//!
//! None of these checks is fatal. They surface setups that are likely to
//! produce a misleading RDM:
//!
//! - **Symmetry**: the fold processor only evaluates `t1 <= t2` and mirrors
//!   the result, which is only correct for a symmetric metric
//! - **Group size**: conditions with a single trial cannot appear on both
//!   sides of a split

mod groups;
mod symmetry;

pub use groups::group_size_check;
pub use symmetry::symmetry_check;

use serde::{Deserialize, Serialize};

use crate::epochs::Epochs;
use crate::metric::Metric;
use crate::types::Label;

/// Non-fatal issue found before dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PreflightWarning {
    /// Swapping the metric's arguments changed its value.
    AsymmetricMetric {
        /// Metric name.
        metric: String,
        /// `evaluate(a, b)`.
        forward: f64,
        /// `evaluate(b, a)`.
        backward: f64,
    },

    /// A condition has too few trials to be split.
    SmallConditionGroup {
        /// Condition label.
        label: Label,
        /// Number of trials carrying it.
        count: usize,
    },
}

impl PreflightWarning {
    /// Whether the warning means the RDM is likely wrong, not just noisy.
    pub fn is_critical(&self) -> bool {
        matches!(self, PreflightWarning::AsymmetricMetric { .. })
    }

    /// Human-readable description.
    pub fn description(&self) -> String {
        match self {
            PreflightWarning::AsymmetricMetric {
                metric,
                forward,
                backward,
            } => format!(
                "metric '{}' is not symmetric (a,b -> {}, b,a -> {}); \
                 mirrored time-by-time entries will be wrong",
                metric, forward, backward
            ),
            PreflightWarning::SmallConditionGroup { label, count } => format!(
                "condition {} has only {} trial(s); it cannot appear in both \
                 the training and testing partition of a split",
                label, count
            ),
        }
    }
}

/// Run every check and collect the warnings.
pub fn run_all_checks<M: Metric + ?Sized>(
    epochs: &Epochs,
    labels: &[Label],
    metric: &M,
) -> Vec<PreflightWarning> {
    let mut warnings = group_size_check(labels);
    if let Some(warning) = symmetry_check(epochs, labels, metric) {
        warnings.push(warning);
    }
    warnings
}
