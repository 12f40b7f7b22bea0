//! Condition group size check.

use super::PreflightWarning;
use crate::types::{unique_sorted, Label};

/// Minimum trials per condition for it to land in both partitions.
const MIN_TRIALS_PER_CONDITION: usize = 2;

/// Warn about every condition with fewer than two trials.
pub fn group_size_check(labels: &[Label]) -> Vec<PreflightWarning> {
    unique_sorted(labels)
        .into_iter()
        .filter_map(|label| {
            let count = labels.iter().filter(|l| **l == label).count();
            (count < MIN_TRIALS_PER_CONDITION)
                .then_some(PreflightWarning::SmallConditionGroup { label, count })
        })
        .collect()
}
