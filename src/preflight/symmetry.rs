//! Metric symmetry probe.
//!
//! Builds full-data prototypes of neighbouring conditions at a few time
//! samples (first, middle, last) and evaluates the metric in both argument
//! orders. One mismatch is enough to flag the metric.

use super::PreflightWarning;
use crate::epochs::Epochs;
use crate::metric::{Metric, SignalSet};
use crate::types::{unique_sorted, Label};

/// Relative tolerance for calling two metric values equal.
const SYMMETRY_RTOL: f64 = 1e-9;

/// Maximum number of condition pairs probed.
const MAX_PROBED_PAIRS: usize = 3;

/// Probe `metric` for symmetry on real data.
///
/// Returns `None` when the metric looks symmetric or when there is not
/// enough data to probe (fewer than two conditions or no time samples).
pub fn symmetry_check<M: Metric + ?Sized>(
    epochs: &Epochs,
    labels: &[Label],
    metric: &M,
) -> Option<PreflightWarning> {
    let n_times = epochs.n_times();
    if n_times == 0 || labels.len() != epochs.len() {
        return None;
    }
    let unique = unique_sorted(labels);
    if unique.len() < 2 {
        return None;
    }

    let mut times = vec![0, n_times / 2, n_times - 1];
    times.dedup();

    let set_for = |label: &Label, t: usize| {
        let members = labels
            .iter()
            .enumerate()
            .filter(|(_, l)| *l == label)
            .map(|(i, _)| epochs.trial(i));
        SignalSet::at_time(members, epochs.n_channels(), t)
    };

    for pair in unique.windows(2).take(MAX_PROBED_PAIRS) {
        for &t in &times {
            let a = set_for(&pair[0], t);
            let b = set_for(&pair[1], t);
            let forward = metric.evaluate(&a, &b, labels, labels);
            let backward = metric.evaluate(&b, &a, labels, labels);
            if !values_match(forward, backward) {
                return Some(PreflightWarning::AsymmetricMetric {
                    metric: metric.name().to_string(),
                    forward,
                    backward,
                });
            }
        }
    }
    None
}

fn values_match(x: f64, y: f64) -> bool {
    if x.to_bits() == y.to_bits() || (x.is_nan() && y.is_nan()) {
        return true;
    }
    let scale = x.abs().max(y.abs()).max(1.0);
    (x - y).abs() <= SYMMETRY_RTOL * scale
}
