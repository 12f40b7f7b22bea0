//! Labels, normalization modes and other common types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RsaError;

/// Condition label attached to each trial.
///
/// Only `Int` and `Text` are valid inputs to an analysis. `Composite` exists
/// so that tuple-like labels produced upstream are representable and can be
/// rejected explicitly instead of being silently flattened.
///
/// Labels are totally ordered: every `Int` sorts before every `Text`, and
/// values of the same variant use their natural order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Label {
    /// Integer condition code.
    Int(i64),
    /// Named condition.
    Text(String),
    /// Structured label (never accepted by the analysis).
    Composite(Vec<Label>),
}

impl Label {
    /// Whether this label is a plain scalar (integer or string).
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Label::Composite(_))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Int(v) => write!(f, "{}", v),
            Label::Text(s) => write!(f, "{}", s),
            Label::Composite(parts) => {
                write!(f, "(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", part)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<i64> for Label {
    fn from(v: i64) -> Self {
        Label::Int(v)
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Label::Text(s.to_string())
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Label::Text(s)
    }
}

/// Reject any composite label.
pub(crate) fn ensure_scalar_labels(labels: &[Label]) -> Result<(), RsaError> {
    match labels.iter().position(|l| !l.is_scalar()) {
        Some(idx) => Err(RsaError::ContractViolation {
            reason: format!(
                "label {} at trial {} is composite; labels must be integers or strings",
                labels[idx], idx
            ),
        }),
        None => Ok(()),
    }
}

/// Sorted, deduplicated labels.
pub(crate) fn unique_sorted(labels: &[Label]) -> Vec<Label> {
    let mut unique = labels.to_vec();
    unique.sort();
    unique.dedup();
    unique
}

/// Multivariate noise normalization applied inside each fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Normalization {
    /// Use raw trial data.
    #[default]
    None,
    /// Whitening estimated on the whole epoch.
    Epoch,
    /// Whitening estimated on the baseline (samples at or before time zero).
    Baseline,
}

impl Normalization {
    /// Whether a whitening transform has to be fitted.
    pub fn is_whitening(&self) -> bool {
        !matches!(self, Normalization::None)
    }

    /// Time window the whitening transform is estimated on.
    ///
    /// Returns `None` when no whitening is requested.
    pub fn window(&self) -> Option<TimeWindow> {
        match self {
            Normalization::None => None,
            Normalization::Epoch => Some(TimeWindow::full()),
            Normalization::Baseline => Some(TimeWindow::until(0.0)),
        }
    }
}

impl FromStr for Normalization {
    type Err = RsaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Normalization::None),
            "epoch" | "whole-epoch" => Ok(Normalization::Epoch),
            "baseline" => Ok(Normalization::Baseline),
            other => Err(RsaError::Configuration {
                reason: format!(
                    "normalization must be one of \"none\", \"epoch\", \"baseline\"; got {:?}",
                    other
                ),
            }),
        }
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Normalization::None => "none",
            Normalization::Epoch => "epoch",
            Normalization::Baseline => "baseline",
        };
        f.write_str(name)
    }
}

/// Inclusive bounds on the time axis, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Lower bound (unbounded when `None`).
    pub tmin: Option<f64>,
    /// Upper bound (unbounded when `None`).
    pub tmax: Option<f64>,
}

impl TimeWindow {
    /// The whole epoch.
    pub fn full() -> Self {
        Self::default()
    }

    /// Everything at or before `tmax`.
    pub fn until(tmax: f64) -> Self {
        Self {
            tmin: None,
            tmax: Some(tmax),
        }
    }

    /// Whether `t` lies inside the window.
    pub fn contains(&self, t: f64) -> bool {
        self.tmin.is_none_or(|lo| t >= lo) && self.tmax.is_none_or(|hi| t <= hi)
    }

    /// Indices of `times` inside the window.
    pub fn select(&self, times: &[f64]) -> Vec<usize> {
        times
            .iter()
            .enumerate()
            .filter(|(_, &t)| self.contains(t))
            .map(|(i, _)| i)
            .collect()
    }
}
