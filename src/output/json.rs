//! JSON serialization for RDMs.
//!
//! The document carries the condition pairs, the time axis, the nested
//! `[pair][t1][t2]` values and the metadata. Non-finite values (the `+inf`
//! of identical correlation prototypes, NaN) are written as `null`.

use serde::Serialize;

use crate::rdm::{Metadata, Rdm};
use crate::types::Label;

#[derive(Serialize)]
struct RdmDocument<'a> {
    shape: (usize, usize, usize),
    condition_pairs: &'a [(Label, Label)],
    times: &'a [f64],
    values: Vec<Vec<Vec<f64>>>,
    metadata: &'a Metadata,
}

impl<'a> From<&'a Rdm> for RdmDocument<'a> {
    fn from(rdm: &'a Rdm) -> Self {
        Self {
            shape: rdm.shape(),
            condition_pairs: rdm.condition_pairs(),
            times: rdm.times(),
            values: rdm.to_nested(),
            metadata: rdm.metadata(),
        }
    }
}

/// Serialize an RDM to a compact JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for an RDM).
pub fn to_json(rdm: &Rdm) -> Result<String, serde_json::Error> {
    serde_json::to_string(&RdmDocument::from(rdm))
}

/// Serialize an RDM to a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for an RDM).
pub fn to_json_pretty(rdm: &Rdm) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&RdmDocument::from(rdm))
}
