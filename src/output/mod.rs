//! Output formatting for RDMs.

mod json;

pub use json::{to_json, to_json_pretty};
