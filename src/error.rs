//! Error type shared by every stage of the analysis.

use thiserror::Error;

/// Fatal failure of an RDM computation.
///
/// Every variant aborts the enclosing call. Nothing is retried and no
/// partial RDM is ever returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RsaError {
    /// Invalid configuration, detected before any trial is read.
    #[error("configuration error: {reason}")]
    Configuration {
        /// What was wrong.
        reason: String,
    },

    /// Input data breaks a precondition of the analysis.
    #[error("contract violation: {reason}")]
    ContractViolation {
        /// What was violated.
        reason: String,
    },

    /// Two quantities that must agree in size do not.
    #[error("shape mismatch in {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        /// Which quantity disagreed.
        what: &'static str,
        /// Expected size.
        expected: usize,
        /// Observed size.
        got: usize,
    },

    /// The whitening collaborator could not produce a transform.
    #[error("whitening failed: {reason}")]
    Whitening {
        /// Why the transform could not be built.
        reason: String,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RsaError>;
