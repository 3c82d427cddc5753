//! Error types for the digest pipeline.
//!
//! ## Error Cases
//! - `Rejected`: A submission arrived after shutdown was requested.
//! - `InvalidInput`: The submitted payload was empty or missing.
//! - `NotFound`: The handle is unknown, or its digest is not ready yet.
//! - `Internal`: A collaborator (e.g. report serialization) failed.

use crate::key::WorkHandle;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the digest pipeline.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The gate is draining and no new work is admitted.
    #[error("shutdown underway")]
    Rejected,

    /// The submitted payload failed basic validation.
    #[error("{reason}")]
    InvalidInput { reason: String },

    /// No stored result for the handle.
    ///
    /// A handle that was never issued and a handle whose work has not
    /// completed are reported identically.
    #[error("requested key and token data not ready or invalid key submitted")]
    NotFound { handle: WorkHandle },

    /// Internal failure outside of the pipeline itself.
    #[error("Internal error: {context}")]
    Internal { context: String },
}
