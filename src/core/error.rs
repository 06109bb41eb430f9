//! Error types for the client core
//!
//! Provides custom error types for boundary failures. Reconciliation-level
//! failures (malformed history tokens, stale clock snapshots, rejected
//! mutations) are deliberately *not* errors: those degrade to "ignore and
//! retain last good state" inside the models. What remains here is the
//! small set of inbound-data failures worth a typed report in the logs.

use thiserror::Error;

/// Errors that can occur at the client-core boundary
#[derive(Error, Debug)]
pub enum ClientError {
    /// The handicap start encoding in the snapshot was not understood
    #[error("Unusable start encoding: {encoding}")]
    BadStartEncoding { encoding: String },

    /// An analysis annotation referenced a ply outside the history
    #[error("Annotation for out-of-range ply {ply} (history length {len})")]
    AnnotationOutOfRange { ply: usize, len: usize },
}

/// Result type alias for client-core operations
pub type ClientResult<T> = Result<T, ClientError>;
