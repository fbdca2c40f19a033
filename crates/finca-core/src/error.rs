//! Error types for the finca-core library.

use thiserror::Error;

/// Main error type for the finca library.
#[derive(Error, Debug)]
pub enum FincaError {
    /// Movement learning error.
    #[error("learning error: {0}")]
    Learning(#[from] LearningError),

    /// Persistence collaborator error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors propagated unchanged from the persistence collaborator.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Backend failure (I/O, host storage, timeout).
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Errors raised at the learning engine's entry points.
///
/// Malformed *data* never raises here; parsing and classification degrade
/// into doubts instead. Only missing required call arguments do.
#[derive(Error, Debug)]
pub enum LearningError {
    /// Required reconciliation arguments are missing: empty category, or
    /// Property scope without a property id.
    #[error("No se pudo crear la regla de aprendizaje: {0}")]
    InvalidRuleArguments(String),

    /// The movement to reconcile does not exist.
    #[error("movement not found: {0}")]
    MovementNotFound(String),

    /// Persistence failure during reconciliation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for the finca library.
pub type Result<T> = std::result::Result<T, FincaError>;
