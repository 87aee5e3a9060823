use thiserror::Error;

/// A result type for Patchwork GP algorithm
pub type Result<T> = std::result::Result<T, PatchworkError>;

/// An error when using Patchwork GP algorithm
#[derive(Error, Debug)]
pub enum PatchworkError {
    /// When the grouping functions are missing or inconsistent
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    /// When inputs violate a requirement of an operation
    #[error("Precondition error: {0}")]
    PreconditionError(String),
    /// When a factorization of a coupling system fails
    #[error("Numerical error: {0}")]
    NumericalError(String),
    /// When operands dimensions or key sets disagree
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
    /// When Gaussian Process fails
    #[error("GP error: {0}")]
    GpError(#[from] patchbox_gp::GpError),
    /// When a linfa error occurs
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
}
