use thiserror::Error;

/// A result type for GP regression algorithm
pub type Result<T> = std::result::Result<T, GpError>;

/// An error when using [`GaussianProcess`](crate::GaussianProcess) or the linear algebra it relies on
#[derive(Error, Debug)]
pub enum GpError {
    /// When a symmetric factorization meets a vanishing or non finite pivot
    #[error("Singular matrix: pivot {pivot} is {value:e}")]
    SingularMatrix {
        /// Position of the failing pivot in the permuted matrix
        pivot: usize,
        /// Value of the failing pivot
        value: f64,
    },
    /// When operands dimensions disagree
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
    /// When error dur to a bad value
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
    /// When a linfa error occurs
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
}
