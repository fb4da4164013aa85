use thiserror::Error;

/// A result type for GP conditional computations
pub type Result<T> = std::result::Result<T, CondError>;

/// An error when computing a GP conditional
#[derive(Error, Debug)]
pub enum CondError {
    /// When array dimensions are not consistent
    #[error("Shape error: {0}")]
    ShapeError(String),
    /// When a covariance matrix can not be factorized
    #[error("Numerical error: {0}")]
    NumericalError(String),
    /// When no conditional is available for the given source and options
    #[error("Unsupported combination: {0}")]
    UnsupportedCombination(String),
    /// When error due to a bad value
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
    #[error(transparent)]
    /// When linear algebra computation fails
    LinalgError(#[from] linfa_linalg::LinalgError),
}
