//! Failures of the analysis. None of them is retried inside this crate.
use thiserror::Error;

/// Category of a failure, without the details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InputInsufficiency,
    NumericInstability,
    Configuration,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum GumbelError {
    #[error("insufficient input: {0}")]
    InsufficientInput(String),
    #[error("degenerate regression: {0}")]
    DegenerateRegression(String),
    #[error("numeric instability at iteration {iteration}: {message}")]
    NumericInstability { iteration: usize, message: String },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("cancelled at iteration {iteration}")]
    Cancelled { iteration: usize },
}

impl GumbelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GumbelError::InsufficientInput(_) => ErrorKind::InputInsufficiency,
            GumbelError::DegenerateRegression(_) => ErrorKind::InputInsufficiency,
            GumbelError::NumericInstability { .. } => ErrorKind::NumericInstability,
            GumbelError::InvalidConfig(_) => ErrorKind::Configuration,
            GumbelError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }
}

impl From<GumbelError> for std::io::Error {
    fn from(why: GumbelError) -> Self {
        let kind = match why.kind() {
            ErrorKind::Configuration => std::io::ErrorKind::InvalidInput,
            ErrorKind::InputInsufficiency => std::io::ErrorKind::InvalidData,
            _ => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, why)
    }
}

pub type Result<T> = std::result::Result<T, GumbelError>;
