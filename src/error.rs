use thiserror::Error;

#[derive(Error, Debug)]
pub enum AmrError {
    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Invalid drug-class catalog: {0}")]
    InvalidCatalog(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AmrError>;

#[cfg(feature = "python")]
impl From<AmrError> for pyo3::PyErr {
    fn from(err: AmrError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyRuntimeError, PyValueError};
        match err {
            AmrError::MissingColumn(_)
            | AmrError::InvalidCatalog(_)
            | AmrError::InvalidConfig(_)
            | AmrError::UnsupportedFile(_) => PyValueError::new_err(err.to_string()),
            _ => PyRuntimeError::new_err(err.to_string()),
        }
    }
}
