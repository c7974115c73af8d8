use thiserror::Error;

#[derive(Error, Debug)]
pub enum HrError {
    #[error("Data load error: {0}")]
    Load(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl From<polars::error::PolarsError> for HrError {
    fn from(err: polars::error::PolarsError) -> Self {
        HrError::Polars(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HrError>;
