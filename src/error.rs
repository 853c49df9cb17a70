//! Error types for basket analysis

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AffinityError {
    /// A column the analysis cannot run without is absent from the input.
    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("unknown product: {0:?}")]
    UnknownProduct(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("dataframe error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("table shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = AffinityError> = std::result::Result<T, E>;
