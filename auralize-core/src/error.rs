//! Error types for Auralize

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuralizeError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Internal invariant violated: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AuralizeError>;
