//! Custom error types for stockroom

use thiserror::Error;

/// Main error type for stockroom operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv_async::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("Store not found: {0}")]
    StoreNotFound(String),

    #[error("Not initialized: run 'stockroom init' first")]
    NotInitialized,

    #[error("{0}")]
    Other(String),
}

impl From<crate::validate::FieldError> for Error {
    fn from(err: crate::validate::FieldError) -> Self {
        Error::Validation(err.to_string())
    }
}

impl Error {
    /// Whether the error was caused by the caller's input rather than by the system
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::InvalidFile(_) | Error::StoreNotFound(_)
        )
    }
}

/// Result type alias for stockroom
pub type Result<T> = std::result::Result<T, Error>;
