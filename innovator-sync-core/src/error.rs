//! Error types shared by the Innovator client, the BOM reader and the transfer pipeline.

use thiserror::Error;

/// A payload or key rejected before any request is sent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid {entity} field '{field}'. Valid fields are {allowed:?}")]
    UnknownField {
        entity: &'static str,
        field: String,
        allowed: Vec<&'static str>,
    },

    #[error("{entity} field '{field}' must be formatted as {expected}")]
    WrongType {
        entity: &'static str,
        field: String,
        expected: &'static str,
    },

    #[error("{what} must not be empty")]
    EmptyKey { what: &'static str },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid item number '{0}'")]
pub struct ItemNumberError(pub String);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown item type '{0}'")]
pub struct ItemTypeError(pub String);

/// Errors from talking to Innovator.
#[derive(Debug, Error)]
pub enum PlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid base url '{url}': {reason}")]
    BaseUrl { url: String, reason: String },

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from reading a bill-of-materials export.
#[derive(Debug, Error)]
pub enum BomError {
    #[error("Failed to read BOM: {0}")]
    Csv(#[from] csv::Error),

    #[error("BOM is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("Row {row}: invalid item number '{value}'")]
    ItemNumber { row: usize, value: String },
}

/// Errors from the document-management side.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Document store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors surfaced by tagging and transfer runs.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Plm(#[from] PlmError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Bom(#[from] BomError),

    #[error("File '{file}' is missing metadata '{key}'")]
    MissingMetadata { file: String, key: &'static str },

    #[error("File '{file}' has invalid item number '{value}'")]
    InvalidItemNumber { file: String, value: String },

    #[error("Staging directory error: {0}")]
    Io(#[from] std::io::Error),
}
