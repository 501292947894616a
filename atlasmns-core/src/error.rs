//! Error types for AtlasMNS operations

use thiserror::Error;

/// Configuration errors. These are fatal at startup; everything else in the
/// system degrades without terminating the host process.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unable to read configuration file {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("configuration file {path} is not valid TOML: {reason}")]
    Invalid { path: String, reason: String },

    #[error("no RIPE Atlas API key specified")]
    MissingApiKey,
}

/// Schedule store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("unable to connect to the scheduler database at {server}: {reason}")]
    Connect { server: String, reason: String },

    #[error("query failed: {reason}")]
    Query { reason: String },

    #[error("write failed: {reason}")]
    Write { reason: String },

    #[error("cannot decode column {column}: {reason}")]
    RowDecode { column: &'static str, reason: String },
}

/// Measurement platform errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AtlasError {
    #[error("request to the measurement platform failed: {reason}")]
    Request { reason: String },

    #[error("measurement rejected by the platform: {detail}")]
    Rejected { detail: String },

    #[error("unexpected platform response: {reason}")]
    InvalidResponse { reason: String },
}

/// Results store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResultsError {
    #[error("unable to connect to the results database at {server}: {reason}")]
    Connect { server: String, reason: String },

    #[error("write to collection {collection} failed: {reason}")]
    Write { collection: String, reason: String },

    #[error("query on collection {collection} failed: {reason}")]
    Query { collection: String, reason: String },

    #[error("cannot decode result document: {reason}")]
    Decode { reason: String },
}
