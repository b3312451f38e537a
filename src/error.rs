use std::path::PathBuf;
use thiserror::Error;

/// The main error type for socrata-loader operations.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read config from {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config from {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Pre-command exited with {status}: {output}")]
    PreCommandFailed { status: String, output: String },

    #[error("Error calling SODA API: HTTP {status} {message}")]
    Api { status: u16, message: String },

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: ureq::Error,
    },

    #[error("Failed to decode {context}: {source}")]
    InvalidJson {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected batch response shape: {message}")]
    BatchProtocol { message: String },

    #[error(
        "Received error in batch response for operation {index} ({request_type} {url}): {error_code} - {error_message}"
    )]
    BatchOperation {
        index: usize,
        request_type: String,
        url: String,
        error_code: String,
        error_message: String,
    },

    #[error("A batch is already in progress; batches cannot be nested")]
    NestedBatch,

    #[error("No response available for {request_type} {url}: it was queued in a batch")]
    BatchPending { request_type: String, url: String },

    #[error("{step}: response has no '{field}': {response}")]
    MissingField {
        step: &'static str,
        field: &'static str,
        response: String,
    },

    #[error("Something went wrong with the append or replace: {response}")]
    UnrecognizedImportResponse { response: String },

    #[error("Publication returned UID {actual}, expected {expected}")]
    PublishMismatch { expected: String, actual: String },
}
