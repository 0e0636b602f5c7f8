// Error handling for the telemetry engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TelemetryError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TelemetryError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("No recording has been loaded yet")]
    NotReady,

    #[error("Recording has no entries")]
    EmptyRecording,
}

/// Transport and parse failures. Cloneable so a failed load can be kept as
/// the engine's readiness state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Server returned status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<std::io::Error> for LoadError {
    fn from(err: std::io::Error) -> Self {
        LoadError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(err: serde_json::Error) -> Self {
        LoadError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for LoadError {
    fn from(err: reqwest::Error) -> Self {
        LoadError::Http(err.to_string())
    }
}

/// Structural problems in a recording document. `entry` is the position of
/// the offending entry inside the document's `data` array.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Entry {entry}: missing required field `{field}`")]
    MissingField { field: &'static str, entry: usize },

    #[error("Entry {entry}: invalid `{field}`: {reason}")]
    InvalidField {
        field: &'static str,
        entry: usize,
        reason: String,
    },

    #[error("Invalid document field `{field}`: {reason}")]
    InvalidHeader { field: &'static str, reason: String },

    #[error("Second {0} appears more than once")]
    DuplicateSecond(u32),

    #[error("Label `{title}` is missing at second {second}")]
    MissingLabel { title: String, second: u32 },
}
