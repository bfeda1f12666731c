use std::path::PathBuf;

use thiserror::Error;

use crate::registry::SerializationKind;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid target directory: {}", path.display())]
    InvalidTarget { path: PathBuf },

    #[error("Cannot save calibrator '{identity}' before calling fit")]
    NotFitted { identity: String },

    #[error("Object not registered: {name}")]
    NotFound { name: String },

    #[error("Object '{name}' is registered as {found}, expected {expected}")]
    KindMismatch {
        name: String,
        expected: SerializationKind,
        found: SerializationKind,
    },

    #[error("Corrupt artifact {}: {reason}", path.display())]
    CorruptArtifact { path: PathBuf, reason: String },

    #[error("Invalid calibrator identity: {0:?}")]
    InvalidIdentity(String),

    #[error("Invalid object name: {0:?}")]
    InvalidName(String),

    #[error("Failed to encode '{name}': {reason}")]
    Encode { name: String, reason: String },

    #[error("Failed to decode '{name}': {reason}")]
    Decode { name: String, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        StoreError::CorruptArtifact {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
