//! Processor error types

use dispatch_common::errors::AppError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Archive error for {name}: {message}")]
    Archive { name: String, message: String },

    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    #[error("Chunk index {0} out of range")]
    ChunkIndexOutOfRange(u32),

    #[error("File not found: {0}")]
    FileNotFound(Uuid),

    #[error("Unknown file type for file {file_id}: {file_type}")]
    UnknownFileType { file_id: Uuid, file_type: String },

    #[error("Parser task failed: {0}")]
    Task(String),

    #[error("Store error: {0}")]
    Store(#[from] AppError),
}

impl ProcessorError {
    pub(crate) fn archive(name: &str, err: impl std::fmt::Display) -> Self {
        ProcessorError::Archive {
            name: name.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for ProcessorError {
    fn from(e: tokio::task::JoinError) -> Self {
        ProcessorError::Task(e.to_string())
    }
}

impl From<ProcessorError> for AppError {
    fn from(e: ProcessorError) -> Self {
        match e {
            ProcessorError::Store(inner) => inner,
            ProcessorError::UnsupportedAction(action) => AppError::UnsupportedAction { action },
            ProcessorError::ChunkIndexOutOfRange(index) => AppError::Validation {
                message: format!("chunkIndex {} exceeds {}", index, i32::MAX),
                field: Some("chunkIndex".into()),
            },
            ProcessorError::FileNotFound(id) => AppError::FileNotFound { id: id.to_string() },
            ProcessorError::UnknownFileType { file_type, .. } => AppError::InvalidFormat {
                message: format!("unknown file type: {}", file_type),
            },
            other => AppError::Internal {
                message: other.to_string(),
            },
        }
    }
}
