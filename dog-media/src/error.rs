use thiserror::Error;

use crate::planner::RangeRejection;

/// Result type for media operations
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while streaming or ingesting media
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Media not found: {id}")]
    NotFound { id: String },

    #[error("Media {id} has no content")]
    EmptyObject { id: String },

    #[error("Upload {id} committed zero bytes")]
    EmptyUpload { id: String },

    #[error("{rejection} (object size {total})")]
    Range { rejection: RangeRejection, total: u64 },

    #[error("No payload attached to upload")]
    NoPayload,

    #[error("Upload exceeds maximum of {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("Upload failed: {reason}")]
    UploadFailed { reason: String },

    #[error("Media store is not ready")]
    StoreUnavailable,

    #[error("Malformed media id: {id}")]
    MalformedId { id: String },

    #[error("Invalid request: {message}")]
    Invalid { message: String },

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl MediaError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    /// Create an invalid request error
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(id: S) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn upload_failed<S: Into<String>>(reason: S) -> Self {
        Self::UploadFailed {
            reason: reason.into(),
        }
    }

    pub fn range(rejection: RangeRejection, total: u64) -> Self {
        Self::Range { rejection, total }
    }
}
