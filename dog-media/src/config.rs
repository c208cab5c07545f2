use std::time::Duration;

use crate::planner::MissingRangePolicy;
use crate::store::DEFAULT_CHUNK_SIZE;
use crate::VIDEO_CONTENT_TYPE;

/// Configuration for streaming and ingestion
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Absolute max size accepted for a single upload (safety guard)
    pub max_object_bytes: u64,

    /// Chunk size new objects are written with. Stored objects keep the
    /// size recorded in their catalog row.
    pub chunk_size: u64,

    /// When a request carries no `Range` header:
    /// - `FullObject`: serve the whole object (HTTP 200)
    /// - `Require`: reject the request
    pub missing_range: MissingRangePolicy,

    /// Content type recorded on ingest and sent with every response
    pub content_type: String,

    /// Optional: give up on a response when the store stalls this long
    /// between two reads
    pub stream_idle_timeout: Option<Duration>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_object_bytes: 5 * 1024 * 1024 * 1024, // 5GB
            chunk_size: DEFAULT_CHUNK_SIZE,
            missing_range: MissingRangePolicy::FullObject,
            content_type: VIDEO_CONTENT_TYPE.to_string(),
            stream_idle_timeout: None,
        }
    }
}

impl MediaConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max upload size
    pub fn with_max_object_bytes(mut self, bytes: u64) -> Self {
        self.max_object_bytes = bytes;
        self
    }

    /// Set chunk size
    pub fn with_chunk_size(mut self, bytes: u64) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    /// Require a `Range` header (no fallback to full content)
    pub fn require_range(mut self) -> Self {
        self.missing_range = MissingRangePolicy::Require;
        self
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_stream_idle_timeout(mut self, timeout: Duration) -> Self {
        self.stream_idle_timeout = Some(timeout);
        self
    }
}
