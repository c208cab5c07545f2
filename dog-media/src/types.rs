use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::str::FromStr;
use uuid::Uuid;

use crate::store::ReadWindow;
use crate::MediaError;

/// Stream of bytes for media content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Content type served for every stored object
pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Unique identifier for a stored media object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(Uuid);

impl MediaId {
    /// Generate a new random media ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a client-supplied identifier.
    ///
    /// Only the hyphenated UUID form is accepted, so ids that came out of
    /// this crate round-trip and anything else is rejected early.
    pub fn parse(raw: &str) -> Result<Self, MediaError> {
        let malformed = || MediaError::MalformedId { id: raw.to_string() };
        if raw.len() != 36 {
            return Err(malformed());
        }
        Uuid::parse_str(raw).map(Self).map_err(|_| malformed())
    }

}

impl Default for MediaId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for MediaId {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for MediaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Catalog row describing a committed media object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    pub id: MediaId,
    pub filename: String,
    pub length: u64,
    pub chunk_size: u64,
    pub upload_date: DateTime<Utc>,
    pub content_type: String,
}

impl MediaRecord {
    pub fn new<S: Into<String>>(id: MediaId, filename: S, length: u64, chunk_size: u64) -> Self {
        Self {
            id,
            filename: filename.into(),
            length,
            chunk_size,
            upload_date: Utc::now(),
            content_type: VIDEO_CONTENT_TYPE.to_string(),
        }
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Objects with zero length exist but can never be served
    pub fn is_streamable(&self) -> bool {
        self.length > 0
    }

    pub fn chunk_count(&self) -> u64 {
        if self.chunk_size == 0 {
            return 0;
        }
        self.length.div_ceil(self.chunk_size)
    }
}

/// Validated inclusive byte interval of an object, computed per request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl RangeSpec {
    /// Interval covering the whole object. `total` must be non-zero.
    pub fn full(total: u64) -> Self {
        Self {
            start: 0,
            end: total - 1,
            total,
        }
    }

    pub fn content_length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` value for a partial response
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total)
    }

    /// Store-facing window for this interval (exclusive end)
    pub fn read_window(&self) -> ReadWindow {
        ReadWindow::from_inclusive(self.start, self.end)
    }
}

/// Result of a successful ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReceipt {
    #[serde(rename = "fileId")]
    pub id: MediaId,
    pub filename: String,
    #[serde(skip)]
    pub length: u64,
}
