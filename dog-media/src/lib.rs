//! # dog-media: range streaming and chunked ingestion for video
//!
//! `dog-media` serves stored media objects by byte range and ingests uploads
//! into a chunked blob store. It has no HTTP coupling: the responder hands
//! back status, framing and a pull-based body stream, and the caller decides
//! how to put those on the wire.
//!
//! ## Key Features
//!
//! - **Streaming-first**: bodies are read chunk by chunk from the store, never buffered whole
//! - **Range requests**: single `bytes=start-end` / `bytes=start-` ranges with a configurable no-range policy
//! - **Verified ingestion**: uploads are read back after commit and deleted again if they do not check out
//! - **Storage agnostic**: anything implementing [`ChunkStore`] and [`Catalog`] (memory and filesystem ship here)
//!
//! ## Quick Start
//!
//! ```rust
//! use dog_media::prelude::*;
//! use futures_util::StreamExt;
//!
//! # #[tokio::main]
//! # async fn main() -> MediaResult<()> {
//! let adapter = MediaAdapter::new(MediaBackend::new(MemoryChunkStore::new()), MediaConfig::default());
//!
//! let payload: ByteStream = Box::pin(futures_util::stream::once(async {
//!     Ok(bytes::Bytes::from_static(b"0123456789"))
//! }));
//! let receipt = adapter.ingest("clip.mp4", Some(payload)).await?;
//!
//! let response = adapter.stream(&receipt.id, Some("bytes=2-5")).await?;
//! assert_eq!(response.status_code(), 206);
//! assert_eq!(response.content_range().as_deref(), Some("bytes 2-5/10"));
//!
//! let mut body = response.into_body();
//! let mut out = Vec::new();
//! while let Some(chunk) = body.next().await {
//!     out.extend_from_slice(&chunk?);
//! }
//! assert_eq!(out, b"2345");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  StoreGate       ← readiness (503 until open)
//! ├──────────────────────────────────────────┤
//! │  MediaAdapter    ← facade held by handlers
//! ├──────────────────────┬───────────────────┤
//! │  StreamingResponder  │ IngestionCoordinator
//! │  RangeRequestPlanner │
//! ├──────────────────────┴───────────────────┤
//! │  ChunkStore + Catalog ← storage primitives
//! └──────────────────────────────────────────┘
//! ```

pub mod adapter;
mod config;
mod error;
mod fs_store;
mod gate;
mod ingest;
mod memory;
pub mod planner;
mod responder;
pub mod store;
mod types;

// Re-export main types for clean API
pub use adapter::MediaAdapter;
pub use config::MediaConfig;
pub use error::{MediaError, MediaResult};
pub use fs_store::FsChunkStore;
pub use gate::StoreGate;
pub use ingest::{IngestPhase, IngestionCoordinator};
pub use memory::MemoryChunkStore;
pub use planner::{MissingRangePolicy, RangeRejection, RangeRequestPlanner};
pub use responder::{MediaResponse, StreamingResponder};
pub use store::{Catalog, ChunkStore, ChunkWriter, MediaBackend, ReadWindow, DEFAULT_CHUNK_SIZE};
pub use types::{ByteStream, IngestReceipt, MediaId, MediaRecord, RangeSpec, VIDEO_CONTENT_TYPE};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ByteStream, MediaAdapter, MediaBackend, MediaConfig, MediaError, MediaId, MediaRecord,
        MediaResponse, MediaResult, MemoryChunkStore, StoreGate,
    };
}
