use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{ByteStream, MediaId, MediaRecord, MediaResult};

/// Default chunk size (255 KiB), small enough to keep per-request buffers bounded
pub const DEFAULT_CHUNK_SIZE: u64 = 255 * 1024;

/// Half-open byte window `[offset, end)` as understood by chunk stores.
///
/// HTTP ranges are inclusive on both ends; stores read up to but not
/// including `end`. Build windows through [`ReadWindow::from_inclusive`] so
/// the translation happens in exactly one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadWindow {
    pub offset: u64,
    pub end: u64,
}

impl ReadWindow {
    /// Convert an inclusive `[start, end]` interval into a store window.
    pub fn from_inclusive(start: u64, end_inclusive: u64) -> Self {
        Self {
            offset: start,
            end: end_inclusive.saturating_add(1),
        }
    }

    /// Window covering `len` bytes from the beginning of an object
    pub fn whole(len: u64) -> Self {
        Self { offset: 0, end: len }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of the chunk holding the first byte of the window
    pub fn first_chunk(&self, chunk_size: u64) -> u64 {
        self.offset / chunk_size
    }

    /// Byte offset of the window inside its first chunk
    pub fn skip_in_first_chunk(&self, chunk_size: u64) -> u64 {
        self.offset % chunk_size
    }
}

/// Chunked blob storage operations
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Allocate a new object and return a write cursor for it
    async fn open_write(
        &self,
        filename: &str,
        content_type: &str,
    ) -> MediaResult<Box<dyn ChunkWriter>>;

    /// Open a read cursor bounded to `window`
    async fn open_read(&self, id: &MediaId, window: ReadWindow) -> MediaResult<ByteStream>;

    /// Total bytes held in chunks for `id`, `None` if no chunks exist
    async fn stat(&self, id: &MediaId) -> MediaResult<Option<u64>>;

    /// Delete every chunk belonging to `id`
    async fn delete(&self, id: &MediaId) -> MediaResult<()>;

    fn chunk_size(&self) -> u64;
}

/// Write cursor for a single object.
///
/// Dropping a writer without calling [`finish`](ChunkWriter::finish) or
/// [`abort`](ChunkWriter::abort) discards whatever chunks it persisted.
#[async_trait]
pub trait ChunkWriter: Send {
    fn id(&self) -> &MediaId;

    /// Bytes accepted so far (persisted or buffered)
    fn written(&self) -> u64;

    /// Append payload bytes; full chunks are persisted as they fill
    async fn append(&mut self, data: Bytes) -> MediaResult<()>;

    /// Flush the tail chunk and register the catalog record
    async fn finish(self: Box<Self>) -> MediaResult<u64>;

    /// Discard the object's chunks without registering anything
    async fn abort(self: Box<Self>) -> MediaResult<()>;
}

/// Metadata catalog of committed objects
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn find(&self, id: &MediaId) -> MediaResult<Option<MediaRecord>>;

    /// All committed records, newest first
    async fn list(&self) -> MediaResult<Vec<MediaRecord>>;

    /// Remove a record; returns whether it existed
    async fn remove(&self, id: &MediaId) -> MediaResult<bool>;
}

/// A chunk store and its catalog, shared by every request handler
#[derive(Clone)]
pub struct MediaBackend {
    pub store: Arc<dyn ChunkStore>,
    pub catalog: Arc<dyn Catalog>,
}

impl MediaBackend {
    /// Use one value for both the chunk store and the catalog
    pub fn new<S>(store: S) -> Self
    where
        S: ChunkStore + Catalog + 'static,
    {
        let shared = Arc::new(store);
        Self {
            store: shared.clone(),
            catalog: shared,
        }
    }
}

impl std::fmt::Debug for MediaBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaBackend")
            .field("chunk_size", &self.store.chunk_size())
            .finish()
    }
}
