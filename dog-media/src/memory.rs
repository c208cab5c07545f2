use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use parking_lot::RwLock;

use crate::store::{Catalog, ChunkStore, ChunkWriter, ReadWindow, DEFAULT_CHUNK_SIZE};
use crate::{ByteStream, MediaError, MediaId, MediaRecord, MediaResult};

/// In-memory chunk store and catalog.
///
/// Chunks are addressed by `(id, index)` exactly like the durable stores, so
/// the range arithmetic exercised against it is the same.
#[derive(Clone)]
pub struct MemoryChunkStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    chunk_size: u64,
    records: RwLock<HashMap<MediaId, MediaRecord>>,
    chunks: RwLock<HashMap<MediaId, BTreeMap<u64, Bytes>>>,
    open_readers: AtomicUsize,
}

impl MemoryInner {
    fn chunk(&self, id: &MediaId, index: u64) -> Option<Bytes> {
        self.chunks.read().get(id).and_then(|c| c.get(&index).cloned())
    }

    fn put_chunk(&self, id: &MediaId, index: u64, data: Bytes) {
        self.chunks.write().entry(*id).or_default().insert(index, data);
    }

    fn drop_chunks(&self, id: &MediaId) {
        self.chunks.write().remove(id);
    }
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(chunk_size: u64) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                chunk_size: chunk_size.max(1),
                records: RwLock::new(HashMap::new()),
                chunks: RwLock::new(HashMap::new()),
                open_readers: AtomicUsize::new(0),
            }),
        }
    }

    /// Number of read cursors currently alive
    pub fn open_readers(&self) -> usize {
        self.inner.open_readers.load(Ordering::SeqCst)
    }

    /// Number of objects that still own chunks (committed or in flight)
    pub fn chunked_objects(&self) -> usize {
        self.inner.chunks.read().len()
    }

    /// Register a record without going through a writer.
    ///
    /// Lets callers stage catalog states the write path never produces,
    /// such as a record whose chunks are missing.
    pub fn insert_record(&self, record: MediaRecord) {
        self.inner.records.write().insert(record.id, record);
    }
}

impl Default for MemoryChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

struct ReaderGuard(Arc<MemoryInner>);

impl ReaderGuard {
    fn acquire(inner: Arc<MemoryInner>) -> Self {
        inner.open_readers.fetch_add(1, Ordering::SeqCst);
        Self(inner)
    }
}

impl Drop for ReaderGuard {
    fn drop(&mut self) {
        self.0.open_readers.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn open_write(
        &self,
        filename: &str,
        content_type: &str,
    ) -> MediaResult<Box<dyn ChunkWriter>> {
        let id = MediaId::new();
        self.inner.chunks.write().insert(id, BTreeMap::new());

        Ok(Box::new(MemoryChunkWriter {
            inner: self.inner.clone(),
            id,
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            buffer: BytesMut::new(),
            next_index: 0,
            written: 0,
            done: false,
        }))
    }

    async fn open_read(&self, id: &MediaId, window: ReadWindow) -> MediaResult<ByteStream> {
        if !self.inner.chunks.read().contains_key(id) {
            return Err(MediaError::not_found(id.to_string()));
        }

        let guard = ReaderGuard::acquire(self.inner.clone());
        let id = *id;
        let chunk_size = self.inner.chunk_size;

        let stream = async_stream::stream! {
            let guard = guard;
            let mut index = window.first_chunk(chunk_size);
            let mut skip = window.skip_in_first_chunk(chunk_size) as usize;
            let mut remaining = window.len();

            while remaining > 0 {
                let Some(chunk) = guard.0.chunk(&id, index) else {
                    yield Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!("chunk {index} of {id} is missing"),
                    ));
                    return;
                };
                if skip >= chunk.len() {
                    yield Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!("chunk {index} of {id} is shorter than expected"),
                    ));
                    return;
                }

                let take = ((chunk.len() - skip) as u64).min(remaining) as usize;
                let piece = chunk.slice(skip..skip + take);
                skip = 0;
                index += 1;
                remaining -= take as u64;
                yield Ok(piece);
            }
        };

        Ok(Box::pin(stream))
    }

    async fn stat(&self, id: &MediaId) -> MediaResult<Option<u64>> {
        Ok(self
            .inner
            .chunks
            .read()
            .get(id)
            .map(|chunks| chunks.values().map(|c| c.len() as u64).sum()))
    }

    async fn delete(&self, id: &MediaId) -> MediaResult<()> {
        self.inner.drop_chunks(id);
        Ok(())
    }

    fn chunk_size(&self) -> u64 {
        self.inner.chunk_size
    }
}

#[async_trait]
impl Catalog for MemoryChunkStore {
    async fn find(&self, id: &MediaId) -> MediaResult<Option<MediaRecord>> {
        Ok(self.inner.records.read().get(id).cloned())
    }

    async fn list(&self) -> MediaResult<Vec<MediaRecord>> {
        let mut records: Vec<MediaRecord> = self.inner.records.read().values().cloned().collect();
        records.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
        Ok(records)
    }

    async fn remove(&self, id: &MediaId) -> MediaResult<bool> {
        Ok(self.inner.records.write().remove(id).is_some())
    }
}

struct MemoryChunkWriter {
    inner: Arc<MemoryInner>,
    id: MediaId,
    filename: String,
    content_type: String,
    buffer: BytesMut,
    next_index: u64,
    written: u64,
    done: bool,
}

impl MemoryChunkWriter {
    fn persist(&mut self, data: Bytes) {
        self.inner.put_chunk(&self.id, self.next_index, data);
        self.next_index += 1;
    }
}

#[async_trait]
impl ChunkWriter for MemoryChunkWriter {
    fn id(&self) -> &MediaId {
        &self.id
    }

    fn written(&self) -> u64 {
        self.written
    }

    async fn append(&mut self, data: Bytes) -> MediaResult<()> {
        let chunk_size = self.inner.chunk_size as usize;
        self.written += data.len() as u64;
        self.buffer.extend_from_slice(&data);

        while self.buffer.len() >= chunk_size {
            let chunk = self.buffer.split_to(chunk_size).freeze();
            self.persist(chunk);
        }
        Ok(())
    }

    async fn finish(mut self: Box<Self>) -> MediaResult<u64> {
        if !self.buffer.is_empty() {
            let tail = self.buffer.split().freeze();
            self.persist(tail);
        }

        let record = MediaRecord::new(self.id, self.filename.clone(), self.written, self.inner.chunk_size)
            .with_content_type(self.content_type.clone());
        self.inner.records.write().insert(self.id, record);
        self.done = true;

        Ok(self.written)
    }

    async fn abort(mut self: Box<Self>) -> MediaResult<()> {
        self.inner.drop_chunks(&self.id);
        self.done = true;
        Ok(())
    }
}

impl Drop for MemoryChunkWriter {
    fn drop(&mut self) {
        if !self.done {
            self.inner.drop_chunks(&self.id);
        }
    }
}
