#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;

use dog_media::{
    ByteStream, Catalog, ChunkStore, ChunkWriter, MediaAdapter, MediaBackend, MediaConfig,
    MediaError, MediaId, MediaRecord, MediaResult, MemoryChunkStore, ReadWindow,
};

/// Deterministic test payload: byte `i` is `i % 251`
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Payload stream that hands `data` over in `piece`-sized slices
pub fn payload(data: &[u8], piece: usize) -> ByteStream {
    let pieces: Vec<std::io::Result<Bytes>> = data
        .chunks(piece.max(1))
        .map(|p| Ok(Bytes::copy_from_slice(p)))
        .collect();
    Box::pin(futures_util::stream::iter(pieces))
}

pub fn empty_payload() -> ByteStream {
    Box::pin(futures_util::stream::empty())
}

pub async fn collect(mut body: ByteStream) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    while let Some(chunk) = body.next().await {
        out.extend_from_slice(&chunk?);
    }
    Ok(out)
}

/// Collect until the first error, returning what arrived and the error
pub async fn collect_partial(mut body: ByteStream) -> (Vec<u8>, Option<std::io::Error>) {
    let mut out = Vec::new();
    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(chunk) => out.extend_from_slice(&chunk),
            Err(e) => return (out, Some(e)),
        }
    }
    (out, None)
}

pub fn memory_adapter(store: &MemoryChunkStore, config: MediaConfig) -> MediaAdapter {
    MediaAdapter::new(MediaBackend::new(store.clone()), config)
}

/// Ingest `data` and return its id
pub async fn seed(adapter: &MediaAdapter, data: &[u8]) -> MediaId {
    adapter
        .ingest("clip.mp4", Some(payload(data, 64)))
        .await
        .expect("seed upload")
        .id
}

/// Failure injection around a [`MemoryChunkStore`]
#[derive(Clone, Default)]
pub struct Faults {
    /// Fail `append` once this many bytes have been accepted
    pub append_fails_at: Option<u64>,
    /// Read cursors yield this many chunks, then an I/O error
    pub read_fails_after: Option<usize>,
    /// Read cursors yield one chunk, then never make progress
    pub read_stalls: bool,
    /// `stat` under-reports stored bytes by one
    pub stat_short: bool,
    /// `stat` never returns
    pub stat_stalls: bool,
    /// `delete` always errors
    pub delete_fails: bool,
}

#[derive(Clone)]
pub struct FlakyStore {
    pub inner: MemoryChunkStore,
    faults: Arc<Faults>,
}

impl FlakyStore {
    pub fn new(inner: MemoryChunkStore, faults: Faults) -> Self {
        Self {
            inner,
            faults: Arc::new(faults),
        }
    }

    pub fn adapter(&self, config: MediaConfig) -> MediaAdapter {
        MediaAdapter::new(MediaBackend::new(self.clone()), config)
    }
}

fn injected(what: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("injected {what} failure"))
}

#[async_trait]
impl ChunkStore for FlakyStore {
    async fn open_write(&self, filename: &str, content_type: &str) -> MediaResult<Box<dyn ChunkWriter>> {
        let inner = self.inner.open_write(filename, content_type).await?;
        Ok(Box::new(FlakyWriter {
            inner,
            fails_at: self.faults.append_fails_at,
        }))
    }

    async fn open_read(&self, id: &MediaId, window: ReadWindow) -> MediaResult<ByteStream> {
        let inner = self.inner.open_read(id, window).await?;
        if self.faults.read_stalls {
            let stream = inner.take(1).chain(futures_util::stream::pending());
            return Ok(Box::pin(stream));
        }
        match self.faults.read_fails_after {
            Some(n) => {
                let failure = futures_util::stream::once(async { Err(injected("read")) });
                Ok(Box::pin(inner.take(n).chain(failure)))
            }
            None => Ok(inner),
        }
    }

    async fn stat(&self, id: &MediaId) -> MediaResult<Option<u64>> {
        if self.faults.stat_stalls {
            std::future::pending::<()>().await;
        }
        let stored = self.inner.stat(id).await?;
        if self.faults.stat_short {
            return Ok(stored.map(|n| n.saturating_sub(1)));
        }
        Ok(stored)
    }

    async fn delete(&self, id: &MediaId) -> MediaResult<()> {
        if self.faults.delete_fails {
            return Err(MediaError::backend(injected("delete")));
        }
        self.inner.delete(id).await
    }

    fn chunk_size(&self) -> u64 {
        self.inner.chunk_size()
    }
}

#[async_trait]
impl Catalog for FlakyStore {
    async fn find(&self, id: &MediaId) -> MediaResult<Option<MediaRecord>> {
        self.inner.find(id).await
    }

    async fn list(&self) -> MediaResult<Vec<MediaRecord>> {
        self.inner.list().await
    }

    async fn remove(&self, id: &MediaId) -> MediaResult<bool> {
        self.inner.remove(id).await
    }
}

struct FlakyWriter {
    inner: Box<dyn ChunkWriter>,
    fails_at: Option<u64>,
}

#[async_trait]
impl ChunkWriter for FlakyWriter {
    fn id(&self) -> &MediaId {
        self.inner.id()
    }

    fn written(&self) -> u64 {
        self.inner.written()
    }

    async fn append(&mut self, data: Bytes) -> MediaResult<()> {
        if let Some(limit) = self.fails_at {
            if self.inner.written() >= limit {
                return Err(MediaError::backend(injected("append")));
            }
        }
        self.inner.append(data).await
    }

    async fn finish(self: Box<Self>) -> MediaResult<u64> {
        self.inner.finish().await
    }

    async fn abort(self: Box<Self>) -> MediaResult<()> {
        self.inner.abort().await
    }
}

pub const SHORT_WAIT: Duration = Duration::from_millis(50);
