use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tracing::{debug, info, warn};

use crate::store::{Catalog, ChunkStore, ChunkWriter, ReadWindow};
use crate::{ByteStream, MediaError, MediaId, MediaRecord, MediaResult};

const FILES_DIR: &str = "files";
const CHUNKS_DIR: &str = "chunks";

/// Filesystem chunk store.
///
/// Layout under `root`:
///
/// ```text
/// files/<id>.json            catalog record, written once the object is complete
/// chunks/<id>/<index>.chunk  fixed-size chunks, the last one may be short
/// ```
///
/// The store's `chunk_size` only applies to new writes. Reads use the size
/// saved in each object's record, so changing it leaves old objects readable.
#[derive(Clone, Debug)]
pub struct FsChunkStore {
    root: Arc<PathBuf>,
    chunk_size: u64,
}

impl FsChunkStore {
    /// Open (and create if needed) a store rooted at `root`
    pub async fn open<P: Into<PathBuf>>(root: P, chunk_size: u64) -> MediaResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(root.join(FILES_DIR)).await?;
        tokio::fs::create_dir_all(root.join(CHUNKS_DIR)).await?;

        info!(root = %root.display(), chunk_size, "chunk store opened");
        Ok(Self {
            root: Arc::new(root),
            chunk_size: chunk_size.max(1),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, id: &MediaId) -> PathBuf {
        self.root.join(FILES_DIR).join(format!("{id}.json"))
    }

    fn chunk_dir(&self, id: &MediaId) -> PathBuf {
        self.root.join(CHUNKS_DIR).join(id.to_string())
    }

    fn chunk_path(&self, id: &MediaId, index: u64) -> PathBuf {
        self.chunk_dir(id).join(format!("{index:08}.chunk"))
    }

    async fn write_record(&self, record: &MediaRecord) -> MediaResult<()> {
        let path = self.record_path(&record.id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec(record)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

async fn read_chunk(path: &Path) -> std::io::Result<Bytes> {
    match tokio::fs::read(path).await {
        Ok(data) => Ok(Bytes::from(data)),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(std::io::Error::new(
            ErrorKind::UnexpectedEof,
            format!("chunk {} is missing", path.display()),
        )),
        Err(e) => Err(e),
    }
}

fn is_not_found(e: &std::io::Error) -> bool {
    e.kind() == ErrorKind::NotFound
}

#[async_trait]
impl ChunkStore for FsChunkStore {
    async fn open_write(
        &self,
        filename: &str,
        content_type: &str,
    ) -> MediaResult<Box<dyn ChunkWriter>> {
        let id = MediaId::new();
        tokio::fs::create_dir_all(self.chunk_dir(&id)).await?;
        debug!(%id, filename, "write cursor opened");

        Ok(Box::new(FsChunkWriter {
            store: self.clone(),
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
        // chunks are addressed with the size they were written with, which
        // may differ from the size this store now writes new objects with
        let record = self.find(id).await?.ok_or_else(|| MediaError::not_found(id.to_string()))?;
        if record.chunk_size == 0 {
            return Err(MediaError::invalid(format!("record for {id} has a zero chunk size")));
        }

        let store = self.clone();
        let id = *id;
        let chunk_size = record.chunk_size;
        let chunk_count = record.chunk_count();

        let stream = async_stream::stream! {
            let mut index = window.first_chunk(chunk_size);
            let mut skip = window.skip_in_first_chunk(chunk_size) as usize;
            let mut remaining = window.len();

            while remaining > 0 {
                if index >= chunk_count {
                    yield Err(std::io::Error::new(
                        ErrorKind::UnexpectedEof,
                        format!("{id} has no chunk {index}, it ends after {chunk_count}"),
                    ));
                    return;
                }
                let chunk = match read_chunk(&store.chunk_path(&id, index)).await {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };
                if skip >= chunk.len() {
                    yield Err(std::io::Error::new(
                        ErrorKind::UnexpectedEof,
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
        let mut entries = match tokio::fs::read_dir(self.chunk_dir(id)).await {
            Ok(entries) => entries,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut total = 0;
        while let Some(entry) = entries.next_entry().await? {
            total += entry.metadata().await?.len();
        }
        Ok(Some(total))
    }

    async fn delete(&self, id: &MediaId) -> MediaResult<()> {
        match tokio::fs::remove_dir_all(self.chunk_dir(id)).await {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn chunk_size(&self) -> u64 {
        self.chunk_size
    }
}

#[async_trait]
impl Catalog for FsChunkStore {
    async fn find(&self, id: &MediaId) -> MediaResult<Option<MediaRecord>> {
        match tokio::fs::read(self.record_path(id)).await {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> MediaResult<Vec<MediaRecord>> {
        let mut entries = tokio::fs::read_dir(self.root.join(FILES_DIR)).await?;
        let mut records = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = match tokio::fs::read(&path).await {
                Ok(raw) => raw,
                // removed between read_dir and read
                Err(e) if is_not_found(&e) => continue,
                Err(e) => return Err(e.into()),
            };
            match serde_json::from_slice::<MediaRecord>(&raw) {
                Ok(record) => records.push(record),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable catalog record"),
            }
        }

        records.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
        Ok(records)
    }

    async fn remove(&self, id: &MediaId) -> MediaResult<bool> {
        match tokio::fs::remove_file(self.record_path(id)).await {
            Ok(()) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

struct FsChunkWriter {
    store: FsChunkStore,
    id: MediaId,
    filename: String,
    content_type: String,
    buffer: BytesMut,
    next_index: u64,
    written: u64,
    done: bool,
}

impl FsChunkWriter {
    async fn persist(&mut self, data: Bytes) -> MediaResult<()> {
        tokio::fs::write(self.store.chunk_path(&self.id, self.next_index), &data).await?;
        self.next_index += 1;
        Ok(())
    }
}

#[async_trait]
impl ChunkWriter for FsChunkWriter {
    fn id(&self) -> &MediaId {
        &self.id
    }

    fn written(&self) -> u64 {
        self.written
    }

    async fn append(&mut self, data: Bytes) -> MediaResult<()> {
        let chunk_size = self.store.chunk_size as usize;
        self.written += data.len() as u64;
        self.buffer.extend_from_slice(&data);

        while self.buffer.len() >= chunk_size {
            let chunk = self.buffer.split_to(chunk_size).freeze();
            self.persist(chunk).await?;
        }
        Ok(())
    }

    async fn finish(mut self: Box<Self>) -> MediaResult<u64> {
        if !self.buffer.is_empty() {
            let tail = self.buffer.split().freeze();
            self.persist(tail).await?;
        }

        let record = MediaRecord::new(self.id, self.filename.clone(), self.written, self.store.chunk_size)
            .with_content_type(self.content_type.clone());
        self.store.write_record(&record).await?;
        self.done = true;

        debug!(id = %self.id, length = self.written, "write cursor committed");
        Ok(self.written)
    }

    async fn abort(mut self: Box<Self>) -> MediaResult<()> {
        self.done = true;
        self.store.delete(&self.id).await
    }
}

impl Drop for FsChunkWriter {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let dir = self.store.chunk_dir(&self.id);
        warn!(id = %self.id, "write cursor dropped before commit, discarding chunks");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                        if !is_not_found(&e) {
                            warn!(dir = %dir.display(), error = %e, "discarding chunks failed");
                        }
                    }
                });
            }
            Err(_) => {
                if let Err(e) = std::fs::remove_dir_all(&dir) {
                    if !is_not_found(&e) {
                        warn!(dir = %dir.display(), error = %e, "discarding chunks failed");
                    }
                }
            }
        }
    }
}
