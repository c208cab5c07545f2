use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{debug, info, warn};

use crate::store::{Catalog, ChunkStore, ChunkWriter, MediaBackend};
use crate::{ByteStream, IngestReceipt, MediaConfig, MediaError, MediaId, MediaResult};

/// Lifecycle of one upload.
///
/// `Idle -> Writing -> Verifying -> Committed`, with `AbortedWrite` or
/// `CompensatingDelete` leading to `Failed` when something goes wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestPhase {
    Idle,
    Writing,
    AbortedWrite,
    Verifying,
    CompensatingDelete,
    Committed,
    Failed,
}

impl IngestPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Failed)
    }
}

/// Streams uploads into the chunk store, then checks what was committed.
///
/// The store may acknowledge a write without the payload being usable, so
/// every upload is read back through the catalog and `stat` before it is
/// reported as committed. Anything that fails that check is deleted again.
pub struct IngestionCoordinator {
    store: Arc<dyn ChunkStore>,
    catalog: Arc<dyn Catalog>,
    content_type: String,
    max_object_bytes: u64,
}

impl IngestionCoordinator {
    pub fn new(backend: &MediaBackend, config: &MediaConfig) -> Self {
        Self {
            store: backend.store.clone(),
            catalog: backend.catalog.clone(),
            content_type: config.content_type.clone(),
            max_object_bytes: config.max_object_bytes,
        }
    }

    /// Store `payload` under a fresh id, recording `display_name` alongside it.
    pub async fn ingest(
        &self,
        display_name: &str,
        payload: Option<ByteStream>,
    ) -> MediaResult<IngestReceipt> {
        let Some(payload) = payload else {
            return Err(MediaError::NoPayload);
        };

        let mut writer = self
            .store
            .open_write(display_name, &self.content_type)
            .await
            .map_err(|e| MediaError::upload_failed(format!("could not open write cursor: {e}")))?;
        let id = *writer.id();
        let mut pending = PendingUpload::new(id, self);
        phase(&id, IngestPhase::Writing);

        if let Err(err) = self.pump(writer.as_mut(), payload).await {
            phase(&id, IngestPhase::AbortedWrite);
            if let Err(abort_err) = writer.abort().await {
                warn!(%id, error = %abort_err, "write cursor abort failed");
            }
            return Err(self.fail(&mut pending, err).await);
        }

        let written = match writer.finish().await {
            Ok(written) => written,
            Err(err) => {
                phase(&id, IngestPhase::AbortedWrite);
                return Err(self.fail(&mut pending, MediaError::upload_failed(err.to_string())).await);
            }
        };

        phase(&id, IngestPhase::Verifying);
        if let Err(err) = self.verify(&id, written).await {
            return Err(self.fail(&mut pending, err).await);
        }

        pending.settle();
        phase(&id, IngestPhase::Committed);
        info!(%id, filename = display_name, length = written, "upload committed");
        Ok(IngestReceipt {
            id,
            filename: display_name.to_string(),
            length: written,
        })
    }

    async fn pump(&self, writer: &mut dyn ChunkWriter, mut payload: ByteStream) -> MediaResult<()> {
        while let Some(piece) = payload.next().await {
            let piece = piece.map_err(|e| MediaError::upload_failed(format!("payload read failed: {e}")))?;
            if writer.written() + piece.len() as u64 > self.max_object_bytes {
                return Err(MediaError::PayloadTooLarge {
                    limit: self.max_object_bytes,
                });
            }
            writer
                .append(piece)
                .await
                .map_err(|e| MediaError::upload_failed(format!("chunk write failed: {e}")))?;
        }
        Ok(())
    }

    /// Re-read the committed object independently of the write path.
    async fn verify(&self, id: &MediaId, written: u64) -> MediaResult<()> {
        let record = self
            .catalog
            .find(id)
            .await
            .map_err(|e| MediaError::upload_failed(format!("verification lookup failed: {e}")))?;

        let record = match record {
            Some(record) if record.is_streamable() => record,
            _ => return Err(MediaError::EmptyUpload { id: id.to_string() }),
        };
        if record.length != written {
            return Err(MediaError::upload_failed(format!(
                "catalog reports {} bytes, {} were written",
                record.length, written
            )));
        }

        let stored = self
            .store
            .stat(id)
            .await
            .map_err(|e| MediaError::upload_failed(format!("verification stat failed: {e}")))?;
        if stored != Some(record.length) {
            return Err(MediaError::upload_failed(format!(
                "chunk store holds {:?} bytes, catalog expects {}",
                stored, record.length
            )));
        }
        Ok(())
    }

    /// Compensate and hand back the error that triggered it.
    async fn fail(&self, pending: &mut PendingUpload, err: MediaError) -> MediaError {
        let id = pending.id;
        phase(&id, IngestPhase::CompensatingDelete);
        compensate(&id, self.store.as_ref(), self.catalog.as_ref()).await;
        pending.settle();
        phase(&id, IngestPhase::Failed);
        warn!(%id, error = %err, "upload rejected");
        err
    }
}

/// Best-effort removal of the record and its chunks.
async fn compensate(id: &MediaId, store: &dyn ChunkStore, catalog: &dyn Catalog) {
    if let Err(e) = catalog.remove(id).await {
        warn!(%id, error = %e, "compensating record removal failed");
    }
    if let Err(e) = store.delete(id).await {
        warn!(%id, error = %e, "compensating chunk delete failed");
    }
}

/// An upload that has not yet reached `Committed` or finished compensating.
///
/// If the `ingest` future is dropped in between (client gone, request
/// timeout), whatever it left behind is compensated on the runtime.
struct PendingUpload {
    id: MediaId,
    store: Arc<dyn ChunkStore>,
    catalog: Arc<dyn Catalog>,
    settled: bool,
}

impl PendingUpload {
    fn new(id: MediaId, coordinator: &IngestionCoordinator) -> Self {
        Self {
            id,
            store: coordinator.store.clone(),
            catalog: coordinator.catalog.clone(),
            settled: false,
        }
    }

    fn settle(&mut self) {
        self.settled = true;
    }
}

impl Drop for PendingUpload {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let id = self.id;
        warn!(%id, "upload cancelled before it settled, compensating");

        let store = self.store.clone();
        let catalog = self.catalog.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    compensate(&id, store.as_ref(), catalog.as_ref()).await;
                });
            }
            Err(_) => warn!(%id, "no runtime to compensate on, upload may linger"),
        }
    }
}

fn phase(id: &MediaId, phase: IngestPhase) {
    debug!(%id, ?phase, terminal = phase.is_terminal(), "ingest phase");
}
