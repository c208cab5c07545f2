use std::sync::Arc;

use crate::{
    ByteStream, IngestReceipt, IngestionCoordinator, MediaBackend, MediaConfig, MediaId, MediaRecord,
    MediaResponse, MediaResult, StreamingResponder,
};

/// The main media adapter - this is what request handlers hold on to
///
/// Cheap to clone; every clone shares the same backend, responder and
/// ingestion coordinator.
#[derive(Clone)]
pub struct MediaAdapter {
    backend: MediaBackend,
    responder: Arc<StreamingResponder>,
    ingestion: Arc<IngestionCoordinator>,
    config: MediaConfig,
}

impl MediaAdapter {
    /// Create a new media adapter
    pub fn new(backend: MediaBackend, config: MediaConfig) -> Self {
        Self {
            responder: Arc::new(StreamingResponder::new(&backend, &config)),
            ingestion: Arc::new(IngestionCoordinator::new(&backend, &config)),
            backend,
            config,
        }
    }

    /// Committed objects, newest first
    pub async fn list(&self) -> MediaResult<Vec<MediaRecord>> {
        self.backend.catalog.list().await
    }

    pub async fn find(&self, id: &MediaId) -> MediaResult<Option<MediaRecord>> {
        self.backend.catalog.find(id).await
    }

    /// Plan and open a (possibly partial) read of `id`
    pub async fn stream(&self, id: &MediaId, range_header: Option<&str>) -> MediaResult<MediaResponse> {
        self.responder.respond(id, range_header).await
    }

    /// Store an uploaded payload
    pub async fn ingest(&self, display_name: &str, payload: Option<ByteStream>) -> MediaResult<IngestReceipt> {
        self.ingestion.ingest(display_name, payload).await
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    pub fn backend(&self) -> &MediaBackend {
        &self.backend
    }
}

impl std::fmt::Debug for MediaAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaAdapter")
            .field("backend", &self.backend)
            .field("config", &self.config)
            .finish()
    }
}
