use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::{MediaAdapter, MediaError, MediaResult};

/// Readiness gate in front of the media store.
///
/// The server creates an empty gate, hands clones of it to its request
/// handlers and opens it once the store is reachable. Until then every
/// lookup fails with [`MediaError::StoreUnavailable`].
#[derive(Clone, Default)]
pub struct StoreGate {
    cell: Arc<OnceCell<MediaAdapter>>,
}

impl StoreGate {
    /// A gate that is not ready yet
    pub fn new() -> Self {
        Self::default()
    }

    /// A gate that is ready from the start
    pub fn ready(adapter: MediaAdapter) -> Self {
        Self {
            cell: Arc::new(OnceCell::new_with(Some(adapter))),
        }
    }

    /// Publish the adapter. Fails if the gate was already opened.
    pub fn open(&self, adapter: MediaAdapter) -> MediaResult<()> {
        self.cell
            .set(adapter)
            .map_err(|_| MediaError::invalid("media store gate already open"))
    }

    pub fn is_ready(&self) -> bool {
        self.cell.initialized()
    }

    pub fn adapter(&self) -> MediaResult<&MediaAdapter> {
        self.cell.get().ok_or(MediaError::StoreUnavailable)
    }
}

impl std::fmt::Debug for StoreGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreGate").field("ready", &self.is_ready()).finish()
    }
}
