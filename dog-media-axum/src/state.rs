use std::sync::Arc;

use dog_media::{MediaAdapter, StoreGate};

use crate::MediaAxumError;

/// Multipart field that carries the uploaded file unless configured otherwise
pub const DEFAULT_UPLOAD_FIELD: &str = "file";

#[derive(Clone, Debug)]
pub struct MediaAxumState {
    pub gate: StoreGate,
    pub upload_field: Arc<str>,
}

impl MediaAxumState {
    pub fn new(gate: StoreGate) -> Self {
        Self {
            gate,
            upload_field: Arc::from(DEFAULT_UPLOAD_FIELD),
        }
    }

    pub fn with_upload_field(mut self, field: &str) -> Self {
        self.upload_field = Arc::from(field);
        self
    }

    /// The adapter, or `503` while the store is still opening
    pub fn adapter(&self) -> Result<&MediaAdapter, MediaAxumError> {
        Ok(self.gate.adapter()?)
    }
}
