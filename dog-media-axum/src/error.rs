use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use dog_media::MediaError;
use serde_json::json;

/// Feathers-style error classes used on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    PayloadTooLarge,
    RangeNotSatisfiable,
    GeneralError,
    Unavailable,
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::PayloadTooLarge => 413,
            ErrorKind::RangeNotSatisfiable => 416,
            ErrorKind::GeneralError => 500,
            ErrorKind::Unavailable => 503,
        }
    }

    /// Feathers error `name` (e.g. "NotFound")
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::PayloadTooLarge => "PayloadTooLarge",
            ErrorKind::RangeNotSatisfiable => "RangeNotSatisfiable",
            ErrorKind::GeneralError => "GeneralError",
            ErrorKind::Unavailable => "Unavailable",
        }
    }

    /// Feathers error `className` (commonly kebab-cased)
    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::NotFound => "not-found",
            ErrorKind::PayloadTooLarge => "payload-too-large",
            ErrorKind::RangeNotSatisfiable => "range-not-satisfiable",
            ErrorKind::GeneralError => "general-error",
            ErrorKind::Unavailable => "unavailable",
        }
    }
}

impl From<&MediaError> for ErrorKind {
    fn from(err: &MediaError) -> Self {
        match err {
            MediaError::MalformedId { .. }
            | MediaError::NoPayload
            | MediaError::EmptyUpload { .. }
            | MediaError::EmptyObject { .. }
            | MediaError::Invalid { .. } => ErrorKind::BadRequest,
            MediaError::NotFound { .. } => ErrorKind::NotFound,
            MediaError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            MediaError::Range { .. } => ErrorKind::RangeNotSatisfiable,
            MediaError::StoreUnavailable => ErrorKind::Unavailable,
            MediaError::UploadFailed { .. }
            | MediaError::Backend { .. }
            | MediaError::Io { .. }
            | MediaError::Serialization { .. } => ErrorKind::GeneralError,
        }
    }
}

#[derive(Debug)]
pub struct MediaAxumError(pub MediaError);

impl From<MediaError> for MediaAxumError {
    fn from(e: MediaError) -> Self {
        Self(e)
    }
}

impl MediaAxumError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::from(&self.0)
    }

    /// Message safe to hand to clients; server-side failures are not described
    fn client_message(&self) -> String {
        match &self.0 {
            MediaError::UploadFailed { .. } => "Upload failed".to_string(),
            MediaError::Backend { .. } | MediaError::Io { .. } | MediaError::Serialization { .. } => {
                "Internal storage error".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let kind = self.kind();
        json!({
            "name": kind.name(),
            "message": self.client_message(),
            "code": kind.status_code(),
            "className": kind.class_name(),
        })
    }
}

impl IntoResponse for MediaAxumError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = StatusCode::from_u16(kind.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // 416 carries the object size and nothing else
        if let MediaError::Range { total, .. } = &self.0 {
            tracing::debug!(error = %self.0, "range not satisfiable");
            return (status, [(header::CONTENT_RANGE, format!("bytes */{total}"))]).into_response();
        }

        if kind == ErrorKind::GeneralError {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "request rejected");
        }
        (status, Json(self.to_json())).into_response()
    }
}
