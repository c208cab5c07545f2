use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use dog_media::{IngestReceipt, MediaError, MediaId, MediaRecord};

use crate::multipart::take_upload_field;
use crate::{MediaAxumError, MediaAxumState};

pub fn media_router(state: MediaAxumState) -> Router<()> {
    Router::new()
        .route("/health", get(health))
        .route("/videos", get(list_videos))
        .route("/video/{id}", get(stream_video))
        .route("/upload", post(upload))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn list_videos(State(state): State<MediaAxumState>) -> Result<Json<Vec<MediaRecord>>, MediaAxumError> {
    let records = state.adapter()?.list().await?;
    Ok(Json(records))
}

async fn stream_video(
    State(state): State<MediaAxumState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, MediaAxumError> {
    let adapter = state.adapter()?;
    let id = MediaId::parse(&id)?;

    // non-UTF-8 bytes become U+FFFD and fail range parsing as malformed
    let range = headers
        .get(header::RANGE)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

    let response = adapter.stream(&id, range.as_deref()).await?;

    let status = StatusCode::from_u16(response.status_code()).unwrap_or(StatusCode::OK);
    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, response.content_type.as_str())
        .header(header::CONTENT_LENGTH, response.content_length())
        .header(header::ACCEPT_RANGES, "bytes");
    if let Some(content_range) = response.content_range() {
        builder = builder.header(header::CONTENT_RANGE, content_range);
    }

    builder
        .body(Body::from_stream(response.into_body()))
        .map_err(|e| MediaError::backend(e).into())
}

async fn upload(
    State(state): State<MediaAxumState>,
    headers: HeaderMap,
    body: Body,
) -> Result<(StatusCode, Json<IngestReceipt>), MediaAxumError> {
    let adapter = state.adapter()?;
    let content_type = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok());

    let receipt = match take_upload_field(content_type, body, &state.upload_field).await? {
        Some(field) => adapter.ingest(&field.filename, Some(field.payload)).await?,
        None => adapter.ingest("", None).await?,
    };

    tracing::info!(id = %receipt.id, filename = %receipt.filename, length = receipt.length, "video uploaded");
    Ok((StatusCode::CREATED, Json(receipt)))
}
