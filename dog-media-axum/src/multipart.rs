use axum::body::Body;
use dog_media::{ByteStream, MediaError};
use futures::TryStreamExt;

/// The file part of an upload, still streaming from the request body
pub struct UploadField {
    pub filename: String,
    pub payload: ByteStream,
}

/// Find the multipart field named `field_name` and expose its bytes as a
/// stream.
///
/// Uses multer directly rather than axum's extractor so the file is never
/// collected in memory; parts before the wanted one are skipped, parts after
/// it are never read. Returns `Ok(None)` when the field is absent.
pub async fn take_upload_field(
    content_type: Option<&str>,
    body: Body,
    field_name: &str,
) -> Result<Option<UploadField>, MediaError> {
    let content_type = content_type.ok_or_else(|| MediaError::invalid("Missing content-type header"))?;
    let boundary = multer::parse_boundary(content_type)
        .map_err(|_| MediaError::invalid("Expected a multipart/form-data body"))?;

    let mut multipart = multer::Multipart::new(body.into_data_stream(), boundary);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| MediaError::invalid(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some(field_name) {
            tracing::debug!(field = ?field.name(), "skipping multipart field");
            continue;
        }

        let filename = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => field_name.to_string(),
        };
        let payload = field.map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e));

        return Ok(Some(UploadField {
            filename,
            payload: Box::pin(payload),
        }));
    }

    Ok(None)
}
