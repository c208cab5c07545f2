use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, warn};

use crate::planner::RangeRequestPlanner;
use crate::store::{Catalog, ChunkStore, MediaBackend};
use crate::{ByteStream, MediaConfig, MediaError, MediaId, MediaResult, RangeSpec};

/// Serves byte ranges of stored objects.
///
/// Resolves the object in the catalog, plans the range, opens a bounded read
/// cursor and hands back a [`MediaResponse`] whose body pulls from that
/// cursor on demand. The responder never buffers the interval.
pub struct StreamingResponder {
    store: Arc<dyn ChunkStore>,
    catalog: Arc<dyn Catalog>,
    planner: RangeRequestPlanner,
    content_type: String,
    idle_timeout: Option<Duration>,
}

impl StreamingResponder {
    pub fn new(backend: &MediaBackend, config: &MediaConfig) -> Self {
        Self {
            store: backend.store.clone(),
            catalog: backend.catalog.clone(),
            planner: RangeRequestPlanner::new(config.missing_range),
            content_type: config.content_type.clone(),
            idle_timeout: config.stream_idle_timeout,
        }
    }

    pub fn planner(&self) -> &RangeRequestPlanner {
        &self.planner
    }

    /// Prepare the response for `id` given the raw `Range` header, if any.
    ///
    /// Every rejection is returned before a cursor is opened, so nothing has
    /// been written to the client when this fails.
    pub async fn respond(&self, id: &MediaId, range_header: Option<&str>) -> MediaResult<MediaResponse> {
        let record = self
            .catalog
            .find(id)
            .await?
            .ok_or_else(|| MediaError::not_found(id.to_string()))?;

        if !record.is_streamable() {
            return Err(MediaError::EmptyObject { id: id.to_string() });
        }

        let range = self.planner.plan(record.length, range_header).map_err(|rejection| {
            debug!(%id, ?range_header, %rejection, "range rejected");
            MediaError::range(rejection, record.length)
        })?;

        let cursor = self.store.open_read(id, range.read_window()).await?;
        debug!(%id, start = range.start, end = range.end, total = range.total, "streaming range");

        Ok(MediaResponse {
            range,
            partial: range_header.is_some(),
            content_type: self.content_type.clone(),
            body: transfer_body(*id, cursor, range.content_length(), self.idle_timeout),
        })
    }
}

/// A planned response: framing plus a body that streams from the store
pub struct MediaResponse {
    pub range: RangeSpec,
    /// `true` when answering a range request (206), `false` for the
    /// whole-object fallback (200)
    pub partial: bool,
    pub content_type: String,
    pub body: ByteStream,
}

impl MediaResponse {
    pub fn status_code(&self) -> u16 {
        if self.partial {
            206
        } else {
            200
        }
    }

    pub fn content_length(&self) -> u64 {
        self.range.content_length()
    }

    /// `Content-Range` header value; only partial responses carry one
    pub fn content_range(&self) -> Option<String> {
        self.partial.then(|| self.range.content_range())
    }

    pub fn into_body(self) -> ByteStream {
        self.body
    }

    /// Pipe the body into `sink`.
    ///
    /// Stops at the first read or write error. The read cursor is released
    /// when this returns, whatever the outcome.
    pub async fn copy_body_to<W>(self, sink: &mut W) -> std::io::Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let mut body = self.body;
        let mut copied = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            sink.write_all(&chunk).await?;
            copied += chunk.len() as u64;
        }
        sink.flush().await?;
        Ok(copied)
    }
}

impl std::fmt::Debug for MediaResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaResponse")
            .field("range", &self.range)
            .field("partial", &self.partial)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Bookkeeping for one response body; reports early termination on drop.
struct Transfer {
    id: MediaId,
    expected: u64,
    sent: u64,
    failed: bool,
}

impl Transfer {
    fn remaining(&self) -> u64 {
        self.expected - self.sent
    }

    fn fail(&mut self, reason: &std::io::Error) {
        self.failed = true;
        error!(id = %self.id, sent = self.sent, expected = self.expected, error = %reason, "stream aborted");
    }
}

impl Drop for Transfer {
    fn drop(&mut self) {
        if !self.failed && self.sent < self.expected {
            warn!(id = %self.id, sent = self.sent, expected = self.expected, "client went away mid-stream");
        }
    }
}

/// Body stream that delivers exactly `expected` bytes from `cursor` or ends
/// with an error. Errors are terminal; nothing is retried.
fn transfer_body(
    id: MediaId,
    mut cursor: ByteStream,
    expected: u64,
    idle_timeout: Option<Duration>,
) -> ByteStream {
    let stream = async_stream::stream! {
        let mut transfer = Transfer { id, expected, sent: 0, failed: false };

        while transfer.remaining() > 0 {
            let next = match idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, cursor.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        let err = std::io::Error::new(
                            std::io::ErrorKind::TimedOut,
                            format!("store stalled for {limit:?}"),
                        );
                        transfer.fail(&err);
                        yield Err(err);
                        return;
                    }
                },
                None => cursor.next().await,
            };

            match next {
                Some(Ok(mut chunk)) => {
                    let remaining = transfer.remaining();
                    if chunk.len() as u64 > remaining {
                        chunk.truncate(remaining as usize);
                    }
                    transfer.sent += chunk.len() as u64;
                    yield Ok(chunk);
                }
                Some(Err(err)) => {
                    transfer.fail(&err);
                    yield Err(err);
                    return;
                }
                None => {
                    let err = std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!("store ended after {} of {} bytes", transfer.sent, transfer.expected),
                    );
                    transfer.fail(&err);
                    yield Err(err);
                    return;
                }
            }
        }
    };

    Box::pin(stream)
}
