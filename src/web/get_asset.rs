use std::{io::SeekFrom, path::Path, sync::Arc, time::Duration};

use axum::{
    body::{boxed, Body},
    extract::State,
    headers::{ContentRange, HeaderMapExt, LastModified, Range},
    http::{header, StatusCode, Uri},
    response::Response,
    TypedHeader,
};
use axum_util::errors::{ApiError, ApiResult};
use futures::StreamExt;
use hyper::body::Sender;
use log::{debug, warn};
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::{
    assets::{content_type, AssetStore},
    range::{resolve, Resolved},
};

const STREAM_PREFIX: &str = "/stream/";
const STREAM_BUFFER_SIZE: usize = 64 * 1024;
/// Longest a client may leave a chunk unread before the transfer is dropped.
const STALL_TIMEOUT: Duration = Duration::from_secs(30);

lazy_static::lazy_static! {
    static ref BYTES_SERVED: IntCounterVec = register_int_counter_vec!("dashreel_bytes_served", "bytes streamed in response bodies", &["kind"]).unwrap();
    static ref RANGE_UNSATISFIABLE: IntCounter = register_int_counter!("dashreel_range_unsatisfiable", "count of 416 responses").unwrap();
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("client went away")]
    ClientGone,
    #[error("client left data unread for {0:?}")]
    Stalled(Duration),
}

/// Copies `reader` into a response body channel. Every chunk must be taken by
/// the client within `idle_timeout`; the reader is dropped on every exit path.
async fn pump_body<R: AsyncRead + Unpin>(
    reader: R,
    mut sender: Sender,
    idle_timeout: Duration,
    kind: &'static str,
) -> Result<(), StreamError> {
    let mut chunks = ReaderStream::with_capacity(reader, STREAM_BUFFER_SIZE);
    while let Some(chunk) = chunks.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                sender.abort();
                return Err(e.into());
            }
        };
        let len = chunk.len() as u64;
        match tokio::time::timeout(idle_timeout, sender.send_data(chunk)).await {
            Ok(Ok(())) => BYTES_SERVED.with_label_values(&[kind]).inc_by(len),
            Ok(Err(_)) => return Err(StreamError::ClientGone),
            Err(_) => {
                sender.abort();
                return Err(StreamError::Stalled(idle_timeout));
            }
        }
    }
    Ok(())
}

/// Serves the file at `file_path`, honoring a single-range `Range` header.
///
/// Directories and anything that cannot be opened are reported as not found.
pub async fn stream_file(
    file_path: &Path,
    range: Option<TypedHeader<Range>>,
) -> ApiResult<Response> {
    let mut file = match tokio::fs::File::open(file_path).await {
        Ok(file) => file,
        Err(e) => {
            debug!("cannot open {}: {e}", file_path.display());
            return Err(ApiError::NotFound);
        }
    };
    let metadata = file.metadata().await?;
    if metadata.is_dir() {
        return Err(ApiError::NotFound);
    }
    let length = metadata.len();

    let builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type(file_path))
        .header(header::ACCEPT_RANGES, "bytes");

    let (kind, start, bounded_length) = match resolve(range.as_ref().map(|x| &x.0), length) {
        Resolved::Full => ("full", 0, length),
        Resolved::Partial { start, end } => ("partial", start, end - start + 1),
        Resolved::Unsatisfiable => {
            RANGE_UNSATISFIABLE.inc();
            debug!(
                "unsatisfiable range for {} ({length} bytes)",
                file_path.display()
            );
            let mut response = builder
                .status(StatusCode::RANGE_NOT_SATISFIABLE)
                .header(header::CONTENT_LENGTH, "0")
                .body(boxed(Body::empty()))?;
            response
                .headers_mut()
                .typed_insert(ContentRange::unsatisfied_bytes(length));
            return Ok(response);
        }
    };

    if start > 0 {
        file.seek(SeekFrom::Start(start)).await?;
    }
    let (sender, body) = Body::channel();
    let display_path = file_path.display().to_string();
    tokio::spawn(async move {
        match pump_body(file.take(bounded_length), sender, STALL_TIMEOUT, kind).await {
            Ok(()) => {}
            Err(StreamError::ClientGone) => {
                debug!("client went away while streaming {display_path}")
            }
            Err(e) => warn!("streaming {display_path} aborted: {e}"),
        }
    });

    let mut response = builder
        .status(if kind == "partial" {
            StatusCode::PARTIAL_CONTENT
        } else {
            StatusCode::OK
        })
        .header(header::CONTENT_LENGTH, bounded_length.to_string())
        .body(boxed(body))?;
    if kind == "partial" {
        response
            .headers_mut()
            .typed_insert(ContentRange::bytes(start..=start + bounded_length - 1, length)?);
    }
    if let Ok(modified) = metadata.modified() {
        response
            .headers_mut()
            .typed_insert(LastModified::from(modified));
    }
    Ok(response)
}

pub async fn get_asset(
    State(assets): State<Arc<AssetStore>>,
    uri: Uri,
    range: Option<TypedHeader<Range>>,
) -> ApiResult<Response> {
    let raw = uri.path().strip_prefix(STREAM_PREFIX).unwrap_or_default();
    debug!("streaming request received for: {raw}");
    let Ok(path) = urlencoding::decode(raw) else {
        warn!("rejected undecodable asset path {raw:?}");
        return Err(ApiError::NotFound);
    };
    let Some(file_path) = assets.resolve(&path) else {
        warn!("rejected asset path {path:?}");
        return Err(ApiError::NotFound);
    };

    stream_file(&file_path, range).await
}
