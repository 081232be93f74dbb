use std::sync::Arc;

use axum::{
    extract::State,
    headers::Range,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    TypedHeader,
};
use axum_util::errors::{ApiError, ApiResult};
use log::warn;

use super::{get_asset::stream_file, FrontendState};

const INDEX_FILE: &str = "index.html";

pub async fn get_static(
    State(state): State<Arc<FrontendState>>,
    method: Method,
    uri: Uri,
    range: Option<TypedHeader<Range>>,
) -> ApiResult<Response> {
    if method != Method::GET && method != Method::HEAD {
        return Err(ApiError::Response(
            StatusCode::METHOD_NOT_ALLOWED.into_response(),
        ));
    }
    let Ok(path) = urlencoding::decode(uri.path()) else {
        return Err(ApiError::NotFound);
    };
    let Some(mut file_path) = state.assets.resolve(&path) else {
        warn!("rejected static path {path:?}");
        return Err(ApiError::NotFound);
    };
    if tokio::fs::metadata(&file_path)
        .await
        .map(|x| x.is_dir())
        .unwrap_or(false)
    {
        file_path.push(INDEX_FILE);
    }

    stream_file(&file_path, range).await
}
