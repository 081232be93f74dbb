use std::{path::Path, sync::Arc};

use axum::{extract::State, Json};
use axum_util::errors::{ApiError, ApiResult};
use log::{debug, error};
use prometheus::{register_int_counter_vec, IntCounterVec};
use serde::Serialize;

use crate::config::CatalogConfig;

lazy_static::lazy_static! {
    static ref CATALOG_SCANS: IntCounterVec = register_int_counter_vec!("dashreel_catalog_scans", "catalog directory scans", &["outcome"]).unwrap();
}

/// One title in a `/videos` response. `id` is positional and only unique
/// within that response.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
    pub stream_url: String,
}

/// Names of the immediate subdirectories of `root`, sorted. Names that are not
/// valid UTF-8 are kept in lossy form so every directory yields one title.
pub async fn scan_titles(root: &Path) -> std::io::Result<Vec<String>> {
    let mut read_dir = tokio::fs::read_dir(root).await?;
    let mut titles = vec![];
    while let Some(entry) = read_dir.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        titles.push(entry.file_name().to_string_lossy().into_owned());
    }
    titles.sort();
    Ok(titles)
}

pub fn build_catalog(titles: Vec<String>, streaming_url: &str) -> Vec<CatalogEntry> {
    let base = streaming_url.trim_end_matches('/');
    titles
        .into_iter()
        .enumerate()
        .map(|(i, title)| CatalogEntry {
            id: (i + 1).to_string(),
            stream_url: format!("{base}/stream/{title}/stream.mpd"),
            title,
        })
        .collect()
}

pub async fn list_videos(
    State(config): State<Arc<CatalogConfig>>,
) -> ApiResult<Json<Vec<CatalogEntry>>> {
    debug!("scanning for videos in {}", config.videos_dir.display());
    let titles = match scan_titles(&config.videos_dir).await {
        Ok(titles) => titles,
        Err(e) => {
            CATALOG_SCANS.with_label_values(&["error"]).inc();
            error!(
                "failed to read video directory '{}': {e}",
                config.videos_dir.display()
            );
            return Err(ApiError::Other(e.into()));
        }
    };
    CATALOG_SCANS.with_label_values(&["ok"]).inc();

    let videos = build_catalog(titles, &config.streaming_url);
    debug!("found {} videos", videos.len());
    Ok(Json(videos))
}
