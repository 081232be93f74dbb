use std::path::{Component, Path, PathBuf};

/// A directory tree that files are served out of.
#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a `/`-separated request path onto a path under the store root.
    ///
    /// Returns `None` if any segment could escape the root. Empty segments are
    /// skipped, so an empty request path resolves to the root itself.
    pub fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let mut path = self.root.clone();
        for segment in request_path.split('/').filter(|s| !s.is_empty()) {
            if segment.contains(['\\', '\0']) {
                return None;
            }
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(name)), None) => path.push(name),
                _ => return None,
            }
        }
        Some(path)
    }
}

/// Content type served for a file, derived from its extension.
pub fn content_type(path: &Path) -> String {
    let extension = path
        .extension()
        .and_then(|x| x.to_str())
        .map(|x| x.to_ascii_lowercase());
    match extension.as_deref() {
        Some("mpd") => "application/dash+xml".to_string(),
        Some("m4s") => "video/iso.segment".to_string(),
        Some("m3u8") => "application/vnd.apple.mpegurl".to_string(),
        Some("ts") => "video/mp2t".to_string(),
        _ => mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}
