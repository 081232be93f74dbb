use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use super::FrontendState;

/// Script body assigning the catalog base url for the browser client. The url
/// is written into a single-quoted string literal, escaped as needed.
pub fn config_script(catalog_url: &str) -> String {
    let mut literal = String::with_capacity(catalog_url.len());
    for c in catalog_url.chars() {
        match c {
            '\\' => literal.push_str("\\\\"),
            '\'' => literal.push_str("\\'"),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\u{2028}' => literal.push_str("\\u2028"),
            '\u{2029}' => literal.push_str("\\u2029"),
            c => literal.push(c),
        }
    }
    format!("window.CATALOG_URL = '{literal}';\n")
}

pub async fn config_js(State(state): State<Arc<FrontendState>>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        state.config_script.clone(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::{
        assets::AssetStore,
        config::{FrontendConfig, DEFAULT_CATALOG_URL},
        web::{frontend_router, test_support::body_bytes},
    };

    use super::*;

    async fn fetch_config(catalog_url: &str) -> Response {
        let router = frontend_router(&FrontendConfig {
            bind: "127.0.0.1:0".parse().unwrap(),
            assets: AssetStore::new("./static"),
            catalog_url: catalog_url.to_string(),
        });
        router
            .oneshot(Request::builder().uri("/config.js").body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn serves_configured_url() {
        let response = fetch_config("http://catalog.internal:9000").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/javascript"
        );
        assert_eq!(
            body_bytes(response).await,
            b"window.CATALOG_URL = 'http://catalog.internal:9000';\n"
        );
    }

    #[tokio::test]
    async fn serves_default_url() {
        let response = fetch_config(DEFAULT_CATALOG_URL).await;
        assert_eq!(
            body_bytes(response).await,
            b"window.CATALOG_URL = 'http://localhost:8080';\n"
        );
    }

    #[tokio::test]
    async fn serves_relative_url() {
        let response = fetch_config("/catalog").await;
        assert_eq!(
            body_bytes(response).await,
            b"window.CATALOG_URL = '/catalog';\n"
        );
    }

    #[test]
    fn escapes_string_breaking_characters() {
        assert_eq!(
            config_script("http://x/';alert(1);'"),
            "window.CATALOG_URL = 'http://x/\\';alert(1);\\'';\n"
        );
        assert_eq!(
            config_script("a\\b\nc\rd"),
            "window.CATALOG_URL = 'a\\\\b\\nc\\rd';\n"
        );
    }
}
