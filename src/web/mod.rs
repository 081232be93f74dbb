use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{middleware, routing, Router};
use axum_util::logger::{LoggerConfig, LoggerLayer};
use log::{info, Level};

use crate::{
    assets::AssetStore,
    config::{CatalogConfig, FrontendConfig, StreamingConfig},
};

mod config_js;
mod cors;
mod get_asset;
mod get_static;
mod list_videos;
#[cfg(test)]
mod test_support;

const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(30);

pub struct FrontendState {
    pub assets: AssetStore,
    pub config_script: String,
}

async fn health() {}

pub fn streaming_router(config: &StreamingConfig) -> Router {
    Router::new()
        .route("/stream/*path", routing::get(get_asset::get_asset))
        .route("/health", routing::get(health))
        .with_state(Arc::new(config.assets.clone()))
        .layer(middleware::from_fn(cors::cors))
}

pub fn catalog_router(config: &CatalogConfig) -> Router {
    Router::new()
        .route("/videos", routing::get(list_videos::list_videos))
        .route("/health", routing::get(health))
        .with_state(Arc::new(config.clone()))
        .layer(middleware::from_fn(cors::cors))
}

pub fn frontend_router(config: &FrontendConfig) -> Router {
    let state = FrontendState {
        assets: config.assets.clone(),
        config_script: config_js::config_script(&config.catalog_url),
    };
    Router::new()
        .route("/config.js", routing::get(config_js::config_js))
        .route("/health", routing::get(health))
        .fallback(get_static::get_static)
        .with_state(Arc::new(state))
        .layer(middleware::from_fn(cors::cors))
}

/// Binds `bind` and serves `router` until ctrl-c. Failing to bind is fatal to
/// the caller.
pub async fn serve(bind: SocketAddr, router: Router, service: &str) -> anyhow::Result<()> {
    let router = router.layer(LoggerLayer::new(LoggerConfig {
        log_level_filter: Arc::new(|x| {
            if x == "/health" {
                Level::Debug
            } else {
                Level::Info
            }
        }),
        honor_xff: true,
        metric_name: format!("dashreel_{service}_responses"),
    }));

    let server = axum::Server::try_bind(&bind)?.http1_header_read_timeout(HEADER_READ_TIMEOUT);
    info!("{service} service listening @ {bind}");
    server
        .serve(router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down {service} service");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn health_on_every_service() {
        let bind: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let routers = [
            streaming_router(&StreamingConfig {
                bind,
                assets: AssetStore::new("./videos_dash"),
            }),
            catalog_router(&CatalogConfig {
                bind,
                videos_dir: "./videos_dash".into(),
                streaming_url: "http://localhost:8081".to_string(),
            }),
            frontend_router(&FrontendConfig {
                bind,
                assets: AssetStore::new("./static"),
                catalog_url: "http://localhost:8080".to_string(),
            }),
        ];
        for router in routers {
            let response = router
                .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn bind_conflict_is_an_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let bind = listener.local_addr().unwrap();
        let router = streaming_router(&StreamingConfig {
            bind,
            assets: AssetStore::new("./videos_dash"),
        });
        assert!(serve(bind, router, "streaming").await.is_err());
    }
}
