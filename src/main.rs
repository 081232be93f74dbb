use std::net::SocketAddr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::{
    CatalogArgs, CatalogConfig, FrontendArgs, FrontendConfig, StreamingArgs, StreamingConfig,
};
use log::{error, info};

mod assets;
mod config;
mod range;
mod web;

/// Streaming, catalog and frontend services for segmented video
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Exposes prometheus metrics on this address
    #[clap(long, env = "PROMETHEUS_BIND", global = true)]
    prometheus_bind: Option<String>,
    #[clap(subcommand)]
    service: Service,
}

#[derive(Subcommand, Debug)]
enum Service {
    /// Range-capable file delivery out of the asset store under /stream/
    Streaming(StreamingArgs),
    /// JSON listing of titles in the asset store under /videos
    Catalog(CatalogArgs),
    /// Static frontend files plus /config.js
    Frontend(FrontendArgs),
}

async fn run(args: Args) -> anyhow::Result<()> {
    let prometheus_bind = args.prometheus_bind.filter(|x| !x.trim().is_empty());
    if let Some(prometheus_bind) = prometheus_bind {
        let prometheus_bind: SocketAddr = prometheus_bind
            .trim()
            .parse()
            .with_context(|| format!("invalid prometheus bind '{prometheus_bind}'"))?;
        prometheus_exporter::start(prometheus_bind)?;
        info!("prometheus metrics @ {prometheus_bind}");
    }

    match args.service {
        Service::Streaming(args) => {
            let config = StreamingConfig::try_from(args)?;
            info!("serving assets from {}", config.assets.root().display());
            web::serve(config.bind, web::streaming_router(&config), "streaming").await
        }
        Service::Catalog(args) => {
            let config = CatalogConfig::try_from(args)?;
            info!("using streaming service url: {}", config.streaming_url);
            web::serve(config.bind, web::catalog_router(&config), "catalog").await
        }
        Service::Frontend(args) => {
            let config = FrontendConfig::try_from(args)?;
            info!(
                "serving static files from {} with catalog url {}",
                config.assets.root().display(),
                config.catalog_url
            );
            web::serve(config.bind, web::frontend_router(&config), "frontend").await
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    env_logger::Builder::new()
        .parse_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    if let Err(e) = run(args).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_service() {
        let args = Args::try_parse_from([
            "dashreel",
            "catalog",
            "--port",
            "9000",
            "--videos-dir",
            "/srv/videos",
            "--streaming-url",
            "http://streaming:8081",
        ])
        .unwrap();
        let Service::Catalog(catalog) = args.service else {
            panic!("expected catalog service");
        };
        assert_eq!(catalog.port.as_deref(), Some("9000"));
        assert_eq!(catalog.streaming_url.as_deref(), Some("http://streaming:8081"));

        let args = Args::try_parse_from([
            "dashreel",
            "frontend",
            "--port",
            "8001",
            "--catalog-url",
            "http://catalog:8080",
            "--prometheus-bind",
            "127.0.0.1:9100",
        ])
        .unwrap();
        assert_eq!(args.prometheus_bind.as_deref(), Some("127.0.0.1:9100"));
        let Service::Frontend(frontend) = args.service else {
            panic!("expected frontend service");
        };
        let config = FrontendConfig::try_from(frontend).unwrap();
        assert_eq!(config.bind.port(), 8001);
        assert_eq!(config.catalog_url, "http://catalog:8080");

        let args =
            Args::try_parse_from(["dashreel", "streaming", "--port", "8082"]).unwrap();
        let Service::Streaming(streaming) = args.service else {
            panic!("expected streaming service");
        };
        assert_eq!(StreamingConfig::try_from(streaming).unwrap().bind.port(), 8082);
    }

    #[test]
    fn requires_a_service() {
        assert!(Args::try_parse_from(["dashreel"]).is_err());
        assert!(Args::try_parse_from(["dashreel", "encoder"]).is_err());
    }
}
