use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
};

use clap::Args;
use thiserror::Error;

use crate::assets::AssetStore;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_VIDEOS_DIR: &str = "./videos_dash";
pub const DEFAULT_STATIC_DIR: &str = "./static";
pub const DEFAULT_STREAMING_URL: &str = "http://localhost:8081";
pub const DEFAULT_CATALOG_URL: &str = "http://localhost:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid port '{0}'")]
    InvalidPort(String),
    #[error("invalid bind host '{0}'")]
    InvalidHost(String),
}

/// A setting that is unset or blank counts as absent.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|x| !x.trim().is_empty())
}

fn setting(value: Option<String>, default: &str) -> String {
    present(value).unwrap_or_else(|| default.to_string())
}

fn bind_addr(
    host: Option<String>,
    port: Option<String>,
    default_port: u16,
) -> Result<SocketAddr, ConfigError> {
    let host = setting(host, DEFAULT_HOST);
    let host: IpAddr = host
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidHost(host.clone()))?;
    let port = match present(port) {
        Some(port) => port
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidPort(port.clone()))?,
        None => default_port,
    };
    Ok(SocketAddr::new(host, port))
}

// Settings are taken as plain strings so that an empty environment variable
// falls back to the default instead of failing to parse.

#[derive(Args, Debug, Clone)]
pub struct StreamingArgs {
    /// Port to listen on [default: 8081]
    #[clap(long, env = "PORT")]
    pub port: Option<String>,
    /// Address to listen on [default: 0.0.0.0]
    #[clap(long, env = "BIND_HOST")]
    pub host: Option<String>,
    /// Root of the asset store, one subdirectory per title [default: ./videos_dash]
    #[clap(long, env = "VIDEOS_DIR")]
    pub videos_dir: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CatalogArgs {
    /// Port to listen on [default: 8080]
    #[clap(long, env = "PORT")]
    pub port: Option<String>,
    /// Address to listen on [default: 0.0.0.0]
    #[clap(long, env = "BIND_HOST")]
    pub host: Option<String>,
    /// Root of the asset store, one subdirectory per title [default: ./videos_dash]
    #[clap(long, env = "VIDEOS_DIR")]
    pub videos_dir: Option<String>,
    /// Base url of the streaming service, used to build stream urls [default: http://localhost:8081]
    #[clap(long, env = "STREAMING_URL")]
    pub streaming_url: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct FrontendArgs {
    /// Port to listen on [default: 8000]
    #[clap(long, env = "PORT")]
    pub port: Option<String>,
    /// Address to listen on [default: 0.0.0.0]
    #[clap(long, env = "BIND_HOST")]
    pub host: Option<String>,
    /// Directory holding the frontend's static files [default: ./static]
    #[clap(long, env = "STATIC_DIR")]
    pub static_dir: Option<String>,
    /// Base url of the catalog service, exposed to the browser via /config.js [default: http://localhost:8080]
    #[clap(long, env = "CATALOG_URL")]
    pub catalog_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StreamingConfig {
    pub bind: SocketAddr,
    pub assets: AssetStore,
}

impl TryFrom<StreamingArgs> for StreamingConfig {
    type Error = ConfigError;

    fn try_from(args: StreamingArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            bind: bind_addr(args.host, args.port, 8081)?,
            assets: AssetStore::new(setting(args.videos_dir, DEFAULT_VIDEOS_DIR)),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub bind: SocketAddr,
    pub videos_dir: PathBuf,
    /// Used verbatim as the prefix of every stream url.
    pub streaming_url: String,
}

impl TryFrom<CatalogArgs> for CatalogConfig {
    type Error = ConfigError;

    fn try_from(args: CatalogArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            bind: bind_addr(args.host, args.port, 8080)?,
            videos_dir: setting(args.videos_dir, DEFAULT_VIDEOS_DIR).into(),
            streaming_url: setting(args.streaming_url, DEFAULT_STREAMING_URL),
        })
    }
}

#[derive(Debug, Clone)]
pub struct FrontendConfig {
    pub bind: SocketAddr,
    pub assets: AssetStore,
    /// Any value is accepted, including relative urls; it is escaped when
    /// written into /config.js.
    pub catalog_url: String,
}

impl TryFrom<FrontendArgs> for FrontendConfig {
    type Error = ConfigError;

    fn try_from(args: FrontendArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            bind: bind_addr(args.host, args.port, 8000)?,
            assets: AssetStore::new(setting(args.static_dir, DEFAULT_STATIC_DIR)),
            catalog_url: setting(args.catalog_url, DEFAULT_CATALOG_URL),
        })
    }
}
