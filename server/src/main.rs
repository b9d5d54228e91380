//! detour server — the HTTP shell around the translation core.
//!
//! Everything interesting happens in the `detour` library; this binary
//! only resolves configuration, loads the mapping table (refusing to start
//! on any load error), and forwards every inbound request to
//! [`Dispatcher::classify`] behind a catch-all route.

use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use url::Url;

use detour::{Deployment, Dispatcher, LegacyRequest, MappingTable, RedirectStatus};

/// Domain under which destination discovery instances are hosted when only
/// a subdomain is configured.
const DISCOVERY_DOMAIN: &str = "primo.exlibrisgroup.com";

// ═══════════════════════════════════════════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════════════════════════════════════════

/// Redirects legacy web OPAC requests to discovery-service URLs.
///
/// Mapping files hold one record per line:
/// `targetID,<flag><legacyID>[-<suffix>]`.
#[derive(Parser, Debug)]
#[command(name = "detour", version, about)]
struct Args {
    /// Address to bind on.
    #[arg(long, env = "DETOUR_ADDRESS", default_value = "0.0.0.0:8877")]
    address: SocketAddr,

    /// Subdomain of the destination instance,
    /// <subdomain>.primo.exlibrisgroup.com.
    #[arg(long, env = "DETOUR_SUBDOMAIN")]
    subdomain: Option<String>,

    /// Full base URL of the destination instance. Takes precedence over
    /// --subdomain.
    #[arg(long, env = "DETOUR_BASE_URL")]
    base_url: Option<String>,

    /// Destination-instance identifier (vid) appended to every redirect.
    #[arg(long, env = "DETOUR_VID")]
    vid: String,

    /// Deployment file (YAML) overriding the built-in profile and rules.
    #[arg(long, env = "DETOUR_DEPLOYMENT")]
    deployment: Option<PathBuf>,

    /// Mapping files to load at startup.
    mapping_files: Vec<PathBuf>,
}

/// Startup failures. All of them abort before the listener opens.
#[derive(Debug, Error)]
enum StartupError {
    #[error("either --subdomain or --base-url is required")]
    MissingTarget,

    #[error("invalid base URL \"{url}\": {source}")]
    BadBaseUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("could not open mapping file {path}: {source}", path = .path.display())]
    OpenMapping {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not read deployment file {path}: {source}", path = .path.display())]
    ReadDeployment {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid deployment file {path}: {source}", path = .path.display())]
    ParseDeployment {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Load(#[from] detour::LoadError),

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// Resolve the destination origin from `--base-url` or `--subdomain`.
fn resolve_base(args: &Args) -> Result<Url, StartupError> {
    let raw = match (&args.base_url, &args.subdomain) {
        (Some(base), _) => base.clone(),
        (None, Some(subdomain)) => format!("https://{subdomain}.{DISCOVERY_DOMAIN}"),
        (None, None) => return Err(StartupError::MissingTarget),
    };
    Url::parse(&raw).map_err(|source| StartupError::BadBaseUrl { url: raw, source })
}

/// Load the YAML deployment file, or fall back to the built-in defaults.
fn load_deployment(path: Option<&Path>) -> Result<Deployment, StartupError> {
    let Some(path) = path else {
        return Ok(Deployment::default());
    };
    let body = std::fs::read_to_string(path).map_err(|source| StartupError::ReadDeployment {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&body).map_err(|source| StartupError::ParseDeployment {
        path: path.to_path_buf(),
        source,
    })
}

/// Open every configured mapping file as a named buffered source.
fn open_sources(paths: &[PathBuf]) -> Result<Vec<(String, BufReader<File>)>, StartupError> {
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let file = File::open(path).map_err(|source| StartupError::OpenMapping {
            path: path.clone(),
            source,
        })?;
        sources.push((path.display().to_string(), BufReader::new(file)));
    }
    Ok(sources)
}

// ═══════════════════════════════════════════════════════════════════════════════
// HTTP surface
// ═══════════════════════════════════════════════════════════════════════════════

/// Catch-all handler: every inbound request becomes exactly one redirect.
async fn redirect_handler(State(dispatcher): State<Arc<Dispatcher>>, uri: Uri) -> impl IntoResponse {
    let request = LegacyRequest::from_path_and_query(uri.path(), uri.query());
    let redirect = dispatcher.classify(&request);

    tracing::debug!(from = %uri, to = %redirect.url, "redirecting");

    let status = match redirect.status {
        RedirectStatus::Permanent => StatusCode::MOVED_PERMANENTLY,
        RedirectStatus::Temporary => StatusCode::FOUND,
    };
    (status, [(header::LOCATION, redirect.url.to_string())])
}

/// Resolves on SIGINT or SIGTERM; in-flight requests drain before exit.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Startup
// ═══════════════════════════════════════════════════════════════════════════════

async fn run(args: Args) -> Result<(), StartupError> {
    let base = resolve_base(&args)?;
    let deployment = load_deployment(args.deployment.as_deref())?;
    let sources = open_sources(&args.mapping_files)?;

    // Synchronous and all-or-nothing: the listener must not open until the
    // table is fully built.
    let table = MappingTable::load(sources)?;
    tracing::info!(mappings = table.len(), "mapping table loaded");

    let dispatcher = Arc::new(Dispatcher::new(
        base,
        args.vid,
        table,
        deployment.rules,
        deployment.profile,
    ));

    let app = Router::new()
        .fallback(redirect_handler)
        .with_state(dispatcher);

    let listener = tokio::net::TcpListener::bind(args.address)
        .await
        .map_err(StartupError::Serve)?;
    tracing::info!(address = %args.address, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)?;

    tracing::info!("server stopped");
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
