use crate::{
    client::cli_client::resolve_gluster_binary,
    config::{BasicAuth, EnabledCollectors, ExporterConfig, ScrapeSettings, VolumeFilter},
    error::{ExporterError, Hostname, HttpBind, HttpServer as HttpServerError},
    serve::metric_route,
};
use actix_web::{middleware, HttpServer};
use clap::Parser;
use snafu::ResultExt;
use std::{net::SocketAddr, path::PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Gluster cli client module.
pub(crate) mod client;
/// Collector module.
pub(crate) mod collector;
/// Config module for metrics-exporter.
pub(crate) mod config;
/// Error module.
pub(crate) mod error;
/// Scrape orchestration module.
pub(crate) mod scrape;
/// Prometheus metrics handler module.
pub(crate) mod serve;

#[derive(Parser, Debug)]
#[clap(name = env!("CARGO_PKG_NAME"), version, about = env!("CARGO_PKG_DESCRIPTION"))]
struct Cli {
    /// TCP address where prometheus endpoint will listen to
    #[clap(long, short, default_value = "0.0.0.0:9189")]
    metrics_endpoint: SocketAddr,

    /// Path under which to expose metrics
    #[clap(long, default_value = "/metrics")]
    metrics_path: String,

    /// Path to the gluster executable, looked up in PATH when given as a bare name
    #[clap(long, default_value = "gluster")]
    gluster_executable_path: PathBuf,

    /// Comma separated volume names to report, or _all for every volume
    #[clap(long, default_value = config::ALL_VOLUMES)]
    volumes: VolumeFilter,

    /// Enable gluster volume profile metrics
    #[clap(long)]
    profile: bool,

    /// Enable gluster volume quota metrics
    #[clap(long)]
    quota: bool,

    /// Enable gluster mount health metrics
    #[clap(long)]
    mount: bool,

    /// Enable gluster peer metrics
    #[clap(long)]
    peer: bool,

    /// Only report profile metrics of bricks hosted on this node
    #[clap(long)]
    profile_local_bricks_only: bool,

    /// Mount table listing the live mounts
    #[clap(long, default_value = "/proc/mounts")]
    mount_table: PathBuf,

    /// Upper bound for a single gluster cli invocation
    #[clap(long, default_value = "30s")]
    command_timeout: humantime::Duration,

    /// Username for basic auth
    #[clap(long)]
    auth_user: Option<String>,

    /// Password for basic auth
    #[clap(long)]
    auth_passwd: Option<String>,
}

impl Cli {
    fn args() -> Self {
        Cli::parse()
    }
}

/// Initialize metrics-exporter config that are passed through arguments.
fn initialize_exporter(args: Cli) -> Result<(), ExporterError> {
    let gluster_path = resolve_gluster_binary(&args.gluster_executable_path)?;
    let hostname = hostname::get()
        .context(Hostname)?
        .to_string_lossy()
        .into_owned();
    let collectors = EnabledCollectors {
        peer: args.peer,
        profile: args.profile,
        quota: args.quota,
        mount: args.mount,
    };
    info!(
        profile = collectors.profile,
        quota = collectors.quota,
        mount = collectors.mount,
        peer = collectors.peer,
        %hostname,
        gluster = %gluster_path.display(),
        "Enabled collectors"
    );
    let command_timeout = args.command_timeout.into();
    let auth = BasicAuth::new(args.auth_user, args.auth_passwd);
    if auth.is_some() {
        info!("Use basic auth");
    }
    ExporterConfig::new(
        args.metrics_endpoint,
        args.metrics_path,
        gluster_path,
        command_timeout,
        auth,
        ScrapeSettings {
            volumes: args.volumes,
            collectors,
            hostname,
            local_bricks_only: args.profile_local_bricks_only,
            mount_table: args.mount_table,
            probe_timeout: command_timeout,
        },
    )
    .initialize();
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(error) = run().await {
        error!(%error, "failed gluster metrics exporter");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ExporterError> {
    let args = Cli::args();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting {}",
        env!("CARGO_PKG_NAME")
    );
    initialize_exporter(args)?;

    let endpoint = *ExporterConfig::get_config().metrics_endpoint();
    let app = move || {
        actix_web::App::new()
            .wrap(middleware::Logger::default())
            .configure(metric_route)
    };
    info!(%endpoint, "Listening");
    HttpServer::new(app)
        .bind(endpoint)
        .context(HttpBind { endpoint })?
        .workers(1)
        .run()
        .await
        .context(HttpServerError)?;
    Ok(())
}
