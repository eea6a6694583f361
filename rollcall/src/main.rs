//! rollcall - class roster and attendance API
//!
//! Serves read access to classes and students from a SQLite database and
//! accepts batched attendance submissions.

mod config;
mod router;

use clap::Parser;
use rollcall_roster::{DateZone, RosterState, RosterStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "rollcall")]
#[command(about = "Class roster and attendance API", long_about = None)]
struct Args {
    /// Configuration file name, without extension
    #[arg(long, default_value = "rollcall", env = "ROLLCALL_CONFIG")]
    config: String,

    /// Port to listen on
    #[arg(short, long, env = "ROLLCALL_PORT")]
    port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "ROLLCALL_HOST")]
    host: Option<String>,

    /// SQLite database file
    #[arg(long)]
    database: Option<PathBuf>,

    /// Create missing tables on startup
    #[arg(long)]
    init_schema: bool,

    /// Calendar for records submitted without a date (utc or local)
    #[arg(long)]
    date_zone: Option<DateZone>,

    /// Attach permissive CORS headers
    #[arg(long)]
    cors: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "ROLLCALL_LOG_LEVEL")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "rollcall={0},rollcall_roster={0},tower_http=debug",
                    args.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = config::Config::load(&args.config)?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(path) = args.database {
        config.database.path = path;
    }
    if let Some(date_zone) = args.date_zone {
        config.attendance.date_zone = date_zone;
    }
    config.database.init_schema |= args.init_schema;
    config.http.enable_cors |= args.cors;

    info!("Starting rollcall...");
    info!("  Database: {}", config.database.path.display());
    info!("  Default date zone: {:?}", config.attendance.date_zone);
    info!("  Max body size: {} bytes", config.http.max_body_size);
    info!(
        "  CORS: {}",
        if config.http.enable_cors { "enabled" } else { "disabled" }
    );

    let store = RosterStore::open(&config.database.path)?;
    if config.database.init_schema {
        store.ensure_schema()?;
        info!("Schema initialized");
    }

    let state = Arc::new(
        RosterState::new(store, config.attendance.date_zone)
            .with_max_body_bytes(config.http.max_body_size),
    );

    // Create router
    let app = router::create_router(state, config.http.enable_cors);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
