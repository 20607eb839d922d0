//! Keyward License Server
//!
//! HTTP API for issuing license keys and verifying them against bound devices.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use keyward_core::config::{database_path, load_config};
use keyward_core::tracing_init::init_tracing;
use keyward_server::auth::JwtManager;
use keyward_server::licensing::{LicenseService, SystemClock};
use keyward_server::server::{AppState, build_router};
use keyward_server::storage::LicenseDatabase;

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Parser, Debug)]
#[command(name = "keyward-server")]
#[command(
    version,
    about = "Keyward license server - key issuance and device-bound verification"
)]
struct Args {
    /// Path to a JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on. Overrides the config file.
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Path to SQLite database file.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Secret used to sign session tokens.
    #[arg(long, env = "KEYWARD_JWT_SECRET", default_value = DEV_JWT_SECRET, hide_env_values = true)]
    jwt_secret: String,

    /// Set the admin password on startup.
    #[arg(long, env = "KEYWARD_ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing(args.log_json);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        config.server.listen_addr = addr.to_string();
    }
    if let Some(path) = args.db_path {
        config.server.database_path = Some(path);
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.listen_addr,
        "Starting keyward-server"
    );

    if args.jwt_secret == DEV_JWT_SECRET {
        warn!("Using the built-in development JWT secret; set KEYWARD_JWT_SECRET in production");
    }

    let db_path = config
        .server
        .database_path
        .clone()
        .or_else(database_path)
        .context("Cannot determine database path; pass --db-path")?;
    info!(path = %db_path.display(), "Opening license database");
    let db = LicenseDatabase::open(&db_path).await?;

    let licensing = Arc::new(LicenseService::new(
        Arc::new(db),
        Arc::new(SystemClock),
        &config.licensing,
    ));

    let admin_username = &config.auth.admin_username;
    if let Some(generated) = licensing
        .ensure_admin(admin_username, args.admin_password.as_deref())
        .await?
    {
        warn!(
            username = %admin_username,
            password = %generated,
            "Generated admin password; it will not be shown again"
        );
    }

    let jwt = Arc::new(JwtManager::new(
        args.jwt_secret.as_bytes(),
        config.auth.session_ttl_secs,
    ));

    let app = build_router(AppState { licensing, jwt });

    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen_addr))?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received shutdown signal");
            }
        })
        .await?;

    info!("Server stopped");
    Ok(())
}
