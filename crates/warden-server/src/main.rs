//! Warden Server
//!
//! Authentication and RBAC microservice.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use warden_core::db::PoolConfig;
use warden_core::tracing_init::{LogFormat, init_tracing};

use warden_server::app::Warden;
use warden_server::auth::JwtManager;
use warden_server::revocation::{MemoryRevocationStore, RedisRevocationStore, RevocationStore};
use warden_server::storage::AuthDatabase;

const MIN_SECRET_LEN: usize = 32;
const MEMORY_CACHE: &str = "memory";

#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(version, about = "Warden - authentication and role-based access control")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "WARDEN_ADDR", default_value = "0.0.0.0:50051")]
    addr: SocketAddr,

    /// Path to SQLite database file.
    #[arg(long, env = "WARDEN_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Maximum number of pooled database connections.
    #[arg(long, env = "WARDEN_DB_MAX_CONNECTIONS", default_value_t = 5)]
    db_max_connections: u32,

    /// Seconds a write waits for a locked database before failing.
    #[arg(long, env = "WARDEN_DB_BUSY_TIMEOUT", default_value_t = 5)]
    db_busy_timeout: u64,

    /// Revocation cache: a redis:// URL, or "memory" for a single process.
    #[arg(long, env = "WARDEN_CACHE_URL", default_value = "redis://127.0.0.1:6379")]
    cache_url: String,

    /// JWT signing secret (at least 32 bytes).
    #[arg(long, env = "WARDEN_JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    /// Access token TTL in seconds.
    #[arg(long, default_value_t = 900)]
    access_ttl: i64,

    /// Refresh token TTL in seconds.
    #[arg(long, default_value_t = 604_800)]
    refresh_ttl: i64,

    /// Per-request deadline in seconds.
    #[arg(long, default_value_t = 30)]
    request_timeout: u64,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,

    /// Name of the administrator to create at startup if missing.
    #[arg(long, env = "WARDEN_ADMIN_USERNAME", requires = "admin_email")]
    admin_username: Option<String>,

    /// Email of the bootstrap administrator.
    #[arg(long, env = "WARDEN_ADMIN_EMAIL", requires = "admin_username")]
    admin_email: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing("warden_server=info,warden=info", LogFormat::from_json_flag(args.log_json))?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %args.addr,
        "Starting warden"
    );

    if args.jwt_secret.len() < MIN_SECRET_LEN {
        anyhow::bail!("JWT secret must be at least {MIN_SECRET_LEN} bytes");
    }
    if args.access_ttl <= 0 || args.refresh_ttl <= 0 {
        anyhow::bail!("Token TTLs must be positive");
    }
    if args.db_max_connections == 0 {
        anyhow::bail!("Database pool needs at least one connection");
    }

    let db_path = match &args.db_path {
        Some(path) => path.clone(),
        None => default_db_path()?,
    };
    info!(path = %db_path.display(), "Opening auth database");
    let db = AuthDatabase::connect(
        &PoolConfig::file(&db_path)
            .max_connections(args.db_max_connections)
            .busy_timeout(Duration::from_secs(args.db_busy_timeout)),
    )
    .await?;

    let revocations = open_revocation_store(&args.cache_url).await?;

    let jwt = JwtManager::new(args.jwt_secret.as_bytes(), args.access_ttl, args.refresh_ttl);
    let warden = Warden::new(
        db,
        jwt,
        revocations,
        Duration::from_secs(args.request_timeout),
    )
    .await?;

    if let (Some(name), Some(email)) = (&args.admin_username, &args.admin_email) {
        let password = std::env::var("WARDEN_ADMIN_PASSWORD").map_err(|_| {
            anyhow::anyhow!("WARDEN_ADMIN_PASSWORD must be set to bootstrap an administrator")
        })?;
        if warden.accounts().ensure_admin(name, email, &password).await? {
            info!(username = %name, "Bootstrap administrator created");
        }
    }

    let listener = TcpListener::bind(args.addr).await?;
    warden
        .serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Received shutdown signal");
        })
        .await?;

    info!("Warden stopped");
    Ok(())
}

async fn open_revocation_store(url: &str) -> anyhow::Result<Arc<dyn RevocationStore>> {
    if url == MEMORY_CACHE {
        warn!("Using in-process revocation store; revocations are lost on restart");
        let store = Arc::new(MemoryRevocationStore::new());

        // Periodically drop expired revocations (hourly)
        let cleanup = Arc::clone(&store);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(3600));
            interval.tick().await; // Skip first immediate tick
            loop {
                interval.tick().await;
                let removed = cleanup.purge_expired().await;
                if removed > 0 {
                    info!(removed, "Expired revocations purged");
                }
            }
        });
        return Ok(store);
    }

    info!(url = %redact(url), "Connecting to revocation cache");
    Ok(Arc::new(RedisRevocationStore::connect(url).await?))
}

/// Strip credentials from a cache URL before logging it.
fn redact(url: &str) -> String {
    match (url.split_once("://"), url.rsplit_once('@')) {
        (Some((scheme, _)), Some((_, host))) => format!("{scheme}://***@{host}"),
        _ => url.to_string(),
    }
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".warden").join("warden.db"))
}
