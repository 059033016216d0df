//! depot: document store service and tools
//!
//! Usage:
//!   depot serve [--port 8001] [--db depot.db] [--log-dir DIR]
//!   depot sync [--cleanup DAYS] [--bin BIN] [SERVER1] [SERVER2]
//!   depot hash-password [PASSWORD]

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use axum_server::Handle;
use clap::{Parser, Subcommand};
use depot_server::{
    build_router, hash_password, logging, serve, tls_config, AppState, Config, ServerEntry,
    ServersConfig, Users,
};
use depot_storage::Store;
use depot_sync::{HttpPeer, Peer, SyncEngine};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "depot", version)]
#[command(about = "Versioned JSON document store with two-peer sync")]
struct Args {
    /// Path to the service configuration file
    #[arg(short, long, default_value = "depot.toml", global = true)]
    config: PathBuf,

    /// Log level or filter; RUST_LOG takes precedence
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Directory for daily log files (overrides [log] dir)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Address to bind (overrides [server] host)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides [server] port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Database file (overrides [database] path)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Reconcile two servers
    Sync {
        /// Server list
        #[arg(long, default_value = "depot-servers.toml")]
        servers: PathBuf,

        /// Only reconcile this bin
        #[arg(long)]
        bin: Option<String>,

        /// Afterwards remove history older than DAYS on both servers
        #[arg(long, value_name = "DAYS")]
        cleanup: Option<u32>,

        /// First server (default-1 when omitted)
        first: Option<String>,

        /// Second server (default-2 when omitted)
        second: Option<String>,
    },

    /// Print an argon2 hash for an [auth] entry
    HashPassword {
        /// Asked for without echo when omitted
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::load_or_default(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    if let Some(dir) = args.log_dir {
        config.log.dir = Some(dir);
    }

    let level = args.log_level.as_deref().unwrap_or(&config.log.level);
    let _log_guard = logging::init(level, &config.log)?;

    match args.command {
        Command::Serve { host, port, db } => run_service(config, host, port, db).await,
        Command::Sync {
            servers,
            bin,
            cleanup,
            first,
            second,
        } => sync(servers, bin, cleanup, first, second).await,
        Command::HashPassword { password } => {
            let password = match password {
                Some(p) => p,
                None => ask(Prompt::Hidden, "password: ")?,
            };
            let hash =
                hash_password(&password).map_err(|e| anyhow!("failed to hash password: {e}"))?;
            println!("{hash}");
            Ok(())
        }
    }
}

async fn run_service(
    config: Config,
    host: Option<String>,
    port: Option<u16>,
    db: Option<PathBuf>,
) -> Result<()> {
    let mut server = config.server;
    if let Some(host) = host {
        server.host = host;
    }
    if let Some(port) = port {
        server.port = port;
    }
    let db_path = db.unwrap_or(config.database.path);

    let store = Store::open(&db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;
    let mut state = AppState::new(Arc::new(store));
    if let Some(accounts) = config.auth {
        info!(users = accounts.len(), "basic authentication enabled");
        state = state.with_users(Users::new(accounts));
    }

    let addr = server.addr();
    let socket = tokio::net::lookup_host(&addr)
        .await
        .with_context(|| format!("failed to resolve {addr}"))?
        .next()
        .ok_or_else(|| anyhow!("no address for {addr}"))?;
    let tls = match server.tls() {
        Some((cert, key)) => Some(tls_config(cert, key).await?),
        None => None,
    };
    let scheme = if tls.is_some() { "https" } else { "http" };

    let handle = Handle::new();
    tokio::spawn(shutdown_signal(handle.clone()));
    info!(
        %scheme,
        %addr,
        db = %db_path.display(),
        version = env!("CARGO_PKG_VERSION"),
        "depot listening"
    );

    serve(socket, build_router(state), tls, handle)
        .await
        .with_context(|| format!("failed to serve on {addr}"))
}

async fn shutdown_signal(handle: Handle) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
        handle.graceful_shutdown(Some(Duration::from_secs(10)));
    }
}

async fn sync(
    servers: PathBuf,
    bin: Option<String>,
    cleanup: Option<u32>,
    first: Option<String>,
    second: Option<String>,
) -> Result<()> {
    let list = ServersConfig::load(&servers)
        .with_context(|| format!("failed to load {}", servers.display()))?;
    let ((name_a, entry_a), (name_b, entry_b)) = list.pair(first.as_deref(), second.as_deref())?;

    let a = Arc::new(http_peer(name_a, entry_a)?);
    let b = Arc::new(http_peer(name_b, entry_b)?);
    let engine = SyncEngine::new(a.clone(), b.clone());
    let report = engine
        .run(bin.as_deref())
        .await
        .with_context(|| format!("sync between {name_a} and {name_b} failed"))?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(days) = cleanup {
        for peer in [&a, &b] {
            let count = peer
                .cleanup(days)
                .await
                .with_context(|| format!("cleanup on {} failed", peer.name()))?;
            info!(peer = peer.name(), days, count, "cleanup");
        }
    }
    Ok(())
}

/// Builds a peer for a configured server, asking for missing credentials.
fn http_peer(name: &str, entry: &ServerEntry) -> Result<HttpPeer> {
    let peer = HttpPeer::new(name, &entry.url)?;
    Ok(match credentials(name, entry, ask)? {
        Some((username, password)) => peer.with_credentials(username, password),
        None => peer,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prompt {
    Visible,
    /// Typed input is not echoed.
    Hidden,
}

/// Username and password for `entry`, asking for whatever the file leaves
/// out. An empty username means the server is open.
fn credentials(
    name: &str,
    entry: &ServerEntry,
    mut ask: impl FnMut(Prompt, &str) -> Result<String>,
) -> Result<Option<(String, String)>> {
    let username = match &entry.username {
        Some(u) => u.clone(),
        None => ask(Prompt::Visible, &format!("{name} username: "))?,
    };
    if username.is_empty() {
        return Ok(None);
    }
    let password = match &entry.password {
        Some(p) => p.clone(),
        None => ask(Prompt::Hidden, &format!("{name} password for {username}: "))?,
    };
    Ok(Some((username, password)))
}

fn ask(prompt: Prompt, label: &str) -> Result<String> {
    if prompt == Prompt::Hidden {
        return rpassword::prompt_password(label).context("failed to read password");
    }
    eprint!("{label}");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).context("failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
