//! `listkeeper-server` binary.
//!
//! Serves the ListKeeper to-do list pages on `0.0.0.0:$PORT`. Visitor data
//! lives only in memory, so a restart forgets every list; the process logs
//! how many sessions it drops when it exits.
//!
//! Configuration comes from the environment (see
//! [`listkeeper_server::config`]); logs are JSON lines on stdout, filtered by
//! `RUST_LOG`.
//!
//! ```bash
//! PORT=8080 LISTKEEPER_SECURE_COOKIE=true cargo run --release --bin listkeeper-server
//! ```

use std::process::ExitCode;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use listkeeper_server::config::Config;
use listkeeper_server::error::ServerError;
use listkeeper_server::routes::{create_router, AppState};

const USAGE: &str = "\
Environment variables (all optional):
  PORT                              HTTP port (default: 4567)
  RUST_LOG                          log filter (default: info)
  LISTKEEPER_SESSION_TTL_SECS       idle session lifetime (default: 86400)
  LISTKEEPER_MAX_SESSIONS           session capacity (default: 10000)
  LISTKEEPER_CLEANUP_INTERVAL_SECS  expired session sweep (default: 60)
  LISTKEEPER_COOKIE_NAME            session cookie name (default: listkeeper_session)
  LISTKEEPER_SECURE_COOKIE          'true' to mark the cookie Secure";

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Invalid configuration");
            eprintln!("Error: {err}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "ListKeeper server stopped with an error");
            ExitCode::FAILURE
        }
    }
}

/// Builds the app, serves it until a shutdown signal, then stops the
/// session sweeper.
async fn run(config: Config) -> Result<(), ServerError> {
    info!(
        port = config.port,
        session_ttl_secs = config.session_ttl.as_secs(),
        max_sessions = config.max_sessions,
        secure_cookie = config.secure_cookie,
        "Starting ListKeeper"
    );

    let state = AppState::new(config.clone())?;
    let sessions = state.sessions.clone();
    let sweeper = sessions.spawn_cleanup_task(config.cleanup_interval);

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| ServerError::internal(format!("cannot bind {bind_addr}: {err}")))?;
    info!(address = %bind_addr, "Listening");

    let served = axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sweeper.abort();

    let dropped = sessions.len();
    if dropped > 0 {
        warn!(sessions = dropped, "Discarding in-memory sessions");
    }

    served.map_err(|err| ServerError::internal(format!("server error: {err}")))?;
    info!("ListKeeper stopped");
    Ok(())
}

/// JSON logs filtered by `RUST_LOG`, defaulting to `info` with request
/// traces from `tower_http` at `debug`.
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,axum::rejection=trace"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json().with_target(true).with_level(true))
        .init();
}

/// Resolves on SIGINT or, on unix, SIGTERM. A signal whose handler cannot
/// be installed is logged and never fires.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => info!(signal = "SIGINT", "Shutting down"),
        _ = terminate => info!(signal = "SIGTERM", "Shutting down"),
    }
}
