use anyhow::{Context, Result};
use axum::{serve, Router};
use checkin::core::config::Config;
use checkin::core::routes::build_router;
use checkin::core::server::serve_unix;
use checkin::core::startup::open_stores;
use checkin::core::state::AppState;
use checkin::core::tracing_init::init_tracing;
use checkin::stores::{EventStore, UserStore};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::{TcpListener, UnixListener};
use tokio::signal;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info, Level};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let config_path = if args.len() > 1 {
        PathBuf::from(&args[1])
    } else {
        PathBuf::from("config.toml")
    };

    // Load and validate configuration
    let config = Config::from_file(&config_path).context(format!(
        "Failed to load configuration from '{}'. \
        Copy config.example.toml to config.toml and adjust the values.",
        config_path.display()
    ))?;

    init_tracing(&config.logging);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.num_threads)
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    runtime.block_on(async_main(config, config_path))
}

async fn async_main(config: Config, config_path: PathBuf) -> Result<()> {
    info!(
        config_path = %config_path.display(),
        port = ?config.server.port,
        unix_socket = ?config.server.unix_socket,
        num_threads = config.server.num_threads,
        wal_path = ?config.storage.wal_path,
        queue_capacity = config.recorder.queue_capacity,
        log_level = %config.logging.level,
        log_format = %config.logging.format,
        "Check-in service starting"
    );

    let stores = open_stores(&config.storage)?;
    let state = Arc::new(AppState::new(config.clone(), stores.users, stores.events));

    info!(
        users = state.users.len(),
        events = state.events.len(),
        "Check-in service startup complete"
    );

    let app = build_router(Arc::clone(&state)).layer(
        ServiceBuilder::new().layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        ),
    );

    let tcp_handle = match config.server.port {
        Some(port) => Some(spawn_tcp_server(port, app.clone()).await?),
        None => None,
    };

    let unix_handle = match &config.server.unix_socket {
        Some(path) => Some(spawn_unix_server(path, app)?),
        None => None,
    };

    info!("HTTP server(s) started, waiting for shutdown signal");

    // Wait for both servers to complete (if they exist)
    match (tcp_handle, unix_handle) {
        (Some(tcp), Some(unix)) => {
            let (tcp_result, unix_result) = tokio::join!(tcp, unix);
            log_server_exit("TCP", tcp_result);
            log_server_exit("Unix socket", unix_result);
        }
        (Some(tcp), None) => log_server_exit("TCP", tcp.await),
        (None, Some(unix)) => log_server_exit("Unix socket", unix.await),
        (None, None) => anyhow::bail!("No listeners configured"),
    }

    info!("Flushing pending events");
    state.recorder.flush().await;

    info!("Shut down gracefully");

    Ok(())
}

async fn spawn_tcp_server(port: u16, app: Router) -> Result<JoinHandle<Result<()>>> {
    let addr = format!("0.0.0.0:{}", port);
    info!(address = %addr, "Starting TCP listener");

    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind TCP listener to {}", addr))?;

    info!(address = %addr, "TCP listener bound successfully");

    Ok(tokio::spawn(async move {
        serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("TCP server error")
    }))
}

fn spawn_unix_server(unix_socket: &Path, app: Router) -> Result<JoinHandle<Result<()>>> {
    info!(path = %unix_socket.display(), "Starting Unix socket listener");

    // Remove a stale socket file left by a previous run
    if unix_socket.exists() {
        std::fs::remove_file(unix_socket).context(format!(
            "Failed to remove existing Unix socket: {}",
            unix_socket.display()
        ))?;
    }

    let listener = UnixListener::bind(unix_socket).context(format!(
        "Failed to bind Unix socket listener to {}",
        unix_socket.display()
    ))?;

    info!(path = %unix_socket.display(), "Unix socket listener bound successfully");

    Ok(tokio::spawn(serve_unix(listener, app, shutdown_signal())))
}

fn log_server_exit(kind: &str, result: Result<Result<()>, tokio::task::JoinError>) {
    match result {
        Ok(Ok(())) => info!(listener = kind, "Server stopped"),
        Ok(Err(e)) => error!(listener = kind, error = %e, "Server failed"),
        Err(e) => error!(listener = kind, error = %e, "Server task failed"),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
