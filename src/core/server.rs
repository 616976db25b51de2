// Unix socket serving

use anyhow::Result;
use axum::Router;
use std::future::Future;
use tokio::net::UnixListener;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tower::Service;
use tracing::{debug, error, info};

/// Serve `app` on a bound Unix socket until `shutdown` resolves.
///
/// Open connections are then asked to finish their in-flight request and
/// close; the function returns only after every connection task has ended.
pub async fn serve_unix<F>(listener: UnixListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let mut make_service = app.into_make_service();
    let mut connections = JoinSet::new();
    let (stop_tx, stop_rx) = watch::channel(false);

    tokio::pin!(shutdown);

    loop {
        let socket = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((socket, _remote_addr)) => socket,
                Err(e) => {
                    error!(error = %e, "Failed to accept Unix socket connection");
                    continue;
                }
            },
            Some(finished) = connections.join_next() => {
                log_connection_exit(finished);
                continue;
            }
            _ = &mut shutdown => break,
        };

        let tower_service = match make_service.call(&socket).await {
            Ok(svc) => svc,
            Err(infallible) => match infallible {},
        };

        let mut stop_rx = stop_rx.clone();
        connections.spawn(async move {
            let socket = hyper_util::rt::TokioIo::new(socket);

            let hyper_service = hyper::service::service_fn(
                move |request: hyper::Request<hyper::body::Incoming>| {
                    tower_service.clone().call(request)
                },
            );

            let builder =
                hyper_util::server::conn::auto::Builder::new(hyper_util::rt::TokioExecutor::new());
            let conn = builder.serve_connection_with_upgrades(socket, hyper_service);
            tokio::pin!(conn);

            let result = tokio::select! {
                result = conn.as_mut() => result,
                _ = stop_rx.changed() => {
                    conn.as_mut().graceful_shutdown();
                    conn.as_mut().await
                }
            };

            if let Err(err) = result {
                error!(error = %err, "Error serving Unix socket connection");
            }
        });
    }

    info!(
        open_connections = connections.len(),
        "Unix socket listener stopped, draining connections"
    );
    let _ = stop_tx.send(true);

    while let Some(finished) = connections.join_next().await {
        log_connection_exit(finished);
    }

    Ok(())
}

fn log_connection_exit(finished: Result<(), JoinError>) {
    match finished {
        Ok(()) => debug!("Unix socket connection closed"),
        Err(e) => error!(error = %e, "Unix socket connection task failed"),
    }
}
