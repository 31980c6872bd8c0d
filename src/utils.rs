//! Process lifecycle helpers.

use std::future::Future;
use std::time::Duration;

use axum::Router;
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Resolve when the process receives SIGINT (Ctrl+C) or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
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
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

/// How a server run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// In-flight requests finished within the grace period.
    Graceful,
    /// The grace period expired and open connections were dropped.
    TimedOut,
}

/// Serve `router` on `listener` until `signal` resolves, then allow `grace`
/// for in-flight requests.
///
/// Every connection runs in a task owned by this function. On the signal the
/// listener stops accepting and each connection is told to finish its current
/// request and close. Connections still open when `grace` expires are
/// aborted, which drops their handlers mid-flight and resets the socket.
pub async fn serve_until_shutdown<S>(
    listener: TcpListener,
    router: Router,
    signal: S,
    grace: Duration,
) -> ShutdownOutcome
where
    S: Future<Output = ()>,
{
    let (drain_tx, drain_rx) = watch::channel(());
    let mut connections = JoinSet::new();
    tokio::pin!(signal);

    loop {
        tokio::select! {
            biased;

            () = &mut signal => break,

            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                        continue;
                    }
                };

                let service = TowerToHyperService::new(router.clone());
                let mut drain = drain_rx.clone();

                connections.spawn(async move {
                    let conn = http1::Builder::new()
                        .timer(TokioTimer::new())
                        .serve_connection(TokioIo::new(stream), service);
                    tokio::pin!(conn);

                    let result = tokio::select! {
                        result = conn.as_mut() => result,
                        _ = drain.changed() => {
                            conn.as_mut().graceful_shutdown();
                            conn.await
                        }
                    };
                    if let Err(e) = result {
                        debug!(peer = %peer, error = %e, "Connection closed with error");
                    }
                });
            }

            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    drop(listener);
    info!(
        in_flight = connections.len(),
        grace_secs = grace.as_secs_f64(),
        "Draining in-flight requests"
    );
    let _ = drain_tx.send(());

    let drained = tokio::time::timeout(grace, async {
        while connections.join_next().await.is_some() {}
    })
    .await;

    match drained {
        Ok(()) => ShutdownOutcome::Graceful,
        Err(_) => {
            warn!(
                open_connections = connections.len(),
                grace_secs = grace.as_secs_f64(),
                "In-flight requests exceeded shutdown timeout, terminating"
            );
            connections.abort_all();
            // handlers are dropped once their tasks are reaped
            while connections.join_next().await.is_some() {}
            ShutdownOutcome::TimedOut
        }
    }
}
