use anyhow::{bail, Context, Result};
use axum::serve;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::{TcpListener, UnixListener};
use tokio::signal;
use tokio::task::{JoinError, JoinHandle};
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info, Level};

use torrent_session::core::config::Config;
use torrent_session::core::startup::restore_session;
use torrent_session::core::state::AppState;
use torrent_session::core::{routes, tracing_init};
use torrent_session::persist::snapshot::{JsonFileStore, SessionStore};
use torrent_session::stores::registry::Registry;

type ServerHandle = JoinHandle<Result<()>>;

fn main() -> Result<()> {
    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = Config::from_file(&config_path).context(format!(
        "Failed to load configuration from '{}'. \
        On first run, copy config.example.toml to config.toml and adjust the values.",
        config_path.display()
    ))?;

    tracing_init::init_tracing(&config.logging)?;

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
        state_path = %config.session.state_path.display(),
        "Torrent session service starting"
    );

    let store: Arc<dyn SessionStore> = Arc::new(JsonFileStore::new(config.session.state_path.clone()));
    let session = restore_session(store.as_ref());
    let registry = Arc::new(Registry::from_state(session, store, &config.session));

    let state = Arc::new(AppState::new(config.clone(), Arc::clone(&registry)));

    let counts = registry.counts();
    info!(
        torrents = counts.tracked,
        completed = counts.completed,
        dark_mode = registry.dark_mode(),
        "Session ready"
    );

    let app = routes::build_router(state).layer(
        ServiceBuilder::new().layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        ),
    );

    let tcp_handle = if let Some(port) = config.server.port {
        let addr = format!("127.0.0.1:{}", port);
        let listener = TcpListener::bind(&addr)
            .await
            .context(format!("Failed to bind TCP listener to {}", addr))?;

        info!(address = %addr, "TCP listener bound");

        let app = app.clone();
        Some(tokio::spawn(async move {
            serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("TCP server error")
        }))
    } else {
        None
    };

    let unix_handle = if let Some(unix_socket) = &config.server.unix_socket {
        // A stale socket from a previous run blocks the bind
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

        info!(path = %unix_socket.display(), "Unix socket listener bound");

        Some(tokio::spawn(serve_unix(listener, app)))
    } else {
        None
    };

    wait_for_listeners(tcp_handle, unix_handle).await?;

    info!("Saving session before exit");
    if let Err(e) = registry.flush() {
        error!(error = %e, "Final session save failed");
    }

    if let Some(unix_socket) = &config.server.unix_socket {
        let _ = std::fs::remove_file(unix_socket);
    }

    info!("Shut down cleanly");
    Ok(())
}

/// Serve the router over a Unix domain socket until a shutdown signal arrives
async fn serve_unix(listener: UnixListener, app: axum::Router) -> Result<()> {
    use tower::Service;

    let mut make_service = app.into_make_service();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let (socket, _remote_addr) = tokio::select! {
            _ = &mut shutdown => return Ok(()),
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    error!(error = %e, "Failed to accept Unix socket connection");
                    continue;
                }
            },
        };

        let tower_service = match make_service.call(&socket).await {
            Ok(svc) => svc,
            Err(infallible) => match infallible {},
        };

        tokio::spawn(async move {
            let socket = hyper_util::rt::TokioIo::new(socket);

            let hyper_service = hyper::service::service_fn(
                move |request: hyper::Request<hyper::body::Incoming>| {
                    tower_service.clone().call(request)
                },
            );

            if let Err(err) = hyper_util::server::conn::auto::Builder::new(
                hyper_util::rt::TokioExecutor::new(),
            )
            .serve_connection_with_upgrades(socket, hyper_service)
            .await
            {
                error!(error = %err, "Error serving Unix socket connection");
            }
        });
    }
}

/// Wait until a listener stops, then stop the other one.
///
/// Returns only after every server task has finished, so nothing is still
/// serving commands when the final save runs.
async fn wait_for_listeners(
    tcp: Option<ServerHandle>,
    unix: Option<ServerHandle>,
) -> Result<()> {
    match (tcp, unix) {
        (Some(mut tcp), Some(mut unix)) => {
            tokio::select! {
                result = &mut tcp => {
                    log_server_exit("TCP", result);
                    stop_listener("Unix socket", unix).await;
                }
                result = &mut unix => {
                    log_server_exit("Unix socket", result);
                    stop_listener("TCP", tcp).await;
                }
            }
        }
        (Some(tcp), None) => log_server_exit("TCP", tcp.await),
        (None, Some(unix)) => log_server_exit("Unix socket", unix.await),
        (None, None) => {
            error!("No listeners configured");
            bail!("No listeners configured");
        }
    }

    Ok(())
}

async fn stop_listener(name: &str, handle: ServerHandle) {
    handle.abort();
    match handle.await {
        Err(e) if e.is_cancelled() => info!(listener = name, "Server stopped"),
        result => log_server_exit(name, result),
    }
}

fn log_server_exit(name: &str, result: Result<Result<()>, JoinError>) {
    match result {
        Ok(Ok(())) => info!(listener = name, "Server stopped"),
        Ok(Err(e)) => error!(listener = name, error = %e, "Server failed"),
        Err(e) => error!(listener = name, error = %e, "Server task panicked"),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_remaining_listener_is_stopped() {
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = DropFlag(Arc::clone(&stopped));

        let failed: ServerHandle = tokio::spawn(async { Err(anyhow::anyhow!("bind lost")) });
        let running: ServerHandle = tokio::spawn(async move {
            let _flag = flag;
            std::future::pending::<()>().await;
            Ok(())
        });

        wait_for_listeners(Some(failed), Some(running)).await.unwrap();
        assert!(stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_single_listener_is_awaited() {
        let done: ServerHandle = tokio::spawn(async { Ok(()) });
        assert!(wait_for_listeners(None, Some(done)).await.is_ok());
    }

    #[tokio::test]
    async fn test_no_listeners_is_an_error() {
        assert!(wait_for_listeners(None, None).await.is_err());
    }
}
