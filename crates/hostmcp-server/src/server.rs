use crate::ServerError;
use crate::cors::cors_layer;
use crate::handler::McpHandler;
use crate::routes::router;
use axum::Router;
use hostmcp_config::ServerConfig;
use hostmcp_tools::ToolRegistry;
use log::{error, info};
use std::net::SocketAddr;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Serves a tool registry over MCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolServer;

impl ToolServer {
    /// Router with the configured CORS policy, for embedding in an existing
    /// axum application.
    pub fn router(registry: ToolRegistry, config: &ServerConfig) -> Result<Router, ServerError> {
        let cors = cors_layer(&config.cors)?;
        Ok(router(
            McpHandler::new(registry, config.name.clone()),
            cors,
            config.session_idle(),
        ))
    }

    /// Bind and serve on a dedicated thread with its own runtime. Returns
    /// once the listener is bound, or with the bind error.
    pub fn serve(registry: ToolRegistry, config: &ServerConfig) -> Result<ServerHandle, ServerError> {
        let app = Self::router(registry.clone(), config)?;
        let addr = config.bind_addr();
        let (bound_tx, bound_rx) = mpsc::channel::<Result<SocketAddr, ServerError>>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let thread = thread::Builder::new()
            .name("hostmcp-server".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_multi_thread()
                    .enable_all()
                    .thread_name("hostmcp-server-worker")
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        let _ = bound_tx.send(Err(ServerError::Runtime(err)));
                        return;
                    }
                };
                runtime.block_on(async move {
                    let listener = match TcpListener::bind(&addr).await {
                        Ok(listener) => listener,
                        Err(source) => {
                            let _ = bound_tx.send(Err(ServerError::Bind { addr, source }));
                            return;
                        }
                    };
                    let local_addr = match listener.local_addr() {
                        Ok(local_addr) => local_addr,
                        Err(source) => {
                            let _ = bound_tx.send(Err(ServerError::Bind { addr, source }));
                            return;
                        }
                    };
                    let _ = bound_tx.send(Ok(local_addr));
                    let shutdown = async move {
                        // A dropped handle detaches the server instead of stopping it.
                        if shutdown_rx.await.is_err() {
                            std::future::pending::<()>().await;
                        }
                    };
                    if let Err(err) = axum::serve(listener, app)
                        .with_graceful_shutdown(shutdown)
                        .await
                    {
                        error!("tool server stopped (addr={}, error={})", local_addr, err);
                    }
                });
            })
            .map_err(ServerError::Runtime)?;

        let local_addr = match bound_rx.recv() {
            Ok(Ok(local_addr)) => local_addr,
            Ok(Err(err)) => {
                error!("tool server failed to start (error={})", err);
                let _ = thread.join();
                return Err(err);
            }
            Err(_) => return Err(ServerError::ThreadExited),
        };
        info!(
            "tool server listening (addr={}, tools={})",
            local_addr,
            registry.len()
        );
        Ok(ServerHandle {
            local_addr,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }
}

/// Running server. Dropping the handle leaves the server running.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for the server thread.
    pub fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("tool server thread panicked (addr={})", self.local_addr);
            }
        }
        info!("tool server stopped (addr={})", self.local_addr);
    }
}
