use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::balancer::BalancerRegistry;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::proxy::{dispatch_handler, Dispatcher};
use crate::routing::RouteTable;

/// How long in-flight requests may run after a termination signal before
/// they are aborted.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Owns the gateway's runtime state: the route table and balancer registry
/// live as long as this value, and the dispatcher borrows them through it.
pub struct Gateway {
    port: u16,
    dispatcher: Arc<Dispatcher>,
}

impl Gateway {
    /// Build a gateway from an already-validated configuration.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let routes = RouteTable::from_services(&config.services);
        let dispatcher = Dispatcher::new(
            routes,
            BalancerRegistry::new(),
            config.gateway.gateway_headers,
        )?;

        Ok(Self {
            port: config.gateway.port,
            dispatcher: Arc::new(dispatcher),
        })
    }

    /// The dispatcher is the single handler for every inbound path.
    pub fn router(&self) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .layer(TraceLayer::new_for_http())
            .with_state(self.dispatcher.clone())
    }

    /// Bind the listening socket. Failure here is fatal and surfaced before
    /// the server starts accepting.
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| GatewayError::Bind {
                addr: addr.clone(),
                source,
            })?;

        info!(%addr, "api gateway listening");
        Ok(listener)
    }

    /// Serve until a termination signal arrives, then shut down gracefully.
    pub async fn run(self) -> Result<()> {
        let listener = self.bind().await?;
        self.run_until(listener, shutdown_signal(), SHUTDOWN_GRACE).await
    }

    /// Serve on `listener` until `shutdown` resolves. The listener then stops
    /// accepting new connections; in-flight requests get `grace` to complete
    /// before being aborted.
    pub async fn run_until(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
        grace: Duration,
    ) -> Result<()> {
        let app = self.router();

        let (drain_tx, drain_rx) = tokio::sync::oneshot::channel::<()>();
        let mut server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = drain_rx.await;
                })
                .await
        });

        tokio::select! {
            _ = shutdown => {
                info!("shutdown signal received, draining in-flight requests");
            }
            result = &mut server => {
                return match result {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(err)) => Err(GatewayError::Io(err)),
                    Err(err) => Err(GatewayError::Internal(format!("server task failed: {}", err))),
                };
            }
        }

        let _ = drain_tx.send(());

        match tokio::time::timeout(grace, &mut server).await {
            Ok(Ok(Ok(()))) => {
                info!("server closed gracefully");
                Ok(())
            }
            Ok(Ok(Err(err))) => Err(GatewayError::Io(err)),
            Ok(Err(err)) => Err(GatewayError::Internal(format!("server task failed: {}", err))),
            Err(_) => {
                warn!(grace_ms = grace.as_millis() as u64, "grace period elapsed, aborting in-flight requests");
                server.abort();
                Ok(())
            }
        }
    }
}

/// Resolves on SIGHUP, SIGINT, or SIGQUIT.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");
    let mut interrupt = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut quit = signal(SignalKind::quit()).expect("failed to install SIGQUIT handler");

    tokio::select! {
        _ = hangup.recv() => {}
        _ = interrupt.recv() => {}
        _ = quit.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
