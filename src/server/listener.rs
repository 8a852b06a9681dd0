//! Chat server listener
//!
//! Binds the TCP listener, owns the room, and serves the HTTP router that
//! fronts it.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use axum::routing::get;
use axum::{middleware, Router};
use tokio::net::TcpListener;

use crate::error::Result;
use crate::identity::Authenticator;
use crate::room::Room;
use crate::server::auth::require_identity;
use crate::server::config::ServerConfig;
use crate::server::handler::room_upgrade;
use crate::trace::{LogTracer, Tracer};

/// State shared by every request handler
#[derive(Clone)]
pub struct AppState {
    /// The room every connection joins
    pub room: Room,
    /// Resolves session cookies to identities
    pub authenticator: Arc<dyn Authenticator>,
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Source of connection ids
    pub next_connection_id: Arc<AtomicU64>,
}

/// WebSocket chat server
pub struct ChatServer {
    state: AppState,
}

impl ChatServer {
    /// Create a server and start its room
    ///
    /// Must be called from within a tokio runtime. The room reports its
    /// activity through `tracing` at debug level.
    pub fn new<A: Authenticator>(config: ServerConfig, authenticator: A) -> Self {
        Self::with_tracer(config, authenticator, Arc::new(LogTracer))
    }

    /// Create a server whose room reports to a custom tracer
    pub fn with_tracer<A: Authenticator>(
        config: ServerConfig,
        authenticator: A,
        tracer: Arc<dyn Tracer>,
    ) -> Self {
        // The loop outlives the server while connections hold room handles.
        let (room, _room_task) = Room::spawn_with_tracer(config.room.clone(), tracer);

        Self {
            state: AppState {
                room,
                authenticator: Arc::new(authenticator),
                config: Arc::new(config),
                next_connection_id: Arc::new(AtomicU64::new(1)),
            },
        }
    }

    /// Handle to the room
    pub fn room(&self) -> &Room {
        &self.state.room
    }

    /// Server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.state.config.bind_addr
    }

    /// Build the HTTP router: the room endpoint behind the auth gate
    pub fn router(&self) -> Router {
        Router::new()
            .route(&self.state.config.room_path, get(room_upgrade))
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                require_identity,
            ))
            .with_state(self.state.clone())
    }

    /// Run the server
    ///
    /// This method blocks until the process is stopped.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.state.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            addr = %addr,
            path = %self.state.config.room_path,
            "Chat server listening"
        );

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        Ok(())
    }
}
