//! `KonpiraServer` builder and server loop.
//!
//! This is the entry point for running a Konpira game server. It ties
//! together all the layers: transport → protocol → session → room.

use std::sync::Arc;

use konpira_protocol::{Codec, JsonCodec};
use konpira_room::{RoomConfig, RoomRegistry};
use konpira_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{KonpiraError, Router, ServerConfig};

/// Builder for configuring and starting a Konpira server.
///
/// # Example
///
/// ```rust,no_run
/// use konpira::prelude::*;
///
/// # async fn run() -> Result<(), KonpiraError> {
/// let server = KonpiraServer::builder()
///     .bind("0.0.0.0:3001")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct KonpiraServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
}

impl KonpiraServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: ServerConfig::default().bind_addr(),
            room_config: RoomConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the rules and timings every room is created with.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<KonpiraServer<JsonCodec>, KonpiraError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let router = Arc::new(Router::new(RoomRegistry::new(self.room_config)));
        Ok(KonpiraServer { transport, router })
    }
}

impl Default for KonpiraServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Konpira game server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct KonpiraServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    router: Arc<Router<C>>,
}

impl KonpiraServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> KonpiraServerBuilder {
        KonpiraServerBuilder::new()
    }
}

impl<C: Codec + Clone> KonpiraServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The router shared by every connection.
    pub fn router(&self) -> Arc<Router<C>> {
        Arc::clone(&self.router)
    }

    /// Runs the server accept loop.
    ///
    /// Spawns a handler task for each accepted connection. Runs until the
    /// task is dropped or the process is terminated.
    pub async fn run(mut self) -> Result<(), KonpiraError> {
        tracing::info!(addr = ?self.local_addr().ok(), "Konpira server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let router = Arc::clone(&self.router);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, router).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
