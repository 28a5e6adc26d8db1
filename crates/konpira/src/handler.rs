//! Per-connection handler: outbound writer plus inbound dispatch loop.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register the connection with the router and an outbound channel
//!   2. Spawn a writer task draining that channel onto the socket
//!   3. Loop: receive frames → `Router::handle_raw`
//!   4. On close or error → `Router::disconnect`, stop the writer

use std::sync::Arc;

use konpira_protocol::{Codec, ServerMessage};
use konpira_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::{KonpiraError, Router};

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C>(
    conn: WebSocketConnection,
    router: Arc<Router<C>>,
) -> Result<(), KonpiraError>
where
    C: Codec + Clone,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (outbound, inbox) = mpsc::unbounded_channel();
    router.connect(conn_id, outbound).await?;

    let writer = tokio::spawn(write_loop(
        Arc::clone(&conn),
        router.codec().clone(),
        inbox,
    ));

    loop {
        match conn.recv().await {
            Ok(Some(data)) => router.handle_raw(conn_id, &data).await,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        }
    }

    router.disconnect(conn_id).await;
    writer.abort();
    // Already closed from the other side in the common case.
    let _ = conn.close().await;
    Ok(())
}

/// Encodes and sends everything pushed to this connection's channel.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    codec: C,
    mut inbox: mpsc::UnboundedReceiver<ServerMessage>,
) {
    let conn_id = conn.id();
    while let Some(msg) = inbox.recv().await {
        if !conn.is_open() {
            break;
        }
        let bytes = match codec.encode(&msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "failed to encode outbound message");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}
