//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and talk to it with
//! a `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use konpira_transport::{Connection, Transport, WebSocketConnection, WebSocketTransport};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds a transport on port 0, connects one client, and returns both ends.
    async fn connected_pair() -> (WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("bound address");

        let server_handle =
            tokio::spawn(async move { transport.accept().await.expect("should accept") });

        let (client_ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        let server_conn = server_handle.await.expect("accept task should complete");
        (server_conn, client_ws)
    }

    #[tokio::test]
    async fn test_text_frames_flow_both_ways() {
        let (server_conn, mut client_ws) = connected_pair().await;
        assert!(server_conn.id().into_inner() > 0);
        assert!(server_conn.is_open());

        server_conn
            .send(br#"{"type":"error","message":"hi"}"#)
            .await
            .expect("send should succeed");

        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text(), "UTF-8 payloads should go out as text frames");
        assert_eq!(
            msg.into_data().as_ref(),
            br#"{"type":"error","message":"hi"}"#
        );

        client_ws
            .send(Message::text(r#"{"type":"joinRoom"}"#))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"{"type":"joinRoom"}"#);

        server_conn.close().await.expect("close should succeed");
        assert!(!server_conn.is_open());
    }

    #[tokio::test]
    async fn test_binary_payload_is_sent_as_binary() {
        let (server_conn, mut client_ws) = connected_pair().await;

        server_conn.send(&[0xff, 0x00, 0x01]).await.unwrap();

        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_binary());
        assert_eq!(msg.into_data().as_ref(), &[0xff, 0x00, 0x01]);
    }

    #[tokio::test]
    async fn test_recv_returns_none_on_client_close() {
        let (server_conn, mut client_ws) = connected_pair().await;

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
        assert!(!server_conn.is_open());
    }

    #[tokio::test]
    async fn test_send_after_close_is_rejected() {
        let (server_conn, _client_ws) = connected_pair().await;

        server_conn.close().await.unwrap();

        assert!(server_conn.send(b"late").await.is_err());
    }
}
