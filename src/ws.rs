//! WebSocket transport for the backend link.
//!
//! Wraps `tokio-tungstenite` behind a split writer/reader pair so the
//! connection actor can drive both halves from one `tokio::select!` loop.
//! Nothing outside this module touches `tokio-tungstenite` on the client
//! side.
//!
//! # Message kinds
//!
//! Protocol frames travel as binary messages. The keep-alive `PING`/`PONG`
//! exchange uses text messages. Transport-level ping frames are surfaced so
//! the caller can answer them.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite;

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Received WebSocket message.
#[derive(Debug)]
pub enum WsMessage {
    /// UTF-8 text message.
    Text(String),
    /// Binary message (one protocol frame).
    Binary(Vec<u8>),
    /// Transport ping.
    Ping(Vec<u8>),
    /// Transport pong.
    Pong(Vec<u8>),
    /// Close frame.
    Close {
        /// Close code (1005 when the peer sent none).
        code: u16,
        /// Close reason.
        reason: String,
    },
}

/// Write half of a backend connection.
#[derive(Debug)]
pub struct WsWriter {
    sink: futures_util::stream::SplitSink<WsStream, tungstenite::Message>,
}

impl WsWriter {
    /// Send one encoded frame as a binary message.
    pub async fn send_binary(&mut self, data: Vec<u8>) -> Result<()> {
        self.sink
            .send(tungstenite::Message::Binary(data))
            .await
            .context("WebSocket send_binary failed")
    }

    /// Send a text message.
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.sink
            .send(tungstenite::Message::Text(text.to_string()))
            .await
            .context("WebSocket send_text failed")
    }

    /// Answer a transport ping.
    pub async fn send_pong(&mut self, data: Vec<u8>) -> Result<()> {
        self.sink
            .send(tungstenite::Message::Pong(data))
            .await
            .context("WebSocket send_pong failed")
    }

    /// Send a normal close frame and flush.
    pub async fn send_close(&mut self) -> Result<()> {
        self.sink
            .send(tungstenite::Message::Close(None))
            .await
            .context("WebSocket send_close failed")?;
        self.sink.close().await.context("WebSocket close failed")
    }
}

/// Read half of a backend connection.
#[derive(Debug)]
pub struct WsReader {
    stream: futures_util::stream::SplitStream<WsStream>,
}

impl WsReader {
    /// Next message, or `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<Result<WsMessage>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(anyhow::anyhow!("WebSocket read error: {e}"))),
            };
            return Some(Ok(match message {
                tungstenite::Message::Text(text) => WsMessage::Text(text.to_string()),
                tungstenite::Message::Binary(data) => WsMessage::Binary(data.to_vec()),
                tungstenite::Message::Ping(data) => WsMessage::Ping(data.to_vec()),
                tungstenite::Message::Pong(data) => WsMessage::Pong(data.to_vec()),
                tungstenite::Message::Close(close_frame) => {
                    let (code, reason) = close_frame
                        .map(|cf| (cf.code.into(), cf.reason.to_string()))
                        .unwrap_or((1005, String::new()));
                    WsMessage::Close { code, reason }
                }
                tungstenite::Message::Frame(_) => continue,
            }));
        }
    }
}

/// Open a WebSocket to `url`.
///
/// `http://` and `https://` URLs are rewritten to `ws://` / `wss://` first.
pub async fn connect(url: &str) -> Result<(WsWriter, WsReader)> {
    use tungstenite::client::IntoClientRequest;

    let url = http_to_ws_scheme(url);
    let request = url
        .as_str()
        .into_client_request()
        .with_context(|| format!("invalid WebSocket URL: {url}"))?;

    let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .with_context(|| format!("WebSocket connect to {url} failed"))?;

    let (sink, stream) = ws_stream.split();
    Ok((WsWriter { sink }, WsReader { stream }))
}

/// Convert an HTTP(S) URL to the WS(S) scheme; WS URLs pass through.
#[must_use]
pub fn http_to_ws_scheme(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_to_ws_scheme() {
        assert_eq!(http_to_ws_scheme("https://example.com"), "wss://example.com");
        assert_eq!(http_to_ws_scheme("http://localhost:3002"), "ws://localhost:3002");
    }

    #[test]
    fn test_http_to_ws_scheme_passthrough() {
        assert_eq!(http_to_ws_scheme("ws://host:3002"), "ws://host:3002");
        assert_eq!(http_to_ws_scheme("wss://host/socket"), "wss://host/socket");
    }

    #[test]
    fn test_http_to_ws_scheme_only_rewrites_prefix() {
        assert_eq!(
            http_to_ws_scheme("ws://host/?next=http://other"),
            "ws://host/?next=http://other"
        );
    }

    #[tokio::test]
    async fn test_connect_invalid_url_returns_error() {
        assert!(connect("not-a-url").await.is_err());
    }

    #[tokio::test]
    async fn test_connect_unreachable_host_returns_error() {
        assert!(connect("ws://127.0.0.1:1/viewer").await.is_err());
    }

    #[tokio::test]
    async fn test_binary_and_text_reach_peer() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            let mut seen = Vec::new();
            while let Some(Ok(msg)) = ws.next().await {
                if msg.is_close() {
                    break;
                }
                seen.push(msg);
            }
            seen
        });

        let (mut writer, _reader) = connect(&format!("http://{addr}")).await.unwrap();
        writer.send_binary(vec![1, 2, 3]).await.unwrap();
        writer.send_text("PING").await.unwrap();
        writer.send_close().await.unwrap();

        let seen = server.await.unwrap();
        assert_eq!(
            seen,
            vec![
                tungstenite::Message::Binary(vec![1, 2, 3]),
                tungstenite::Message::Text("PING".to_string()),
            ]
        );
    }
}
