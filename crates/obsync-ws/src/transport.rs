//! WebSocket transport abstraction
//!
//! This module provides a trait-based abstraction over a single WebSocket
//! connection, so the stream state machine can be driven by a mock in tests.
//!
//! # Example
//!
//! ```no_run
//! use obsync_ws::transport::{Transport, WsTransport, TransportError};
//!
//! async fn example() -> Result<(), TransportError> {
//!     let mut transport = WsTransport::new("ws://localhost:3001/ws");
//!     transport.connect().await?;
//!     transport.send(r#"{"method":"subscribe","params":{"channel":"orderbook"}}"#).await?;
//!     if let Some(frame) = transport.recv().await? {
//!         println!("Received: {}", frame);
//!     }
//!     Ok(())
//! }
//! ```

use crate::events::CloseFrame;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame as WsCloseFrame;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, instrument};

/// Transport layer errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Connection timeout
    #[error("connection timeout after {0:?}")]
    Timeout(Duration),

    /// Not connected
    #[error("not connected")]
    NotConnected,

    /// Protocol error
    #[error("protocol error: {0}")]
    Protocol(String),

    /// `connect()` called outside a tokio runtime
    #[error("no tokio runtime available to drive the connection")]
    NoRuntime,
}

/// Trait for WebSocket transport abstraction
///
/// One value represents one connection attempt. The stream state machine
/// asks its factory for a fresh transport on every `connect()`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to the WebSocket endpoint
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Send a text message
    async fn send(&mut self, message: &str) -> Result<(), TransportError>;

    /// Receive a text message
    ///
    /// Returns `None` if the connection was closed gracefully.
    async fn recv(&mut self) -> Result<Option<String>, TransportError>;

    /// Close the connection, optionally with a close code and reason
    async fn close(&mut self, frame: Option<CloseFrame>) -> Result<(), TransportError>;

    /// Check if currently connected
    fn is_connected(&self) -> bool;

    /// Get the endpoint URL
    fn endpoint(&self) -> &str;
}

/// Real WebSocket transport using tokio-tungstenite
pub struct WsTransport {
    url: String,
    stream: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
    connect_timeout: Duration,
}

impl WsTransport {
    /// Create a new WebSocket transport
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream: None,
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Set connection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[async_trait]
impl Transport for WsTransport {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn connect(&mut self) -> Result<(), TransportError> {
        debug!("Connecting to WebSocket");

        let (ws_stream, _response) = timeout(self.connect_timeout, connect_async(&self.url))
            .await
            .map_err(|_| TransportError::Timeout(self.connect_timeout))?
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        self.stream = Some(ws_stream);
        debug!("WebSocket connected");
        Ok(())
    }

    #[instrument(skip(self, message), fields(len = message.len()))]
    async fn send(&mut self, message: &str) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;

        stream
            .send(Message::Text(message.to_string()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    #[instrument(skip(self))]
    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;

            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Binary(data))) => {
                    return String::from_utf8(data)
                        .map(Some)
                        .map_err(|e| TransportError::Protocol(e.to_string()));
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "Server sent close frame");
                    self.stream = None;
                    return Ok(None);
                }
                // tungstenite answers pings itself; raw frames never surface on read
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Err(e)) => {
                    self.stream = None;
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
                None => {
                    self.stream = None;
                    return Err(TransportError::ConnectionClosed);
                }
            }
        }
    }

    #[instrument(skip(self))]
    async fn close(&mut self, frame: Option<CloseFrame>) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.take() {
            let frame = frame.map(|f| WsCloseFrame {
                code: CloseCode::from(f.code),
                reason: f.reason.into(),
            });
            stream
                .close(frame)
                .await
                .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockServer, MockTransport};

#[cfg(any(test, feature = "test-utils"))]
mod mock {
    use super::{Transport, TransportError};
    use crate::events::CloseFrame;
    use crate::stream::TransportFactory;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    #[derive(Debug)]
    enum MockFrame {
        Text(String),
        Close,
        Error(String),
    }

    #[derive(Default)]
    struct ServerState {
        sent: Mutex<Vec<String>>,
        closes: Mutex<Vec<Option<CloseFrame>>>,
        connects: AtomicUsize,
        fail_connect: Mutex<Option<String>>,
        inbound: Mutex<Option<mpsc::UnboundedSender<MockFrame>>>,
    }

    /// Server side of the mock: push frames to, and inspect frames from, the
    /// most recently connected [`MockTransport`]
    #[derive(Clone, Default)]
    pub struct MockServer {
        state: Arc<ServerState>,
    }

    impl MockServer {
        /// Create a server with no connections
        pub fn new() -> Self {
            Self::default()
        }

        /// A fresh transport bound to this server
        pub fn transport(&self, url: impl Into<String>) -> MockTransport {
            MockTransport::with_server(url, self.clone())
        }

        /// Factory for [`StreamTransport::with_factory`](crate::StreamTransport::with_factory)
        pub fn factory(&self) -> TransportFactory {
            let server = self.clone();
            Arc::new(move || Box::new(server.transport("ws://mock.test")) as Box<dyn Transport>)
        }

        /// Push a text frame to the live connection. Returns false if none is live.
        pub fn push_text(&self, frame: impl Into<String>) -> bool {
            self.push(MockFrame::Text(frame.into()))
        }

        /// Close the live connection from the server side
        pub fn push_close(&self) -> bool {
            self.push(MockFrame::Close)
        }

        /// Fail the live connection with a network error
        pub fn push_error(&self, message: impl Into<String>) -> bool {
            self.push(MockFrame::Error(message.into()))
        }

        fn push(&self, frame: MockFrame) -> bool {
            match self.state.inbound.lock().as_ref() {
                Some(tx) => tx.send(frame).is_ok(),
                None => false,
            }
        }

        /// Make the next connection attempt fail
        pub fn fail_next_connect(&self, message: impl Into<String>) {
            *self.state.fail_connect.lock() = Some(message.into());
        }

        /// Every frame the client sent, across all connections, in order
        pub fn sent(&self) -> Vec<String> {
            self.state.sent.lock().clone()
        }

        /// Sent frames, clearing the capture buffer
        pub fn take_sent(&self) -> Vec<String> {
            std::mem::take(&mut *self.state.sent.lock())
        }

        /// Close frames the client sent, in order
        pub fn closes(&self) -> Vec<Option<CloseFrame>> {
            self.state.closes.lock().clone()
        }

        /// Number of successful connections
        pub fn connections(&self) -> usize {
            self.state.connects.load(Ordering::SeqCst)
        }
    }

    /// Mock transport for testing
    ///
    /// Frames are delivered through an unbounded channel; `recv` waits until
    /// the server pushes something.
    pub struct MockTransport {
        url: String,
        connected: bool,
        server: MockServer,
        inbound_tx: mpsc::UnboundedSender<MockFrame>,
        inbound_rx: mpsc::UnboundedReceiver<MockFrame>,
    }

    impl MockTransport {
        /// Create a new mock transport with its own server
        pub fn new(url: impl Into<String>) -> Self {
            Self::with_server(url, MockServer::new())
        }

        fn with_server(url: impl Into<String>, server: MockServer) -> Self {
            let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
            Self {
                url: url.into(),
                connected: false,
                server,
                inbound_tx,
                inbound_rx,
            }
        }

        /// The server this transport reports to
        pub fn server(&self) -> MockServer {
            self.server.clone()
        }

        /// Queue a frame to be returned by `recv`
        pub fn push_response(&self, msg: impl Into<String>) {
            let _ = self.inbound_tx.send(MockFrame::Text(msg.into()));
        }

        /// Queue a graceful close
        pub fn push_close(&self) {
            let _ = self.inbound_tx.send(MockFrame::Close);
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn connect(&mut self) -> Result<(), TransportError> {
            if let Some(message) = self.server.state.fail_connect.lock().take() {
                return Err(TransportError::ConnectionFailed(message));
            }
            self.connected = true;
            self.server.state.connects.fetch_add(1, Ordering::SeqCst);
            *self.server.state.inbound.lock() = Some(self.inbound_tx.clone());
            Ok(())
        }

        async fn send(&mut self, message: &str) -> Result<(), TransportError> {
            if !self.connected {
                return Err(TransportError::NotConnected);
            }
            self.server.state.sent.lock().push(message.to_string());
            Ok(())
        }

        async fn recv(&mut self) -> Result<Option<String>, TransportError> {
            if !self.connected {
                return Err(TransportError::NotConnected);
            }
            match self.inbound_rx.recv().await {
                Some(MockFrame::Text(text)) => Ok(Some(text)),
                Some(MockFrame::Close) => {
                    self.connected = false;
                    Ok(None)
                }
                Some(MockFrame::Error(message)) => {
                    self.connected = false;
                    Err(TransportError::ReceiveFailed(message))
                }
                None => Err(TransportError::ConnectionClosed),
            }
        }

        async fn close(&mut self, frame: Option<CloseFrame>) -> Result<(), TransportError> {
            if self.connected {
                self.server.state.closes.lock().push(frame);
            }
            self.connected = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn endpoint(&self) -> &str {
            &self.url
        }
    }
}
