//! Stream transport state machine
//!
//! [`StreamTransport`] owns one logical WebSocket stream. It queues outbound
//! frames while disconnected, flushes them in order on open, parses inbound
//! frames into [`WsMessage`] and fans lifecycle events out to listeners.
//!
//! Each `connect()` spawns one connection task on the current tokio runtime.
//! Every task carries a generation number; once `disconnect()` bumps the
//! generation, a task that is still connecting or reading stops touching
//! shared state and never fires another listener.

use crate::config::StreamConfig;
use crate::events::{CloseEvent, CloseFrame, DisconnectReason, TransportState};
use crate::listeners::{ListenerHandle, ListenerSet};
use crate::transport::{Transport, TransportError, WsTransport};

use obsync_types::{SyncError, WsMessage};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Creates a fresh transport for every connection attempt
pub type TransportFactory = Arc<dyn Fn() -> Box<dyn Transport> + Send + Sync>;

enum Command {
    Send(String),
    Close(CloseFrame),
}

struct Inner {
    config: StreamConfig,
    factory: TransportFactory,
    state: RwLock<TransportState>,
    generation: AtomicU64,
    /// Frames submitted while not open; only ever appended to or fully drained
    queue: Mutex<VecDeque<String>>,
    commands: Mutex<Option<mpsc::UnboundedSender<Command>>>,
    on_message: Arc<ListenerSet<WsMessage>>,
    on_open: Arc<ListenerSet<()>>,
    on_close: Arc<ListenerSet<CloseEvent>>,
    on_error: Arc<ListenerSet<SyncError>>,
}

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn dispatch(&self, text: &str) {
        match WsMessage::parse(text) {
            Ok(message) => self.on_message.emit(&message),
            Err(err) => {
                warn!("Failed to parse frame: {} - {}", err, text);
                self.on_error.emit(&SyncError::parse(&err, text));
            }
        }
    }

    /// Remote or network close of the current connection
    fn closed(&self, generation: u64, reason: DisconnectReason) {
        {
            let mut state = self.state.write();
            if !self.is_current(generation) {
                return;
            }
            *state = TransportState::Closed;
            self.commands.lock().take();
        }
        self.on_close.emit(&CloseEvent::new(reason));
    }
}

/// A WebSocket stream with queued sends and listener fan-out
///
/// Cloning is cheap and every clone drives the same stream.
#[derive(Clone)]
pub struct StreamTransport {
    inner: Arc<Inner>,
}

impl fmt::Debug for StreamTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamTransport")
            .field("url", &self.inner.config.url)
            .field("state", &self.state())
            .field("queued", &self.queued())
            .finish()
    }
}

impl StreamTransport {
    /// Create a stream backed by real WebSocket connections
    pub fn new(config: StreamConfig) -> Self {
        let url = config.url.clone();
        let timeout = config.connect_timeout;
        let factory: TransportFactory =
            Arc::new(move || Box::new(WsTransport::new(url.clone()).with_timeout(timeout)));
        Self::with_factory(config, factory)
    }

    /// Create a stream with a custom transport factory (mocks, proxies)
    pub fn with_factory(config: StreamConfig, factory: TransportFactory) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                factory,
                state: RwLock::new(TransportState::Idle),
                generation: AtomicU64::new(0),
                queue: Mutex::new(VecDeque::new()),
                commands: Mutex::new(None),
                on_message: Arc::new(ListenerSet::new()),
                on_open: Arc::new(ListenerSet::new()),
                on_close: Arc::new(ListenerSet::new()),
                on_error: Arc::new(ListenerSet::new()),
            }),
        }
    }

    /// Stream configuration
    pub fn config(&self) -> &StreamConfig {
        &self.inner.config
    }

    /// Current state
    pub fn state(&self) -> TransportState {
        *self.inner.state.read()
    }

    /// True while the socket is open
    pub fn is_open(&self) -> bool {
        self.state() == TransportState::Open
    }

    /// Frames waiting for the next open
    pub fn queued(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Open the stream
    ///
    /// A no-op while connecting or open. Otherwise spawns a connection task
    /// on the current tokio runtime and returns immediately; the outcome is
    /// reported through the open/close/error listeners.
    pub fn connect(&self) -> Result<(), TransportError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| TransportError::NoRuntime)?;

        let (generation, commands) = {
            let mut state = self.inner.state.write();
            if matches!(*state, TransportState::Connecting | TransportState::Open) {
                debug!("connect() ignored, stream is {}", *state);
                return Ok(());
            }
            *state = TransportState::Connecting;

            let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let (tx, rx) = mpsc::unbounded_channel();
            *self.inner.commands.lock() = Some(tx);
            (generation, rx)
        };

        info!("Connecting to {}", self.inner.config.url);
        let transport = (self.inner.factory)();
        runtime.spawn(run_connection(
            self.inner.clone(),
            transport,
            commands,
            generation,
        ));
        Ok(())
    }

    /// Serialize a message to JSON and send it
    pub fn send<T: Serialize>(&self, message: &T) -> Result<(), SyncError> {
        let frame = serde_json::to_string(message).map_err(|e| SyncError::Parse {
            message: e.to_string(),
            raw: None,
        })?;
        self.send_raw(frame);
        Ok(())
    }

    /// Send a pre-serialized frame
    ///
    /// Sent immediately if open, otherwise queued for the next open.
    pub fn send_raw(&self, frame: impl Into<String>) {
        let frame = frame.into();
        let mut queue = self.inner.queue.lock();
        if self.state() == TransportState::Open {
            if let Some(tx) = self.inner.commands.lock().as_ref() {
                if tx.send(Command::Send(frame.clone())).is_ok() {
                    return;
                }
            }
        }
        debug!("Stream not open, queueing frame ({} pending)", queue.len() + 1);
        queue.push_back(frame);
    }

    /// Close the stream from the application side
    ///
    /// Close listeners are not notified for this close. Queued frames are
    /// discarded.
    pub fn disconnect(&self, code: u16, reason: impl Into<String>) {
        let reason = reason.into();

        let commands = {
            let mut queue = self.inner.queue.lock();
            let mut state = self.inner.state.write();
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            if *state != TransportState::Idle {
                *state = TransportState::Closed;
            }
            queue.clear();
            self.inner.commands.lock().take()
        };

        if let Some(tx) = commands {
            info!("Disconnecting ({code}: {reason})");
            let _ = tx.send(Command::Close(CloseFrame { code, reason }));
        }
    }

    /// Listen for parsed inbound messages
    pub fn on_message<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&WsMessage) + Send + Sync + 'static,
    {
        ListenerSet::subscribe(&self.inner.on_message, listener)
    }

    /// Listen for the socket opening
    ///
    /// Fires immediately if the stream is already open.
    pub fn on_open<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let listener = Arc::new(listener);
        let already_open = self.is_open();
        let registered = listener.clone();
        let handle = ListenerSet::subscribe(&self.inner.on_open, move |_: &()| registered());
        if already_open {
            listener();
        }
        handle
    }

    /// Listen for closes the application did not ask for
    pub fn on_close<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&CloseEvent) + Send + Sync + 'static,
    {
        ListenerSet::subscribe(&self.inner.on_close, listener)
    }

    /// Listen for transport and parse errors
    pub fn on_error<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&SyncError) + Send + Sync + 'static,
    {
        ListenerSet::subscribe(&self.inner.on_error, listener)
    }
}

async fn run_connection(
    inner: Arc<Inner>,
    mut transport: Box<dyn Transport>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    generation: u64,
) {
    if let Err(err) = transport.connect().await {
        if !inner.is_current(generation) {
            return;
        }
        warn!("Connection to {} failed: {}", inner.config.url, err);
        inner.on_error.emit(&SyncError::Transport(err.to_string()));
        inner.closed(generation, DisconnectReason::ConnectFailed(err.to_string()));
        return;
    }

    // Flip to open and take the backlog under the queue lock so no frame
    // submitted in between can be stranded in the queue.
    let backlog = {
        let mut queue = inner.queue.lock();
        let mut state = inner.state.write();
        if !inner.is_current(generation) {
            drop(state);
            drop(queue);
            debug!("Connection superseded before open, closing");
            let _ = transport.close(None).await;
            return;
        }
        *state = TransportState::Open;
        std::mem::take(&mut *queue)
    };

    info!("Connected to {}", inner.config.url);
    if !backlog.is_empty() {
        debug!("Flushing {} queued frames", backlog.len());
    }
    for frame in backlog {
        if let Err(err) = transport.send(&frame).await {
            warn!("Failed to flush queued frame: {}", err);
            inner.on_error.emit(&SyncError::Transport(err.to_string()));
        }
    }
    inner.on_open.emit(&());

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Send(frame)) => {
                    if let Err(err) = transport.send(&frame).await {
                        warn!("Send failed: {}", err);
                        inner.on_error.emit(&SyncError::Transport(err.to_string()));
                    }
                }
                Some(Command::Close(frame)) => {
                    if let Err(err) = transport.close(Some(frame)).await {
                        debug!("Close handshake failed: {}", err);
                    }
                    return;
                }
                None => {
                    let _ = transport.close(None).await;
                    return;
                }
            },
            frame = transport.recv() => match frame {
                Ok(Some(text)) => {
                    if inner.is_current(generation) {
                        inner.dispatch(&text);
                    }
                }
                Ok(None) => {
                    info!("Server closed connection");
                    inner.closed(generation, DisconnectReason::ServerClosed);
                    return;
                }
                Err(err) => {
                    if inner.is_current(generation) {
                        warn!("WebSocket error: {}", err);
                        inner.on_error.emit(&SyncError::Transport(err.to_string()));
                    }
                    inner.closed(generation, DisconnectReason::NetworkError(err.to_string()));
                    return;
                }
            },
        }
    }
}
