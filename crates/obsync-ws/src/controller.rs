//! Self-healing order book synchronization
//!
//! [`SyncController`] bridges a [`StreamTransport`] and the pure book engine:
//!
//! - on open it subscribes to the active market
//! - snapshots replace the book, updates patch it, and both are checked
//!   against the server checksum
//! - a checksum mismatch or a market switch re-sends the subscribe request
//!   so the server answers with a fresh snapshot
//!
//! Frames for any market other than the active one are dropped, as are
//! updates that arrive before the first snapshot.

use crate::config::SyncConfig;
use crate::events::CloseEvent;
use crate::listeners::{ListenerHandle, ListenerSet};
use crate::selection::MarketSelection;
use crate::stream::StreamTransport;
use crate::transport::TransportError;

use obsync_book::{
    apply_delta, check_checksum, derive_top_levels, normalize_snapshot, sorted_levels,
    ChecksumResult, NormalizedBookState, TopLevels,
};
use obsync_types::{
    BookMessage, MessageKind, SpreadOption, SubscribeRequest, SyncError, SyncResult, WsMessage,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Close code sent by [`SyncController::stop`]
pub const STOP_CODE: u16 = 1000;

/// Close reason sent by [`SyncController::stop`]
pub const STOP_REASON: &str = "Order book stream stopped";

/// Subscription status for the selected market
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionState {
    /// Raw selection value
    pub selected_market_id: String,
    /// Market actually subscribed to (selection or fallback)
    pub active_market_id: u64,
    /// Socket is open
    pub is_connected: bool,
    /// A snapshot has been applied for the active market
    pub is_initialized: bool,
    /// Kind of the last accepted book message
    pub last_message_kind: MessageKind,
}

/// Counters since the controller was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub snapshots: u64,
    pub updates: u64,
    pub checksum_mismatches: u64,
    pub stale_frames: u64,
    pub gap_deltas: u64,
    pub parse_errors: u64,
}

/// Everything a renderer needs, published after every state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookView {
    /// Subscription status
    pub subscription: SubscriptionState,
    /// Display levels (truncated and aggregated)
    pub top: TopLevels,
    /// Aggregation in effect
    pub spread: SpreadOption,
    /// Depth in effect
    pub depth: usize,
    /// Timestamp of the last applied message (integer microseconds)
    pub timestamp: String,
    /// Server-reported level count of the last applied message
    pub level_count: u64,
    /// Outcome of the last checksum comparison, if one was possible
    pub last_checksum: Option<ChecksumResult>,
    /// Counters
    pub stats: SyncStats,
}

struct SyncState {
    subscription: SubscriptionState,
    book: Option<Arc<NormalizedBookState>>,
    top: TopLevels,
    spread: SpreadOption,
    depth: usize,
    last_checksum: Option<ChecksumResult>,
    stats: SyncStats,
}

impl SyncState {
    fn view(&self) -> BookView {
        let (timestamp, level_count) = match &self.book {
            Some(book) => (book.timestamp.clone(), book.level_count),
            None => (String::new(), 0),
        };
        BookView {
            subscription: self.subscription.clone(),
            top: self.top.clone(),
            spread: self.spread,
            depth: self.depth,
            timestamp,
            level_count,
            last_checksum: self.last_checksum,
            stats: self.stats,
        }
    }

    fn recompute(&mut self) {
        self.top = match &self.book {
            Some(book) => derive_top_levels(book, self.depth, self.spread),
            None => TopLevels::default(),
        };
    }

    fn reset_book(&mut self) {
        self.book = None;
        self.top = TopLevels::default();
        self.last_checksum = None;
        self.subscription.is_initialized = false;
        self.subscription.last_message_kind = MessageKind::None;
    }
}

struct ControllerInner {
    config: SyncConfig,
    transport: StreamTransport,
    selection: MarketSelection,
    state: Mutex<SyncState>,
    listeners: Arc<ListenerSet<BookView>>,
    attachments: Mutex<Vec<ListenerHandle>>,
}

impl ControllerInner {
    fn publish(&self) {
        let view = self.state.lock().view();
        self.listeners.emit(&view);
    }

    fn send_subscribe(&self, market_id: u64) {
        debug!("Subscribing to market {}", market_id);
        if let Err(err) = self.transport.send(&SubscribeRequest::market(market_id)) {
            warn!("Failed to encode subscribe request: {}", err);
        }
    }

    fn handle_open(&self) {
        let selected = self.selection.get();
        let market_id = self.config.resolve_market_id(&selected);
        {
            let mut state = self.state.lock();
            if state.subscription.active_market_id != market_id {
                state.reset_book();
            }
            state.subscription.selected_market_id = selected;
            state.subscription.active_market_id = market_id;
            state.subscription.is_connected = true;
        }
        info!("Stream open, subscribing to market {}", market_id);
        self.send_subscribe(market_id);
        self.publish();
    }

    fn handle_close(&self, event: &CloseEvent) {
        info!("Stream closed: {:?}", event.reason);
        self.state.lock().subscription.is_connected = false;
        self.publish();
    }

    fn handle_error(&self, error: &SyncError) {
        match error {
            SyncError::Transport(_) => {
                self.state.lock().subscription.is_connected = false;
                self.publish();
            }
            SyncError::Parse { .. } => {
                self.state.lock().stats.parse_errors += 1;
            }
            other => debug!("Ignoring stream error: {}", other),
        }
    }

    fn handle_selection(&self, selected: &str) {
        let market_id = self.config.resolve_market_id(selected);
        {
            let mut state = self.state.lock();
            state.reset_book();
            state.subscription.selected_market_id = selected.to_string();
            state.subscription.active_market_id = market_id;
        }
        info!("Market switched to {}", market_id);
        // While not open, the open handler subscribes to the new market
        if self.transport.is_open() {
            self.send_subscribe(market_id);
        }
        self.publish();
    }

    fn handle_message(&self, message: &WsMessage) {
        match message {
            WsMessage::Book(book) => {
                // Dropped frames are logged inside; nothing else to do
                let _ = self.process(book);
            }
            WsMessage::Method(response) => {
                if response.success == Some(false) {
                    warn!(
                        "{} rejected: {}",
                        response.method,
                        response.error.as_deref().unwrap_or("no reason given")
                    );
                } else {
                    debug!("{} acknowledged", response.method);
                }
            }
            WsMessage::Unknown(value) => debug!("Unknown message: {}", value),
        }
    }

    fn process(&self, message: &BookMessage) -> SyncResult<MessageKind> {
        let mismatch = {
            let mut state = self.state.lock();
            let active = state.subscription.active_market_id;

            if message.market_id().parse::<u64>().ok() != Some(active) {
                state.stats.stale_frames += 1;
                debug!(
                    "Dropping {} for market {} (active {})",
                    message.kind(),
                    message.market_id(),
                    active
                );
                return Err(SyncError::StaleMarketFrame {
                    selected: active.to_string(),
                    received: message.market_id().to_string(),
                });
            }

            let next = match message {
                BookMessage::Snapshot(snapshot) => {
                    state.stats.snapshots += 1;
                    state.subscription.is_initialized = true;
                    normalize_snapshot(snapshot)
                }
                BookMessage::Update(update) => {
                    let Some(book) = state.book.clone() else {
                        state.stats.gap_deltas += 1;
                        debug!("Dropping update for market {} before snapshot", active);
                        return Err(SyncError::ProtocolGap {
                            market_id: message.market_id().to_string(),
                        });
                    };
                    state.stats.updates += 1;
                    apply_delta(&book, update)
                }
            };

            let raw = sorted_levels(&next, self.config.checksum_depth);
            let result = check_checksum(
                &raw.bids,
                &raw.asks,
                message.checksum(),
                self.config.checksum_depth,
            );

            state.book = Some(Arc::new(next));
            state.subscription.last_message_kind = message.kind();
            state.last_checksum = result;
            state.recompute();

            match result {
                Some(result) if !result.is_valid() => {
                    state.stats.checksum_mismatches += 1;
                    Some(result)
                }
                _ => None,
            }
        };

        if let Some(result) = mismatch {
            warn!(
                "Checksum mismatch for market {}: expected {}, computed {}",
                message.market_id(),
                result.expected,
                result.computed
            );
            // Keep the diverged book on screen until the fresh snapshot lands
            let market_id = self.state.lock().subscription.active_market_id;
            self.send_subscribe(market_id);
            self.publish();
            return Err(SyncError::checksum_mismatch(
                message.market_id(),
                result.expected,
                result.computed,
            ));
        }

        self.publish();
        Ok(message.kind())
    }
}

/// Order book sync controller for one stream and one selected market
///
/// Cloning is cheap; clones share state.
#[derive(Clone)]
pub struct SyncController {
    inner: Arc<ControllerInner>,
}

impl fmt::Debug for SyncController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncController")
            .field("subscription", &self.subscription())
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl SyncController {
    /// Create a controller. Nothing is registered until [`attach`](Self::attach).
    pub fn new(transport: StreamTransport, selection: MarketSelection, config: SyncConfig) -> Self {
        let selected = selection.get();
        let subscription = SubscriptionState {
            active_market_id: config.resolve_market_id(&selected),
            selected_market_id: selected,
            ..Default::default()
        };
        let state = SyncState {
            subscription,
            book: None,
            top: TopLevels::default(),
            spread: config.spread,
            depth: config.display_depth,
            last_checksum: None,
            stats: SyncStats::default(),
        };

        Self {
            inner: Arc::new(ControllerInner {
                config,
                transport,
                selection,
                state: Mutex::new(state),
                listeners: Arc::new(ListenerSet::new()),
                attachments: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Register with the transport and the selection cell
    ///
    /// Idempotent. If the transport is already open this subscribes at once.
    pub fn attach(&self) {
        let mut attachments = self.inner.attachments.lock();
        if !attachments.is_empty() {
            return;
        }

        let transport = &self.inner.transport;
        let weak = Arc::downgrade(&self.inner);

        attachments.push(transport.on_message(with_inner(&weak, |inner, message: &WsMessage| {
            inner.handle_message(message)
        })));
        attachments.push(transport.on_close(with_inner(&weak, |inner, event: &CloseEvent| {
            inner.handle_close(event)
        })));
        attachments.push(transport.on_error(with_inner(&weak, |inner, error: &SyncError| {
            inner.handle_error(error)
        })));
        attachments.push(self.inner.selection.on_change(with_inner(&weak, |inner, selected: &String| {
            inner.handle_selection(selected)
        })));

        // Last, because it fires immediately when already open
        let open = weak.clone();
        drop(attachments);
        let handle = transport.on_open(move || {
            if let Some(inner) = open.upgrade() {
                inner.handle_open();
            }
        });
        self.inner.attachments.lock().push(handle);
    }

    /// Attach and connect the transport
    pub fn start(&self) -> Result<(), TransportError> {
        self.attach();
        self.inner.transport.connect()
    }

    /// Detach every listener, then close the stream with 1000 "Order book stream stopped"
    ///
    /// Detaching first guarantees no resubscribe can fire during teardown.
    pub fn stop(&self) {
        let attachments = std::mem::take(&mut *self.inner.attachments.lock());
        for handle in &attachments {
            handle.unsubscribe();
        }
        self.inner.transport.disconnect(STOP_CODE, STOP_REASON);
        self.inner.state.lock().subscription.is_connected = false;
        self.inner.publish();
    }

    /// True between `attach` and `stop`
    pub fn is_attached(&self) -> bool {
        !self.inner.attachments.lock().is_empty()
    }

    /// Listen for view changes
    pub fn subscribe<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&BookView) + Send + Sync + 'static,
    {
        ListenerSet::subscribe(&self.inner.listeners, listener)
    }

    /// Apply a book message directly, bypassing the transport
    ///
    /// Returns the message kind on success; drops surface as
    /// [`SyncError::StaleMarketFrame`] or [`SyncError::ProtocolGap`] and a
    /// failed checksum as [`SyncError::ChecksumMismatch`] after the
    /// resubscribe has been issued.
    pub fn process(&self, message: &BookMessage) -> SyncResult<MessageKind> {
        self.inner.process(message)
    }

    /// Change display aggregation; recomputes from the current book
    pub fn set_spread(&self, spread: SpreadOption) {
        {
            let mut state = self.inner.state.lock();
            state.spread = spread;
            state.recompute();
        }
        self.inner.publish();
    }

    /// Change display depth; recomputes from the current book
    pub fn set_depth(&self, depth: usize) {
        {
            let mut state = self.inner.state.lock();
            state.depth = depth.max(1);
            state.recompute();
        }
        self.inner.publish();
    }

    /// Current view
    pub fn view(&self) -> BookView {
        self.inner.state.lock().view()
    }

    /// Current subscription status
    pub fn subscription(&self) -> SubscriptionState {
        self.inner.state.lock().subscription.clone()
    }

    /// Counters
    pub fn stats(&self) -> SyncStats {
        self.inner.state.lock().stats
    }

    /// Current normalized book, if a snapshot has been applied
    ///
    /// The returned state is immutable; later messages produce new values.
    pub fn book(&self) -> Option<Arc<NormalizedBookState>> {
        self.inner.state.lock().book.clone()
    }

    /// The transport this controller drives
    pub fn transport(&self) -> &StreamTransport {
        &self.inner.transport
    }

    /// The selection this controller follows
    pub fn selection(&self) -> &MarketSelection {
        &self.inner.selection
    }

    /// Sync configuration
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }
}

fn with_inner<T: ?Sized + 'static, F>(
    weak: &Weak<ControllerInner>,
    handler: F,
) -> impl Fn(&T) + Send + Sync + 'static
where
    F: Fn(&ControllerInner, &T) + Send + Sync + 'static,
{
    let weak = weak.clone();
    move |event: &T| {
        if let Some(inner) = weak.upgrade() {
            handler(&inner, event);
        }
    }
}
