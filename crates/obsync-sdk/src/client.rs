//! High-level order book client

use crate::builder::{ConfigError, OrderBookClientBuilder};
use crate::reconnect::ReconnectConfig;
use obsync_book::{to_rows, BookRow};
use obsync_types::{Amount, PriceLevel, SpreadOption};
use obsync_ws::{
    BookView, CloseEvent, ListenerHandle, MarketSelection, StreamTransport, SyncController,
    SyncStats, TransportError, TransportFactory, TransportState,
};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

/// Receiver of every published [`BookView`]
pub type ViewReceiver = mpsc::UnboundedReceiver<BookView>;

/// Errors from [`OrderBookClientBuilder::connect`]
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Builder validation failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Transport could not start
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Schedules `connect()` after closes the application did not request
struct Reconnector {
    config: ReconnectConfig,
    transport: StreamTransport,
    runtime: Handle,
    attempts: AtomicU32,
    stopped: AtomicBool,
}

impl Reconnector {
    fn on_open(&self) {
        self.attempts.store(0, Ordering::SeqCst);
    }

    fn on_close(self: Arc<Self>, event: &CloseEvent) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }

        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.config.should_reconnect(attempt) {
            error!("Giving up after {} reconnect attempts", attempt - 1);
            return;
        }

        let delay = self.config.delay_with_jitter(attempt);
        info!(
            "Stream closed ({:?}), reconnect attempt {} in {:?}",
            event.reason, attempt, delay
        );

        let runtime = self.runtime.clone();
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if self.stopped.load(Ordering::SeqCst) {
                return;
            }
            if let Err(e) = self.transport.connect() {
                warn!("Reconnect failed to start: {}", e);
            }
        });
    }
}

/// High-level client for one order book feed
///
/// Owns the transport, the sync controller and the market selection.
///
/// # Example
///
/// ```no_run
/// use obsync_sdk::prelude::*;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut client = OrderBookClient::builder("ws://localhost:3001/ws")
///         .with_market("1")
///         .with_depth(10)
///         .connect()
///         .await?;
///
///     let mut views = client.events().unwrap();
///     while let Some(view) = views.recv().await {
///         if let Some(spread) = view.top.spread() {
///             println!("spread {}", spread);
///         }
///     }
///     Ok(())
/// }
/// ```
pub struct OrderBookClient {
    controller: SyncController,
    reconnector: Option<Arc<Reconnector>>,
    handles: Vec<ListenerHandle>,
    event_rx: Option<ViewReceiver>,
}

impl OrderBookClient {
    /// Create a new client builder
    pub fn builder(url: impl Into<String>) -> OrderBookClientBuilder {
        OrderBookClientBuilder::new(url)
    }

    /// Transport state
    pub fn state(&self) -> TransportState {
        self.controller.transport().state()
    }

    /// Check if the stream is open
    pub fn is_connected(&self) -> bool {
        self.controller.subscription().is_connected
    }

    /// Switch to another market
    ///
    /// Returns false if the market was already selected.
    pub fn select_market(&self, market_id: impl Into<String>) -> bool {
        self.controller.selection().set(market_id)
    }

    /// Raw selection value
    pub fn selected_market(&self) -> String {
        self.controller.selection().get()
    }

    /// Market actually subscribed to
    pub fn active_market_id(&self) -> u64 {
        self.controller.subscription().active_market_id
    }

    /// Current view
    pub fn view(&self) -> BookView {
        self.controller.view()
    }

    /// Listen for view changes
    pub fn subscribe<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&BookView) + Send + Sync + 'static,
    {
        self.controller.subscribe(listener)
    }

    /// Take the view receiver (can only be called once)
    pub fn events(&mut self) -> Option<ViewReceiver> {
        self.event_rx.take()
    }

    /// Change display aggregation
    pub fn set_spread(&self, spread: SpreadOption) {
        self.controller.set_spread(spread);
    }

    /// Change display depth
    pub fn set_depth(&self, depth: usize) {
        self.controller.set_depth(depth);
    }

    /// Best bid in the current view
    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.view().top.best_bid().cloned()
    }

    /// Best ask in the current view
    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.view().top.best_ask().cloned()
    }

    /// Ask minus bid, if the book is not crossed
    pub fn spread(&self) -> Option<Amount> {
        self.view().top.spread()
    }

    /// Mid price
    pub fn mid_price(&self) -> Option<Amount> {
        self.view().top.mid_price()
    }

    /// Display rows (bids, asks) with running totals
    pub fn rows(&self) -> (Vec<BookRow>, Vec<BookRow>) {
        let view = self.view();
        (to_rows(&view.top.bids), to_rows(&view.top.asks))
    }

    /// Counters
    pub fn stats(&self) -> SyncStats {
        self.controller.stats()
    }

    /// Reconnect attempts since the last successful open
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnector
            .as_ref()
            .map(|r| r.attempts.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// The underlying controller
    pub fn controller(&self) -> &SyncController {
        &self.controller
    }

    /// Stop reconnecting, then stop the controller
    ///
    /// Safe to call more than once.
    #[instrument(skip(self))]
    pub fn shutdown(&self) {
        if let Some(reconnector) = &self.reconnector {
            reconnector.stopped.store(true, Ordering::SeqCst);
        }
        for handle in &self.handles {
            handle.unsubscribe();
        }
        if self.controller.is_attached() {
            self.controller.stop();
            info!("Order book client shut down");
        }
    }
}

impl std::fmt::Debug for OrderBookClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBookClient")
            .field("state", &self.state())
            .field("selected_market", &self.selected_market())
            .field("reconnect", &self.reconnector.is_some())
            .finish()
    }
}

impl OrderBookClientBuilder {
    /// Validate, connect to the feed and return a client
    #[instrument(skip(self), fields(url = %self.url, market = %self.market_id))]
    pub async fn connect(self) -> Result<OrderBookClient, ClientError> {
        self.validate()?;
        let transport = StreamTransport::new(self.to_stream_config());
        self.start(transport)
    }

    /// Like [`connect`](Self::connect) but with a custom transport factory
    pub async fn connect_with_factory(
        self,
        factory: TransportFactory,
    ) -> Result<OrderBookClient, ClientError> {
        self.validate()?;
        let transport = StreamTransport::with_factory(self.to_stream_config(), factory);
        self.start(transport)
    }

    fn start(self, transport: StreamTransport) -> Result<OrderBookClient, ClientError> {
        let selection = MarketSelection::new(self.market_id.clone());
        let controller = SyncController::new(transport.clone(), selection, self.to_sync_config());

        let mut handles = Vec::new();

        let (tx, rx) = mpsc::unbounded_channel();
        handles.push(controller.subscribe(move |view| {
            let _ = tx.send(view.clone());
        }));

        let policy = self.effective_reconnect();
        let reconnector = if policy.is_enabled() {
            let reconnector = Arc::new(Reconnector {
                config: policy,
                transport: transport.clone(),
                runtime: Handle::try_current().map_err(|_| TransportError::NoRuntime)?,
                attempts: AtomicU32::new(0),
                stopped: AtomicBool::new(false),
            });

            let weak: Weak<Reconnector> = Arc::downgrade(&reconnector);
            handles.push(transport.on_close(move |event: &CloseEvent| {
                if let Some(reconnector) = weak.upgrade() {
                    reconnector.on_close(event);
                }
            }));
            let weak = Arc::downgrade(&reconnector);
            handles.push(transport.on_open(move || {
                if let Some(reconnector) = weak.upgrade() {
                    reconnector.on_open();
                }
            }));

            Some(reconnector)
        } else {
            None
        };

        controller.start()?;
        info!("Order book client started for market {}", self.market_id);

        Ok(OrderBookClient {
            controller,
            reconnector,
            handles,
            event_rx: Some(rx),
        })
    }
}
