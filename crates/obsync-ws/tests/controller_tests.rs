//! Sync controller tests: subscribe on open, market switching, stale frames,
//! checksum resync and teardown order

mod common;

use common::*;
use obsync_types::{MessageKind, SpreadOption};
use obsync_ws::{
    BookView, MarketSelection, SyncConfig, SyncController, STOP_REASON,
};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

struct Harness {
    controller: SyncController,
    selection: MarketSelection,
    server: obsync_ws::MockServer,
    views: Arc<Mutex<Vec<BookView>>>,
}

impl Harness {
    fn subscribes(&self) -> Vec<serde_json::Value> {
        parsed(&self.server.sent())
            .into_iter()
            .filter(|frame| frame["method"] == "subscribe")
            .collect()
    }

    fn last_view(&self) -> BookView {
        self.views.lock().last().cloned().unwrap_or_else(|| self.controller.view())
    }
}

async fn started(selected: &str, config: SyncConfig) -> Harness {
    let (stream, server) = mock_stream();
    let selection = MarketSelection::new(selected);
    let controller = SyncController::new(stream, selection.clone(), config);

    let views = Arc::new(Mutex::new(Vec::new()));
    let sink = views.clone();
    let _handle = controller.subscribe(move |view| sink.lock().push(view.clone()));

    controller.start().unwrap();
    wait_until("connected", || controller.subscription().is_connected).await;

    Harness {
        controller,
        selection,
        server,
        views,
    }
}

#[tokio::test]
async fn test_open_subscribes_to_selected_market() {
    let h = started("3", SyncConfig::default()).await;

    wait_until("subscribe", || h.subscribes().len() == 1).await;
    assert_eq!(h.subscribes(), vec![subscribe_request(3)]);
    assert!(h.last_view().subscription.is_connected);
}

#[tokio::test]
async fn test_unusable_selection_uses_fallback() {
    let h = started("", SyncConfig::default().with_fallback_market(9)).await;

    wait_until("subscribe", || h.subscribes().len() == 1).await;
    assert_eq!(h.subscribes(), vec![subscribe_request(9)]);
    assert_eq!(h.controller.subscription().active_market_id, 9);
}

#[tokio::test]
async fn test_snapshot_then_update() {
    let h = started("1", SyncConfig::default()).await;

    h.server.push_text(snapshot_frame(1, &[(100, 10), (99, 5)], &[(101, 5)], None));
    wait_until("snapshot", || h.controller.subscription().is_initialized).await;

    h.server.push_text(update_frame(1, Some(&[(100, 0), (98, 1)]), None, None));
    wait_until("update", || h.controller.stats().updates == 1).await;

    let view = h.controller.view();
    let bids: Vec<String> = view.top.bids.iter().map(|l| l.price.to_string()).collect();
    assert_eq!(bids, vec!["99", "98"]);
    assert_eq!(view.top.asks.len(), 1);
    assert_eq!(view.subscription.last_message_kind, MessageKind::Update);
    assert_eq!(view.timestamp, "1734784104213018");
}

#[tokio::test]
async fn test_update_before_snapshot_is_dropped() {
    let h = started("1", SyncConfig::default()).await;

    h.server.push_text(update_frame(1, Some(&[(100, 5)]), None, None));
    wait_until("gap", || h.controller.stats().gap_deltas == 1).await;

    assert!(h.controller.book().is_none());
    assert!(!h.controller.subscription().is_initialized);
}

#[tokio::test]
async fn test_market_switch_resets_and_subscribes_once() {
    let h = started("1", SyncConfig::default()).await;
    wait_until("subscribe", || h.subscribes().len() == 1).await;

    h.server.push_text(snapshot_frame(1, &[(100, 10)], &[(101, 5)], None));
    wait_until("snapshot", || h.controller.subscription().is_initialized).await;

    h.selection.set("2");

    let view = h.controller.view();
    assert!(!view.subscription.is_initialized);
    assert!(view.top.bids.is_empty());
    assert!(view.top.asks.is_empty());
    assert!(h.controller.book().is_none());
    assert_eq!(view.subscription.active_market_id, 2);

    settle().await;
    assert_eq!(h.subscribes(), vec![subscribe_request(1), subscribe_request(2)]);
}

#[tokio::test]
async fn test_stale_frames_after_switch_change_nothing() {
    let h = started("1", SyncConfig::default()).await;
    h.selection.set("2");

    h.server.push_text(snapshot_frame(2, &[(200, 1)], &[(201, 1)], None));
    wait_until("snapshot", || h.controller.subscription().is_initialized).await;
    let before = h.controller.view();

    // In-flight frames for the old market
    h.server.push_text(snapshot_frame(1, &[(100, 10)], &[(101, 5)], None));
    h.server.push_text(update_frame(1, Some(&[(200, 0)]), None, None));
    wait_until("stale", || h.controller.stats().stale_frames == 2).await;

    let after = h.controller.view();
    assert_eq!(after.top, before.top);
    assert_eq!(after.subscription, before.subscription);
}

#[tokio::test]
async fn test_checksum_mismatch_resubscribes_and_keeps_book() {
    let h = started("1", SyncConfig::default()).await;
    wait_until("subscribe", || h.subscribes().len() == 1).await;

    let (bids, asks) = deep_book();
    let good = checksum_of(&bids, &asks);

    h.server.push_text(snapshot_frame(1, &bids, &asks, Some(json!(good))));
    wait_until("snapshot", || h.controller.stats().snapshots == 1).await;
    assert!(h.controller.view().last_checksum.unwrap().is_valid());
    assert_eq!(h.subscribes().len(), 1);

    // Same book, wrong checksum, sent as a hex string
    h.server.push_text(update_frame(1, Some(&[]), None, Some(json!(format!("0x{:x}", good ^ 0xff)))));
    wait_until("mismatch", || h.controller.stats().checksum_mismatches == 1).await;
    wait_until("resubscribe", || h.subscribes().len() == 2).await;

    assert_eq!(h.subscribes()[1], subscribe_request(1));
    assert_eq!(h.controller.book().unwrap().bids.len(), 10);
    assert!(!h.last_view().last_checksum.unwrap().is_valid());
}

#[tokio::test]
async fn test_checksum_accepts_signed_and_hex_forms() {
    let h = started("1", SyncConfig::default()).await;

    let (bids, asks) = deep_book();
    let good = checksum_of(&bids, &asks);

    h.server.push_text(snapshot_frame(1, &bids, &asks, Some(json!(good as i32))));
    h.server.push_text(snapshot_frame(1, &bids, &asks, Some(json!(format!("0X{good:X}")))));
    h.server.push_text(snapshot_frame(1, &bids, &asks, Some(json!(good.to_string()))));
    wait_until("snapshots", || h.controller.stats().snapshots == 3).await;

    assert_eq!(h.controller.stats().checksum_mismatches, 0);
}

#[tokio::test]
async fn test_shallow_book_never_mismatches() {
    let h = started("1", SyncConfig::default()).await;

    h.server.push_text(snapshot_frame(1, &[(100, 10)], &[(101, 5)], Some(json!(12345))));
    wait_until("snapshot", || h.controller.stats().snapshots == 1).await;

    assert_eq!(h.controller.stats().checksum_mismatches, 0);
    assert!(h.controller.view().last_checksum.is_none());
}

#[tokio::test]
async fn test_parse_error_is_counted_and_dispatch_continues() {
    let h = started("1", SyncConfig::default()).await;

    h.server.push_text("{definitely not json");
    h.server.push_text(snapshot_frame(1, &[(100, 10)], &[(101, 5)], None));
    wait_until("snapshot", || h.controller.stats().snapshots == 1).await;

    assert_eq!(h.controller.stats().parse_errors, 1);
    assert!(h.controller.subscription().is_connected);
}

#[tokio::test]
async fn test_server_close_marks_disconnected_and_reopen_resubscribes() {
    let h = started("1", SyncConfig::default()).await;
    wait_until("subscribe", || h.subscribes().len() == 1).await;

    h.server.push_close();
    wait_until("disconnected", || !h.controller.subscription().is_connected).await;

    h.controller.transport().connect().unwrap();
    wait_until("reconnected", || h.controller.subscription().is_connected).await;
    wait_until("resubscribe", || h.subscribes().len() == 2).await;
    assert_eq!(h.subscribes()[1], subscribe_request(1));
}

#[tokio::test]
async fn test_switch_while_disconnected_subscribes_on_open() {
    let (stream, server) = mock_stream();
    let selection = MarketSelection::new("1");
    let controller = SyncController::new(stream, selection.clone(), SyncConfig::default());
    controller.attach();

    selection.set("4");
    assert_eq!(controller.transport().queued(), 0);

    controller.transport().connect().unwrap();
    wait_until("connected", || controller.subscription().is_connected).await;
    settle().await;

    assert_eq!(parsed(&server.sent()), vec![subscribe_request(4)]);
}

#[tokio::test]
async fn test_spread_and_depth_apply_without_network() {
    let h = started("1", SyncConfig::default()).await;
    h.server.push_text(snapshot_frame(1, &[(129, 1), (121, 2), (95, 4)], &[(131, 1)], None));
    wait_until("snapshot", || h.controller.stats().snapshots == 1).await;
    let sent_before = h.server.sent().len();

    h.controller.set_depth(2);
    assert_eq!(h.controller.view().top.bids.len(), 2);

    h.controller.set_spread(SpreadOption::One);
    assert_eq!(h.controller.view().spread, SpreadOption::One);

    assert_eq!(h.server.sent().len(), sent_before);
}

#[tokio::test]
async fn test_stop_detaches_then_disconnects() {
    let h = started("1", SyncConfig::default()).await;
    h.server.push_text(snapshot_frame(1, &[(100, 10)], &[(101, 5)], None));
    wait_until("snapshot", || h.controller.stats().snapshots == 1).await;

    h.controller.stop();
    assert!(!h.controller.is_attached());
    wait_until("close frame", || !h.server.closes().is_empty()).await;

    let closes = h.server.closes();
    let frame = closes[0].clone().unwrap();
    assert_eq!(frame.code, 1000);
    assert_eq!(frame.reason, STOP_REASON);

    // Selection changes no longer reach the controller
    let sent_before = h.server.sent().len();
    h.selection.set("5");
    settle().await;
    assert_eq!(h.controller.subscription().active_market_id, 1);
    assert_eq!(h.server.sent().len(), sent_before);
    assert!(!h.controller.subscription().is_connected);
}
