//! Integration tests for the order book client
//!
//! Drives the full stack (client, controller, stream transport) against the
//! mock feed.

mod common;

use common::*;
use obsync_sdk::display::format_amount;
use obsync_sdk::{ReconnectConfig, SpreadOption, TransportState};
use std::time::Duration;

#[tokio::test]
async fn test_connect_subscribes_selected_market() {
    let (client, server) = connect(fast_builder().with_market("2")).await;

    wait_until("subscribe", || subscribed_markets(&server) == vec![2]).await;
    assert!(client.is_connected());
    assert_eq!(client.state(), TransportState::Open);
    assert_eq!(client.active_market_id(), 2);

    client.shutdown();
}

#[tokio::test]
async fn test_snapshot_reaches_view_and_events() {
    let (mut client, server) = connect(fast_builder()).await;
    let mut events = client.events().unwrap();
    assert!(client.events().is_none());

    wait_until("connected", || client.is_connected()).await;
    server.push_text(eth_snapshot(1));
    wait_until("snapshot", || client.stats().snapshots == 1).await;

    let bid = client.best_bid().unwrap();
    let ask = client.best_ask().unwrap();
    assert_eq!(format_amount(&bid.price, 2), "2,500");
    assert_eq!(format_amount(&ask.price, 2), "2,501");
    assert_eq!(format_amount(&client.spread().unwrap(), 2), "1");
    assert_eq!(format_amount(&client.mid_price().unwrap(), 2), "2,500.5");

    let (bids, asks) = client.rows();
    assert_eq!(bids[1].cumulative_quantity.to_string(), "3500000000000000000");
    assert_eq!(asks[1].cumulative_quantity.to_string(), "4000000000000000000");
    // 2500 * 1.5 = 3750 quote
    assert_eq!(format_amount(&bids[0].notional, 2), "3,750");

    let mut saw_snapshot = false;
    while let Ok(view) = events.try_recv() {
        saw_snapshot |= view.subscription.is_initialized;
    }
    assert!(saw_snapshot);

    client.shutdown();
}

#[tokio::test]
async fn test_select_market_resubscribes() {
    let (client, server) = connect(fast_builder()).await;
    wait_until("first subscribe", || subscribed_markets(&server) == vec![1]).await;

    server.push_text(eth_snapshot(1));
    wait_until("snapshot", || client.stats().snapshots == 1).await;

    assert!(client.select_market("5"));
    assert!(!client.select_market("5"));
    assert!(client.best_bid().is_none());
    assert_eq!(client.selected_market(), "5");

    wait_until("second subscribe", || subscribed_markets(&server) == vec![1, 5]).await;

    // Late frame for the previous market
    server.push_text(eth_snapshot(1));
    wait_until("stale", || client.stats().stale_frames == 1).await;
    assert!(client.best_bid().is_none());

    client.shutdown();
}

#[tokio::test]
async fn test_spread_option_changes_view_only() {
    let (client, server) = connect(fast_builder()).await;
    wait_until("connected", || client.is_connected()).await;
    server.push_text(eth_snapshot(1));
    wait_until("snapshot", || client.stats().snapshots == 1).await;
    let sent = server.sent().len();

    client.set_spread(SpreadOption::One);
    let view = client.view();
    assert_eq!(view.spread, SpreadOption::One);
    // 2499.5 floors to 2499 in whole-unit buckets
    assert_eq!(view.top.bids.len(), 2);
    assert_eq!(format_amount(&view.top.bids[1].price, 2), "2,499");

    client.set_depth(1);
    assert_eq!(client.view().top.bids.len(), 1);
    assert_eq!(server.sent().len(), sent);

    client.shutdown();
}

#[tokio::test]
async fn test_reconnects_after_server_close() {
    let (client, server) = connect(fast_builder()).await;
    wait_until("first subscribe", || subscribed_markets(&server) == vec![1]).await;

    server.push_close();
    wait_until("reconnected", || server.connections() == 2).await;
    wait_until("resubscribed", || subscribed_markets(&server) == vec![1, 1]).await;
    wait_until("attempts reset", || client.reconnect_attempts() == 0).await;
    assert!(client.is_connected());

    client.shutdown();
}

#[tokio::test]
async fn test_reconnect_retries_failed_connects() {
    let (client, server) = connect(fast_builder()).await;
    wait_until("connected", || client.is_connected()).await;

    server.fail_next_connect("refused");
    server.push_close();

    wait_until("reconnected", || server.connections() == 2).await;
    wait_until("open", || client.is_connected()).await;

    client.shutdown();
}

#[tokio::test]
async fn test_reconnect_gives_up_after_max_attempts() {
    let builder = fast_builder().with_reconnect_config(
        ReconnectConfig::new()
            .with_initial_delay(Duration::from_millis(5))
            .with_jitter(0.0)
            .with_max_attempts(1),
    );
    let (client, server) = connect(builder).await;
    wait_until("connected", || client.is_connected()).await;

    server.fail_next_connect("refused");
    server.push_close();

    wait_until("gave up", || client.reconnect_attempts() == 2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(server.connections(), 1);
    assert_eq!(client.state(), TransportState::Closed);
}

#[tokio::test]
async fn test_without_reconnect_stays_closed() {
    let (client, server) = connect(fast_builder().without_reconnect()).await;
    wait_until("connected", || client.is_connected()).await;

    server.push_close();
    wait_until("closed", || !client.is_connected()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(server.connections(), 1);
    assert_eq!(client.reconnect_attempts(), 0);
}

#[tokio::test]
async fn test_shutdown_closes_once_and_does_not_reconnect() {
    let (client, server) = connect(fast_builder()).await;
    wait_until("connected", || client.is_connected()).await;

    client.shutdown();
    client.shutdown();

    wait_until("close frame", || !server.closes().is_empty()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let closes = server.closes();
    assert_eq!(closes.len(), 1);
    assert_eq!(closes[0].as_ref().unwrap().reason, obsync_ws::STOP_REASON);
    assert_eq!(server.connections(), 1);
    assert!(!client.is_connected());
}
