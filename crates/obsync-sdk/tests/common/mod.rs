//! Common test utilities for SDK integration tests

#![allow(dead_code)]

use obsync_sdk::{OrderBookClient, OrderBookClientBuilder, ReconnectConfig};
use obsync_ws::MockServer;
use serde_json::{json, Value};
use std::time::Duration;

/// Builder pointed at the mock feed with fast, deterministic reconnects
pub fn fast_builder() -> OrderBookClientBuilder {
    OrderBookClient::builder("ws://mock.test").with_reconnect_config(
        ReconnectConfig::new()
            .with_initial_delay(Duration::from_millis(10))
            .with_max_delay(Duration::from_millis(40))
            .with_jitter(0.0),
    )
}

/// Connect a client to a fresh mock server
pub async fn connect(builder: OrderBookClientBuilder) -> (OrderBookClient, MockServer) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let server = MockServer::new();
    let client = builder
        .connect_with_factory(server.factory())
        .await
        .unwrap();
    (client, server)
}

/// Poll `condition` every few milliseconds, panicking after two seconds
pub async fn wait_until<F: Fn() -> bool>(what: &str, condition: F) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}

/// Subscribe frames the client sent, as market ids
pub fn subscribed_markets(server: &MockServer) -> Vec<u64> {
    server
        .sent()
        .iter()
        .filter_map(|frame| serde_json::from_str::<Value>(frame).ok())
        .filter(|frame| frame["method"] == "subscribe")
        .filter_map(|frame| frame["params"]["market_ids"][0].as_u64())
        .collect()
}

/// Snapshot frame with 18-decimal prices
pub fn snapshot(market_id: u64, bids: &[(&str, &str)], asks: &[(&str, &str)]) -> String {
    let levels = |side: &[(&str, &str)]| -> Vec<Value> {
        side.iter()
            .enumerate()
            .map(|(i, (price, quantity))| {
                json!({
                    "price": price,
                    "quantity": quantity,
                    "order_count": 1,
                    "block_number": 7,
                    "log_index": i,
                })
            })
            .collect()
    };

    json!({
        "method": "snapshot",
        "channel": "orderbook",
        "type": "snapshot",
        "market_id": market_id.to_string(),
        "level_count": bids.len() + asks.len(),
        "timestamp": "1734784104113018",
        "data": {
            "market_id": market_id,
            "bids": levels(bids),
            "asks": levels(asks),
        }
    })
    .to_string()
}

/// 2,500.00 / 2,501.00 book with 18-decimal fixed point
pub fn eth_snapshot(market_id: u64) -> String {
    snapshot(
        market_id,
        &[
            ("2500000000000000000000", "1500000000000000000"),
            ("2499500000000000000000", "2000000000000000000"),
        ],
        &[
            ("2501000000000000000000", "1000000000000000000"),
            ("2502000000000000000000", "3000000000000000000"),
        ],
    )
}
