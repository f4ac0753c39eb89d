//! Common test utilities and fixtures for the stream and controller tests
//!
//! Frames follow the wire format of the orderbook channel.

#![allow(dead_code)]

use obsync_book::compute_checksum;
use obsync_types::PriceLevel;
use obsync_ws::{MockServer, StreamConfig, StreamTransport};
use serde_json::{json, Value};
use std::time::Duration;

/// Subscribe acknowledgement
pub const SUBSCRIBE_ACK: &str = r#"{"method": "subscribe", "success": true}"#;

/// Route engine logs to the test writer; `RUST_LOG=debug` to see them
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Stream backed by a fresh mock server
pub fn mock_stream() -> (StreamTransport, MockServer) {
    init_tracing();
    let server = MockServer::new();
    let stream = StreamTransport::with_factory(StreamConfig::new("ws://mock.test"), server.factory());
    (stream, server)
}

/// Poll `condition` every few milliseconds, panicking after one second
pub async fn wait_until<F: Fn() -> bool>(what: &str, condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}

/// Give the connection task a chance to run
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}

fn level_json(price: u64, quantity: u64, log_index: u64) -> Value {
    json!({
        "price": price.to_string(),
        "quantity": quantity.to_string(),
        "order_count": 1,
        "block_number": 42,
        "log_index": log_index,
    })
}

fn levels_json(levels: &[(u64, u64)]) -> Vec<Value> {
    levels
        .iter()
        .enumerate()
        .map(|(i, (p, q))| level_json(*p, *q, i as u64))
        .collect()
}

/// Snapshot frame
pub fn snapshot_frame(
    market_id: u64,
    bids: &[(u64, u64)],
    asks: &[(u64, u64)],
    checksum: Option<Value>,
) -> String {
    let mut frame = json!({
        "method": "snapshot",
        "channel": "orderbook",
        "type": "snapshot",
        "market_id": market_id.to_string(),
        "level_count": bids.len() + asks.len(),
        "timestamp": "1734784104113018",
        "data": {
            "market_id": market_id,
            "bids": levels_json(bids),
            "asks": levels_json(asks),
        }
    });
    if let Some(checksum) = checksum {
        frame["checksum"] = checksum;
    }
    frame.to_string()
}

/// Update frame; `None` leaves the side out of the payload
pub fn update_frame(
    market_id: u64,
    bids: Option<&[(u64, u64)]>,
    asks: Option<&[(u64, u64)]>,
    checksum: Option<Value>,
) -> String {
    let mut data = json!({ "market_id": market_id });
    if let Some(bids) = bids {
        data["bids"] = Value::Array(levels_json(bids));
    }
    if let Some(asks) = asks {
        data["asks"] = Value::Array(levels_json(asks));
    }
    let mut frame = json!({
        "method": "update",
        "channel": "orderbook",
        "type": "update",
        "market_id": market_id.to_string(),
        "level_count": 0,
        "timestamp": "1734784104213018",
        "data": data,
    });
    if let Some(checksum) = checksum {
        frame["checksum"] = checksum;
    }
    frame.to_string()
}

/// Ten levels per side around 100, deep enough for checksum verification
pub fn deep_book() -> (Vec<(u64, u64)>, Vec<(u64, u64)>) {
    let bids = (0..10).map(|i| (100 - i, 10 + i)).collect();
    let asks = (0..10).map(|i| (101 + i, 5 + i)).collect();
    (bids, asks)
}

/// Checksum the server would send for these levels (already best-first)
pub fn checksum_of(bids: &[(u64, u64)], asks: &[(u64, u64)]) -> u32 {
    let to_levels = |levels: &[(u64, u64)]| -> Vec<PriceLevel> {
        levels
            .iter()
            .map(|(p, q)| PriceLevel::new((*p).into(), (*q).into()))
            .collect()
    };
    compute_checksum(&to_levels(bids), &to_levels(asks), 10)
}

/// Subscribe request as parsed JSON
pub fn subscribe_request(market_id: u64) -> Value {
    json!({"method": "subscribe", "params": {"channel": "orderbook", "market_ids": [market_id]}})
}

/// Parse every captured frame as JSON
pub fn parsed(frames: &[String]) -> Vec<Value> {
    frames
        .iter()
        .map(|f| serde_json::from_str(f).unwrap_or(Value::String(f.clone())))
        .collect()
}
