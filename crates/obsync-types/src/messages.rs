//! Request and response message types for the order book WebSocket feed

use crate::{Channel, MessageKind, RawLevel};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Request Types
// ============================================================================

/// Which markets a subscribe request targets
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MarketFilter {
    /// Every market the server publishes (no `market_ids` on the wire)
    #[default]
    All,
    /// Exactly these markets (may be empty)
    Markets(Vec<u64>),
}

impl MarketFilter {
    /// Filter for a single market
    pub fn single(market_id: u64) -> Self {
        Self::Markets(vec![market_id])
    }

    /// True for the unfiltered variant
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl Serialize for MarketFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::All => serializer.serialize_none(),
            Self::Markets(ids) => ids.serialize(serializer),
        }
    }
}

/// Subscribe request message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscribeRequest {
    /// Always "subscribe"
    pub method: &'static str,
    /// Subscription parameters
    pub params: SubscribeParams,
}

impl SubscribeRequest {
    /// Create a new orderbook subscribe request
    pub fn orderbook(market_ids: MarketFilter) -> Self {
        Self {
            method: "subscribe",
            params: SubscribeParams {
                channel: Channel::Orderbook,
                market_ids,
            },
        }
    }

    /// Subscribe request for a single market
    pub fn market(market_id: u64) -> Self {
        Self::orderbook(MarketFilter::single(market_id))
    }
}

/// Subscription parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscribeParams {
    /// Channel to subscribe to
    pub channel: Channel,
    /// Target markets
    #[serde(skip_serializing_if = "MarketFilter::is_all")]
    pub market_ids: MarketFilter,
}

// ============================================================================
// Checksum Values
// ============================================================================

/// Error for a checksum that cannot be represented as an unsigned 32-bit CRC
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid checksum value {0:?}")]
pub struct ChecksumParseError(pub String);

/// Server-supplied CRC-32, normalized to its unsigned form
///
/// The feed may carry the checksum as a JSON integer (signed or unsigned), a
/// decimal string or a `0x`-prefixed hexadecimal string. All of them normalize
/// to the same `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChecksumValue(pub u32);

impl ChecksumValue {
    /// The normalized unsigned value
    pub fn get(&self) -> u32 {
        self.0
    }

    /// Normalize a signed or unsigned integer into the CRC range
    pub fn from_i128(value: i128) -> Result<Self, ChecksumParseError> {
        const TWO_32: i128 = 1 << 32;
        if (0..TWO_32).contains(&value) {
            Ok(Self(value as u32))
        } else if (i32::MIN as i128..0).contains(&value) {
            Ok(Self((value + TWO_32) as u32))
        } else {
            Err(ChecksumParseError(value.to_string()))
        }
    }

    /// Parse the string forms: decimal (optionally negative) or `0x` hex
    pub fn parse_str(s: &str) -> Result<Self, ChecksumParseError> {
        let trimmed = s.trim();
        let err = || ChecksumParseError(s.to_string());

        if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            return u32::from_str_radix(hex, 16).map(Self).map_err(|_| err());
        }

        let value: i128 = trimmed.parse().map_err(|_| err())?;
        Self::from_i128(value)
    }
}

impl fmt::Display for ChecksumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ChecksumValue {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for ChecksumValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Signed(i64),
            Unsigned(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Signed(n) => ChecksumValue::from_i128(n as i128).map_err(D::Error::custom),
            Repr::Unsigned(n) => ChecksumValue::from_i128(n as i128).map_err(D::Error::custom),
            Repr::Text(s) => ChecksumValue::parse_str(&s).map_err(D::Error::custom),
        }
    }
}

impl Serialize for ChecksumValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

// ============================================================================
// Channel Data Types
// ============================================================================

/// Market ids arrive as strings on the envelope, but tolerate bare integers
fn deserialize_market_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(u64),
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}

/// Snapshot payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotData {
    /// Numeric market id
    #[serde(default)]
    pub market_id: u64,
    /// Bid levels, in any order
    #[serde(default)]
    pub bids: Vec<RawLevel>,
    /// Ask levels, in any order
    #[serde(default)]
    pub asks: Vec<RawLevel>,
}

/// Update payload; absent sides are left untouched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateData {
    /// Numeric market id
    #[serde(default)]
    pub market_id: u64,
    /// Changed bid levels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bids: Option<Vec<RawLevel>>,
    /// Changed ask levels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asks: Option<Vec<RawLevel>>,
}

/// Full book snapshot message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMessage {
    /// "snapshot"
    #[serde(default)]
    pub method: String,
    /// Always the orderbook channel
    pub channel: Channel,
    /// Market the snapshot belongs to
    #[serde(deserialize_with = "deserialize_market_id")]
    pub market_id: String,
    /// Server-side level count
    #[serde(default)]
    pub level_count: u64,
    /// Integer microseconds
    #[serde(default)]
    pub timestamp: String,
    /// Expected CRC-32 over the top levels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<ChecksumValue>,
    /// Levels
    pub data: SnapshotData,
}

impl SnapshotMessage {
    /// Build a snapshot message (fixtures and tests)
    pub fn new(market_id: impl Into<String>, bids: Vec<RawLevel>, asks: Vec<RawLevel>) -> Self {
        let market_id = market_id.into();
        let numeric_id = market_id.parse().unwrap_or_default();
        let level_count = (bids.len() + asks.len()) as u64;
        Self {
            method: "snapshot".to_string(),
            channel: Channel::Orderbook,
            market_id,
            level_count,
            timestamp: String::new(),
            checksum: None,
            data: SnapshotData {
                market_id: numeric_id,
                bids,
                asks,
            },
        }
    }

    /// Attach an expected checksum
    pub fn with_checksum(mut self, checksum: u32) -> Self {
        self.checksum = Some(ChecksumValue(checksum));
        self
    }

    /// Attach a timestamp (integer microseconds)
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }
}

/// Incremental update message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMessage {
    /// "update" (or "delta")
    #[serde(default)]
    pub method: String,
    /// Always the orderbook channel
    pub channel: Channel,
    /// Market the update belongs to
    #[serde(deserialize_with = "deserialize_market_id")]
    pub market_id: String,
    /// Server-side level count
    #[serde(default)]
    pub level_count: u64,
    /// Integer microseconds
    #[serde(default)]
    pub timestamp: String,
    /// Expected CRC-32 over the top levels after applying this update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<ChecksumValue>,
    /// Changed levels
    pub data: UpdateData,
}

impl UpdateMessage {
    /// Build an update message (fixtures and tests)
    pub fn new(
        market_id: impl Into<String>,
        bids: Option<Vec<RawLevel>>,
        asks: Option<Vec<RawLevel>>,
    ) -> Self {
        let market_id = market_id.into();
        let numeric_id = market_id.parse().unwrap_or_default();
        Self {
            method: "update".to_string(),
            channel: Channel::Orderbook,
            market_id,
            level_count: 0,
            timestamp: String::new(),
            checksum: None,
            data: UpdateData {
                market_id: numeric_id,
                bids,
                asks,
            },
        }
    }

    /// Attach an expected checksum
    pub fn with_checksum(mut self, checksum: u32) -> Self {
        self.checksum = Some(ChecksumValue(checksum));
        self
    }

    /// Attach a timestamp (integer microseconds)
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }
}

/// Orderbook channel message, discriminated by its `type` field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BookMessage {
    /// Full replacement
    Snapshot(SnapshotMessage),
    /// Incremental patch
    #[serde(alias = "delta")]
    Update(UpdateMessage),
}

impl BookMessage {
    /// Market id from the envelope
    pub fn market_id(&self) -> &str {
        match self {
            Self::Snapshot(msg) => &msg.market_id,
            Self::Update(msg) => &msg.market_id,
        }
    }

    /// Message kind
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Snapshot(_) => MessageKind::Snapshot,
            Self::Update(_) => MessageKind::Update,
        }
    }

    /// Expected checksum, if the server sent one
    pub fn checksum(&self) -> Option<u32> {
        match self {
            Self::Snapshot(msg) => msg.checksum.map(|c| c.get()),
            Self::Update(msg) => msg.checksum.map(|c| c.get()),
        }
    }

    /// Timestamp (integer microseconds)
    pub fn timestamp(&self) -> &str {
        match self {
            Self::Snapshot(msg) => &msg.timestamp,
            Self::Update(msg) => &msg.timestamp,
        }
    }
}

/// Response to a subscribe request, or any other method reply
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MethodResponse {
    /// Method name
    pub method: String,
    /// Whether the operation succeeded
    #[serde(default)]
    pub success: Option<bool>,
    /// Error message if failed
    #[serde(default)]
    pub error: Option<String>,
}

/// Parsed WebSocket message
#[derive(Debug, Clone)]
pub enum WsMessage {
    /// Orderbook snapshot or update
    Book(BookMessage),
    /// Method response (subscribe acknowledgements and errors)
    Method(MethodResponse),
    /// Anything else; kept for logging
    Unknown(serde_json::Value),
}

impl WsMessage {
    /// Parse a JSON text frame
    ///
    /// Frames on the orderbook channel must deserialize into a [`BookMessage`];
    /// a malformed book frame is an error, not an `Unknown`.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(json)?;

        let channel = value.get("channel").and_then(|v| v.as_str());
        if channel == Some(Channel::Orderbook.as_str()) && value.get("type").is_some() {
            let msg: BookMessage = serde_json::from_value(value)?;
            return Ok(Self::Book(msg));
        }

        if value.get("method").and_then(|v| v.as_str()).is_some() && value.get("data").is_none() {
            let response: MethodResponse = serde_json::from_value(value)?;
            return Ok(Self::Method(response));
        }

        Ok(Self::Unknown(value))
    }

    /// Check if this is a book snapshot
    pub fn is_book_snapshot(&self) -> bool {
        matches!(self, Self::Book(BookMessage::Snapshot(_)))
    }

    /// Check if this is a book update
    pub fn is_book_update(&self) -> bool {
        matches!(self, Self::Book(BookMessage::Update(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "method": "snapshot",
        "channel": "orderbook",
        "type": "snapshot",
        "market_id": "1",
        "level_count": 2,
        "timestamp": "1734784104113018",
        "checksum": 1910706556,
        "data": {
            "market_id": 1,
            "bids": [{"price": "100", "quantity": "10", "order_count": 1, "block_number": 5, "log_index": 0}],
            "asks": [{"price": "101", "quantity": "5", "order_count": 2, "block_number": 5, "log_index": 1}]
        }
    }"#;

    #[test]
    fn test_subscribe_request_single_market() {
        let json = serde_json::to_string(&SubscribeRequest::market(7)).unwrap();
        assert_eq!(
            json,
            r#"{"method":"subscribe","params":{"channel":"orderbook","market_ids":[7]}}"#
        );
    }

    #[test]
    fn test_subscribe_request_all_markets_omits_ids() {
        let json = serde_json::to_string(&SubscribeRequest::orderbook(MarketFilter::All)).unwrap();
        assert_eq!(json, r#"{"method":"subscribe","params":{"channel":"orderbook"}}"#);
    }

    #[test]
    fn test_subscribe_request_empty_list_is_explicit() {
        let req = SubscribeRequest::orderbook(MarketFilter::Markets(vec![]));
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""market_ids":[]"#));
    }

    #[test]
    fn test_parse_snapshot() {
        let msg = WsMessage::parse(SNAPSHOT).unwrap();
        assert!(msg.is_book_snapshot());

        let WsMessage::Book(book) = msg else {
            panic!("expected book message");
        };
        assert_eq!(book.market_id(), "1");
        assert_eq!(book.kind(), MessageKind::Snapshot);
        assert_eq!(book.checksum(), Some(1910706556));
        assert_eq!(book.timestamp(), "1734784104113018");
    }

    #[test]
    fn test_parse_update_with_missing_side() {
        let json = r#"{
            "method": "update", "channel": "orderbook", "type": "update",
            "market_id": "1", "level_count": 1, "timestamp": "1",
            "data": {"market_id": 1, "asks": [{"price": "101", "quantity": "0", "order_count": 0, "block_number": 6, "log_index": 0}]}
        }"#;
        let WsMessage::Book(BookMessage::Update(update)) = WsMessage::parse(json).unwrap() else {
            panic!("expected update");
        };
        assert!(update.data.bids.is_none());
        assert_eq!(update.data.asks.as_ref().map(Vec::len), Some(1));
        assert!(update.checksum.is_none());
    }

    #[test]
    fn test_parse_delta_alias() {
        let json = r#"{"method":"delta","channel":"orderbook","type":"delta","market_id":"3",
                       "level_count":0,"timestamp":"1","data":{"market_id":3}}"#;
        let msg = WsMessage::parse(json).unwrap();
        assert!(msg.is_book_update());
    }

    #[test]
    fn test_malformed_book_frame_is_error() {
        let json = r#"{"channel":"orderbook","type":"snapshot","market_id":"1",
                       "data":{"bids":[{"price":"abc","quantity":"1"}],"asks":[]}}"#;
        assert!(WsMessage::parse(json).is_err());
        assert!(WsMessage::parse("{not json").is_err());
    }

    #[test]
    fn test_parse_method_response_and_unknown() {
        let ack = WsMessage::parse(r#"{"method":"subscribe","success":true}"#).unwrap();
        assert!(matches!(ack, WsMessage::Method(ref r) if r.success == Some(true)));

        let other = WsMessage::parse(r#"{"channel":"heartbeat"}"#).unwrap();
        assert!(matches!(other, WsMessage::Unknown(_)));
    }

    #[test]
    fn test_checksum_forms_normalize_identically() {
        let decimal: ChecksumValue = serde_json::from_str("1910706556").unwrap();
        let text: ChecksumValue = serde_json::from_str(r#""1910706556""#).unwrap();
        let hex: ChecksumValue = serde_json::from_str(r#""0x71E3117C""#).unwrap();
        assert_eq!(decimal.get(), 1910706556);
        assert_eq!(text, decimal);
        assert_eq!(hex, decimal);
    }

    #[test]
    fn test_checksum_signed_form() {
        // -1 is the signed representation of 0xFFFFFFFF
        let signed: ChecksumValue = serde_json::from_str("-1").unwrap();
        assert_eq!(signed.get(), u32::MAX);
        assert!(ChecksumValue::parse_str("4294967296").is_err());
        assert!(ChecksumValue::parse_str("0xZZ").is_err());
    }

    #[test]
    fn test_numeric_market_id_tolerated() {
        let json = r#"{"channel":"orderbook","type":"update","market_id":9,"data":{"market_id":9}}"#;
        let WsMessage::Book(book) = WsMessage::parse(json).unwrap() else {
            panic!("expected book message");
        };
        assert_eq!(book.market_id(), "9");
    }
}
