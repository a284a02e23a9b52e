//! Event log records: method ordinals and parsed payloads.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::domain::Hash256;

/// Minor units per whole coin.
pub const SATOSHIDEN: u64 = 100_000_000;

/// Swap lifecycle methods, ordered by how far the swap has progressed.
///
/// The ordinal doubles as the progress index: a record only moves forward
/// through these, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Method {
    Unknown = 0,
    Request = 1,
    Reserved = 2,
    Connect = 3,
    Connected = 4,
    TradeStatus = 5,
}

impl Method {
    pub const COUNT: u32 = 6;

    pub fn parse(s: &str) -> Method {
        match s {
            "request" => Method::Request,
            "reserved" => Method::Reserved,
            "connect" => Method::Connect,
            "connected" => Method::Connected,
            "tradestatus" => Method::TradeStatus,
            _ => Method::Unknown,
        }
    }

    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn from_index(index: u32) -> Option<Method> {
        match index {
            0 => Some(Method::Unknown),
            1 => Some(Method::Request),
            2 => Some(Method::Reserved),
            3 => Some(Method::Connect),
            4 => Some(Method::Connected),
            5 => Some(Method::TradeStatus),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Unknown => "unknown",
            Method::Request => "request",
            Method::Reserved => "reserved",
            Method::Connect => "connect",
            Method::Connected => "connected",
            Method::TradeStatus => "tradestatus",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Amounts arrive either as integer minor units or as decimal whole-coin
/// values; floats are scaled by [`SATOSHIDEN`].
fn de_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(0),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Ok(u)
            } else if let Some(f) = n.as_f64() {
                Ok((f * SATOSHIDEN as f64) as u64)
            } else {
                Err(serde::de::Error::custom("amount out of range"))
            }
        }
        _ => Err(serde::de::Error::custom("amount must be a number")),
    }
}

/// One side's declared trade, parsed from a non-status log record.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteEvent {
    #[serde(default)]
    pub gui: String,
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub rel: String,
    #[serde(default, deserialize_with = "de_amount")]
    pub satoshis: u64,
    #[serde(default, deserialize_with = "de_amount")]
    pub destsatoshis: u64,
    #[serde(default, deserialize_with = "de_amount")]
    pub txfee: u64,
    #[serde(default, deserialize_with = "de_amount")]
    pub desttxfee: u64,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub desttxid: Hash256,
    #[serde(default)]
    pub destvout: u32,
    #[serde(default)]
    pub feetxid: Hash256,
    #[serde(default)]
    pub feevout: u32,
    #[serde(default)]
    pub requestid: u32,
    #[serde(default)]
    pub quoteid: u32,
    #[serde(default)]
    pub srchash: Hash256,
    #[serde(default)]
    pub desthash: Hash256,
    #[serde(default)]
    pub iambob: i32,
    #[serde(default)]
    pub status: Option<String>,
}

impl QuoteEvent {
    /// Originating-application tag, `"nogui"` when absent.
    pub fn gui_or_default(&self) -> &str {
        if self.gui.is_empty() {
            "nogui"
        } else {
            &self.gui
        }
    }
}

/// A peer's report of a swap's progress, keyed by request/quote ids
/// rather than a ready-made fingerprint.
#[derive(Debug, Clone, Deserialize)]
pub struct TradeStatusEvent {
    #[serde(default)]
    pub aliceid: u64,
    #[serde(default)]
    pub requestid: u32,
    #[serde(default)]
    pub quoteid: u32,
    /// Base-side coin symbol.
    #[serde(default)]
    pub bob: String,
    /// Rel-side coin symbol.
    #[serde(default)]
    pub alice: String,
    #[serde(default, deserialize_with = "de_amount")]
    pub srcamount: u64,
    #[serde(default, deserialize_with = "de_amount")]
    pub destamount: u64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub bobdeposit: Hash256,
    #[serde(default)]
    pub alicepayment: Hash256,
    #[serde(default)]
    pub bobpayment: Hash256,
    #[serde(default)]
    pub paymentspent: Hash256,
    #[serde(default, rename = "Apaymentspent")]
    pub apaymentspent: Hash256,
    #[serde(default)]
    pub depositspent: Hash256,
}
