//! Domain types for swap tracking.
//!
//! This module provides:
//! - Primitives: TimeSec, Coin
//! - 256-bit references with the burned-sentinel merge rule
//! - Parsed log event payloads and the lifecycle method ordering
//! - The reconciled SwapRecord and its fingerprint derivation

pub mod event;
pub mod hash;
pub mod primitives;
pub mod swap;

pub use event::{Method, QuoteEvent, TradeStatusEvent, SATOSHIDEN};
pub use hash::Hash256;
pub use primitives::{Coin, TimeSec};
pub use swap::{dstr, fingerprint, SwapRecord, TradeIntent};
