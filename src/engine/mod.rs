//! Swap reconciliation engine: event counters, symbol interning, the
//! tracker core, candle aggregation, and the query responder.

pub mod candles;
pub mod counters;
pub mod hooks;
pub mod registry;
pub mod responder;
pub mod tracker;

pub use candles::{CandleBar, CandleError};
pub use counters::CounterSet;
pub use hooks::{Broadcast, LogBroadcast, NoopTrustHook, SwapRole, TrustHook};
pub use registry::SymbolRegistry;
pub use responder::{Responder, SwapSnapshot, VolumeEntry, WindowedReport};
pub use tracker::{SwapTracker, VolumeAccum, WindowOutput, WindowParams, STALE_AFTER_SECS};
