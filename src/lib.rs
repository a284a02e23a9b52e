pub mod api;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod store;

pub use config::{Config, SettlementTimeouts};
pub use domain::{
    dstr, fingerprint, Coin, Hash256, Method, QuoteEvent, SwapRecord, TimeSec, TradeIntent,
    TradeStatusEvent, SATOSHIDEN,
};
pub use engine::{
    Broadcast, CandleBar, CounterSet, Responder, SwapSnapshot, SwapTracker, SymbolRegistry,
    TrustHook, WindowParams,
};
pub use error::AppError;
pub use store::EventLog;
