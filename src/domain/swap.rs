//! Reconciled swap state: trade intents, fingerprints, swap records.

use crate::domain::{Coin, Hash256, Method, QuoteEvent, TimeSec, SATOSHIDEN};

/// Deterministic 64-bit swap key derived from the destination and fee
/// transaction references of the quote.
pub fn fingerprint(desttxid: Hash256, destvout: u32, feetxid: Hash256, feevout: u32) -> u64 {
    ((desttxid.first_u32() as u64) << 48)
        | ((destvout as u64) << 32)
        | ((feetxid.first_u32() as u64) << 16)
        | feevout as u64
}

/// Convert minor units to a whole-coin value for display.
pub fn dstr(minor: u64) -> f64 {
    minor as f64 / SATOSHIDEN as f64
}

/// The latest declared terms of one swap: coins, counterparty keys,
/// amounts, fees, and the request/quote pairing identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeIntent {
    pub srccoin: Coin,
    pub destcoin: Coin,
    pub srchash: Hash256,
    pub desthash: Hash256,
    pub satoshis: u64,
    pub destsatoshis: u64,
    pub txfee: u64,
    pub desttxfee: u64,
    pub requestid: u32,
    pub quoteid: u32,
    pub timestamp: TimeSec,
    pub gui: String,
}

impl TradeIntent {
    pub fn from_quote(quote: &QuoteEvent) -> Self {
        TradeIntent {
            srccoin: Coin::new(quote.base.clone()),
            destcoin: Coin::new(quote.rel.clone()),
            srchash: quote.srchash,
            desthash: quote.desthash,
            satoshis: quote.satoshis,
            destsatoshis: quote.destsatoshis,
            txfee: quote.txfee,
            desttxfee: quote.desttxfee,
            requestid: quote.requestid,
            quoteid: quote.quoteid,
            timestamp: TimeSec::new(quote.timestamp),
            gui: quote.gui_or_default().to_string(),
        }
    }

    /// Exchange price: destination amount over fee-adjusted source amount.
    pub fn price(&self) -> f64 {
        let denom = self.satoshis as i64 - self.txfee as i64;
        if denom > 0 {
            self.destsatoshis as f64 / denom as f64
        } else {
            0.0
        }
    }
}

/// The reconciled state of one swap fingerprint.
#[derive(Debug, Clone)]
pub struct SwapRecord {
    pub aliceid: u64,
    pub intent: TradeIntent,
    pub qprice: f64,
    /// Furthest lifecycle stage observed; never decreases.
    pub progress: Method,
    /// Display ordering sequence, assigned on first observation.
    pub seq: u32,
    pub bobgui: String,
    pub alicegui: String,
    pub lasttime: TimeSec,
    /// Terminal timestamps; at most one is ever nonzero, and once set
    /// neither is cleared or changed.
    pub finished: TimeSec,
    pub expired: TimeSec,
    pub bobdeposit: Hash256,
    pub alicepayment: Hash256,
    pub bobpayment: Hash256,
    pub paymentspent: Hash256,
    pub apaymentspent: Hash256,
    pub depositspent: Hash256,
}

impl SwapRecord {
    pub fn new(aliceid: u64, intent: TradeIntent, progress: Method, seq: u32, now: TimeSec) -> Self {
        let qprice = intent.price();
        SwapRecord {
            aliceid,
            intent,
            qprice,
            progress,
            seq,
            bobgui: "nogui".to_string(),
            alicegui: "nogui".to_string(),
            lasttime: now,
            finished: TimeSec::new(0),
            expired: TimeSec::new(0),
            bobdeposit: Hash256::ZERO,
            alicepayment: Hash256::ZERO,
            bobpayment: Hash256::ZERO,
            paymentspent: Hash256::ZERO,
            apaymentspent: Hash256::ZERO,
            depositspent: Hash256::ZERO,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !self.finished.is_zero() || !self.expired.is_zero()
    }

    pub fn mark_finished(&mut self, at: TimeSec) {
        if !self.is_terminal() {
            self.finished = at;
        }
    }

    pub fn mark_expired(&mut self, at: TimeSec) {
        if !self.is_terminal() {
            self.expired = at;
        }
    }
}
