//! Process-lifetime monotonic counters surfaced in summary responses.

use serde::Serialize;

use crate::domain::Method;

/// Per-event-kind counters plus duplicate/parse-error accounting.
///
/// Field order matches the wire layout of the windowed summary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterSet {
    pub request: u32,
    pub reserved: u32,
    pub connect: u32,
    pub connected: u32,
    pub duplicates: u32,
    pub parse_errors: u32,
    /// Unique swaps observed; doubles as the display sequence generator.
    pub uniques: u32,
    pub tradestatus: u32,
    pub unknown: u32,
    /// tradestatus events that resolved no record.
    #[serde(skip)]
    pub unexpected: u32,
    /// tradestatus events that matched by id but failed validation.
    #[serde(skip)]
    pub mismatches: u32,
}

impl CounterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump_method(&mut self, method: Method) {
        match method {
            Method::Request => self.request += 1,
            Method::Reserved => self.reserved += 1,
            Method::Connect => self.connect += 1,
            Method::Connected => self.connected += 1,
            Method::TradeStatus => self.tradestatus += 1,
            Method::Unknown => self.unknown += 1,
        }
    }

    /// Allocate the next display sequence number.
    pub fn next_seq(&mut self) -> u32 {
        let seq = self.uniques;
        self.uniques += 1;
        seq
    }
}
