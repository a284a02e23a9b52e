//! The reconciliation core: merges out-of-order, duplicate, and partially
//! validated log events into one consistent record per swap fingerprint.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::config::SettlementTimeouts;
use crate::domain::{
    fingerprint, Coin, Hash256, Method, QuoteEvent, SwapRecord, TimeSec, TradeIntent,
    TradeStatusEvent,
};
use crate::engine::counters::CounterSet;
use crate::engine::hooks::{SwapRole, TrustHook};
use crate::engine::registry::SymbolRegistry;

/// A point query on a record older than this asks peers for a fresher status.
pub const STALE_AFTER_SECS: i64 = 60;

/// Filters for a windowed query. Zero/empty values mean "no filter";
/// a start in the future with `end == start` selects only records that
/// are still open.
#[derive(Debug, Clone, Default)]
pub struct WindowParams {
    pub start: i64,
    pub end: i64,
    pub gui: Option<String>,
    pub pubkey: Option<Hash256>,
    pub base: Option<Coin>,
    pub rel: Option<Coin>,
}

impl WindowParams {
    /// No time bounds, no filters: every known record.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn pair(base: Coin, rel: Coin, start: i64, end: i64) -> Self {
        WindowParams {
            start,
            end,
            base: Some(base),
            rel: Some(rel),
            ..Self::default()
        }
    }
}

/// Per-coin volume totals accumulated over every visited record.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VolumeAccum {
    pub srcvol: u64,
    pub destvol: u64,
    pub numtrades: u32,
}

impl VolumeAccum {
    pub fn is_empty(&self) -> bool {
        self.srcvol == 0 && self.destvol == 0
    }
}

/// Result of one reconciliation pass over both partitions.
#[derive(Debug)]
pub struct WindowOutput {
    /// Records matching the window and filters, active partition first.
    pub swaps: Vec<SwapRecord>,
    /// Records still active after the pass.
    pub rt_count: u32,
    /// Records in the archived partition after the pass.
    pub swaps_count: u32,
    /// (symbol, totals) for every coin with nonzero visited volume.
    pub volumes: Vec<(String, VolumeAccum)>,
    /// Active fingerprints whose last update is older than the jitter
    /// threshold; the caller rebroadcasts a status request for each.
    pub stale: Vec<u64>,
    pub counters: CounterSet,
}

pub struct SwapTracker {
    /// Swaps not yet finished or expired ("real-time" set).
    active: BTreeMap<u64, SwapRecord>,
    /// Swaps that reached a terminal state. Insertion here is the terminal
    /// transition; records are never deleted.
    archived: BTreeMap<u64, SwapRecord>,
    counters: CounterSet,
    timeouts: SettlementTimeouts,
    registry: Arc<SymbolRegistry>,
    trust: Arc<dyn TrustHook>,
}

impl SwapTracker {
    pub fn new(
        timeouts: SettlementTimeouts,
        registry: Arc<SymbolRegistry>,
        trust: Arc<dyn TrustHook>,
    ) -> Self {
        SwapTracker {
            active: BTreeMap::new(),
            archived: BTreeMap::new(),
            counters: CounterSet::new(),
            timeouts,
            registry,
            trust,
        }
    }

    pub fn counters(&self) -> &CounterSet {
        &self.counters
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn archived_len(&self) -> usize {
        self.archived.len()
    }

    /// Apply one raw log line. Returns true when the line held a JSON
    /// object; anything else is counted as a parse error and skipped.
    pub fn apply_line(&mut self, line: &str, now: TimeSec) -> bool {
        match serde_json::from_str::<Value>(line) {
            Ok(value @ Value::Object(_)) => {
                self.apply_value(&value, now);
                true
            }
            _ => {
                if !line.trim().is_empty() {
                    self.counters.parse_errors += 1;
                    tracing::debug!(line, "skipping unparseable log line");
                }
                false
            }
        }
    }

    /// Apply one decoded event object.
    pub fn apply_value(&mut self, event: &Value, now: TimeSec) {
        let Some(method_str) = event.get("method").and_then(Value::as_str) else {
            self.counters.unknown += 1;
            tracing::warn!(%event, "event with no method");
            return;
        };
        let method = Method::parse(method_str);
        self.counters.bump_method(method);
        match method {
            Method::Unknown => {
                tracing::warn!(method = method_str, "unknown event method");
            }
            Method::TradeStatus => self.apply_tradestatus(event, now),
            Method::Connect => {
                // connect events may nest the quote under "trade"
                let payload = event.get("trade").unwrap_or(event);
                self.apply_quote(Method::Connect, payload, now);
            }
            advancing => self.apply_quote(advancing, event, now),
        }
    }

    fn apply_quote(&mut self, method: Method, payload: &Value, now: TimeSec) {
        let quote: QuoteEvent = match serde_json::from_value(payload.clone()) {
            Ok(quote) => quote,
            Err(err) => {
                self.counters.parse_errors += 1;
                tracing::warn!(%payload, %err, "quote parse error");
                return;
            }
        };
        if quote.base.is_empty() || quote.rel.is_empty() || quote.satoshis == 0 {
            self.counters.parse_errors += 1;
            tracing::warn!(%payload, "quote missing base/rel/amount");
            return;
        }

        let aliceid = fingerprint(quote.desttxid, quote.destvout, quote.feetxid, quote.feevout);
        let gui = quote.gui_or_default().to_string();
        let iambob = quote.iambob != 0;
        let finished_on_arrival = quote.status.as_deref() == Some("finished");
        let intent = TradeIntent::from_quote(&quote);

        match Self::find_in(&mut self.active, &mut self.archived, aliceid) {
            Some(record) => {
                if method > record.progress {
                    record.progress = method;
                    Self::replace_intent(record, intent, now);
                } else {
                    self.counters.duplicates += 1;
                }
                Self::assign_gui(record, &gui, iambob);
            }
            None => {
                let seq = self.counters.next_seq();
                let mut record = SwapRecord::new(aliceid, intent, method, seq, now);
                Self::assign_gui(&mut record, &gui, iambob);
                if finished_on_arrival {
                    self.archived.insert(aliceid, record);
                } else {
                    self.trust
                        .register_swap(record.intent.srchash, aliceid, SwapRole::Bob);
                    self.trust
                        .register_swap(record.intent.desthash, aliceid, SwapRole::Alice);
                    self.active.insert(aliceid, record);
                }
            }
        }
    }

    fn apply_tradestatus(&mut self, payload: &Value, now: TimeSec) {
        let status: TradeStatusEvent = match serde_json::from_value(payload.clone()) {
            Ok(status) => status,
            Err(err) => {
                self.counters.parse_errors += 1;
                tracing::warn!(%payload, %err, "tradestatus parse error");
                return;
            }
        };

        let mut resolved = false;
        let mut mismatched = false;
        if let Some(record) = Self::find_in(&mut self.active, &mut self.archived, status.aliceid) {
            match Self::merge_status(record, &status, now, &self.timeouts) {
                Ok(()) => resolved = true,
                Err(()) => {
                    self.counters.mismatches += 1;
                    mismatched = true;
                }
            }
        }

        if !resolved {
            // A status can arrive before any event that would have taught us
            // its fingerprint; fall back to the stored request/quote id pair.
            let delayed = self
                .active
                .iter()
                .chain(self.archived.iter())
                .find(|(id, record)| {
                    **id != status.aliceid
                        && record.intent.requestid == status.requestid
                        && record.intent.quoteid == status.quoteid
                })
                .map(|(id, _)| *id);
            if let Some(id) = delayed {
                if let Some(record) = Self::find_in(&mut self.active, &mut self.archived, id) {
                    match Self::merge_status(record, &status, now, &self.timeouts) {
                        Ok(()) => resolved = true,
                        Err(()) => {
                            self.counters.mismatches += 1;
                            mismatched = true;
                            tracing::warn!(aliceid = id, "tradestatus mismatch after delayed match");
                        }
                    }
                }
            }
        }

        if !resolved && !mismatched {
            self.counters.unexpected += 1;
            tracing::warn!(
                unexpected = self.counters.unexpected,
                %payload,
                "unexpected tradestatus"
            );
        }
    }

    /// Validate a tradestatus against a candidate record and merge it in.
    /// A failed check leaves the record untouched.
    fn merge_status(
        record: &mut SwapRecord,
        status: &TradeStatusEvent,
        now: TimeSec,
        timeouts: &SettlementTimeouts,
    ) -> Result<(), ()> {
        let q = &record.intent;
        let ids_match = status.requestid == q.requestid && status.quoteid == q.quoteid;
        let symbols_match =
            status.bob == q.srccoin.as_str() && status.alice == q.destcoin.as_str();
        let src_delta = status.srcamount as i128 + 2 * q.txfee as i128 - q.satoshis as i128;
        let dest_delta =
            status.destamount as i128 + 2 * q.desttxfee as i128 - q.destsatoshis as i128;
        let amounts_match =
            src_delta.abs() <= q.txfee as i128 && dest_delta.abs() <= q.desttxfee as i128;

        if !(ids_match && symbols_match && amounts_match) {
            if ids_match {
                tracing::warn!(
                    aliceid = record.aliceid,
                    bob = %status.bob,
                    base = %q.srccoin,
                    alice = %status.alice,
                    rel = %q.destcoin,
                    srcamount = status.srcamount,
                    satoshis = q.satoshis,
                    destamount = status.destamount,
                    destsatoshis = q.destsatoshis,
                    "mismatched tradestatus"
                );
            }
            return Err(());
        }

        let timeout = timeouts.pair_timeout(q.srccoin.as_str(), q.destcoin.as_str());
        let quoted_at = q.timestamp;

        record.progress = Method::TradeStatus;
        record.lasttime = now;
        record.bobdeposit = status.bobdeposit.merge(record.bobdeposit);
        record.alicepayment = status.alicepayment.merge(record.alicepayment);
        record.bobpayment = status.bobpayment.merge(record.bobpayment);
        record.paymentspent = status.paymentspent.merge(record.paymentspent);
        record.apaymentspent = status.apaymentspent.merge(record.apaymentspent);
        record.depositspent = status.depositspent.merge(record.depositspent);

        if status.status.as_deref() == Some("finished") {
            let at = if status.timestamp != 0 {
                TimeSec::new(status.timestamp)
            } else {
                now
            };
            record.mark_finished(at);
        }
        if record.finished.is_zero() && now.as_secs() > quoted_at.as_secs() + 2 * timeout {
            record.mark_expired(now);
        }
        Ok(())
    }

    /// A peer's swapstatus report: accepted only when it is strictly ahead
    /// of what we know locally.
    pub fn external_status(&mut self, payload: &Value, now: TimeSec) {
        let aliceid = payload.get("aliceid").and_then(Value::as_u64).unwrap_or(0);
        let Some(record) = Self::find_in(&mut self.active, &mut self.archived, aliceid) else {
            return;
        };
        record.lasttime = now;
        let ind = payload.get("ind").and_then(Value::as_u64).unwrap_or(0) as u32;
        if ind > record.progress.index() {
            if let Some(method) = Method::from_index(ind) {
                tracing::info!(aliceid, from = %record.progress, to = %method, "swapstatus advanced");
                record.progress = method;
                let finished = payload.get("finished").and_then(Value::as_i64).unwrap_or(0);
                let expired = payload.get("expired").and_then(Value::as_i64).unwrap_or(0);
                if finished != 0 {
                    record.mark_finished(TimeSec::new(finished));
                }
                if expired != 0 {
                    record.mark_expired(TimeSec::new(expired));
                }
            }
        }
    }

    /// Snapshot one record by fingerprint; the flag reports whether it has
    /// gone stale and deserves a peer rebroadcast.
    pub fn point_query(&self, aliceid: u64, now: TimeSec) -> Option<(SwapRecord, bool)> {
        let record = self
            .active
            .get(&aliceid)
            .or_else(|| self.archived.get(&aliceid))?;
        let stale = now.as_secs() > record.lasttime.as_secs() + STALE_AFTER_SECS;
        Some((record.clone(), stale))
    }

    /// One reconciliation pass: expire overdue records, migrate newly
    /// terminal ones to the archived partition, and collect everything
    /// matching the window.
    pub fn windowed(&mut self, params: &WindowParams, now: TimeSec, stale_after: i64) -> WindowOutput {
        let (mut start, end) = (params.start, params.end);
        if start > end {
            start = end;
        }

        let mut swaps = Vec::new();
        let mut volumes: Vec<VolumeAccum> = Vec::new();
        let mut stale = Vec::new();
        let mut migrate = Vec::new();
        let mut rt_count = 0u32;

        let active_ids: Vec<u64> = self.active.keys().copied().collect();
        for id in active_ids {
            let Some(record) = self.active.get_mut(&id) else {
                continue;
            };
            Self::expire_if_due(record, now, &self.timeouts);
            Self::accumulate_volume(&self.registry, &mut volumes, record);
            if Self::display_match(record, start, end, params, now) {
                swaps.push(record.clone());
            }
            if record.is_terminal() {
                migrate.push(id);
            } else {
                rt_count += 1;
                if now.as_secs() > record.lasttime.as_secs() + stale_after {
                    stale.push(id);
                }
            }
        }
        for id in migrate {
            if let Some(record) = self.active.remove(&id) {
                self.archived.insert(id, record);
            }
        }

        let mut swaps_count = 0u32;
        for record in self.archived.values_mut() {
            Self::expire_if_due(record, now, &self.timeouts);
            Self::accumulate_volume(&self.registry, &mut volumes, record);
            if Self::display_match(record, start, end, params, now) {
                swaps.push(record.clone());
            }
            swaps_count += 1;
        }

        let volumes = volumes
            .into_iter()
            .enumerate()
            .filter(|(_, accum)| !accum.is_empty())
            .map(|(index, accum)| (self.registry.symbol(index).unwrap_or_default(), accum))
            .collect();

        WindowOutput {
            swaps,
            rt_count,
            swaps_count,
            volumes,
            stale,
            counters: self.counters,
        }
    }

    fn find_in<'a>(
        active: &'a mut BTreeMap<u64, SwapRecord>,
        archived: &'a mut BTreeMap<u64, SwapRecord>,
        aliceid: u64,
    ) -> Option<&'a mut SwapRecord> {
        if active.contains_key(&aliceid) {
            active.get_mut(&aliceid)
        } else {
            archived.get_mut(&aliceid)
        }
    }

    fn replace_intent(record: &mut SwapRecord, intent: TradeIntent, now: TimeSec) {
        let prior_gui = std::mem::take(&mut record.intent.gui);
        record.intent = intent;
        // A later event with no gui tag never erases a known one.
        if record.intent.gui.is_empty() || record.intent.gui == "nogui" {
            record.intent.gui = prior_gui;
        }
        record.qprice = record.intent.price();
        record.lasttime = now;
    }

    fn assign_gui(record: &mut SwapRecord, gui: &str, iambob: bool) {
        if gui != "nogui" {
            if iambob {
                record.bobgui = gui.to_string();
            } else {
                record.alicegui = gui.to_string();
            }
        }
    }

    fn expire_if_due(record: &mut SwapRecord, now: TimeSec, timeouts: &SettlementTimeouts) {
        if !record.is_terminal() {
            let timeout = timeouts.pair_timeout(
                record.intent.srccoin.as_str(),
                record.intent.destcoin.as_str(),
            );
            if now.as_secs() > record.intent.timestamp.as_secs() + 2 * timeout {
                record.mark_expired(now);
            }
        }
    }

    fn accumulate_volume(
        registry: &SymbolRegistry,
        volumes: &mut Vec<VolumeAccum>,
        record: &SwapRecord,
    ) {
        let base = registry.intern(record.intent.srccoin.as_str());
        if volumes.len() <= base {
            volumes.resize(base + 1, VolumeAccum::default());
        }
        volumes[base].srcvol += record.intent.satoshis;
        volumes[base].numtrades += 1;

        let rel = registry.intern(record.intent.destcoin.as_str());
        if volumes.len() <= rel {
            volumes.resize(rel + 1, VolumeAccum::default());
        }
        volumes[rel].destvol += record.intent.destsatoshis;
        volumes[rel].numtrades += 1;
    }

    fn display_match(
        record: &SwapRecord,
        start: i64,
        end: i64,
        params: &WindowParams,
        now: TimeSec,
    ) -> bool {
        let ts = record.intent.timestamp.as_secs();
        let mut disp = if start == 0 && end == 0 {
            true
        } else if start > now.as_secs() && end == start {
            !record.is_terminal()
        } else {
            ts >= start && ts <= end
        };
        if let Some(base) = &params.base {
            if base != &record.intent.srccoin && base != &record.intent.destcoin {
                disp = false;
            }
        }
        if let Some(rel) = &params.rel {
            if rel != &record.intent.srccoin && rel != &record.intent.destcoin {
                disp = false;
            }
        }
        if disp {
            disp = match &params.gui {
                Some(gui) if !gui.is_empty() => *gui == record.bobgui || *gui == record.alicegui,
                _ => true,
            };
        }
        if disp {
            disp = match params.pubkey {
                Some(pubkey) if !pubkey.is_zero() => {
                    pubkey == record.intent.srchash || pubkey == record.intent.desthash
                }
                _ => true,
            };
        }
        disp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::hooks::NoopTrustHook;
    use serde_json::json;
    use std::sync::Mutex;

    const T0: i64 = 1_600_000_000;

    struct RecordingTrust {
        seen: Mutex<Vec<(Hash256, u64, SwapRole)>>,
    }

    impl TrustHook for RecordingTrust {
        fn register_swap(&self, pubkey: Hash256, aliceid: u64, role: SwapRole) {
            self.seen.lock().unwrap().push((pubkey, aliceid, role));
        }
    }

    fn tracker() -> SwapTracker {
        SwapTracker::new(
            SettlementTimeouts::new(3600),
            Arc::new(SymbolRegistry::new()),
            Arc::new(NoopTrustHook),
        )
    }

    fn hexpad(byte: u8) -> String {
        hex::encode([byte; 32])
    }

    fn quote(method: &str, dest_byte: u8, fee_byte: u8) -> Value {
        json!({
            "method": method,
            "base": "KMD",
            "rel": "BTC",
            "satoshis": 100_000_000u64,
            "destsatoshis": 50_000_000u64,
            "txfee": 10_000u64,
            "desttxfee": 1_000u64,
            "timestamp": T0,
            "desttxid": hexpad(dest_byte),
            "destvout": 0,
            "feetxid": hexpad(fee_byte),
            "feevout": 1,
            "requestid": 7,
            "quoteid": 9,
            "srchash": hexpad(0xaa),
            "desthash": hexpad(0xbb),
            "gui": "mmgui",
            "iambob": 1
        })
    }

    fn quote_fingerprint(dest_byte: u8, fee_byte: u8) -> u64 {
        fingerprint(
            hexpad(dest_byte).parse().unwrap(),
            0,
            hexpad(fee_byte).parse().unwrap(),
            1,
        )
    }

    /// Amounts that pass validation against `quote`: the stored amount
    /// minus twice the fee, on each side.
    fn matching_status() -> Value {
        json!({
            "method": "tradestatus",
            "aliceid": quote_fingerprint(1, 2),
            "requestid": 7,
            "quoteid": 9,
            "bob": "KMD",
            "alice": "BTC",
            "srcamount": 99_980_000u64,
            "destamount": 49_998_000u64,
            "timestamp": T0 + 100
        })
    }

    #[test]
    fn test_create_then_advance() {
        let mut t = tracker();
        t.apply_value(&quote("request", 1, 2), TimeSec::new(T0));
        t.apply_value(&quote("connected", 1, 2), TimeSec::new(T0 + 5));
        assert_eq!(t.active_len(), 1);
        let (record, _) = t.point_query(quote_fingerprint(1, 2), TimeSec::new(T0 + 5)).unwrap();
        assert_eq!(record.progress, Method::Connected);
        assert!(record.finished.is_zero());
        assert!(record.expired.is_zero());
        assert_eq!(t.counters().request, 1);
        assert_eq!(t.counters().connected, 1);
        assert_eq!(t.counters().uniques, 1);
        assert_eq!(t.counters().duplicates, 0);
    }

    #[test]
    fn test_regression_is_a_counted_duplicate() {
        let mut t = tracker();
        t.apply_value(&quote("connected", 1, 2), TimeSec::new(T0));
        t.apply_value(&quote("request", 1, 2), TimeSec::new(T0 + 5));
        let (record, _) = t.point_query(quote_fingerprint(1, 2), TimeSec::new(T0 + 5)).unwrap();
        assert_eq!(record.progress, Method::Connected);
        assert_eq!(t.counters().duplicates, 1);
        assert_eq!(t.counters().uniques, 1);
    }

    #[test]
    fn test_idempotent_replay() {
        let lines = [
            quote("request", 1, 2).to_string(),
            quote("connected", 1, 2).to_string(),
            matching_status().to_string(),
        ];
        let mut t = tracker();
        for line in &lines {
            t.apply_line(line, TimeSec::new(T0 + 10));
        }
        let first = t.point_query(quote_fingerprint(1, 2), TimeSec::new(T0 + 10)).unwrap().0;
        for line in &lines {
            t.apply_line(line, TimeSec::new(T0 + 20));
        }
        let second = t.point_query(quote_fingerprint(1, 2), TimeSec::new(T0 + 20)).unwrap().0;
        assert_eq!(t.active_len() + t.archived_len(), 1);
        assert_eq!(second.progress, first.progress);
        assert_eq!(second.finished, first.finished);
        assert_eq!(second.expired, first.expired);
        assert_eq!(t.counters().uniques, 1);
    }

    #[test]
    fn test_trust_hook_called_for_both_sides() {
        let trust = Arc::new(RecordingTrust {
            seen: Mutex::new(Vec::new()),
        });
        let mut t = SwapTracker::new(
            SettlementTimeouts::new(3600),
            Arc::new(SymbolRegistry::new()),
            trust.clone(),
        );
        t.apply_value(&quote("request", 1, 2), TimeSec::new(T0));
        let seen = trust.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].2, SwapRole::Bob);
        assert_eq!(seen[1].2, SwapRole::Alice);
        assert_eq!(seen[0].1, quote_fingerprint(1, 2));
    }

    #[test]
    fn test_finished_quote_lands_in_archived_without_trust_call() {
        let trust = Arc::new(RecordingTrust {
            seen: Mutex::new(Vec::new()),
        });
        let mut t = SwapTracker::new(
            SettlementTimeouts::new(3600),
            Arc::new(SymbolRegistry::new()),
            trust.clone(),
        );
        let mut event = quote("connected", 3, 4);
        event["status"] = json!("finished");
        t.apply_value(&event, TimeSec::new(T0));
        assert_eq!(t.active_len(), 0);
        assert_eq!(t.archived_len(), 1);
        assert!(trust.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_tradestatus_finishes_swap() {
        let mut t = tracker();
        t.apply_value(&quote("request", 1, 2), TimeSec::new(T0));
        t.apply_value(&quote("connected", 1, 2), TimeSec::new(T0 + 5));
        let mut status = matching_status();
        status["status"] = json!("finished");
        t.apply_value(&status, TimeSec::new(T0 + 100));
        let (record, _) = t.point_query(quote_fingerprint(1, 2), TimeSec::new(T0 + 100)).unwrap();
        assert_eq!(record.finished, TimeSec::new(T0 + 100));
        assert_eq!(record.progress, Method::TradeStatus);
        // Migration to archived happens on the next reconciliation pass.
        let out = t.windowed(&WindowParams::all(), TimeSec::new(T0 + 101), 3600);
        assert_eq!(out.rt_count, 0);
        assert_eq!(out.swaps_count, 1);
        assert_eq!(t.archived_len(), 1);
        assert_eq!(t.active_len(), 0);
    }

    #[test]
    fn test_tolerance_boundary() {
        // Exactly one fee unit away passes; one more minor unit fails.
        let mut t = tracker();
        t.apply_value(&quote("request", 1, 2), TimeSec::new(T0));
        let mut at_edge = matching_status();
        at_edge["srcamount"] = json!(99_980_000u64 + 10_000);
        t.apply_value(&at_edge, TimeSec::new(T0 + 10));
        assert_eq!(t.counters().mismatches, 0);

        let mut t = tracker();
        t.apply_value(&quote("request", 1, 2), TimeSec::new(T0));
        let mut past_edge = matching_status();
        past_edge["srcamount"] = json!(99_980_000u64 + 10_001);
        t.apply_value(&past_edge, TimeSec::new(T0 + 10));
        assert_eq!(t.counters().mismatches, 1);
        let (record, _) = t.point_query(quote_fingerprint(1, 2), TimeSec::new(T0 + 10)).unwrap();
        assert_eq!(record.progress, Method::Request);
    }

    #[test]
    fn test_mismatch_leaves_record_untouched() {
        let mut t = tracker();
        t.apply_value(&quote("request", 1, 2), TimeSec::new(T0));
        let before = t.point_query(quote_fingerprint(1, 2), TimeSec::new(T0)).unwrap().0;
        let mut status = matching_status();
        status["bob"] = json!("DOGE");
        t.apply_value(&status, TimeSec::new(T0 + 10));
        let after = t.point_query(quote_fingerprint(1, 2), TimeSec::new(T0 + 10)).unwrap().0;
        assert_eq!(after.lasttime, before.lasttime);
        assert_eq!(after.progress, before.progress);
        assert!(after.bobdeposit.is_zero());
    }

    #[test]
    fn test_merge_monotonicity() {
        let mut t = tracker();
        t.apply_value(&quote("request", 1, 2), TimeSec::new(T0));
        let mut with_deposit = matching_status();
        with_deposit["bobdeposit"] = json!(hexpad(0x77));
        t.apply_value(&with_deposit, TimeSec::new(T0 + 10));
        let mut burned = matching_status();
        burned["bobdeposit"] = json!(Hash256::DEAD.to_string());
        t.apply_value(&burned, TimeSec::new(T0 + 20));
        let (record, _) = t.point_query(quote_fingerprint(1, 2), TimeSec::new(T0 + 20)).unwrap();
        assert_eq!(record.bobdeposit, hexpad(0x77).parse().unwrap());
    }

    #[test]
    fn test_tradestatus_delayed_match_by_ids() {
        let mut t = tracker();
        t.apply_value(&quote("request", 1, 2), TimeSec::new(T0));
        let mut status = matching_status();
        // Fingerprint the peer reports is unknown to us; ids still resolve it.
        status["aliceid"] = json!(999_999u64);
        t.apply_value(&status, TimeSec::new(T0 + 10));
        assert_eq!(t.counters().unexpected, 0);
        let (record, _) = t.point_query(quote_fingerprint(1, 2), TimeSec::new(T0 + 10)).unwrap();
        assert_eq!(record.progress, Method::TradeStatus);
    }

    #[test]
    fn test_unexpected_tradestatus_counted() {
        let mut t = tracker();
        t.apply_value(&matching_status(), TimeSec::new(T0));
        assert_eq!(t.counters().unexpected, 1);
        assert_eq!(t.active_len(), 0);
    }

    #[test]
    fn test_parse_errors_counted_and_skipped() {
        let mut t = tracker();
        assert!(!t.apply_line("not json", TimeSec::new(T0)));
        t.apply_value(&json!({"method": "request", "rel": "BTC"}), TimeSec::new(T0));
        t.apply_value(&json!({"method": "warpspeed"}), TimeSec::new(T0));
        t.apply_value(&json!({"nomethod": 1}), TimeSec::new(T0));
        assert_eq!(t.counters().parse_errors, 2);
        assert_eq!(t.counters().unknown, 2);
        assert_eq!(t.active_len(), 0);
    }

    #[test]
    fn test_connect_payload_nested_under_trade() {
        let mut t = tracker();
        let event = json!({"method": "connect", "trade": quote("connect", 5, 6)});
        t.apply_value(&event, TimeSec::new(T0));
        assert_eq!(t.active_len(), 1);
        assert_eq!(t.counters().connect, 1);
    }

    #[test]
    fn test_gui_preserved_across_updates() {
        let mut t = tracker();
        t.apply_value(&quote("request", 1, 2), TimeSec::new(T0));
        let mut bare = quote("connected", 1, 2);
        bare["gui"] = json!("");
        bare["iambob"] = json!(0);
        t.apply_value(&bare, TimeSec::new(T0 + 5));
        let (record, _) = t.point_query(quote_fingerprint(1, 2), TimeSec::new(T0 + 5)).unwrap();
        assert_eq!(record.intent.gui, "mmgui");
        assert_eq!(record.bobgui, "mmgui");
        assert_eq!(record.alicegui, "nogui");
    }

    #[test]
    fn test_expiry_sweep_migrates() {
        let mut t = tracker();
        t.apply_value(&quote("request", 1, 2), TimeSec::new(T0));
        // Just inside 2x the timeout: still active.
        let out = t.windowed(&WindowParams::all(), TimeSec::new(T0 + 7200), 1_000_000);
        assert_eq!(out.rt_count, 1);
        // Past it: expired and migrated in the same pass.
        let out = t.windowed(&WindowParams::all(), TimeSec::new(T0 + 7201), 1_000_000);
        assert_eq!(out.rt_count, 0);
        assert_eq!(out.swaps_count, 1);
        let (record, _) = t.point_query(quote_fingerprint(1, 2), TimeSec::new(T0 + 7201)).unwrap();
        assert_eq!(record.expired, TimeSec::new(T0 + 7201));
        assert!(record.finished.is_zero());
    }

    #[test]
    fn test_windowed_zero_zero_returns_everything() {
        let mut t = tracker();
        t.apply_value(&quote("request", 1, 2), TimeSec::new(T0));
        let mut done = quote("connected", 3, 4);
        done["status"] = json!("finished");
        t.apply_value(&done, TimeSec::new(T0));
        let out = t.windowed(&WindowParams::all(), TimeSec::new(T0 + 1), 1_000_000);
        assert_eq!(out.swaps.len(), 2);
        assert_eq!(out.rt_count, 1);
        assert_eq!(out.swaps_count, 1);
    }

    #[test]
    fn test_windowed_time_and_pair_filters() {
        let mut t = tracker();
        t.apply_value(&quote("request", 1, 2), TimeSec::new(T0));
        let params = WindowParams {
            start: T0 - 10,
            end: T0 + 10,
            ..WindowParams::default()
        };
        let out = t.windowed(&params, TimeSec::new(T0 + 1), 1_000_000);
        assert_eq!(out.swaps.len(), 1);

        let params = WindowParams {
            start: T0 + 100,
            end: T0 + 200,
            ..WindowParams::default()
        };
        let out = t.windowed(&params, TimeSec::new(T0 + 300), 1_000_000);
        assert!(out.swaps.is_empty());

        let params = WindowParams::pair(Coin::new("DOGE".into()), Coin::new("BTC".into()), 0, 0);
        let out = t.windowed(&params, TimeSec::new(T0 + 1), 1_000_000);
        assert!(out.swaps.is_empty());

        let params = WindowParams::pair(Coin::new("KMD".into()), Coin::new("BTC".into()), 0, 0);
        let out = t.windowed(&params, TimeSec::new(T0 + 1), 1_000_000);
        assert_eq!(out.swaps.len(), 1);
    }

    #[test]
    fn test_windowed_still_open_form() {
        let mut t = tracker();
        t.apply_value(&quote("request", 1, 2), TimeSec::new(T0));
        let mut done = quote("connected", 3, 4);
        done["status"] = json!("finished");
        t.apply_value(&done, TimeSec::new(T0));
        let future = T0 + 1_000_000;
        let params = WindowParams {
            start: future,
            end: future,
            ..WindowParams::default()
        };
        let out = t.windowed(&params, TimeSec::new(T0 + 1), 1_000_000);
        assert_eq!(out.swaps.len(), 1);
        assert_eq!(out.swaps[0].aliceid, quote_fingerprint(1, 2));
    }

    #[test]
    fn test_windowed_volumes_cover_visited_records() {
        let mut t = tracker();
        t.apply_value(&quote("request", 1, 2), TimeSec::new(T0));
        t.apply_value(&quote("request", 3, 4), TimeSec::new(T0));
        let params = WindowParams {
            start: T0 + 100,
            end: T0 + 200,
            ..WindowParams::default()
        };
        // Nothing matches the window, but volumes still cover both records.
        let out = t.windowed(&params, TimeSec::new(T0 + 300), 1_000_000);
        assert!(out.swaps.is_empty());
        let kmd = out.volumes.iter().find(|(coin, _)| coin == "KMD").unwrap();
        assert_eq!(kmd.1.srcvol, 200_000_000);
        assert_eq!(kmd.1.numtrades, 2);
        let btc = out.volumes.iter().find(|(coin, _)| coin == "BTC").unwrap();
        assert_eq!(btc.1.destvol, 100_000_000);
    }

    #[test]
    fn test_windowed_reports_stale_active_records() {
        let mut t = tracker();
        t.apply_value(&quote("request", 1, 2), TimeSec::new(T0));
        let out = t.windowed(&WindowParams::all(), TimeSec::new(T0 + 120), 60);
        assert_eq!(out.stale, vec![quote_fingerprint(1, 2)]);
        let out = t.windowed(&WindowParams::all(), TimeSec::new(T0 + 30), 60);
        assert!(out.stale.is_empty());
    }

    #[test]
    fn test_external_status_requires_strict_advance() {
        let mut t = tracker();
        t.apply_value(&quote("connected", 1, 2), TimeSec::new(T0));
        let aliceid = quote_fingerprint(1, 2);

        let stale_report = json!({"aliceid": aliceid, "ind": 3, "finished": T0 + 50});
        t.external_status(&stale_report, TimeSec::new(T0 + 60));
        let (record, _) = t.point_query(aliceid, TimeSec::new(T0 + 60)).unwrap();
        assert_eq!(record.progress, Method::Connected);
        assert!(record.finished.is_zero());

        let ahead = json!({"aliceid": aliceid, "ind": 5, "finished": T0 + 50, "expired": 0});
        t.external_status(&ahead, TimeSec::new(T0 + 70));
        let (record, _) = t.point_query(aliceid, TimeSec::new(T0 + 70)).unwrap();
        assert_eq!(record.progress, Method::TradeStatus);
        assert_eq!(record.finished, TimeSec::new(T0 + 50));
    }

    #[test]
    fn test_point_query_staleness_flag() {
        let mut t = tracker();
        t.apply_value(&quote("request", 1, 2), TimeSec::new(T0));
        let aliceid = quote_fingerprint(1, 2);
        assert!(!t.point_query(aliceid, TimeSec::new(T0 + 60)).unwrap().1);
        assert!(t.point_query(aliceid, TimeSec::new(T0 + 61)).unwrap().1);
        assert!(t.point_query(12345, TimeSec::new(T0)).is_none());
    }

    #[test]
    fn test_start_after_end_is_clamped() {
        let mut t = tracker();
        t.apply_value(&quote("request", 1, 2), TimeSec::new(T0));
        let params = WindowParams {
            start: T0 + 500,
            end: T0 - 500,
            ..WindowParams::default()
        };
        // Clamped to [T0-500, T0-500]: nothing matches, nothing panics.
        let out = t.windowed(&params, TimeSec::new(T0 + 1), 1_000_000);
        assert!(out.swaps.is_empty());
    }
}
