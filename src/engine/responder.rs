//! Query front end: replays newly appended log lines into the tracker
//! before answering, and rebroadcasts status requests for stale swaps.

use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::domain::{dstr, SwapRecord, TimeSec};
use crate::engine::candles::{self, CandleBar, CandleError};
use crate::engine::counters::CounterSet;
use crate::engine::hooks::Broadcast;
use crate::engine::tracker::{SwapTracker, VolumeAccum, WindowOutput, WindowParams};
use crate::store::{EventLog, LogError};

/// Wire snapshot of one swap record.
#[derive(Debug, Clone, Serialize)]
pub struct SwapSnapshot {
    pub timestamp: i64,
    pub aliceid: u64,
    /// Source-side ownership-key fingerprint, hex.
    pub src: String,
    pub base: String,
    pub basevol: f64,
    /// Destination-side ownership-key fingerprint, hex.
    pub dest: String,
    pub rel: String,
    pub relvol: f64,
    pub price: f64,
    pub requestid: u32,
    pub quoteid: u32,
    pub finished: i64,
    pub expired: i64,
    pub ind: u32,
}

impl From<&SwapRecord> for SwapSnapshot {
    fn from(record: &SwapRecord) -> Self {
        SwapSnapshot {
            timestamp: record.intent.timestamp.as_secs(),
            aliceid: record.aliceid,
            src: record.intent.srchash.to_string(),
            base: record.intent.srccoin.to_string(),
            basevol: dstr(record.intent.satoshis),
            dest: record.intent.desthash.to_string(),
            rel: record.intent.destcoin.to_string(),
            relvol: dstr(record.intent.destsatoshis),
            price: record.qprice,
            requestid: record.intent.requestid,
            quoteid: record.intent.quoteid,
            finished: record.finished.as_secs(),
            expired: record.expired.as_secs(),
            ind: record.progress.index(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VolumeEntry {
    pub coin: String,
    pub srcvol: f64,
    pub destvol: f64,
    pub numtrades: u32,
    pub total: f64,
}

impl VolumeEntry {
    fn new(coin: String, accum: &VolumeAccum) -> Self {
        VolumeEntry {
            coin,
            srcvol: dstr(accum.srcvol),
            destvol: dstr(accum.destvol),
            numtrades: accum.numtrades,
            total: dstr(accum.srcvol + accum.destvol),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WindowedReport {
    pub result: &'static str,
    /// Log lines ingested by this pass.
    pub newlines: u32,
    pub swaps: Vec<SwapSnapshot>,
    #[serde(rename = "RTcount")]
    pub rt_count: u32,
    #[serde(rename = "swapscount")]
    pub swaps_count: u32,
    pub volumes: Vec<VolumeEntry>,
    #[serde(flatten)]
    pub counters: CounterSet,
}

pub struct Responder {
    log: Arc<EventLog>,
    tracker: Mutex<SwapTracker>,
    broadcast: Arc<dyn Broadcast>,
    /// Randomized staleness threshold so a fleet of trackers does not
    /// rebroadcast status requests in lockstep.
    jitter_secs: i64,
    screen_width: i64,
}

impl Responder {
    pub fn new(
        log: Arc<EventLog>,
        tracker: SwapTracker,
        broadcast: Arc<dyn Broadcast>,
        screen_width: i64,
    ) -> Self {
        let jitter_secs = rand::thread_rng().gen_range(60..360);
        Self::with_jitter(log, tracker, broadcast, screen_width, jitter_secs)
    }

    pub fn with_jitter(
        log: Arc<EventLog>,
        tracker: SwapTracker,
        broadcast: Arc<dyn Broadcast>,
        screen_width: i64,
        jitter_secs: i64,
    ) -> Self {
        Responder {
            log,
            tracker: Mutex::new(tracker),
            broadcast,
            jitter_secs,
            screen_width,
        }
    }

    /// Append one event to the durable log. It is picked up by the next
    /// reconciliation pass.
    pub fn record_event(&self, event: &Value) -> Result<(), LogError> {
        self.log.append(event)
    }

    /// Snapshot one swap. A stale hit is rebroadcast to peers as our
    /// current view, inviting fresher reports.
    pub async fn point_query(&self, aliceid: u64, now: TimeSec) -> Option<SwapSnapshot> {
        let tracker = self.tracker.lock().await;
        let (record, stale) = tracker.point_query(aliceid, now)?;
        drop(tracker);
        let snapshot = SwapSnapshot::from(&record);
        if stale {
            if let Ok(Value::Object(mut obj)) = serde_json::to_value(&snapshot) {
                obj.insert("method".to_string(), json!("swapstatus"));
                self.broadcast.send(Value::Object(obj));
            }
        }
        Some(snapshot)
    }

    /// Fold a peer's swapstatus report into the tracker.
    pub async fn external_status(&self, payload: &Value, now: TimeSec) {
        let mut tracker = self.tracker.lock().await;
        tracker.external_status(payload, now);
    }

    pub async fn windowed_query(&self, params: &WindowParams, now: TimeSec) -> Result<WindowedReport, LogError> {
        let (newlines, out) = self.reconcile(params, now).await?;
        let swaps = out.swaps.iter().map(SwapSnapshot::from).collect();
        let volumes = out
            .volumes
            .iter()
            .map(|(coin, accum)| VolumeEntry::new(coin.clone(), accum))
            .collect();
        Ok(WindowedReport {
            result: "success",
            newlines,
            swaps,
            rt_count: out.rt_count,
            swaps_count: out.swaps_count,
            volumes,
            counters: out.counters,
        })
    }

    pub async fn build_candles(
        &self,
        params: &WindowParams,
        timescale: i64,
        now: TimeSec,
    ) -> Result<Vec<CandleBar>, CandleError> {
        let (start, end, _) = candles::plan_buckets(
            params.start,
            params.end,
            timescale,
            self.screen_width,
            now.as_secs(),
        )?;
        let bucketed = WindowParams {
            start,
            end,
            ..params.clone()
        };
        let (_, out) = self.reconcile(&bucketed, now).await?;
        Ok(candles::build(start, end, timescale, &out.swaps))
    }

    /// Ingest any log lines appended since the last pass, then run one
    /// windowed reconciliation. Stale active swaps trigger a status
    /// request to peers.
    async fn reconcile(
        &self,
        params: &WindowParams,
        now: TimeSec,
    ) -> Result<(u32, WindowOutput), LogError> {
        let mut tracker = self.tracker.lock().await;
        let lines = self.log.tail_new()?;
        let mut newlines = 0u32;
        for line in &lines {
            if tracker.apply_line(line, now) {
                newlines += 1;
            }
        }
        if newlines > 0 {
            tracing::debug!(newlines, "ingested log lines");
        }
        let out = tracker.windowed(params, now, self.jitter_secs);
        drop(tracker);
        for aliceid in &out.stale {
            self.broadcast
                .send(json!({"method": "gettradestatus", "aliceid": aliceid}));
        }
        Ok((newlines, out))
    }
}
