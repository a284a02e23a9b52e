//! OHLC candle aggregation over reconciled swap records.

use serde::ser::{Serialize, SerializeSeq, Serializer};
use thiserror::Error;

use crate::domain::{dstr, SwapRecord};
use crate::store::LogError;

/// Volumes at or below this are treated as no trade.
const SMALLVAL: f64 = 1e-9;

#[derive(Debug, Error)]
pub enum CandleError {
    #[error("one minute is shortest timescale")]
    TimescaleTooShort,
    #[error("start and end must be non-negative")]
    NegativeBound,
    #[error("range spans more than {0} bars, reduce it or widen the timescale")]
    RangeTooWide(usize),
    #[error(transparent)]
    Log(#[from] LogError),
}

/// One time bucket of trades. Open/close follow the earliest and latest
/// trade seen, not insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleBar {
    pub timestamp: i64,
    pub firsttime: i64,
    pub lasttime: i64,
    pub numtrades: u32,
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub close: f64,
    pub relsum: f64,
    pub basesum: f64,
}

impl CandleBar {
    pub fn new(timestamp: i64) -> Self {
        CandleBar {
            timestamp,
            firsttime: 0,
            lasttime: 0,
            numtrades: 0,
            high: 0.0,
            low: 0.0,
            open: 0.0,
            close: 0.0,
            relsum: 0.0,
            basesum: 0.0,
        }
    }

    /// Fold one trade into the bar. Trades with a negligible volume on
    /// either side are ignored.
    pub fn update(&mut self, timestamp: i64, basevol: f64, relvol: f64) {
        if basevol <= SMALLVAL || relvol <= SMALLVAL {
            return;
        }
        let price = relvol / basevol;
        if self.firsttime == 0 || timestamp < self.firsttime {
            self.firsttime = timestamp;
            self.open = price;
        }
        if self.lasttime == 0 || timestamp >= self.lasttime {
            self.lasttime = timestamp;
            self.close = price;
        }
        if self.low == 0.0 || price < self.low {
            self.low = price;
        }
        if price > self.high {
            self.high = price;
        }
        self.relsum += relvol;
        self.basesum += basevol;
        self.numtrades += 1;
    }

    pub fn is_populated(&self) -> bool {
        self.numtrades > 0
    }

    pub fn average_price(&self) -> f64 {
        if self.basesum > SMALLVAL {
            self.relsum / self.basesum
        } else {
            0.0
        }
    }
}

impl Serialize for CandleBar {
    /// Wire form is a fixed row: [timestamp, high, low, open, close,
    /// relvolume, basevolume, averageprice, numtrades].
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut row = serializer.serialize_seq(Some(9))?;
        row.serialize_element(&self.timestamp)?;
        row.serialize_element(&self.high)?;
        row.serialize_element(&self.low)?;
        row.serialize_element(&self.open)?;
        row.serialize_element(&self.close)?;
        row.serialize_element(&self.relsum)?;
        row.serialize_element(&self.basesum)?;
        row.serialize_element(&self.average_price())?;
        row.serialize_element(&self.numtrades)?;
        row.end()
    }
}

/// Resolve the requested range into concrete bucket bounds.
/// Returns (start, end, numbars).
///
/// Bounds come straight from caller input, so they are validated here:
/// negative bounds are rejected, and the bar count is capped at one
/// screen width so a wide range cannot demand an unbounded allocation.
pub fn plan_buckets(
    start: i64,
    end: i64,
    timescale: i64,
    screen_width: i64,
    now: i64,
) -> Result<(i64, i64, usize), CandleError> {
    if timescale < 60 {
        return Err(CandleError::TimescaleTooShort);
    }
    if start < 0 || end < 0 {
        return Err(CandleError::NegativeBound);
    }
    let end = if end == 0 {
        (now / timescale) * timescale
    } else {
        end
    };
    let start = if start == 0 || start >= end {
        end.saturating_sub(screen_width.saturating_mul(timescale)).max(0)
    } else {
        start
    };
    let max_bars = screen_width as usize + 1;
    let numbars = ((end - start) / timescale + 1) as usize;
    if numbars > max_bars {
        return Err(CandleError::RangeTooWide(max_bars));
    }
    Ok((start, end, numbars))
}

/// Assign each record in range to its bucket.
pub fn fold_swaps(
    bars: &mut [CandleBar],
    start: i64,
    end: i64,
    timescale: i64,
    swaps: &[SwapRecord],
) {
    for record in swaps {
        let ts = record.intent.timestamp.as_secs();
        if ts < start || ts > end {
            continue;
        }
        let index = ((ts - start) / timescale) as usize;
        if let Some(bar) = bars.get_mut(index) {
            bar.update(ts, dstr(record.intent.satoshis), dstr(record.intent.destsatoshis));
        }
    }
}

/// Build the populated bars for one pair and range.
pub fn build(
    start: i64,
    end: i64,
    timescale: i64,
    swaps: &[SwapRecord],
) -> Vec<CandleBar> {
    let numbars = ((end - start) / timescale + 1) as usize;
    let mut bars: Vec<CandleBar> = (0..numbars)
        .map(|i| CandleBar::new(start + i as i64 * timescale))
        .collect();
    fold_swaps(&mut bars, start, end, timescale, swaps);
    bars.into_iter().filter(CandleBar::is_populated).collect()
}
