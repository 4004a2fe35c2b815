//! Bounded rate history with busy-window detection.
//!
//! The sampler thread appends one entry per successful tick; any number of
//! reporting threads read through cloned handles. Detection works on append
//! timestamps alone: a gap between consecutive samples wider than the
//! sampling cadence means the sampler thread itself was starved.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::rates::RateRecord;

/// Report timestamp format, rendered in local time.
const TIME_FORMAT: &str = "%m-%d %H:%M:%S%.3f";

/// Separator appended after every report entry.
const ENTRY_SEPARATOR: &str = "\r\n";

/// A consecutive in-band gap above `sample_interval * BUSY_GAP_FACTOR`
/// marks the window busy.
const BUSY_GAP_FACTOR: f64 = 1.2;

/// One appended sample: wall-clock millis plus the computed percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp_ms: i64,
    pub rates: RateRecord,
}

/// Shared, capacity-bounded, chronologically ordered rate history.
///
/// Clones are cheap handles onto the same store. All access goes through
/// one mutex scoped to this instance; readers never fail and operate over
/// whatever history exists, including none.
#[derive(Debug, Clone)]
pub struct RateHistory {
    inner: Arc<HistoryInner>,
}

#[derive(Debug)]
struct HistoryInner {
    max_entries: usize,
    sample_interval_ms: i64,
    busy_threshold_ms: i64,
    entries: Mutex<VecDeque<HistoryEntry>>,
}

impl RateHistory {
    /// Creates an empty history.
    ///
    /// `max_entries` below 1 is clamped to 1. `sample_interval` is the
    /// cadence the sampler is ticked at; it scales the busy-window math.
    pub fn new(max_entries: usize, sample_interval: Duration) -> Self {
        let max_entries = max_entries.max(1);
        let sample_interval_ms = sample_interval.as_millis() as i64;
        Self {
            inner: Arc::new(HistoryInner {
                max_entries,
                sample_interval_ms,
                busy_threshold_ms: (sample_interval_ms as f64 * BUSY_GAP_FACTOR) as i64,
                entries: Mutex::new(VecDeque::with_capacity(max_entries + 1)),
            }),
        }
    }

    /// Appends one sample, evicting the oldest entry when over capacity.
    ///
    /// Timestamps come from a monotonically increasing wall clock at call
    /// time, so append order is chronological order. A same-millisecond
    /// append overwrites the newest entry, keeping timestamps unique.
    pub fn append(&self, timestamp_ms: i64, rates: RateRecord) {
        let mut entries = self.inner.entries.lock().unwrap();
        if let Some(last) = entries.back_mut()
            && last.timestamp_ms == timestamp_ms
        {
            last.rates = rates;
            return;
        }
        entries.push_back(HistoryEntry {
            timestamp_ms,
            rates,
        });
        if entries.len() > self.inner.max_entries {
            entries.pop_front();
        }
    }

    /// All retained entries, oldest first.
    pub fn snapshot_all(&self) -> Vec<HistoryEntry> {
        self.inner.entries.lock().unwrap().iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().unwrap().is_empty()
    }

    /// Was the measurement cadence disrupted around the window start?
    ///
    /// Looks at entries strictly inside the band
    /// `[window_start - interval, window_start + interval]` and reports
    /// whether any two consecutive in-band entries are further apart than
    /// the busy threshold. Windows no longer than one sampling interval,
    /// and bands with fewer than two entries, are never busy.
    pub fn is_busy(&self, window_start_ms: i64, window_end_ms: i64) -> bool {
        if window_end_ms - window_start_ms <= self.inner.sample_interval_ms {
            return false;
        }
        let band_lo = window_start_ms - self.inner.sample_interval_ms;
        let band_hi = window_start_ms + self.inner.sample_interval_ms;

        let entries = self.inner.entries.lock().unwrap();
        let mut last_in_band: Option<i64> = None;
        for entry in entries.iter() {
            let ts = entry.timestamp_ms;
            if band_lo < ts && ts < band_hi {
                if let Some(prev) = last_in_band
                    && ts - prev > self.inner.busy_threshold_ms
                {
                    return true;
                }
                last_in_band = Some(ts);
            }
        }
        false
    }

    /// Formatted history, oldest first: one `"<time> <rates>"` line per
    /// entry, each followed by the entry separator.
    pub fn format_report(&self) -> String {
        let entries = self.inner.entries.lock().unwrap();
        let mut out = String::new();
        for entry in entries.iter() {
            match DateTime::from_timestamp_millis(entry.timestamp_ms) {
                Some(utc) => {
                    let local = utc.with_timezone(&Local);
                    out.push_str(&local.format(TIME_FORMAT).to_string());
                }
                // Out-of-range timestamp; keep the raw value readable.
                None => out.push_str(&entry.timestamp_ms.to_string()),
            }
            out.push(' ');
            out.push_str(&entry.rates.to_string());
            out.push_str(ENTRY_SEPARATOR);
        }
        out
    }
}
