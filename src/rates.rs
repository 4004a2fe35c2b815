//! Interval utilization percentages from consecutive counter snapshots.
//!
//! This module is the single source of truth for the percentage math. The
//! sampler feeds it one snapshot pair per tick; it owns the baseline the
//! next delta is taken against.

use serde::{Deserialize, Serialize};

use crate::parser::{ProcessCpuTimes, SystemCpuTimes};

/// Utilization percentages for one sampling interval.
///
/// Integer percentages from truncating division; practically in [0, 100],
/// but counter regressions can push individual fields outside that range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RateRecord {
    /// Non-idle share of the whole interval (iowait counts as busy).
    pub total_pct: i64,
    /// Share consumed by the sampled process.
    pub app_pct: i64,
    pub user_pct: i64,
    pub system_pct: i64,
    pub iowait_pct: i64,
}

impl std::fmt::Display for RateRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}% {}% {}% {}% {}%",
            self.total_pct, self.app_pct, self.user_pct, self.system_pct, self.iowait_pct
        )
    }
}

/// The snapshot pair the next delta is computed against.
#[derive(Debug, Clone, Copy)]
struct CpuBaseline {
    sys: SystemCpuTimes,
    app: ProcessCpuTimes,
}

/// Rate tracking state for the CPU sampler.
#[derive(Debug, Default)]
pub struct CpuRateState {
    prev: Option<CpuBaseline>,
}

impl CpuRateState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the baseline; the next update only seeds it.
    pub fn reset(&mut self) {
        self.prev = None;
    }

    pub fn has_baseline(&self) -> bool {
        self.prev.is_some()
    }

    /// Folds in one tick's snapshots and returns the interval percentages.
    ///
    /// The incoming pair unconditionally becomes the new baseline, whether
    /// or not a record is produced, so deltas stay anchored to
    /// genuinely-read ticks. Returns `None` on the first sample after
    /// start/reset and on a non-positive total delta (clock-resolution
    /// collapse or counter regression).
    pub fn update(&mut self, sys: SystemCpuTimes, app: ProcessCpuTimes) -> Option<RateRecord> {
        let Some(prev) = self.prev.replace(CpuBaseline { sys, app }) else {
            return None;
        };

        let total_delta = sys.total() - prev.sys.total();
        if total_delta <= 0 {
            return None;
        }
        let idle_delta = sys.idle - prev.sys.idle;

        Some(RateRecord {
            total_pct: (total_delta - idle_delta) * 100 / total_delta,
            app_pct: (app.total() - prev.app.total()) * 100 / total_delta,
            user_pct: (sys.user - prev.sys.user) * 100 / total_delta,
            system_pct: (sys.system - prev.sys.system) * 100 / total_delta,
            iowait_pct: (sys.iowait - prev.sys.iowait) * 100 / total_delta,
        })
    }
}
