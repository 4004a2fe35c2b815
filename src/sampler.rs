//! The sampling pipeline: acquire counter lines, parse, rate, record.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::history::RateHistory;
use crate::parser;
use crate::rates::CpuRateState;
use crate::source::CounterSource;

/// Sampler construction parameters.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Cadence the sampler is expected to be ticked at.
    pub sample_interval: Duration,
    /// How many samples the history retains.
    pub max_entries: usize,
    /// Process whose counters are sampled; `None` means this process.
    pub pid: Option<u32>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_millis(1000),
            max_entries: 10,
            pid: None,
        }
    }
}

impl SamplerConfig {
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }
}

/// Periodic CPU utilization sampler.
///
/// Each [`sample`](Self::sample) call runs one tick: read the system and
/// process counter lines, parse them, derive percentages against the
/// previous tick, and append the result to the shared history. Every
/// failure along the way degrades to "no new sample this tick"; ticking
/// itself never fails and never panics.
pub struct CpuSampler {
    source: Box<dyn CounterSource>,
    rate_state: CpuRateState,
    history: RateHistory,
    pid: Option<u32>,
}

impl CpuSampler {
    pub fn new(config: SamplerConfig, source: Box<dyn CounterSource>) -> Self {
        Self {
            source,
            rate_state: CpuRateState::new(),
            history: RateHistory::new(config.max_entries, config.sample_interval),
            pid: config.pid,
        }
    }

    /// A shared handle onto the sample history.
    pub fn history(&self) -> RateHistory {
        self.history.clone()
    }

    /// Drops the rate baseline so the next two ticks form a fresh pair.
    ///
    /// Call before (re)starting the tick loop; counters accumulated while
    /// the sampler was paused would otherwise skew the first record.
    pub fn start(&mut self) {
        self.rate_state.reset();
    }

    fn pid(&mut self) -> u32 {
        *self.pid.get_or_insert_with(std::process::id)
    }

    /// Runs one sampling tick.
    pub fn sample(&mut self) {
        let system_line = match self.source.read_system() {
            Ok(line) => line,
            Err(err) => {
                warn!(
                    "Failed to read system counters via {} source: {}",
                    self.source.name(),
                    err
                );
                return;
            }
        };
        let pid = self.pid();
        let process_line = match self.source.read_process(pid) {
            Ok(line) => line,
            Err(err) => {
                warn!(
                    "Failed to read counters of pid {} via {} source: {}",
                    pid,
                    self.source.name(),
                    err
                );
                return;
            }
        };
        let (sys, app) = match parser::parse_tick(&system_line, &process_line) {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!("Discarding unparsable counter tick: {}", err);
                return;
            }
        };
        if let Some(record) = self.rate_state.update(sys, app) {
            self.history.append(Utc::now().timestamp_millis(), record);
        }
    }

    /// See [`RateHistory::is_busy`].
    pub fn is_cpu_busy(&self, window_start_ms: i64, window_end_ms: i64) -> bool {
        self.history.is_busy(window_start_ms, window_end_ms)
    }

    /// See [`RateHistory::format_report`].
    pub fn cpu_rate_report(&self) -> String {
        self.history.format_report()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::RateRecord;
    use crate::source::DirectSource;
    use crate::source::mock::{
        MockFs, SAMPLE_PROCESS_LINE, SAMPLE_SYSTEM_LINE, ScriptedSource, SyntheticSource,
    };

    // Totals 1000 apart so percentage expectations stay round.
    const SYS_T1: &str = "cpu  100 0 100 700 100 0 0 0 0 0";
    const SYS_T2: &str = "cpu  350 50 350 1100 150 0 0 0 0 0";

    fn proc_line(utime: i64, stime: i64) -> String {
        format!("1 (t) S 1 1 1 0 -1 0 0 0 0 0 {} {} 0 0", utime, stime)
    }

    fn sampler_with_script(ticks: &[(String, String)]) -> CpuSampler {
        let mut source = ScriptedSource::new();
        for (system, process) in ticks {
            source.push_tick(system.clone(), process.clone());
        }
        CpuSampler::new(SamplerConfig::default(), Box::new(source))
    }

    fn two_good_ticks() -> Vec<(String, String)> {
        vec![
            (SYS_T1.to_string(), proc_line(10, 5)),
            (SYS_T2.to_string(), proc_line(100, 35)),
        ]
    }

    #[test]
    fn first_tick_only_establishes_baseline() {
        let mut sampler = sampler_with_script(&two_good_ticks());
        sampler.sample();
        assert!(sampler.history().is_empty());
        assert!(sampler.rate_state.has_baseline());
    }

    #[test]
    fn second_tick_records_rates() {
        let mut sampler = sampler_with_script(&two_good_ticks());
        sampler.sample();
        sampler.sample();
        let entries = sampler.history().snapshot_all();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].rates,
            RateRecord {
                total_pct: 60,
                app_pct: 12,
                user_pct: 25,
                system_pct: 25,
                iowait_pct: 5,
            }
        );
    }

    #[test]
    fn unparsable_tick_is_skipped_without_touching_baseline() {
        let ticks = vec![
            (SYS_T1.to_string(), proc_line(10, 5)),
            ("garbage".to_string(), "also garbage".to_string()),
            (SYS_T2.to_string(), proc_line(100, 35)),
        ];
        let mut sampler = sampler_with_script(&ticks);
        sampler.sample();
        sampler.sample();
        sampler.sample();
        // The record spans the first and third tick.
        let entries = sampler.history().snapshot_all();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].rates.total_pct, 60);
        assert_eq!(entries[0].rates.app_pct, 12);
    }

    #[test]
    fn exhausted_source_never_panics() {
        let mut sampler = sampler_with_script(&[]);
        sampler.sample();
        sampler.sample();
        assert!(sampler.history().is_empty());
        assert!(!sampler.rate_state.has_baseline());
    }

    #[test]
    fn start_resets_the_baseline() {
        let mut sampler =
            CpuSampler::new(SamplerConfig::default(), Box::new(SyntheticSource::new()));
        sampler.sample();
        sampler.start();
        sampler.sample();
        assert!(sampler.history().is_empty());
        sampler.sample();
        assert_eq!(sampler.history().len(), 1);
    }

    #[test]
    fn synthetic_source_produces_steady_rates() {
        let mut sampler =
            CpuSampler::new(SamplerConfig::default(), Box::new(SyntheticSource::new()));
        for _ in 0..4 {
            sampler.sample();
        }
        let entries = sampler.history().snapshot_all();
        assert!(!entries.is_empty());
        for entry in &entries {
            assert_eq!(entry.rates.total_pct, 62);
            assert_eq!(entry.rates.app_pct, 12);
        }
    }

    #[test]
    fn configured_pid_selects_counter_file() {
        let mut fs = MockFs::new();
        fs.add_counter_files("/proc", 4321, SAMPLE_SYSTEM_LINE, SAMPLE_PROCESS_LINE);
        let mut sampler = CpuSampler::new(
            SamplerConfig::default().with_pid(4321),
            Box::new(DirectSource::new(fs, "/proc")),
        );
        sampler.sample();
        assert!(sampler.rate_state.has_baseline());
    }

    #[test]
    fn default_pid_is_current_process() {
        let mut fs = MockFs::new();
        fs.add_counter_files(
            "/proc",
            std::process::id(),
            SAMPLE_SYSTEM_LINE,
            SAMPLE_PROCESS_LINE,
        );
        let mut sampler = CpuSampler::new(
            SamplerConfig::default(),
            Box::new(DirectSource::new(fs, "/proc")),
        );
        sampler.sample();
        assert!(sampler.rate_state.has_baseline());
        assert_eq!(sampler.pid, Some(std::process::id()));
    }

    #[test]
    fn missing_process_counters_abandon_tick() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/stat", format!("{}\n", SAMPLE_SYSTEM_LINE));
        let mut sampler = CpuSampler::new(
            SamplerConfig::default().with_pid(99),
            Box::new(DirectSource::new(fs, "/proc")),
        );
        sampler.sample();
        assert!(!sampler.rate_state.has_baseline());
        assert!(sampler.history().is_empty());
    }

    #[test]
    fn report_renders_recorded_rates() {
        let mut sampler = sampler_with_script(&two_good_ticks());
        sampler.sample();
        sampler.sample();
        assert!(sampler.cpu_rate_report().contains("60% 12% 25% 25% 5%"));
    }

    #[test]
    fn short_window_is_never_busy() {
        let sampler = sampler_with_script(&[]);
        assert!(!sampler.is_cpu_busy(0, 500));
    }
}
