//! Test doubles: an in-memory filesystem and scripted counter sources.
//!
//! [`SyntheticSource`] also backs the daemon on platforms without
//! counter files, so this module is compiled in unconditionally.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};

use super::fs::FileSystem;
use super::{CounterSource, SourceError};

/// A realistic aggregate system counter line.
pub const SAMPLE_SYSTEM_LINE: &str = "cpu  74608 2520 24433 1117073 6176 4054 0 0 0 0";

/// A realistic per-process counter line.
pub const SAMPLE_PROCESS_LINE: &str = "1234 (stallscoped) S 1 1234 1234 0 -1 4194304 100 0 0 0 10 5 0 0 20 0 1 0 12345 12345678 100 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0";

/// In-memory filesystem with per-path contents and readability.
#[derive(Debug, Default)]
pub struct MockFs {
    files: HashMap<PathBuf, String>,
    unreadable: HashSet<PathBuf>,
}

impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    /// The path exists but every read fails with `PermissionDenied`.
    pub fn add_unreadable(&mut self, path: impl Into<PathBuf>) {
        self.unreadable.insert(path.into());
    }

    /// Installs a system and a process counter file under `proc_path`.
    pub fn add_counter_files(
        &mut self,
        proc_path: &str,
        pid: u32,
        system_line: &str,
        process_line: &str,
    ) {
        self.add_file(format!("{}/stat", proc_path), format!("{}\n", system_line));
        self.add_file(
            format!("{}/{}/stat", proc_path, pid),
            format!("{}\n", process_line),
        );
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        if self.unreadable.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("mock permission denied: {}", path.display()),
            ));
        }
        match self.files.get(path) {
            Some(content) => Ok(content.clone()),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("mock file not found: {}", path.display()),
            )),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.unreadable.contains(path)
    }
}

/// Replays a fixed script of counter line pairs, one pair per tick.
///
/// `read_system` consumes the next pair and stashes its process half for
/// the following `read_process`. Once the script runs out, both reads
/// fail, which is how a vanished counter file looks to the sampler.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    ticks: VecDeque<(String, String)>,
    pending_process: Option<String>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_tick(&mut self, system_line: impl Into<String>, process_line: impl Into<String>) {
        self.ticks.push_back((system_line.into(), process_line.into()));
    }
}

impl CounterSource for ScriptedSource {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn read_system(&mut self) -> Result<String, SourceError> {
        match self.ticks.pop_front() {
            Some((system, process)) => {
                self.pending_process = Some(process);
                Ok(system)
            }
            None => Err(SourceError::Empty("exhausted script".to_string())),
        }
    }

    fn read_process(&mut self, _pid: u32) -> Result<String, SourceError> {
        match self.pending_process.take() {
            Some(process) => Ok(process),
            None => Err(SourceError::Empty("exhausted script".to_string())),
        }
    }
}

/// Generates steadily advancing counters, 62% total and 12% app load.
///
/// Stands in for real counter files on platforms that have none.
#[derive(Debug, Default)]
pub struct SyntheticSource {
    step: i64,
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterSource for SyntheticSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn read_system(&mut self) -> Result<String, SourceError> {
        self.step += 1;
        let s = self.step;
        Ok(format!(
            "cpu  {} {} {} {} {} {} {} 0 0 0",
            400 * s,
            10 * s,
            160 * s,
            380 * s,
            30 * s,
            10 * s,
            10 * s
        ))
    }

    fn read_process(&mut self, pid: u32) -> Result<String, SourceError> {
        let s = self.step;
        Ok(format!(
            "{} (stallscoped) S 1 1 1 0 -1 4194304 0 0 0 0 {} {} 0 0",
            pid,
            90 * s,
            30 * s
        ))
    }
}
