//! Counter sources: where raw CPU counter lines come from.
//!
//! A [`CounterSource`] yields the aggregate system counter line and the
//! per-process counter line for one tick. Two strategies exist: reading
//! the counter files directly ([`DirectSource`]) and spawning a reader
//! process for environments where direct reads are blocked
//! ([`CommandSource`]). [`select_source`] probes once and picks.

mod command;
mod direct;
pub mod fs;
pub mod mock;

use std::fmt;
use std::io;
use std::path::PathBuf;

use tracing::debug;

pub use command::CommandSource;
pub use direct::DirectSource;
pub use fs::{FileSystem, RealFs};

/// Failure to acquire a counter line.
#[derive(Debug)]
pub enum SourceError {
    /// Reading the counter data failed.
    Io(io::Error),
    /// The reader process could not be spawned.
    Spawn(io::Error),
    /// The source produced no counter line.
    Empty(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Io(err) => write!(f, "I/O error: {}", err),
            SourceError::Spawn(err) => write!(f, "failed to spawn reader process: {}", err),
            SourceError::Empty(what) => write!(f, "no counter line from {}", what),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<io::Error> for SourceError {
    fn from(err: io::Error) -> Self {
        SourceError::Io(err)
    }
}

/// One strategy for acquiring raw counter lines.
///
/// Implementations return the first line of the respective counter file.
/// They never panic on acquisition failure; errors surface as
/// [`SourceError`] and the caller decides what a failed tick means.
pub trait CounterSource: Send {
    /// Short strategy name for logs.
    fn name(&self) -> &'static str;

    /// The aggregate system counter line.
    fn read_system(&mut self) -> Result<String, SourceError>;

    /// The counter line of process `pid`.
    fn read_process(&mut self, pid: u32) -> Result<String, SourceError>;
}

/// Picks the acquisition strategy for this process.
///
/// Probes whether our own counter file under `proc_path` is readable.
/// If it is, direct file reads are used; otherwise every tick goes
/// through a spawned reader process. The choice is made once here and
/// never revisited.
pub fn select_source(proc_path: &str, dump_file: Option<PathBuf>) -> Box<dyn CounterSource> {
    select_source_with(RealFs::new(), proc_path, dump_file)
}

fn select_source_with<F: FileSystem + 'static>(
    fs: F,
    proc_path: &str,
    dump_file: Option<PathBuf>,
) -> Box<dyn CounterSource> {
    let probe = PathBuf::from(format!("{}/{}/stat", proc_path, std::process::id()));
    match fs.read_to_string(&probe) {
        Ok(_) => {
            debug!("Counter files readable, using direct reads");
            Box::new(DirectSource::new(fs, proc_path))
        }
        Err(err) => {
            if fs.exists(&probe) {
                debug!("Counter file {} unreadable ({}), using reader process", probe.display(), err);
            } else {
                debug!("Counter file {} missing, using reader process", probe.display());
            }
            let mut source = CommandSource::new(proc_path);
            if let Some(path) = dump_file {
                source = source.with_dump_file(path);
            }
            Box::new(source)
        }
    }
}
