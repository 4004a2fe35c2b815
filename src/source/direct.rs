//! Direct-read counter source.

use std::path::PathBuf;

use super::fs::FileSystem;
use super::{CounterSource, SourceError};

/// Reads counter lines straight from the counter files.
///
/// The cheap strategy: one file read per counter, no subprocess. Fails
/// every tick if the counter files are not readable from this process,
/// which is what [`super::select_source`] probes for up front.
#[derive(Debug)]
pub struct DirectSource<F: FileSystem> {
    fs: F,
    proc_path: String,
}

impl<F: FileSystem> DirectSource<F> {
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    fn first_line(&self, path: &str) -> Result<String, SourceError> {
        let content = self.fs.read_to_string(&PathBuf::from(path))?;
        match content.lines().next() {
            Some(line) => Ok(line.to_string()),
            None => Err(SourceError::Empty(path.to_string())),
        }
    }
}

impl<F: FileSystem> CounterSource for DirectSource<F> {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn read_system(&mut self) -> Result<String, SourceError> {
        self.first_line(&format!("{}/stat", self.proc_path))
    }

    fn read_process(&mut self, pid: u32) -> Result<String, SourceError> {
        self.first_line(&format!("{}/{}/stat", self.proc_path, pid))
    }
}
