//! Reader-process counter source.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use super::{CounterSource, SourceError};

/// Captures counter lines by spawning a reader process per tick.
///
/// Fallback strategy for environments where the counter files cannot be
/// opened by this process. Each capture spawns `cat`, drains its stdout,
/// and kills and reaps the child on every exit path. Optionally the full
/// captured output is appended to a dump file for offline inspection;
/// dump failures are logged and never fail the capture.
#[derive(Debug)]
pub struct CommandSource {
    proc_path: String,
    dump_file: Option<PathBuf>,
}

impl CommandSource {
    pub fn new(proc_path: impl Into<String>) -> Self {
        Self {
            proc_path: proc_path.into(),
            dump_file: None,
        }
    }

    /// Append every captured line to `path`.
    pub fn with_dump_file(mut self, path: PathBuf) -> Self {
        self.dump_file = Some(path);
        self
    }

    fn capture(&self, path: &str) -> Result<String, SourceError> {
        let lines = run_oneshot("cat", path)?;
        self.append_dump(&lines);
        match lines.into_iter().next() {
            Some(line) => Ok(line),
            None => Err(SourceError::Empty(path.to_string())),
        }
    }

    fn append_dump(&self, lines: &[String]) {
        let Some(path) = &self.dump_file else {
            return;
        };
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| {
                for line in lines {
                    writeln!(file, "{}", line)?;
                }
                Ok(())
            });
        if let Err(err) = result {
            debug!("Failed to append counter dump to {}: {}", path.display(), err);
        }
    }
}

impl CounterSource for CommandSource {
    fn name(&self) -> &'static str {
        "command"
    }

    fn read_system(&mut self) -> Result<String, SourceError> {
        self.capture(&format!("{}/stat", self.proc_path))
    }

    fn read_process(&mut self, pid: u32) -> Result<String, SourceError> {
        self.capture(&format!("{}/{}/stat", self.proc_path, pid))
    }
}

/// Runs `cmd arg`, returning its stdout lines.
///
/// The child is killed and waited on before returning, no matter how the
/// read went. A failed spawn and a failed stdout read are distinct errors;
/// a child that produces nothing yields an empty vec.
fn run_oneshot(cmd: &str, arg: &str) -> Result<Vec<String>, SourceError> {
    let mut child = Command::new(cmd)
        .arg(arg)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(SourceError::Spawn)?;

    let mut lines = Vec::new();
    let mut read_err = None;
    if let Some(stdout) = child.stdout.take() {
        for line in BufReader::new(stdout).lines() {
            match line {
                Ok(line) => lines.push(line),
                Err(err) => {
                    read_err = Some(err);
                    break;
                }
            }
        }
    }

    // The child must not outlive the capture, whatever the read did.
    let _ = child.kill();
    let _ = child.wait();

    match read_err {
        Some(err) => Err(SourceError::Io(err)),
        None => Ok(lines),
    }
}
