//! A named background thread driving a callback at a fixed cadence.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

/// Sleep slice between shutdown checks.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Drives a callback at a fixed interval on a dedicated thread.
///
/// The callback runs immediately after spawn, then once per interval.
/// Sleeps happen in short slices so stopping takes effect within one
/// slice even for long intervals. Dropping the ticker stops it too.
pub struct Ticker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn<F>(name: &str, interval: Duration, mut tick: F) -> io::Result<Ticker>
    where
        F: FnMut() + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = running.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                debug!("Tick thread started");
                while thread_running.load(Ordering::SeqCst) {
                    tick();
                    let mut remaining = interval;
                    while !remaining.is_zero() && thread_running.load(Ordering::SeqCst) {
                        let slice = remaining.min(SLEEP_SLICE);
                        thread::sleep(slice);
                        remaining -= slice;
                    }
                }
                debug!("Tick thread stopped");
            })?;
        Ok(Ticker {
            running,
            handle: Some(handle),
        })
    }

    /// Signals the tick thread to stop and joins it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
