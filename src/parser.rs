//! Parsers for the two cumulative CPU counter lines.
//!
//! These are pure functions that turn the raw first line of `/proc/stat` and
//! a `/proc/[pid]/stat` line into structured counters. They are designed to
//! be easily testable with string inputs; callers treat any error as "skip
//! this tick".

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Minimum whitespace tokens in the aggregate cpu line (label plus at least
/// eight time columns; modern kernels emit ten).
const SYSTEM_MIN_TOKENS: usize = 9;

/// Minimum whitespace tokens in a process stat line; the four CPU-time
/// fields sit at offsets 13..=16.
const PROCESS_MIN_TOKENS: usize = 17;

/// System-wide cumulative CPU time buckets (jiffies since boot), from the
/// first line of `/proc/stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SystemCpuTimes {
    pub user: i64,
    pub nice: i64,
    pub system: i64,
    pub idle: i64,
    pub iowait: i64,
    pub irq: i64,
    pub softirq: i64,
}

impl SystemCpuTimes {
    /// Sum of all seven buckets; strictly increases between genuine samples.
    pub fn total(&self) -> i64 {
        self.user + self.nice + self.system + self.idle + self.iowait + self.irq + self.softirq
    }
}

/// Cumulative CPU time of one process (jiffies), from `/proc/[pid]/stat`:
/// user mode, kernel mode, and the same two for reaped children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessCpuTimes {
    pub utime: i64,
    pub stime: i64,
    pub cutime: i64,
    pub cstime: i64,
}

impl ProcessCpuTimes {
    /// Sum of the four fields; non-decreasing across the process lifetime.
    pub fn total(&self) -> i64 {
        self.utime + self.stime + self.cutime + self.cstime
    }
}

/// Parses the aggregate `cpu` line of `/proc/stat`.
///
/// Expects the `cpu` label followed by the time columns; per-core lines
/// (`cpu0`, `cpu1`, ...) are rejected.
pub fn parse_system_line(line: &str) -> Result<SystemCpuTimes, ParseError> {
    let fields: Vec<&str> = line.split_whitespace().collect();

    if fields.len() < SYSTEM_MIN_TOKENS {
        return Err(ParseError::new(format!(
            "cpu line too short: expected {}+ tokens, got {}",
            SYSTEM_MIN_TOKENS,
            fields.len()
        )));
    }

    if fields[0] != "cpu" {
        return Err(ParseError::new(format!(
            "not the aggregate cpu line: starts with {:?}",
            fields[0]
        )));
    }

    let parse_field = |idx: usize, name: &str| -> Result<i64, ParseError> {
        fields
            .get(idx)
            .ok_or_else(|| ParseError::new(format!("missing field {}", name)))?
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {}: {:?}", name, fields[idx])))
    };

    Ok(SystemCpuTimes {
        user: parse_field(1, "user")?,
        nice: parse_field(2, "nice")?,
        system: parse_field(3, "system")?,
        idle: parse_field(4, "idle")?,
        iowait: parse_field(5, "iowait")?,
        irq: parse_field(6, "irq")?,
        softirq: parse_field(7, "softirq")?,
    })
}

/// Parses a `/proc/[pid]/stat` line.
///
/// Fields are addressed by whitespace offset, so a comm containing spaces
/// would shift them; the sampled process is our own, whose comm does not.
pub fn parse_process_line(line: &str) -> Result<ProcessCpuTimes, ParseError> {
    let fields: Vec<&str> = line.split_whitespace().collect();

    if fields.len() < PROCESS_MIN_TOKENS {
        return Err(ParseError::new(format!(
            "process stat line too short: expected {}+ tokens, got {}",
            PROCESS_MIN_TOKENS,
            fields.len()
        )));
    }

    let parse_field = |idx: usize, name: &str| -> Result<i64, ParseError> {
        fields
            .get(idx)
            .ok_or_else(|| ParseError::new(format!("missing field {}", name)))?
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {}: {:?}", name, fields[idx])))
    };

    Ok(ProcessCpuTimes {
        utime: parse_field(13, "utime")?,
        stime: parse_field(14, "stime")?,
        cutime: parse_field(15, "cutime")?,
        cstime: parse_field(16, "cstime")?,
    })
}

/// Parses both counter lines of one tick.
///
/// Either failure poisons the whole tick; no partial result is produced.
pub fn parse_tick(
    system_line: &str,
    process_line: &str,
) -> Result<(SystemCpuTimes, ProcessCpuTimes), ParseError> {
    Ok((
        parse_system_line(system_line)?,
        parse_process_line(process_line)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYSTEM_LINE: &str = "cpu  74608 2520 24433 1117073 6176 4054 0 0 0 0";
    const PROCESS_LINE: &str = "1234 (stallscoped) S 1 1234 1234 0 -1 4194304 100 0 0 0 10 5 0 0 20 0 1 0 12345 12345678 100 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0";

    #[test]
    fn test_parse_system_line() {
        let t = parse_system_line(SYSTEM_LINE).unwrap();
        assert_eq!(t.user, 74608);
        assert_eq!(t.nice, 2520);
        assert_eq!(t.system, 24433);
        assert_eq!(t.idle, 1117073);
        assert_eq!(t.iowait, 6176);
        assert_eq!(t.irq, 4054);
        assert_eq!(t.softirq, 0);
        assert_eq!(t.total(), 74608 + 2520 + 24433 + 1117073 + 6176 + 4054);
    }

    #[test]
    fn test_parse_system_line_too_short() {
        let err = parse_system_line("cpu  1 2 3 4").unwrap_err();
        assert!(err.message.contains("too short"));
    }

    #[test]
    fn test_parse_system_line_rejects_per_core() {
        let err = parse_system_line("cpu0 74608 2520 24433 1117073 6176 4054 0 0 0 0").unwrap_err();
        assert!(err.message.contains("aggregate"));
    }

    #[test]
    fn test_parse_system_line_non_numeric() {
        let err = parse_system_line("cpu  74608 x 24433 1117073 6176 4054 0 0 0 0").unwrap_err();
        assert!(err.message.contains("invalid nice"));
    }

    #[test]
    fn test_parse_system_line_empty() {
        assert!(parse_system_line("").is_err());
    }

    #[test]
    fn test_parse_process_line() {
        let t = parse_process_line(PROCESS_LINE).unwrap();
        assert_eq!(t.utime, 10);
        assert_eq!(t.stime, 5);
        assert_eq!(t.cutime, 0);
        assert_eq!(t.cstime, 0);
        assert_eq!(t.total(), 15);
    }

    #[test]
    fn test_parse_process_line_negative_child_times() {
        // cutime/cstime are signed in the kernel interface
        let line = "1 (init) S 0 1 1 0 -1 4194304 0 0 0 0 7 3 -1 -2 20 0 1 0 1 1 1";
        let t = parse_process_line(line).unwrap();
        assert_eq!(t.cutime, -1);
        assert_eq!(t.cstime, -2);
        assert_eq!(t.total(), 7);
    }

    #[test]
    fn test_parse_process_line_too_short() {
        let err = parse_process_line("1234 (a) S 1 2 3 4 5 6 7").unwrap_err();
        assert!(err.message.contains("too short"));
    }

    #[test]
    fn test_parse_process_line_non_numeric() {
        let line = "1234 (a) S 1 1234 1234 0 -1 4194304 100 0 0 0 ten 5 0 0 20 0 1 0";
        let err = parse_process_line(line).unwrap_err();
        assert!(err.message.contains("invalid utime"));
    }

    #[test]
    fn test_parse_tick() {
        let (sys, app) = parse_tick(SYSTEM_LINE, PROCESS_LINE).unwrap();
        assert_eq!(sys.user, 74608);
        assert_eq!(app.total(), 15);
    }

    #[test]
    fn test_parse_tick_fails_on_either_line() {
        assert!(parse_tick("garbage", PROCESS_LINE).is_err());
        assert!(parse_tick(SYSTEM_LINE, "garbage").is_err());
    }
}
