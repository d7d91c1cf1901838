//! Leveled, timestamped line logger shared by every component (4.K).
//!
//! This is deliberately not backed by an external logging facade: the
//! logger is specified core functionality (it is consumed directly by
//! the field-value parser, the body reader, the response writer and the
//! connection driver), not a pluggable transport. The supervisor decides
//! where the lines end up by supplying any [`std::io::Write`].

use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

/// Severity, lowest to highest so that `level >= filter` reads naturally
/// at the call site (`self.logger.log(Level::Warn, ...)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }
}

/// A leveled logger bound to one connection label.
///
/// Cloning is cheap (the label is an owned `String` cloned once per
/// connection, not per log line); there is no shared mutable state, in
/// keeping with the single-threaded-per-connection model.
pub struct Logger<W: Write> {
    out: W,
    label: String,
    filter: Level,
}

impl<W: Write> Logger<W> {
    /// Creates a logger writing to `out`, tagging every line with `label`
    /// (the connection's listener-supplied identifier, `"(stdio)"` by
    /// default) and suppressing anything below `filter`.
    pub fn new(out: W, label: impl Into<String>, filter: Level) -> Self {
        Self {
            out,
            label: label.into(),
            filter,
        }
    }

    /// Logs `message` at `level` if it passes the configured filter.
    ///
    /// Format: `<ISO-8601 UTC> <label> <pid> <LEVEL> <message>`.
    pub fn log(&mut self, level: Level, message: &str) {
        if level < self.filter {
            return;
        }

        let _ = writeln!(
            self.out,
            "{} {} {} {} {}",
            iso8601_now(),
            self.label,
            std::process::id(),
            level.as_str(),
            message
        );
    }

    /// TRACE-logs one wire-direction line (an input line or an emitted
    /// body chunk), prefixed with a direction marker as required by 4.K.
    pub fn trace_wire(&mut self, direction: Direction, bytes: &[u8]) {
        if Level::Trace < self.filter {
            return;
        }
        let marker = match direction {
            Direction::In => "<-",
            Direction::Out => "->",
        };
        self.log(Level::Trace, &format!("{marker} {}", String::from_utf8_lossy(bytes)));
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Direction marker for [`Logger::trace_wire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

/// Hand-rolled RFC 3339 / ISO-8601 UTC timestamp (`YYYY-MM-DDTHH:MM:SSZ`).
///
/// No `chrono`/`time` dependency: the core already computes the RFC 1123
/// `Date` header by hand (see [`crate::response::rfc1123_date`]), and this
/// reuses the same civil-from-days algorithm.
fn iso8601_now() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let (y, mo, d, h, mi, s) = crate::response::civil_from_unix(secs);
    format!("{y:04}-{mo:02}-{d:02}T{h:02}:{mi:02}:{s:02}Z")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_below_threshold() {
        let mut buf = Vec::new();
        let mut logger = Logger::new(&mut buf, "(stdio)", Level::Warn);
        logger.log(Level::Info, "ignored");
        logger.log(Level::Error, "kept");
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("ERROR kept"));
    }

    #[test]
    fn line_shape() {
        let mut buf = Vec::new();
        let mut logger = Logger::new(&mut buf, "conn-1", Level::Trace);
        logger.log(Level::Warn, "malformed start-line");
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("conn-1"));
        assert!(text.contains("WARN"));
        assert!(text.contains("malformed start-line"));
    }

    #[test]
    fn level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Fatal > Level::Error);
    }
}
