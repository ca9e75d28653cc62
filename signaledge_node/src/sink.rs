//! External collaborator seams: indicator and display sinks.
//!
//! Both sinks receive best-effort, fire-and-forget notifications once per
//! tick. A failing sink never propagates into the engine; delivery errors
//! are logged and dropped.

use crate::error::SinkError;
use signaledge::consts::DISPLAY_MAX_LEN;
use tracing::{debug, info};

/// Indicator signals derived from the record once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorSignals {
    /// Always on while the engine runs.
    pub power: bool,
    /// Alert flag.
    pub fault: bool,
    /// Temperature sitting exactly on the threshold.
    pub nominal_high: bool,
    /// No alert and temperature off the threshold.
    pub nominal_ok: bool,
}

/// Consumer of the per-tick indicator signals (e.g. a GPIO LED bank).
pub trait IndicatorSink: Send {
    /// Push the four signals. No acknowledgment is expected.
    fn set_indicators(&mut self, signals: IndicatorSignals) -> Result<(), SinkError>;
}

/// Consumer of the per-tick status line (e.g. a small text display).
pub trait DisplaySink: Send {
    /// Push one status line, at most `DISPLAY_MAX_LEN` bytes.
    fn show(&mut self, line: &str) -> Result<(), SinkError>;
}

/// Indicator sink that writes the signals to the log.
#[derive(Debug, Default)]
pub struct LogIndicatorSink;

impl IndicatorSink for LogIndicatorSink {
    fn set_indicators(&mut self, signals: IndicatorSignals) -> Result<(), SinkError> {
        debug!(
            power = signals.power,
            fault = signals.fault,
            nominal_high = signals.nominal_high,
            nominal_ok = signals.nominal_ok,
            "indicators"
        );
        Ok(())
    }
}

/// Display sink that writes the status line to the log.
#[derive(Debug, Default)]
pub struct LogDisplaySink;

impl DisplaySink for LogDisplaySink {
    fn show(&mut self, line: &str) -> Result<(), SinkError> {
        info!(display = line);
        Ok(())
    }
}

/// Truncate a status line to the display limit on a char boundary.
pub fn clip_display_line(line: &str) -> &str {
    if line.len() <= DISPLAY_MAX_LEN {
        return line;
    }
    let mut end = DISPLAY_MAX_LEN;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_lines_pass_through() {
        assert_eq!(clip_display_line("Temp:25C Fan:0 OK"), "Temp:25C Fan:0 OK");
    }

    #[test]
    fn long_lines_are_clipped() {
        let long = "x".repeat(100);
        assert_eq!(clip_display_line(&long).len(), DISPLAY_MAX_LEN);
    }

    #[test]
    fn clipping_respects_char_boundaries() {
        let line = format!("{}°°°", "x".repeat(DISPLAY_MAX_LEN - 1));
        let clipped = clip_display_line(&line);
        assert!(clipped.len() <= DISPLAY_MAX_LEN);
        assert!(clipped.is_char_boundary(clipped.len()));
    }
}
