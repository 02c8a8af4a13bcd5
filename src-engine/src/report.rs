//! Human-readable status lines for the reporting collaborator.

use std::fmt;
use std::io::Write;

use tracing::info;

use crate::device::DeviceId;

/// Number of segments in the rendered volume bar.
const BAR_SEGMENTS: u32 = 10;

/// A status observation emitted by the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// The link reached `Linked`; carries the playback device id.
    LinkReady { device: DeviceId },
    /// A link attempt failed.
    LinkFailed { reason: String },
    /// The bridge volume changed.
    Volume { level: f32, muted: bool },
}

impl Report {
    /// Volume report for the level actually applied to playback.
    pub fn volume(level: f32, muted: bool) -> Self {
        Report::Volume { level, muted }
    }
}

/// Rounded percentage of an effective volume level.
pub fn volume_percent(level: f32) -> u32 {
    (level.clamp(0.0, 1.0) * 100.0).round() as u32
}

/// Render a 10-segment bar: one filled segment per full 10%.
pub fn volume_bar(percent: u32) -> String {
    let filled = (percent / 10).min(BAR_SEGMENTS);
    let mut bar = String::with_capacity(BAR_SEGMENTS as usize * 3);
    for i in 0..BAR_SEGMENTS {
        bar.push(if i < filled { '●' } else { '○' });
    }
    bar
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::LinkReady { device } => write!(f, "link ready: {}", device),
            Report::LinkFailed { reason } => write!(f, "link failed: {}", reason),
            Report::Volume { level, muted } => {
                let effective = if *muted { 0.0 } else { *level };
                let percent = volume_percent(effective);
                write!(f, "volume: [{}] {}%", volume_bar(percent), percent)
            }
        }
    }
}

/// Sink for status reports.
pub trait Reporter: Send + Sync {
    fn report(&self, report: Report);
}

/// Writes each report as a line on stdout and mirrors it to the log.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, report: Report) {
        let line = report.to_string();
        info!("[Report] {}", line);
        let mut stdout = std::io::stdout().lock();
        // stdout closed: the log line above is all we can do
        let _ = writeln!(stdout, "{}", line);
        let _ = stdout.flush();
    }
}
