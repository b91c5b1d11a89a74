//! RTP timestamp bookkeeping and RTCP Sender Report scheduling.

use std::time::Duration;

/// Default spacing between RTCP Sender Reports.
pub const DEFAULT_RTCP_INTERVAL: Duration = Duration::from_secs(5);

/// Media clock for one stream.
///
/// Every access unit advances the timestamp by a fixed sample count
/// (1024 for AAC), whatever the sampling rate. Wall-clock time fed in
/// through [`add_elapsed`](Self::add_elapsed) decides when the next
/// Sender Report is due; the very first access unit always gets one.
#[derive(Debug)]
pub struct RtpClock {
    timestamp: u64,
    increment: u32,
    report_interval: Duration,
    since_report: Option<Duration>,
}

impl RtpClock {
    pub fn new(start: u64, increment: u32, report_interval: Duration) -> Self {
        Self {
            timestamp: start,
            increment,
            report_interval,
            since_report: None,
        }
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Step to the next access unit and return its timestamp.
    pub fn advance(&mut self) -> u64 {
        self.timestamp = self.timestamp.wrapping_add(self.increment as u64);
        self.timestamp
    }

    pub fn add_elapsed(&mut self, elapsed: Duration) {
        if let Some(since) = self.since_report.as_mut() {
            *since += elapsed;
        }
    }

    pub fn report_due(&self) -> bool {
        self.since_report
            .is_none_or(|since| since > self.report_interval)
    }

    pub fn mark_reported(&mut self) {
        self.since_report = Some(Duration::ZERO);
    }
}
