//! Real-time pacing of packet emission.
//!
//! An encoder pipe can deliver several access units at once. Sending them
//! back to back would burst the network, so after each access unit the
//! worker sleeps long enough to bring the inter-unit interval up to two
//! thirds of the audio duration the unit represents.
//!
//! `measured` is the wall-clock time between two consecutive checkpoints,
//! so it includes the previous sleep. When the previous corrected value
//! fell short of the two-thirds target, that shortfall is subtracted from
//! the current measurement before deciding how long to sleep.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Initial value of the previous-measurement slot, large enough that the
/// first access unit gets no correction.
const INITIAL_LAST_MEASURED_MS: i64 = 5000;

pub const DEFAULT_STATS_WINDOW: usize = 50;

/// Moving average over the most recent inter-frame intervals.
#[derive(Debug)]
pub struct IntervalStats {
    window: VecDeque<Duration>,
    capacity: usize,
    sum: Duration,
    nominal: Duration,
}

impl IntervalStats {
    /// `nominal` is reported until the first sample arrives.
    pub fn new(capacity: usize, nominal: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            sum: Duration::ZERO,
            nominal,
        }
    }

    pub fn push(&mut self, interval: Duration) {
        if self.window.len() == self.capacity
            && let Some(oldest) = self.window.pop_front()
        {
            self.sum -= oldest;
        }
        self.window.push_back(interval);
        self.sum += interval;
    }

    pub fn average(&self) -> Duration {
        if self.window.is_empty() {
            return self.nominal;
        }
        self.sum / self.window.len() as u32
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

/// Outcome of one pacing checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaceDecision {
    /// Raw wall-clock time since the previous checkpoint.
    pub interval: Duration,
    /// Nominal per-packet duration of this access unit, in ms.
    pub expected_ms: i64,
    /// Measurement after the shortfall correction, in ms.
    pub corrected_ms: i64,
    pub sleep: Option<Duration>,
}

#[derive(Debug)]
pub struct Pacer {
    sampling_rate: u32,
    samples_per_frame: u32,
    last_checkpoint: Instant,
    last_measured_ms: i64,
    stats: IntervalStats,
}

impl Pacer {
    pub fn new(sampling_rate: u32, samples_per_frame: u32, stats_window: usize) -> Self {
        let nominal = Duration::from_nanos(
            samples_per_frame as u64 * 1_000_000_000 / sampling_rate.max(1) as u64,
        );
        Self {
            sampling_rate,
            samples_per_frame,
            last_checkpoint: Instant::now(),
            last_measured_ms: INITIAL_LAST_MEASURED_MS,
            stats: IntervalStats::new(stats_window, nominal),
        }
    }

    /// Nominal milliseconds per packet:
    /// `aac_frame_count * samples_per_frame * 1000 / (packet_count * sampling_rate)`.
    pub fn expected_ms(&self, aac_frame_count: u8, packet_count: usize) -> i64 {
        let num = aac_frame_count as i64 * self.samples_per_frame as i64 * 1000;
        let den = packet_count.max(1) as i64 * self.sampling_rate.max(1) as i64;
        num / den
    }

    /// Correct `measured_ms` and decide how long to sleep.
    ///
    /// Returns the corrected measurement and the sleep, if any. The
    /// corrected value becomes the reference for the next call.
    pub fn decide(&mut self, measured_ms: i64, expected_ms: i64) -> (i64, Option<Duration>) {
        let target = 2 * expected_ms / 3;
        let mut measured = measured_ms;
        if self.last_measured_ms < target {
            measured -= target - self.last_measured_ms;
        }
        self.last_measured_ms = measured;

        let sleep = (measured < target).then(|| Duration::from_millis((target - measured) as u64));
        (measured, sleep)
    }

    /// Close the measurement window for one access unit.
    pub fn checkpoint(
        &mut self,
        now: Instant,
        aac_frame_count: u8,
        packet_count: usize,
    ) -> PaceDecision {
        let interval = now.saturating_duration_since(self.last_checkpoint);
        self.last_checkpoint = now;
        self.stats.push(interval);

        let expected_ms = self.expected_ms(aac_frame_count, packet_count);
        let (corrected_ms, sleep) = self.decide(interval.as_millis() as i64, expected_ms);

        tracing::trace!(
            measured_ms = interval.as_millis() as u64,
            expected_ms,
            corrected_ms,
            sleep_ms = sleep.map(|d| d.as_millis() as u64),
            "pacing checkpoint"
        );

        PaceDecision {
            interval,
            expected_ms,
            corrected_ms,
            sleep,
        }
    }

    /// Moving average of recent inter-frame intervals.
    pub fn average_interval(&self) -> Duration {
        self.stats.average()
    }
}
