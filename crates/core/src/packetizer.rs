use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};

use parking_lot::Mutex;

use crate::clock::{DEFAULT_RTCP_INTERVAL, RtpClock};
use crate::error::{AacRtpError, Result, WorkerExit};
use crate::media::aac::{AacPayloader, DEFAULT_MAX_PACKET_SIZE, SAMPLES_PER_FRAME};
use crate::media::adts::{AdtsHeader, AdtsReader};
use crate::pacing::{DEFAULT_STATS_WINDOW, Pacer};
use crate::source::{AdtsSource, CloseHandle};
use crate::transport::{RtpTransport, SenderReporter};

/// Sampling rate assumed until [`AacAdtsPacketizer::set_sampling_rate`] is called.
pub const DEFAULT_SAMPLING_RATE: u32 = 8000;

/// Packetizer tuning knobs.
#[derive(Debug, Clone)]
pub struct PacketizerConfig {
    /// Upper bound on a whole RTP packet, RTP header included.
    pub max_packet_size: usize,
    /// Spacing between RTCP Sender Reports.
    pub rtcp_interval: Duration,
    /// RTP timestamp increment per access unit.
    pub samples_per_frame: u32,
    /// Number of inter-frame intervals kept for the moving average.
    pub stats_window: usize,
}

impl Default for PacketizerConfig {
    fn default() -> Self {
        Self {
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            rtcp_interval: DEFAULT_RTCP_INTERVAL,
            samples_per_frame: SAMPLES_PER_FRAME,
            stats_window: DEFAULT_STATS_WINDOW,
        }
    }
}

/// Outcome of the most recent worker run, written when the worker exits.
#[derive(Debug, Default)]
struct RunRecord {
    exit: Option<WorkerExit>,
    rtp_timestamp: u64,
}

struct Worker {
    handle: JoinHandle<()>,
    cancel: Arc<AtomicBool>,
    closer: Box<dyn CloseHandle>,
}

/// ADTS to RTP (RFC 3640 aac-hbr) packetizer.
///
/// Runs one background thread that drains an ADTS byte source, sends each
/// access unit as one or more RTP packets, emits an RTCP Sender Report
/// every few seconds and paces itself to the audio rate.
///
/// ```text
/// start()            stop()
/// Stopped ───────▶ Running ───────▶ Stopped
///                     │ EOF / I/O error / corrupt frame
///                     └──────────────▶ Stopped (worker exits on its own)
/// ```
///
/// A source is consumed by a run: install a fresh one with
/// [`set_source`](Self::set_source) before starting again. The transport,
/// reporter and RTP timestamp carry over between runs.
pub struct AacAdtsPacketizer {
    config: PacketizerConfig,
    sampling_rate: u32,
    source: Option<Box<dyn AdtsSource>>,
    transport: Arc<Mutex<Box<dyn RtpTransport>>>,
    reporter: Arc<Mutex<Box<dyn SenderReporter>>>,
    record: Arc<Mutex<RunRecord>>,
    worker: Option<Worker>,
}

impl AacAdtsPacketizer {
    pub fn new(
        transport: impl RtpTransport + 'static,
        reporter: impl SenderReporter + 'static,
    ) -> Self {
        Self::with_config(transport, reporter, PacketizerConfig::default())
    }

    pub fn with_config(
        transport: impl RtpTransport + 'static,
        reporter: impl SenderReporter + 'static,
        config: PacketizerConfig,
    ) -> Self {
        Self {
            config,
            sampling_rate: DEFAULT_SAMPLING_RATE,
            source: None,
            transport: Arc::new(Mutex::new(Box::new(transport))),
            reporter: Arc::new(Mutex::new(Box::new(reporter))),
            record: Arc::new(Mutex::new(RunRecord::default())),
            worker: None,
        }
    }

    /// Install the ADTS byte source for the next run.
    pub fn set_source(&mut self, source: impl AdtsSource + 'static) -> Result<()> {
        if self.is_running() {
            return Err(AacRtpError::AlreadyRunning);
        }
        self.source = Some(Box::new(source));
        Ok(())
    }

    /// Audio sampling rate used for pacing. Rejected while running.
    pub fn set_sampling_rate(&mut self, sampling_rate: u32) -> Result<()> {
        if self.is_running() {
            return Err(AacRtpError::AlreadyRunning);
        }
        if sampling_rate == 0 {
            return Err(AacRtpError::InvalidSamplingRate(sampling_rate));
        }
        tracing::debug!(sampling_rate, "sampling rate configured");
        self.sampling_rate = sampling_rate;
        Ok(())
    }

    pub fn sampling_rate(&self) -> u32 {
        self.sampling_rate
    }

    /// Spawn the worker. Does nothing if a worker is already running.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            tracing::debug!("packetizer already running, start ignored");
            return Ok(());
        }
        self.reap();

        let payloader = AacPayloader::new(self.config.max_packet_size)?;
        let source = self.source.take().ok_or(AacRtpError::NoSource)?;
        let closer = source.close_handle()?;
        let cancel = Arc::new(AtomicBool::new(false));

        let start_ts = {
            let mut record = self.record.lock();
            record.exit = None;
            record.rtp_timestamp
        };

        let mut worker_loop = WorkerLoop {
            reader: AdtsReader::new(source),
            payloader,
            clock: RtpClock::new(
                start_ts,
                self.config.samples_per_frame,
                self.config.rtcp_interval,
            ),
            pacer: Pacer::new(
                self.sampling_rate,
                self.config.samples_per_frame,
                self.config.stats_window,
            ),
            transport: self.transport.clone(),
            reporter: self.reporter.clone(),
            cancel: cancel.clone(),
            sampling_rate: self.sampling_rate,
            rate_checked: false,
        };
        let record = self.record.clone();

        let handle = thread::Builder::new()
            .name("aac-rtp-packetizer".into())
            .spawn(move || {
                let exit = worker_loop.run();
                let mut record = record.lock();
                record.rtp_timestamp = worker_loop.clock.timestamp();
                record.exit = Some(exit);
            })?;

        tracing::info!(
            sampling_rate = self.sampling_rate,
            max_packet_size = self.config.max_packet_size,
            "AAC packetizer started"
        );

        self.worker = Some(Worker {
            handle,
            cancel,
            closer,
        });
        Ok(())
    }

    /// Stop the worker and wait for it to exit.
    ///
    /// Closes the source first so a blocked read fails, then wakes the
    /// worker if it is pacing. Safe to call when not running.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        worker.cancel.store(true, Ordering::SeqCst);
        worker.closer.close();
        worker.handle.thread().unpark();

        if worker.handle.join().is_err() {
            tracing::error!("packetizer worker panicked");
        }
        tracing::info!(exit = ?self.last_exit(), "AAC packetizer stopped");
    }

    /// Whether the worker thread is alive.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }

    /// How the most recent run ended, once it has ended.
    pub fn last_exit(&self) -> Option<WorkerExit> {
        self.record.lock().exit.clone()
    }

    /// Timestamp of the last access unit sent.
    pub fn rtp_timestamp(&self) -> u64 {
        self.record.lock().rtp_timestamp
    }

    /// Join a worker that already exited on its own.
    fn reap(&mut self) {
        if let Some(worker) = self.worker.take()
            && worker.handle.join().is_err()
        {
            tracing::error!("packetizer worker panicked");
        }
    }
}

impl Drop for AacAdtsPacketizer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State owned by the worker thread for one run.
struct WorkerLoop {
    reader: AdtsReader<Box<dyn AdtsSource>>,
    payloader: AacPayloader,
    clock: RtpClock,
    pacer: Pacer,
    transport: Arc<Mutex<Box<dyn RtpTransport>>>,
    reporter: Arc<Mutex<Box<dyn SenderReporter>>>,
    cancel: Arc<AtomicBool>,
    sampling_rate: u32,
    rate_checked: bool,
}

impl WorkerLoop {
    fn run(&mut self) -> WorkerExit {
        let result = self.run_until_cancelled();
        let cancelled = self.cancel.load(Ordering::SeqCst);

        match result {
            Ok(()) => WorkerExit::Cancelled,
            Err(AacRtpError::CorruptFrame {
                frame_length,
                header_len,
            }) => {
                tracing::error!(
                    frame_length,
                    header_len,
                    ts = self.clock.timestamp(),
                    "corrupt ADTS header, packetizer giving up"
                );
                WorkerExit::Corrupt {
                    frame_length,
                    header_len,
                }
            }
            Err(e) if cancelled => {
                tracing::debug!(error = %e, "read interrupted by stop");
                WorkerExit::Cancelled
            }
            Err(AacRtpError::StreamClosed) => {
                tracing::info!("ADTS input ended");
                WorkerExit::StreamClosed
            }
            Err(e) => {
                tracing::warn!(error = %e, "packetizer terminated");
                WorkerExit::StreamClosed
            }
        }
    }

    fn run_until_cancelled(&mut self) -> Result<()> {
        while !self.cancel.load(Ordering::SeqCst) {
            let header = self.reader.next_header()?;
            self.check_sampling_rate(&header);

            let packets = self.send_access_unit(&header)?;

            let decision = self
                .pacer
                .checkpoint(Instant::now(), header.aac_frame_count, packets);
            self.clock.add_elapsed(decision.interval);

            if let Some(sleep) = decision.sleep
                && !sleep_unless_cancelled(&self.cancel, sleep)
            {
                break;
            }
        }
        Ok(())
    }

    /// Timestamp, optional Sender Report, then the fragments of one AU.
    fn send_access_unit(&mut self, header: &AdtsHeader) -> Result<usize> {
        let ts = self.clock.advance();
        let mut transport = self.transport.lock();
        transport.set_timestamp(ts);

        if self.clock.report_due() {
            let mut reporter = self.reporter.lock();
            reporter.set_ntp_timestamp(SystemTime::now());
            reporter.set_rtp_timestamp(ts);
            reporter.send()?;
            self.clock.mark_reported();
            tracing::debug!(
                ts,
                avg_interval_us = self.pacer.average_interval().as_micros() as u64,
                "RTCP sender report due"
            );
        }

        let packets =
            self.payloader
                .send_access_unit(&mut self.reader, header.frame_length, &mut **transport)?;

        tracing::trace!(
            frame_length = header.frame_length,
            aac_frames = header.aac_frame_count,
            packets,
            ts,
            "access unit sent"
        );
        Ok(packets)
    }

    fn check_sampling_rate(&mut self, header: &AdtsHeader) {
        if self.rate_checked {
            return;
        }
        self.rate_checked = true;
        match header.sampling_rate() {
            Some(rate) if rate != self.sampling_rate => tracing::warn!(
                stream_rate = rate,
                configured_rate = self.sampling_rate,
                "ADTS sampling rate differs from configured rate"
            ),
            _ => {}
        }
    }
}

/// Sleep for `duration` unless `cancel` is raised. Returns false when cancelled.
///
/// [`AacAdtsPacketizer::stop`] unparks the worker thread to cut the wait short.
fn sleep_unless_cancelled(cancel: &AtomicBool, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if cancel.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::park_timeout(deadline - now);
    }
}
