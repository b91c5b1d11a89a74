//! Byte sources that feed the ADTS reader.
//!
//! A source is a plain [`Read`] plus a way to make a read that is blocked
//! on the worker thread fail from the controller thread. `stop()` relies
//! on that to tear down a worker waiting on a quiet encoder.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// Closes a source from another thread.
pub trait CloseHandle: Send + Sync {
    /// After this returns, pending and future reads on the source fail promptly.
    fn close(&self);
}

/// Input accepted by [`AacAdtsPacketizer`](crate::AacAdtsPacketizer).
pub trait AdtsSource: Read + Send {
    fn close_handle(&self) -> io::Result<Box<dyn CloseHandle>>;
}

impl AdtsSource for TcpStream {
    fn close_handle(&self) -> io::Result<Box<dyn CloseHandle>> {
        Ok(Box::new(TcpCloser(self.try_clone()?)))
    }
}

struct TcpCloser(TcpStream);

impl CloseHandle for TcpCloser {
    fn close(&self) {
        if let Err(e) = self.0.shutdown(Shutdown::Both) {
            tracing::debug!(error = %e, "TCP source shutdown");
        }
    }
}

/// Bytes a [`byte_queue`] holds before `push` blocks.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64 * 1024;

#[derive(Debug, Default)]
struct QueueState {
    bytes: VecDeque<u8>,
    finished: bool,
    closed: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<QueueState>,
    capacity: usize,
    ready: Condvar,
    space: Condvar,
}

impl Shared {
    fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.bytes.clear();
        self.ready.notify_all();
        self.space.notify_all();
    }
}

/// Create an in-memory byte pipe holding at most [`DEFAULT_QUEUE_CAPACITY`] bytes.
///
/// The writer half is usually fed by an encoder or a file pump thread;
/// the reader half is handed to the packetizer. Dropping the writer marks
/// end-of-stream: the reader drains what is left, then returns `Ok(0)`.
/// Dropping or closing the reader makes further pushes fail with `BrokenPipe`.
pub fn byte_queue() -> (QueueWriter, QueueReader) {
    byte_queue_with_capacity(DEFAULT_QUEUE_CAPACITY)
}

/// [`byte_queue`] with an explicit capacity. A full queue blocks the writer
/// until the reader drains it.
pub fn byte_queue_with_capacity(capacity: usize) -> (QueueWriter, QueueReader) {
    let shared = Arc::new(Shared {
        state: Mutex::new(QueueState::default()),
        capacity: capacity.max(1),
        ready: Condvar::new(),
        space: Condvar::new(),
    });
    (
        QueueWriter {
            shared: shared.clone(),
        },
        QueueReader { shared },
    )
}

/// Producer half of [`byte_queue`].
#[derive(Debug)]
pub struct QueueWriter {
    shared: Arc<Shared>,
}

impl QueueWriter {
    /// Append bytes, waiting for room while the queue is full.
    ///
    /// Fails with `BrokenPipe` once the reader side is closed or dropped.
    pub fn push(&self, mut data: &[u8]) -> io::Result<()> {
        let mut state = self.shared.state.lock();
        loop {
            if state.closed {
                return Err(io::Error::from(io::ErrorKind::BrokenPipe));
            }
            if data.is_empty() {
                return Ok(());
            }
            let room = self.shared.capacity.saturating_sub(state.bytes.len());
            if room == 0 {
                self.shared.space.wait(&mut state);
                continue;
            }
            let n = room.min(data.len());
            state.bytes.extend(&data[..n]);
            data = &data[n..];
            self.shared.ready.notify_all();
        }
    }

    /// Mark end-of-stream.
    pub fn finish(&self) {
        self.shared.state.lock().finished = true;
        self.shared.ready.notify_all();
    }
}

impl Write for QueueWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.push(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for QueueWriter {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Consumer half of [`byte_queue`].
#[derive(Debug)]
pub struct QueueReader {
    shared: Arc<Shared>,
}

impl Read for QueueReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut state = self.shared.state.lock();
        loop {
            if state.closed {
                return Err(io::Error::new(
                    io::ErrorKind::ConnectionAborted,
                    "byte queue closed",
                ));
            }
            if !state.bytes.is_empty() {
                let n = buf.len().min(state.bytes.len());
                for (dst, src) in buf.iter_mut().zip(state.bytes.drain(..n)) {
                    *dst = src;
                }
                self.shared.space.notify_all();
                return Ok(n);
            }
            if state.finished {
                return Ok(0);
            }
            self.shared.ready.wait(&mut state);
        }
    }
}

impl Drop for QueueReader {
    fn drop(&mut self) {
        self.shared.close();
    }
}

impl AdtsSource for QueueReader {
    fn close_handle(&self) -> io::Result<Box<dyn CloseHandle>> {
        Ok(Box::new(QueueCloser {
            shared: self.shared.clone(),
        }))
    }
}

struct QueueCloser {
    shared: Arc<Shared>,
}

impl CloseHandle for QueueCloser {
    fn close(&self) {
        self.shared.close();
    }
}
