//! Background read loop for a [`PtyProcess`].

use crate::error::PtyIoError;
use crate::pty_process::PtyProcess;
use crate::types::{StreamEnd, TermSize};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Name of the per-session output thread.
pub const READER_THREAD_NAME: &str = "sshui-pty-reader";

/// How long `stop` waits for the read loop before detaching it.
const READER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

struct ReaderThread {
    handle: JoinHandle<()>,
    done: Receiver<()>,
}

/// Drives one [`PtyProcess`]: output is pumped to a callback on a dedicated
/// thread, input and resizes are forwarded from the caller's thread.
///
/// `on_bytes` receives chunks in arrival order. `on_end` runs exactly once,
/// on the read thread, after the last chunk. Both run off the caller's
/// thread, so they usually hand data to a channel.
pub struct SessionIo {
    pty: Arc<PtyProcess>,
    stop_requested: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    reader: Mutex<Option<ReaderThread>>,
}

impl SessionIo {
    /// Take ownership of `pty` and start its read loop.
    pub fn start<B, E>(pty: PtyProcess, mut on_bytes: B, on_end: E) -> Result<Self, PtyIoError>
    where
        B: FnMut(Vec<u8>) + Send + 'static,
        E: FnOnce(StreamEnd) + Send + 'static,
    {
        let mut output = pty.read()?;
        let pty = Arc::new(pty);
        let stop_requested = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let (done_tx, done) = mpsc::channel();

        let stop_flag = stop_requested.clone();
        let finished_flag = finished.clone();
        let pid = pty.pid();

        let handle = thread::Builder::new()
            .name(READER_THREAD_NAME.into())
            .spawn(move || {
                for chunk in output.by_ref() {
                    if stop_flag.load(Ordering::Acquire) {
                        break;
                    }
                    on_bytes(chunk);
                }

                let reason = if stop_flag.load(Ordering::Acquire) {
                    StreamEnd::Stopped
                } else {
                    output.end_reason().cloned().unwrap_or(StreamEnd::Eof)
                };
                drop(output);
                tracing::debug!(pid = ?pid, %reason, "Pty read loop finished");

                finished_flag.store(true, Ordering::Release);
                on_end(reason);
                let _ = done_tx.send(());
            })
            .map_err(PtyIoError::ReadLoop)?;

        Ok(Self {
            pty,
            stop_requested,
            finished,
            reader: Mutex::new(Some(ReaderThread { handle, done })),
        })
    }

    /// Send input bytes to the process, verbatim.
    pub fn forward_input(&self, bytes: &[u8]) -> Result<(), PtyIoError> {
        self.pty.write(bytes)
    }

    pub fn forward_resize(&self, size: TermSize) -> Result<(), PtyIoError> {
        self.pty.resize(size)
    }

    /// Window size as the process sees it.
    pub fn window_size(&self) -> Result<TermSize, PtyIoError> {
        self.pty.window_size()
    }

    pub fn pid(&self) -> Option<u32> {
        self.pty.pid()
    }

    pub fn command(&self) -> &[String] {
        self.pty.command()
    }

    pub fn has_exited(&self) -> bool {
        self.pty.has_exited()
    }

    /// The read loop is still delivering output.
    pub fn is_running(&self) -> bool {
        !self.finished.load(Ordering::Acquire) && !self.stop_requested.load(Ordering::Acquire)
    }

    /// Stop the read loop and terminate the process. Idempotent.
    ///
    /// Safe to call from inside `on_bytes` or `on_end`: the read thread is
    /// not joined from itself.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        // Killing the child hangs up the pty, ending the pending read.
        self.pty.terminate();

        let Some(reader) = self.reader.lock().take() else {
            return;
        };
        if reader.handle.thread().id() == thread::current().id() {
            tracing::trace!(pid = ?self.pid(), "stop called from the read loop");
            return;
        }

        match reader.done.recv_timeout(READER_JOIN_TIMEOUT) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if reader.handle.join().is_err() {
                    tracing::warn!(pid = ?self.pid(), "Pty read loop panicked");
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(pid = ?self.pid(), "Pty read loop did not finish, detaching");
            }
        }
    }
}

impl Drop for SessionIo {
    fn drop(&mut self) {
        self.stop();
    }
}
