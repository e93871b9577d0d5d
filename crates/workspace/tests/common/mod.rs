//! Shared helpers for session integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use sshui_workspace::{InputSink, Surface, Workspace};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use terminal::TermSize;

pub use tempfile::{tempdir, TempDir};

/// Default timeout for waiting on a child process.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Poll interval for the workspace event loop.
pub const TICK: Duration = Duration::from_millis(20);

/// What a [`RecordingSurface`] has seen. Cloned handles share state with the
/// surface after it has been boxed into a workspace.
#[derive(Clone, Default)]
pub struct SurfaceLog {
    output: Arc<Mutex<Vec<u8>>>,
    title: Arc<Mutex<Option<String>>>,
    sink: Arc<Mutex<Option<InputSink>>>,
    closed: Arc<AtomicUsize>,
}

impl SurfaceLog {
    pub fn output(&self) -> Vec<u8> {
        self.output.lock().clone()
    }

    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output.lock()).into_owned()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.output_text().contains(needle)
    }

    pub fn title(&self) -> Option<String> {
        self.title.lock().clone()
    }

    pub fn sink(&self) -> Option<InputSink> {
        self.sink.lock().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

/// A surface that records everything it is given.
pub struct RecordingSurface {
    size: TermSize,
    log: SurfaceLog,
}

impl RecordingSurface {
    pub fn new(size: TermSize) -> (Box<dyn Surface>, SurfaceLog) {
        let log = SurfaceLog::default();
        let surface = Self {
            size,
            log: log.clone(),
        };
        (Box::new(surface), log)
    }
}

impl Surface for RecordingSurface {
    fn write(&mut self, bytes: &[u8]) {
        self.log.output.lock().extend_from_slice(bytes);
    }

    fn size(&self) -> TermSize {
        self.size
    }

    fn attach(&mut self, sink: InputSink) {
        *self.log.sink.lock() = Some(sink);
    }

    fn set_title(&mut self, title: &str) {
        *self.log.title.lock() = Some(title.to_string());
    }

    fn on_close(&mut self) {
        self.log.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Run the workspace event loop until `done` holds or the timeout passes.
pub fn pump_until(workspace: &mut Workspace, mut done: impl FnMut(&Workspace) -> bool) -> bool {
    let deadline = Instant::now() + DEFAULT_TIMEOUT;
    while Instant::now() < deadline {
        workspace.wait_for_events(TICK);
        if done(workspace) {
            return true;
        }
    }
    false
}

pub fn argv(command: &[&str]) -> Vec<String> {
    command.iter().map(|s| s.to_string()).collect()
}

pub fn sh(script: &str) -> Vec<String> {
    argv(&["/bin/sh", "-c", script])
}
