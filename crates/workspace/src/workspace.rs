//! Session management for SSH-UI.
//!
//! A [`Workspace`] owns every open session. Each session's read loop runs on
//! its own thread and posts [`SessionEvent`]s to the workspace, which applies
//! them on the caller's thread: output goes to the session's surface, and a
//! finished stream closes the session.

mod placement;
mod registry;
mod session_window;
mod surface;

pub use placement::{centered_in, place, Bounds};
pub use registry::{SessionId, SessionRegistry};
pub use session_window::{default_title, SessionWindow};
pub use surface::{InputSink, Surface};

use platform::PtySupport;
use settings::Config;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use terminal::{PtyIoError, SpawnError, StreamEnd, TermSize};

/// A request to open a session window.
#[derive(Clone, Debug, PartialEq)]
pub struct OpenRequest {
    /// Program and arguments, run as-is.
    pub command: Vec<String>,
    pub title: Option<String>,
    /// Screen of the window the request came from, for centering.
    pub parent_screen: Option<Bounds>,
}

impl OpenRequest {
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            title: None,
            parent_screen: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn on_screen(mut self, screen: Bounds) -> Self {
        self.parent_screen = Some(screen);
        self
    }
}

/// Posted by a session's read loop.
#[derive(Debug)]
pub enum SessionEvent {
    Output { id: SessionId, data: Vec<u8> },
    Ended { id: SessionId, reason: StreamEnd },
}

/// Owns the open sessions and applies their events.
pub struct Workspace {
    config: Config,
    support: PtySupport,
    registry: SessionRegistry,
    events_tx: Sender<SessionEvent>,
    events_rx: Receiver<SessionEvent>,
}

impl Workspace {
    pub fn new(config: Config) -> Self {
        Self::with_pty_support(config, platform::pty_support())
    }

    pub fn with_pty_support(config: Config, support: PtySupport) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        tracing::debug!(%support, "Workspace created");
        Self {
            config,
            support,
            registry: SessionRegistry::new(),
            events_tx,
            events_rx,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pty_support(&self) -> PtySupport {
        self.support
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn session(&self, id: SessionId) -> Option<&SessionWindow> {
        self.registry.get(id)
    }

    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    /// Whether the application should keep running.
    pub fn has_open_sessions(&self) -> bool {
        !self.registry.is_empty()
    }

    /// Open a session window for `request`, displayed on `surface`.
    ///
    /// On error nothing is registered and no process is left running.
    pub fn open_session(
        &mut self,
        request: OpenRequest,
        surface: Box<dyn Surface>,
    ) -> Result<SessionId, SpawnError> {
        let id = SessionId::new();
        let window = SessionWindow::open(
            id,
            request,
            surface,
            self.support,
            &self.config,
            &self.events_tx,
        )?;
        self.registry.register(window);
        Ok(id)
    }

    /// Close a session. Returns false if it was not open.
    pub fn close_session(&mut self, id: SessionId) -> bool {
        match self.registry.unregister(id) {
            Some(mut window) => {
                window.close();
                true
            }
            None => false,
        }
    }

    pub fn forward_input(&self, id: SessionId, bytes: &[u8]) -> Result<(), PtyIoError> {
        let window = self.registry.get(id).ok_or(PtyIoError::Closed)?;
        window.forward_input(bytes).inspect_err(|e| {
            tracing::warn!(session = %id, "Failed to forward input: {}", e);
        })
    }

    pub fn forward_resize(&mut self, id: SessionId, size: TermSize) -> Result<(), PtyIoError> {
        let window = self.registry.get_mut(id).ok_or(PtyIoError::Closed)?;
        window.forward_resize(size).inspect_err(|e| {
            tracing::warn!(session = %id, %size, "Failed to resize: {}", e);
        })
    }

    /// Apply every queued event without blocking. Returns how many there were.
    pub fn process_pending(&mut self) -> usize {
        let mut count = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            count += 1;
        }
        count
    }

    /// Block up to `timeout` for an event, then apply everything queued.
    pub fn wait_for_events(&mut self, timeout: Duration) -> usize {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => {
                self.handle_event(event);
                1 + self.process_pending()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Output { id, data } => match self.registry.get_mut(id) {
                Some(window) => window.write_output(&data),
                None => tracing::trace!(session = %id, len = data.len(), "Output for closed session"),
            },
            SessionEvent::Ended { id, reason } => {
                if self.registry.contains(id) {
                    tracing::info!(session = %id, %reason, "Session ended");
                    self.close_session(id);
                }
            }
        }
    }

    /// Close every session.
    pub fn shutdown(&mut self) {
        let windows: Vec<SessionWindow> = self.registry.drain().collect();
        if windows.is_empty() {
            return;
        }
        tracing::info!(count = windows.len(), "Closing all sessions");
        for mut window in windows {
            window.close();
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.shutdown();
    }
}
