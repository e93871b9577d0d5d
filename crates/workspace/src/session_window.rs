//! One open connection: a pty session bound to its surface.

use crate::placement::{self, Bounds};
use crate::registry::SessionId;
use crate::surface::{InputSink, Surface};
use crate::{OpenRequest, SessionEvent};
use platform::PtySupport;
use settings::Config;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use terminal::{PtyIoError, PtyProcess, SessionIo, SpawnError, SpawnOptions, TermSize};

/// Window title for `command` when the request does not name one.
pub fn default_title(command: &[String]) -> String {
    match command.last() {
        Some(target) => format!("SSH to {}", target),
        None => "SSH".to_string(),
    }
}

fn spawn_options(config: &Config) -> SpawnOptions {
    SpawnOptions {
        term: config.term.clone(),
        env: config
            .env
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        working_dir: None,
        terminate_grace: config.terminate_grace(),
        read_buffer_size: config.read_buffer_size,
    }
}

/// Size for the new pty. Surfaces report zero until they are laid out.
fn initial_size(reported: TermSize, config: &Config) -> TermSize {
    if reported.is_valid() {
        reported
    } else {
        TermSize::new(config.default_rows, config.default_cols)
    }
}

/// A session window. Owns the process (through [`SessionIo`]) and the
/// surface that displays it.
///
/// On a platform without pty support the window is informational: it shows
/// a notice and has no process.
pub struct SessionWindow {
    id: SessionId,
    title: String,
    command: Vec<String>,
    io: Option<Arc<SessionIo>>,
    surface: Option<Box<dyn Surface>>,
    bounds: Bounds,
    size: TermSize,
    closed: bool,
}

impl SessionWindow {
    /// Spawn the requested command and wire it to `surface`.
    ///
    /// Output and end-of-stream are posted to `events` tagged with `id`.
    pub fn open(
        id: SessionId,
        request: OpenRequest,
        mut surface: Box<dyn Surface>,
        support: PtySupport,
        config: &Config,
        events: &Sender<SessionEvent>,
    ) -> Result<Self, SpawnError> {
        if request.command.first().map_or(true, String::is_empty) {
            return Err(SpawnError::EmptyCommand);
        }

        let OpenRequest {
            command,
            title,
            parent_screen,
        } = request;
        let title = title.unwrap_or_else(|| default_title(&command));
        let size = initial_size(surface.size(), config);
        let bounds = placement::place(parent_screen, config.window_width, config.window_height);

        let io = match PtyProcess::spawn_with_support(
            support,
            &command,
            size,
            &spawn_options(config),
        ) {
            Ok(pty) => {
                let output_tx = events.clone();
                let end_tx = events.clone();
                let io = SessionIo::start(
                    pty,
                    move |data| {
                        let _ = output_tx.send(SessionEvent::Output { id, data });
                    },
                    move |reason| {
                        let _ = end_tx.send(SessionEvent::Ended { id, reason });
                    },
                )
                .map_err(|e| SpawnError::Io(e.into()))?;
                let io = Arc::new(io);
                surface.attach(InputSink::new(id, &io));
                tracing::info!(session = %id, pid = ?io.pid(), %size, "Opened session {:?}", title);
                Some(io)
            }
            Err(SpawnError::Unsupported(e)) => {
                tracing::info!(session = %id, "{}", e);
                surface.write(format!("{}\r\n", e).as_bytes());
                None
            }
            Err(e) => return Err(e),
        };
        surface.set_title(&title);

        Ok(Self {
            id,
            title,
            command,
            io,
            surface: Some(surface),
            bounds,
            size,
            closed: false,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Current size of the session's terminal.
    pub fn size(&self) -> TermSize {
        self.io
            .as_ref()
            .and_then(|io| io.window_size().ok())
            .unwrap_or(self.size)
    }

    pub fn pid(&self) -> Option<u32> {
        self.io.as_ref().and_then(|io| io.pid())
    }

    /// Showing the unsupported-platform notice, no process behind it.
    pub fn is_informational(&self) -> bool {
        self.io.is_none() && !self.closed
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn has_exited(&self) -> bool {
        self.io.as_ref().is_some_and(|io| io.has_exited())
    }

    /// Hand output to the surface.
    pub fn write_output(&mut self, data: &[u8]) {
        if let Some(surface) = self.surface.as_mut() {
            surface.write(data);
        }
    }

    pub fn forward_input(&self, bytes: &[u8]) -> Result<(), PtyIoError> {
        if self.closed {
            return Err(PtyIoError::Closed);
        }
        match &self.io {
            Some(io) => io.forward_input(bytes),
            None => Ok(()),
        }
    }

    pub fn forward_resize(&mut self, size: TermSize) -> Result<(), PtyIoError> {
        if self.closed {
            return Err(PtyIoError::Closed);
        }
        if let Some(io) = &self.io {
            io.forward_resize(size)?;
        } else if !size.is_valid() {
            return Err(PtyIoError::InvalidSize {
                rows: size.rows,
                cols: size.cols,
            });
        }
        self.size = size;
        Ok(())
    }

    /// Stop the process and release the surface. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Some(io) = self.io.take() {
            io.stop();
        }
        if let Some(mut surface) = self.surface.take() {
            surface.on_close();
        }
        tracing::info!(session = %self.id, "Closed session {:?}", self.title);
    }
}

impl Drop for SessionWindow {
    fn drop(&mut self) {
        self.close();
    }
}
