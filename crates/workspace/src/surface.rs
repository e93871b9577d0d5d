//! The rendering side of a session.

use crate::registry::SessionId;
use std::sync::{Arc, Weak};
use terminal::{PtyIoError, SessionIo, TermSize};

/// A terminal emulator that displays one session.
///
/// The emulator itself is out of scope here: it parses the bytes it is
/// given and reports its size in cells. Keystrokes and resizes go back
/// through the [`InputSink`] handed to [`attach`](Surface::attach).
#[cfg_attr(test, mockall::automock)]
pub trait Surface {
    /// Display output from the process.
    fn write(&mut self, bytes: &[u8]);

    /// Current size in character cells. May be zero before first layout.
    fn size(&self) -> TermSize;

    fn attach(&mut self, _sink: InputSink) {}

    fn set_title(&mut self, _title: &str) {}

    /// The session is closed; called once.
    fn on_close(&mut self) {}
}

/// Sends a surface's input and resize events to its session.
///
/// Holds the session weakly: once the session is closed every call fails
/// with [`PtyIoError::Closed`].
#[derive(Clone)]
pub struct InputSink {
    session: SessionId,
    io: Weak<SessionIo>,
}

impl InputSink {
    pub(crate) fn new(session: SessionId, io: &Arc<SessionIo>) -> Self {
        Self {
            session,
            io: Arc::downgrade(io),
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn send(&self, bytes: &[u8]) -> Result<(), PtyIoError> {
        self.io
            .upgrade()
            .ok_or(PtyIoError::Closed)?
            .forward_input(bytes)
    }

    pub fn resize(&self, size: TermSize) -> Result<(), PtyIoError> {
        self.io
            .upgrade()
            .ok_or(PtyIoError::Closed)?
            .forward_resize(size)
    }
}
