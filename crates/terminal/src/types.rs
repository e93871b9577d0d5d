//! Plain data types shared by the pty and session layers.

use portable_pty::PtySize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Terminal dimensions in character cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TermSize {
    pub rows: u16,
    pub cols: u16,
}

impl Default for TermSize {
    fn default() -> Self {
        Self { rows: 24, cols: 80 }
    }
}

impl TermSize {
    pub const fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }

    /// Both dimensions are positive.
    pub fn is_valid(self) -> bool {
        self.rows > 0 && self.cols > 0
    }

    pub(crate) fn to_pty_size(self) -> PtySize {
        PtySize {
            rows: self.rows,
            cols: self.cols,
            pixel_width: 0,
            pixel_height: 0,
        }
    }
}

impl From<PtySize> for TermSize {
    fn from(size: PtySize) -> Self {
        Self {
            rows: size.rows,
            cols: size.cols,
        }
    }
}

impl fmt::Display for TermSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// Knobs for spawning a pty process.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnOptions {
    /// Exported as `TERM`.
    pub term: String,
    /// Extra environment, applied after `TERM`.
    pub env: Vec<(String, String)>,
    pub working_dir: Option<PathBuf>,
    /// Time between SIGTERM and SIGKILL in [`PtyProcess::terminate`](crate::PtyProcess::terminate).
    pub terminate_grace: Duration,
    pub read_buffer_size: usize,
}

impl Default for SpawnOptions {
    fn default() -> Self {
        Self {
            term: "xterm-256color".to_string(),
            env: Vec::new(),
            working_dir: None,
            terminate_grace: Duration::from_millis(1500),
            read_buffer_size: 4096,
        }
    }
}

/// Why a pty output stream ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEnd {
    /// The process exited or hung up the terminal.
    Eof,
    /// Reading failed for another reason.
    Failed(String),
    /// The owner asked the read loop to stop.
    Stopped,
}

impl fmt::Display for StreamEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eof => write!(f, "end of stream"),
            Self::Failed(reason) => write!(f, "read failed: {}", reason),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}
