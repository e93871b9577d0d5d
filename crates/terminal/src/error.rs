use thiserror::Error;

/// The platform has no pseudoterminal facility.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Platform {platform} not supported yet.")]
pub struct UnsupportedPlatformError {
    pub platform: &'static str,
}

/// Creating a pty process failed. Nothing is left running.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("command is empty")]
    EmptyCommand,
    #[error("invalid terminal size {rows}x{cols}")]
    InvalidSize { rows: u16, cols: u16 },
    #[error("failed to open pseudoterminal: {0:#}")]
    OpenPty(#[source] anyhow::Error),
    #[error("failed to spawn `{program}`: {source:#}")]
    Spawn {
        program: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to set up pseudoterminal I/O: {0:#}")]
    Io(#[source] anyhow::Error),
    #[error(transparent)]
    Unsupported(#[from] UnsupportedPlatformError),
}

/// Writing to, resizing, or reading from a pty process failed.
///
/// These are recoverable: the session stays open until its output stream
/// ends.
#[derive(Debug, Error)]
pub enum PtyIoError {
    #[error("process has exited")]
    Exited,
    #[error("pseudoterminal is closed")]
    Closed,
    #[error("invalid terminal size {rows}x{cols}")]
    InvalidSize { rows: u16, cols: u16 },
    #[error("output stream was already taken")]
    ReaderTaken,
    #[error("failed to start read loop: {0}")]
    ReadLoop(#[source] std::io::Error),
    #[error("failed to write to pseudoterminal: {0}")]
    Write(#[from] std::io::Error),
    #[error("failed to resize pseudoterminal: {0:#}")]
    Resize(#[source] anyhow::Error),
    #[error("failed to query pseudoterminal size: {0:#}")]
    Query(#[source] anyhow::Error),
}
