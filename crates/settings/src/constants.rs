//! Centralized configuration constants for SSH-UI.
//!
//! Defaults and accepted ranges for every configurable value, grouped by
//! the component that consumes them.

/// Pseudoterminal session configuration.
pub mod session {
    use std::time::Duration;

    /// TERM exported to spawned commands.
    pub const DEFAULT_TERM: &str = "xterm-256color";

    /// Size used when the surface has not been laid out yet.
    pub const DEFAULT_ROWS: u16 = 24;
    pub const DEFAULT_COLS: u16 = 80;

    /// How long a child gets to exit after SIGTERM before it is SIGKILLed.
    pub const TERMINATE_GRACE: Duration = Duration::from_millis(1500);
    pub const MIN_TERMINATE_GRACE: Duration = Duration::from_millis(50);
    pub const MAX_TERMINATE_GRACE: Duration = Duration::from_secs(30);

    /// Read buffer for the pty output loop.
    pub const READ_BUFFER_SIZE: usize = 4096;
    pub const MIN_READ_BUFFER_SIZE: usize = 256;
    pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;
}

/// Session window configuration.
pub mod window {
    /// Default session window size in pixels.
    pub const DEFAULT_WIDTH: u32 = 800;
    pub const DEFAULT_HEIGHT: u32 = 600;

    /// Origin used when the parent window's screen is unknown.
    pub const DEFAULT_X: i32 = 100;
    pub const DEFAULT_Y: i32 = 100;

    /// Smallest window we will create.
    pub const MIN_WIDTH: u32 = 200;
    pub const MIN_HEIGHT: u32 = 120;
}

/// Settings file validation limits.
pub mod settings {
    /// Maximum settings file size in bytes (64 KB).
    /// Settings files should be tiny; anything larger is suspicious.
    pub const MAX_FILE_SIZE: u64 = 64 * 1024;

    /// Maximum length for string fields (TERM, env values).
    pub const MAX_STRING_LENGTH: usize = 256;
}
