//! Platform capability detection.
//!
//! Pseudoterminal sessions need a POSIX pty facility. The answer is decided
//! once from the compile target and handed around as a [`PtySupport`] value,
//! so session code never compares platform names itself.

use std::fmt;

/// Whether the running platform can bind a spawned process to a pty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PtySupport {
    /// POSIX-like platform with openpty/setsid/TIOCSCTTY.
    Supported,
    /// No usable pty facility. `platform` is the OS name shown to the user.
    Unsupported { platform: &'static str },
}

impl PtySupport {
    pub fn is_supported(self) -> bool {
        matches!(self, Self::Supported)
    }
}

impl fmt::Display for PtySupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Supported => write!(f, "supported"),
            Self::Unsupported { platform } => write!(f, "unsupported on {}", platform),
        }
    }
}

/// Detect pty support for the current build target.
#[cfg(unix)]
pub fn pty_support() -> PtySupport {
    PtySupport::Supported
}

/// Detect pty support for the current build target.
#[cfg(not(unix))]
pub fn pty_support() -> PtySupport {
    tracing::debug!(
        "No pseudoterminal support on {}",
        std::env::consts::OS
    );
    PtySupport::Unsupported {
        platform: os_display_name(),
    }
}

/// Human readable OS name, matching what users see in the notice message.
pub fn os_display_name() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        "freebsd" => "FreeBSD",
        "openbsd" => "OpenBSD",
        "netbsd" => "NetBSD",
        other => other,
    }
}
