//! Pseudoterminal process management.
//!
//! [`PtyProcess`] owns one child bound to one pseudoterminal and
//! [`SessionIo`] runs its blocking read loop on a dedicated thread.
//! This crate has no UI dependencies; rendering surfaces live in
//! `sshui_workspace`.

mod error;
mod pty_process;
mod session_io;
pub mod types;

pub use error::{PtyIoError, SpawnError, UnsupportedPlatformError};
pub use pty_process::{PtyOutput, PtyProcess};
pub use session_io::{SessionIo, READER_THREAD_NAME};
pub use types::*;
