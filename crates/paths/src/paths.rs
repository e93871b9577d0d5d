//! Centralized path management for SSH-UI.
//!
//! Directories are resolved once and cached. Call the `set_*` overrides
//! before first access to redirect them (tests, `--config`).

use std::path::PathBuf;
use std::sync::OnceLock;

const APP_DIR: &str = "sshui";

static CONFIG_DIR: OnceLock<PathBuf> = OnceLock::new();
static LOGS_DIR: OnceLock<PathBuf> = OnceLock::new();

/// ~/.config/sshui (or platform equivalent)
pub fn config_dir() -> &'static PathBuf {
    CONFIG_DIR.get_or_init(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    })
}

/// ~/Library/Logs/sshui on macOS, <data-dir>/sshui/logs elsewhere.
pub fn logs_dir() -> &'static PathBuf {
    LOGS_DIR.get_or_init(|| {
        #[cfg(target_os = "macos")]
        {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Library")
                .join("Logs")
                .join(APP_DIR)
        }
        #[cfg(not(target_os = "macos"))]
        {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
                .join("logs")
        }
    })
}

/// Override config dir (must be called before first access).
pub fn set_config_dir(path: PathBuf) {
    let _ = CONFIG_DIR.set(path);
}

/// Override logs dir (must be called before first access).
pub fn set_logs_dir(path: PathBuf) {
    let _ = LOGS_DIR.set(path);
}

/// Config file path: config_dir()/config.toml
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Log file written by the `sshui` binary.
pub fn log_file() -> PathBuf {
    logs_dir().join("sshui.log")
}
