//! TOML config file support.
//!
//! Config location: `~/.config/sshui/config.toml`

use crate::constants::{session, settings, window};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User-facing config parsed from TOML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// TERM exported to spawned commands.
    pub term: String,
    /// Rows used when the surface reports no size yet.
    pub default_rows: u16,
    /// Columns used when the surface reports no size yet.
    pub default_cols: u16,
    /// Milliseconds between SIGTERM and SIGKILL when closing a session.
    pub terminate_grace_ms: u64,
    /// Read buffer size for the pty output loop.
    pub read_buffer_size: usize,
    /// Session window width in pixels.
    pub window_width: u32,
    /// Session window height in pixels.
    pub window_height: u32,
    /// Extra environment variables for spawned commands.
    pub env: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            term: session::DEFAULT_TERM.to_string(),
            default_rows: session::DEFAULT_ROWS,
            default_cols: session::DEFAULT_COLS,
            terminate_grace_ms: session::TERMINATE_GRACE.as_millis() as u64,
            read_buffer_size: session::READ_BUFFER_SIZE,
            window_width: window::DEFAULT_WIDTH,
            window_height: window::DEFAULT_HEIGHT,
            env: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn terminate_grace(&self) -> Duration {
        Duration::from_millis(self.terminate_grace_ms)
    }

    /// Clamp every value into its accepted range, replacing unusable ones
    /// with defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();

        if !is_valid_term(&self.term) {
            tracing::warn!("Invalid term {:?}, using {}", self.term, defaults.term);
            self.term = defaults.term;
        }
        if self.default_rows == 0 {
            self.default_rows = defaults.default_rows;
        }
        if self.default_cols == 0 {
            self.default_cols = defaults.default_cols;
        }

        let grace = self.terminate_grace().clamp(
            session::MIN_TERMINATE_GRACE,
            session::MAX_TERMINATE_GRACE,
        );
        self.terminate_grace_ms = grace.as_millis() as u64;

        self.read_buffer_size = self
            .read_buffer_size
            .clamp(session::MIN_READ_BUFFER_SIZE, session::MAX_READ_BUFFER_SIZE);

        self.window_width = self.window_width.max(window::MIN_WIDTH);
        self.window_height = self.window_height.max(window::MIN_HEIGHT);

        self.env.retain(|key, value| {
            let keep = is_valid_env_key(key) && is_valid_env_value(value);
            if !keep {
                tracing::warn!("Ignoring invalid env entry {:?}", key);
            }
            keep
        });

        self
    }
}

fn is_valid_term(term: &str) -> bool {
    !term.is_empty()
        && term.len() <= settings::MAX_STRING_LENGTH
        && !term.chars().any(|c| c.is_whitespace() || c.is_control())
}

fn is_valid_env_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= settings::MAX_STRING_LENGTH
        && !key.contains('=')
        && !key.contains('\0')
}

fn is_valid_env_value(value: &str) -> bool {
    value.len() <= settings::MAX_STRING_LENGTH && !value.contains('\0')
}

/// Default config file content with comments (generated on first launch).
const DEFAULT_CONFIG: &str = r#"# SSH-UI Configuration

# TERM exported to every session
term = "xterm-256color"

# Terminal size used before the session window has been laid out
default-rows = 24
default-cols = 80

# How long a closing session may take to exit before it is force-killed
terminate-grace-ms = 1500

# Read buffer for session output (bytes)
# read-buffer-size = 4096

# Session window size in pixels
window-width = 800
window-height = 600

# Extra environment variables for every session
# [env]
# LANG = "en_US.UTF-8"
"#;

/// Return the config file path.
pub fn config_path() -> PathBuf {
    sshui_paths::config_file()
}

/// Ensure the config file exists, creating a default if missing.
/// Returns the path to the config file.
pub fn ensure_config_file() -> Option<PathBuf> {
    let path = config_path();
    if !path.exists() {
        let parent = path.parent()?;
        std::fs::create_dir_all(parent).ok()?;
        std::fs::write(&path, DEFAULT_CONFIG).ok()?;
        tracing::info!("Created default config at {:?}", path);
    }
    Some(path)
}

/// Load and parse the config file. Returns default on any error.
pub fn load_config() -> Config {
    load_config_from(&config_path())
}

/// Load and parse a specific config file. Returns default on any error.
pub fn load_config_from(path: &Path) -> Config {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to read config: {}", e);
            }
            return Config::default();
        }
    };

    // Size guard
    if content.len() > settings::MAX_FILE_SIZE as usize {
        tracing::warn!(
            "Config file too large ({} bytes), using defaults",
            content.len()
        );
        return Config::default();
    }

    match toml::from_str::<Config>(&content) {
        Ok(cfg) => cfg.sanitized(),
        Err(e) => {
            tracing::warn!("Failed to parse {:?}: {}", path, e);
            Config::default()
        }
    }
}
