//! SSH-UI - runs an SSH command on a pseudoterminal session.
//!
//! Main entry point. The invoking terminal is the session's surface: output
//! is copied to stdout and keystrokes are read from stdin in raw mode.

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::tty::IsTty;
use once_cell::sync::Lazy;
use sshui_workspace::{OpenRequest, SessionId, Surface, Workspace};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::{Duration, Instant};
use terminal::TermSize;
use tracing::{debug, error, info, warn};

/// Application startup time for performance monitoring
static STARTUP_TIME: Lazy<Instant> = Lazy::new(Instant::now);

/// Event loop tick; bounds input and resize latency.
const TICK: Duration = Duration::from_millis(16);

#[derive(Parser, Debug)]
#[command(name = "sshui", version, about = "Run an SSH command in a terminal session")]
struct Cli {
    /// Session title (defaults to "SSH to <last argument>")
    #[arg(long)]
    title: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Command to run, e.g. `ssh -p 2222 user@host`
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

/// Check if debug mode is enabled via environment variable.
fn is_debug_mode() -> bool {
    std::env::var("SSHUI_DEBUG").is_ok()
}

fn open_log_file() -> Result<std::fs::File> {
    let path = sshui_paths::log_file();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create logs directory: {:?}", dir))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {:?}", path))
}

/// Initialize the logging system.
///
/// Logs go to a file: stdout and stderr belong to the session.
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // In debug mode, enable trace logging for our crates
    let default_filter = if is_debug_mode() {
        "sshui=trace,terminal=trace,sshui_workspace=trace,info"
    } else {
        "sshui=info,terminal=info,sshui_workspace=info,warn"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let layer = fmt::layer().with_target(true).with_line_number(true);

    match open_log_file() {
        Ok(file) => tracing_subscriber::registry()
            .with(
                layer
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
            .with(filter)
            .init(),
        Err(e) => {
            tracing_subscriber::registry()
                .with(layer.with_writer(std::io::stderr))
                .with(filter)
                .init();
            warn!("Logging to stderr: {:#}", e);
        }
    }

    if is_debug_mode() {
        info!(
            "SSH-UI v{} starting up (DEBUG MODE ENABLED)",
            env!("CARGO_PKG_VERSION")
        );
        info!("Set RUST_LOG for custom log levels, e.g. RUST_LOG=terminal=trace");
    } else {
        info!("SSH-UI v{} starting up", env!("CARGO_PKG_VERSION"));
    }
}

/// Size of the invoking terminal, zero if unknown.
fn terminal_size() -> TermSize {
    match crossterm::terminal::size() {
        Ok((cols, rows)) => TermSize::new(rows, cols),
        Err(_) => TermSize::new(0, 0),
    }
}

/// The invoking terminal as a session surface.
struct StdioSurface {
    stdout: std::io::Stdout,
}

impl StdioSurface {
    fn new() -> Self {
        Self {
            stdout: std::io::stdout(),
        }
    }
}

impl Surface for StdioSurface {
    fn write(&mut self, bytes: &[u8]) {
        let mut out = self.stdout.lock();
        if let Err(e) = out.write_all(bytes).and_then(|()| out.flush()) {
            warn!("Failed to write session output: {}", e);
        }
    }

    fn size(&self) -> TermSize {
        terminal_size()
    }

    fn set_title(&mut self, title: &str) {
        if self.stdout.is_tty() {
            let _ = crossterm::execute!(self.stdout, crossterm::terminal::SetTitle(title));
        }
    }

    fn on_close(&mut self) {
        let _ = self.stdout.flush();
    }
}

/// Raw mode for the lifetime of the session; restored on drop.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Option<Self>> {
        if !std::io::stdin().is_tty() {
            return Ok(None);
        }
        crossterm::terminal::enable_raw_mode().context("Failed to enable raw mode")?;
        Ok(Some(Self))
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = crossterm::terminal::disable_raw_mode() {
            error!("Failed to restore terminal mode: {}", e);
        }
    }
}

/// Forward stdin to a channel from a background thread.
fn spawn_stdin_reader() -> Result<Receiver<Vec<u8>>> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("sshui-stdin".into())
        .spawn(move || {
            let mut stdin = std::io::stdin();
            let mut buf = [0u8; 1024];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!("Failed to read stdin: {}", e);
                        break;
                    }
                }
            }
            debug!("stdin reader finished");
        })
        .context("Failed to spawn stdin reader")?;
    Ok(rx)
}

fn run_session(workspace: &mut Workspace, id: SessionId) -> Result<()> {
    let _raw_mode = RawModeGuard::enable()?;
    let input = spawn_stdin_reader()?;
    let mut input_open = true;
    let mut last_size = terminal_size();

    while workspace.has_open_sessions() {
        workspace.wait_for_events(TICK);

        while input_open {
            match input.try_recv() {
                Ok(bytes) => {
                    // Failures are logged by the workspace; the session stays up.
                    let _ = workspace.forward_input(id, &bytes);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => input_open = false,
            }
        }

        let size = terminal_size();
        if size != last_size && size.is_valid() {
            let _ = workspace.forward_resize(id, size);
            last_size = size;
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => settings::load_config_from(path),
        None => {
            settings::ensure_config_file();
            settings::load_config()
        }
    };
    debug!(?config, "Loaded config");

    let mut request = OpenRequest::new(cli.command);
    if let Some(title) = cli.title {
        request = request.with_title(title);
    }

    let mut workspace = Workspace::new(config);
    let id = workspace
        .open_session(request, Box::new(StdioSurface::new()))
        .context("Failed to open session")?;

    if workspace.session(id).is_some_and(|s| s.is_informational()) {
        workspace.close_session(id);
        return Ok(());
    }

    info!("Session ready in {:?}", STARTUP_TIME.elapsed());
    run_session(&mut workspace, id)?;
    info!("All sessions closed, exiting");
    Ok(())
}

fn main() -> ExitCode {
    let _ = *STARTUP_TIME;

    let cli = Cli::parse();
    init_logging();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("sshui: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn trailing_command_keeps_its_flags() {
        let cli = Cli::try_parse_from(["sshui", "--title", "box", "ssh", "-p", "2222", "user@host"])
            .unwrap();
        assert_eq!(cli.title.as_deref(), Some("box"));
        assert_eq!(cli.command, vec!["ssh", "-p", "2222", "user@host"]);
        assert!(cli.config.is_none());
    }

    #[test]
    fn config_path_is_accepted() {
        let cli = Cli::try_parse_from(["sshui", "--config", "/tmp/sshui.toml", "ssh", "host"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/sshui.toml")));
        assert_eq!(cli.command, vec!["ssh", "host"]);
    }

    #[test]
    fn command_is_required() {
        assert!(Cli::try_parse_from(["sshui"]).is_err());
    }
}
