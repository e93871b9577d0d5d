//! PTY process management.

use crate::error::{PtyIoError, SpawnError, UnsupportedPlatformError};
use crate::types::{SpawnOptions, StreamEnd, TermSize};
use anyhow::Context;
use parking_lot::Mutex;
use platform::PtySupport;
use portable_pty::{native_pty_system, Child, CommandBuilder, ExitStatus, MasterPty};
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// How often `terminate` checks whether the child has gone.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Master side of the pseudoterminal plus the size last applied to it.
/// Kept under one lock so the recorded size always matches the driver.
struct TerminalState {
    master: Option<Box<dyn MasterPty + Send>>,
    size: TermSize,
}

struct ChildState {
    child: Box<dyn Child + Send + Sync>,
    exit: Option<ExitStatus>,
}

impl ChildState {
    /// Reap the child if it has exited. Returns true once it is gone.
    fn poll_exit(&mut self) -> bool {
        if self.exit.is_some() {
            return true;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.exit = Some(status);
                true
            }
            Ok(None) => false,
            Err(e) => {
                // ECHILD: nothing left to wait for.
                tracing::debug!("try_wait on pty child failed: {}", e);
                self.exit = Some(ExitStatus::with_exit_code(1));
                true
            }
        }
    }

    fn wait_for_exit(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.poll_exit() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(EXIT_POLL_INTERVAL);
        }
    }

    fn reap(&mut self) {
        if self.exit.is_some() {
            return;
        }
        match self.child.wait() {
            Ok(status) => self.exit = Some(status),
            Err(e) => tracing::debug!("Wait for pty child: {}", e),
        }
    }
}

/// A child process bound to its own pseudoterminal.
///
/// All methods take `&self`; the writer, the master and the child each sit
/// behind their own lock so input, resizes and termination can come from
/// different threads while the output stream is read elsewhere. Dropping a
/// `PtyProcess` terminates it.
pub struct PtyProcess {
    command: Vec<String>,
    pid: Option<u32>,
    terminal: Mutex<TerminalState>,
    writer: Mutex<Option<Box<dyn Write + Send>>>,
    reader: Mutex<Option<Box<dyn Read + Send>>>,
    child: Mutex<ChildState>,
    terminated: AtomicBool,
    terminate_grace: Duration,
    read_buffer_size: usize,
}

impl PtyProcess {
    /// Spawn `command` on a new pseudoterminal of the given size.
    ///
    /// `command[0]` is the program, the rest are its arguments. Nothing is
    /// interpreted by a shell.
    pub fn spawn(
        command: &[String],
        size: TermSize,
        options: &SpawnOptions,
    ) -> Result<Self, SpawnError> {
        Self::spawn_with_support(platform::pty_support(), command, size, options)
    }

    /// Like [`spawn`](Self::spawn) with an explicit platform capability.
    pub fn spawn_with_support(
        support: PtySupport,
        command: &[String],
        size: TermSize,
        options: &SpawnOptions,
    ) -> Result<Self, SpawnError> {
        if let PtySupport::Unsupported { platform } = support {
            return Err(UnsupportedPlatformError { platform }.into());
        }

        let (program, args) = match command.split_first() {
            Some((program, args)) if !program.is_empty() => (program, args),
            _ => return Err(SpawnError::EmptyCommand),
        };
        if !size.is_valid() {
            return Err(SpawnError::InvalidSize {
                rows: size.rows,
                cols: size.cols,
            });
        }

        let pair = native_pty_system()
            .openpty(size.to_pty_size())
            .context("Failed to open PTY")
            .map_err(SpawnError::OpenPty)?;

        let mut cmd = CommandBuilder::new(program);
        cmd.args(args);
        cmd.env("TERM", &options.term);
        for (key, value) in &options.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &options.working_dir {
            cmd.cwd(dir);
        }

        let mut child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|source| SpawnError::Spawn {
                program: program.clone(),
                source,
            })?;

        // The parent must not hold the terminal side open, otherwise the
        // master never sees a hang-up after the child exits.
        drop(pair.slave);

        let io = pair
            .master
            .try_clone_reader()
            .context("Failed to get PTY reader")
            .and_then(|reader| {
                let writer = pair
                    .master
                    .take_writer()
                    .context("Failed to get PTY writer")?;
                Ok((reader, writer))
            });
        let (reader, writer) = match io {
            Ok(io) => io,
            Err(e) => {
                if let Err(kill_err) = child.kill() {
                    tracing::debug!("Kill child after failed setup: {}", kill_err);
                }
                let _ = child.wait();
                return Err(SpawnError::Io(e));
            }
        };

        let pid = child.process_id();
        tracing::info!(pid = ?pid, command = ?command, %size, "Spawned pty process");

        Ok(Self {
            command: command.to_vec(),
            pid,
            terminal: Mutex::new(TerminalState {
                master: Some(pair.master),
                size,
            }),
            writer: Mutex::new(Some(writer)),
            reader: Mutex::new(Some(reader)),
            child: Mutex::new(ChildState { child, exit: None }),
            terminated: AtomicBool::new(false),
            terminate_grace: options.terminate_grace,
            read_buffer_size: options.read_buffer_size.max(1),
        })
    }

    /// The argv this process was started with.
    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Size last applied to the pseudoterminal.
    pub fn size(&self) -> TermSize {
        self.terminal.lock().size
    }

    /// Whether the child has exited (reaping it if so).
    pub fn has_exited(&self) -> bool {
        self.child.lock().poll_exit()
    }

    /// Exit code, once the child has been reaped.
    pub fn exit_code(&self) -> Option<u32> {
        self.child.lock().exit.as_ref().map(ExitStatus::exit_code)
    }

    /// Whether [`terminate`](Self::terminate) has run.
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Write input bytes to the process, verbatim.
    pub fn write(&self, data: &[u8]) -> Result<(), PtyIoError> {
        if self.is_terminated() {
            return Err(PtyIoError::Closed);
        }
        if self.has_exited() {
            return Err(PtyIoError::Exited);
        }
        let mut writer_guard = self.writer.lock();
        let writer = writer_guard.as_mut().ok_or(PtyIoError::Closed)?;
        writer.write_all(data)?;
        writer.flush()?;
        Ok(())
    }

    /// Resize the pseudoterminal. The kernel delivers SIGWINCH to the
    /// foreground process group.
    pub fn resize(&self, size: TermSize) -> Result<(), PtyIoError> {
        if !size.is_valid() {
            return Err(PtyIoError::InvalidSize {
                rows: size.rows,
                cols: size.cols,
            });
        }
        if self.is_terminated() {
            return Err(PtyIoError::Closed);
        }
        if self.has_exited() {
            return Err(PtyIoError::Exited);
        }

        let mut terminal = self.terminal.lock();
        let master = terminal.master.as_ref().ok_or(PtyIoError::Closed)?;
        master
            .resize(size.to_pty_size())
            .map_err(PtyIoError::Resize)?;
        terminal.size = size;
        tracing::trace!(pid = ?self.pid, %size, "Resized pty");
        Ok(())
    }

    /// Window size as reported by the terminal driver, i.e. what the child sees.
    pub fn window_size(&self) -> Result<TermSize, PtyIoError> {
        let terminal = self.terminal.lock();
        let master = terminal.master.as_ref().ok_or(PtyIoError::Closed)?;
        master
            .get_size()
            .map(TermSize::from)
            .map_err(PtyIoError::Query)
    }

    /// Take the output stream. Blocking; run it on its own thread.
    ///
    /// The stream can be taken once. It ends when the process exits, the
    /// terminal hangs up, or a read fails.
    pub fn read(&self) -> Result<PtyOutput, PtyIoError> {
        if self.is_terminated() {
            return Err(PtyIoError::Closed);
        }
        let reader = self.reader.lock().take().ok_or(PtyIoError::ReaderTaken)?;
        Ok(PtyOutput::new(reader, self.read_buffer_size))
    }

    /// Stop the process and release the pseudoterminal. Idempotent.
    ///
    /// A live child gets SIGTERM, then SIGKILL if it is still around after
    /// the grace period. Both go to its process group, which it leads.
    pub fn terminate(&self) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }

        {
            let mut state = self.child.lock();
            if !state.poll_exit() {
                self.stop_child(&mut state);
            }
        }

        // Writer goes after the child: portable-pty sends EOF on drop.
        self.writer.lock().take();
        self.terminal.lock().master.take();
        self.reader.lock().take();

        tracing::debug!(pid = ?self.pid, exit_code = ?self.exit_code(), "Pty process released");
    }

    #[cfg(unix)]
    fn stop_child(&self, state: &mut ChildState) {
        use nix::sys::signal::Signal;

        if let Some(pid) = self.pid {
            signal_group(pid, Signal::SIGTERM);
            if state.wait_for_exit(self.terminate_grace) {
                return;
            }
            tracing::warn!(
                pid,
                grace_ms = self.terminate_grace.as_millis() as u64,
                "Pty process ignored SIGTERM, killing"
            );
            signal_group(pid, Signal::SIGKILL);
        } else if let Err(e) = state.child.kill() {
            tracing::debug!("Kill child process: {}", e);
        }
        state.reap();
    }

    #[cfg(not(unix))]
    fn stop_child(&self, state: &mut ChildState) {
        if let Err(e) = state.child.kill() {
            tracing::debug!("Kill child process: {}", e);
        }
        if !state.wait_for_exit(self.terminate_grace) {
            tracing::warn!(pid = ?self.pid, "Pty process still running after kill");
        }
        state.reap();
    }
}

impl Drop for PtyProcess {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Send `signal` to the process group led by `pid`, falling back to the
/// process itself.
#[cfg(unix)]
fn signal_group(pid: u32, signal: nix::sys::signal::Signal) {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, killpg};
    use nix::unistd::Pid;

    let target = Pid::from_raw(pid as i32);
    match killpg(target, signal) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => {
            tracing::debug!(pid, ?signal, "killpg failed ({}), signalling process", e);
            if let Err(e) = kill(target, signal) {
                tracing::debug!(pid, ?signal, "kill failed: {}", e);
            }
        }
    }
}

/// Blocking stream of output chunks from a [`PtyProcess`].
///
/// Yields chunks in the order the process wrote them and stops for good at
/// the first EOF, hang-up or error. [`end_reason`](Self::end_reason) says
/// which.
pub struct PtyOutput {
    reader: Box<dyn Read + Send>,
    buffer: Vec<u8>,
    end: Option<StreamEnd>,
}

impl PtyOutput {
    fn new(reader: Box<dyn Read + Send>, buffer_size: usize) -> Self {
        Self {
            reader,
            buffer: vec![0u8; buffer_size],
            end: None,
        }
    }

    /// `None` while the stream is still open.
    pub fn end_reason(&self) -> Option<&StreamEnd> {
        self.end.as_ref()
    }
}

impl Iterator for PtyOutput {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        if self.end.is_some() {
            return None;
        }
        loop {
            match self.reader.read(&mut self.buffer) {
                Ok(0) => {
                    self.end = Some(StreamEnd::Eof);
                    return None;
                }
                Ok(n) => return Some(self.buffer[..n].to_vec()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if is_hangup(&e) => {
                    self.end = Some(StreamEnd::Eof);
                    return None;
                }
                Err(e) => {
                    tracing::warn!("Error reading PTY output: {}", e);
                    self.end = Some(StreamEnd::Failed(e.to_string()));
                    return None;
                }
            }
        }
    }
}

impl std::iter::FusedIterator for PtyOutput {}

/// Linux reports EIO on the master once every slave handle is closed.
#[cfg(unix)]
fn is_hangup(error: &io::Error) -> bool {
    error.raw_os_error() == Some(nix::errno::Errno::EIO as i32)
}

#[cfg(not(unix))]
fn is_hangup(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::BrokenPipe
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use proptest::test_runner::{Config as ProptestConfig, TestCaseError, TestRunner};
    use std::sync::mpsc;
    use test_case::test_case;

    const TEST_TIMEOUT: Duration = Duration::from_secs(10);

    fn sh(script: &str) -> Vec<String> {
        vec!["/bin/sh".into(), "-c".into(), script.into()]
    }

    fn fast_options() -> SpawnOptions {
        SpawnOptions {
            terminate_grace: Duration::from_millis(200),
            ..SpawnOptions::default()
        }
    }

    fn spawn(command: &[String]) -> PtyProcess {
        PtyProcess::spawn(command, TermSize::default(), &fast_options()).unwrap()
    }

    /// Drain the stream on a helper thread so a stuck read fails the test
    /// instead of hanging it.
    fn collect(mut output: PtyOutput) -> (Vec<u8>, StreamEnd) {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let bytes: Vec<u8> = output.by_ref().flatten().collect();
            let end = output.end_reason().cloned();
            let _ = tx.send((bytes, end));
        });
        let (bytes, end) = rx
            .recv_timeout(TEST_TIMEOUT)
            .expect("timed out waiting for pty output to end");
        (bytes, end.expect("stream ended without a reason"))
    }

    fn contains(haystack: &[u8], needle: &str) -> bool {
        String::from_utf8_lossy(haystack).contains(needle)
    }

    #[test]
    fn spawn_rejects_empty_command() {
        let result = PtyProcess::spawn(&[], TermSize::default(), &fast_options());
        assert!(matches!(result, Err(SpawnError::EmptyCommand)));

        let result = PtyProcess::spawn(&[String::new()], TermSize::default(), &fast_options());
        assert!(matches!(result, Err(SpawnError::EmptyCommand)));
    }

    #[test_case(0, 80 ; "zero rows")]
    #[test_case(24, 0 ; "zero cols")]
    fn spawn_rejects_zero_size(rows: u16, cols: u16) {
        let result = PtyProcess::spawn(&sh("true"), TermSize::new(rows, cols), &fast_options());
        assert!(matches!(
            result,
            Err(SpawnError::InvalidSize { rows: r, cols: c }) if r == rows && c == cols
        ));
    }

    #[test]
    fn spawn_fails_on_unsupported_platform() {
        let result = PtyProcess::spawn_with_support(
            PtySupport::Unsupported { platform: "Plan9" },
            &sh("true"),
            TermSize::default(),
            &fast_options(),
        );
        match result {
            Err(SpawnError::Unsupported(e)) => {
                assert_eq!(e.to_string(), "Platform Plan9 not supported yet.")
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("spawn should fail on an unsupported platform"),
        }
    }

    #[test]
    fn spawn_fails_for_missing_binary() {
        let command = vec!["/definitely/not/a/real/binary".to_string()];
        let result = PtyProcess::spawn(&command, TermSize::default(), &fast_options());
        assert!(matches!(result, Err(SpawnError::Spawn { ref program, .. }) if program == &command[0]));
    }

    #[test]
    fn read_yields_output_then_ends() {
        let pty = spawn(&sh("printf 'hello\\n'"));
        let (bytes, end) = collect(pty.read().unwrap());

        assert!(contains(&bytes, "hello"), "output was {:?}", bytes);
        assert_eq!(end, StreamEnd::Eof);
    }

    #[test]
    fn read_is_not_restartable() {
        let pty = spawn(&sh("sleep 30"));
        let _output = pty.read().unwrap();
        assert!(matches!(pty.read(), Err(PtyIoError::ReaderTaken)));
        pty.terminate();
    }

    #[test]
    fn written_input_is_echoed_back() {
        let pty = spawn(&["cat".to_string()]);
        let output = pty.read().unwrap();

        pty.write(b"ping\n").unwrap();
        pty.write(b"pong\n").unwrap();
        // Give cat a moment before hanging it up.
        std::thread::sleep(Duration::from_millis(100));
        pty.terminate();

        let (bytes, _) = collect(output);
        let text = String::from_utf8_lossy(&bytes);
        let ping = text.find("ping").expect("ping missing");
        let pong = text.find("pong").expect("pong missing");
        assert!(ping < pong, "output out of order: {:?}", text);
    }

    #[test]
    fn terminate_reaps_and_releases() {
        let pty = spawn(&sh("sleep 30"));
        let pid = pty.pid().expect("child has a pid");

        pty.terminate();

        assert!(pty.is_terminated());
        assert!(pty.has_exited());
        #[cfg(target_os = "linux")]
        assert!(
            !std::path::Path::new(&format!("/proc/{pid}")).exists(),
            "child {pid} was not reaped"
        );
        let _ = pid;
        assert!(matches!(pty.write(b"x"), Err(PtyIoError::Closed)));
        assert!(matches!(
            pty.resize(TermSize::new(10, 10)),
            Err(PtyIoError::Closed)
        ));
        assert!(matches!(pty.window_size(), Err(PtyIoError::Closed)));
        assert!(matches!(pty.read(), Err(PtyIoError::Closed)));
    }

    #[test]
    fn terminate_is_idempotent() {
        let pty = spawn(&sh("sleep 30"));
        pty.terminate();
        pty.terminate();
        drop(pty);
    }

    #[test]
    fn terminate_after_natural_exit_does_not_signal() {
        let pty = spawn(&sh("exit 3"));
        let (_, end) = collect(pty.read().unwrap());
        assert_eq!(end, StreamEnd::Eof);

        let deadline = Instant::now() + TEST_TIMEOUT;
        while !pty.has_exited() {
            assert!(Instant::now() < deadline, "child never exited");
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(pty.exit_code(), Some(3));

        pty.terminate();
        assert_eq!(pty.exit_code(), Some(3));
    }

    #[test]
    fn terminate_kills_process_that_ignores_sigterm() {
        let pty = spawn(&sh("trap '' TERM; while true; do sleep 1; done"));
        // Let the shell install its trap.
        std::thread::sleep(Duration::from_millis(200));

        let started = Instant::now();
        pty.terminate();

        assert!(pty.has_exited());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn write_after_exit_reports_exited() {
        let pty = spawn(&sh("true"));
        let deadline = Instant::now() + TEST_TIMEOUT;
        while !pty.has_exited() {
            assert!(Instant::now() < deadline, "child never exited");
            std::thread::sleep(Duration::from_millis(5));
        }

        assert!(matches!(pty.write(b"late"), Err(PtyIoError::Exited)));
        assert!(matches!(
            pty.resize(TermSize::new(30, 100)),
            Err(PtyIoError::Exited)
        ));
    }

    #[test]
    fn resize_rejects_zero_dimension() {
        let pty = spawn(&sh("sleep 30"));
        assert!(matches!(
            pty.resize(TermSize::new(0, 10)),
            Err(PtyIoError::InvalidSize { rows: 0, cols: 10 })
        ));
        assert_eq!(pty.size(), TermSize::default());
    }

    #[test]
    fn resize_is_reported_by_driver() {
        let pty = spawn(&sh("sleep 30"));
        let mut runner = TestRunner::new(ProptestConfig::with_cases(32));

        runner
            .run(&(1u16..=500, 1u16..=500), |(rows, cols)| {
                let size = TermSize::new(rows, cols);
                pty.resize(size)
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
                let reported = pty
                    .window_size()
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
                prop_assert_eq!(reported, size);
                prop_assert_eq!(pty.size(), size);
                Ok(())
            })
            .unwrap();

        pty.terminate();
    }

    #[test]
    fn child_sees_resized_window() {
        let pty = spawn(&sh("read _line; stty size"));
        let output = pty.read().unwrap();

        pty.resize(TermSize::new(30, 100)).unwrap();
        pty.write(b"\n").unwrap();

        let (bytes, _) = collect(output);
        assert!(contains(&bytes, "30 100"), "output was {:?}", bytes);
    }

    #[test]
    fn term_and_env_reach_the_child() {
        let options = SpawnOptions {
            term: "vt100".to_string(),
            env: vec![("SSHUI_TEST_VAR".to_string(), "marker-42".to_string())],
            ..fast_options()
        };
        let pty = PtyProcess::spawn(
            &sh("printf '%s %s\\n' \"$TERM\" \"$SSHUI_TEST_VAR\""),
            TermSize::default(),
            &options,
        )
        .unwrap();

        let (bytes, _) = collect(pty.read().unwrap());
        assert!(contains(&bytes, "vt100 marker-42"), "output was {:?}", bytes);
    }

    #[test]
    fn command_is_kept_verbatim() {
        let command = sh("sleep 30");
        let pty = spawn(&command);
        assert_eq!(pty.command(), command.as_slice());
        assert!(pty.pid().is_some());
    }
}
