//! Line-oriented channel to one engine subprocess.
//!
//! This module spawns an engine with piped stdin/stdout and exposes the
//! three primitives the game driver needs: send a command, wait for a line
//! with a deadline, and track the engine's remaining clock.
//!
//! Output is read on a dedicated thread and forwarded over a channel, so a
//! read can give up after a deadline instead of blocking forever on an
//! engine that crashed or hung.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use sprt_arena::debug_log::DebugLog;
//! use sprt_arena::engine_channel::EngineChannel;
//!
//! let mut engine = EngineChannel::spawn("/path/to/engine", DebugLog::disabled())?;
//! engine.handshake(Duration::from_secs(5))?;
//! engine.send("uainewgame")?;
//! engine.send("go btime 1000 wtime 1000 binc 0 winc 0")?;
//! let line = engine.read_line(Duration::from_secs(2))?;
//! println!("{} replied: {}", engine.name(), line);
//! # Ok::<(), sprt_arena::engine_channel::ChannelError>(())
//! ```

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::debug_log::{DebugLog, Direction};

/// Errors that can occur when communicating with an engine.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Failed to spawn the engine process or write to it.
    #[error("Engine I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The engine closed its output stream (usually because it exited).
    #[error("Engine closed its output")]
    Closed,
    /// No line arrived before the read deadline.
    #[error("Engine unresponsive for {0:?}")]
    Unresponsive(Duration),
}

/// How to start an engine: the executable and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl EngineCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl std::fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// A running engine process.
///
/// The channel owns the process for its whole lifetime. Dropping it asks
/// the engine to quit and then kills the process.
pub struct EngineChannel {
    /// The child process handle.
    process: Child,
    /// Handle to write commands to the engine's stdin.
    stdin: ChildStdin,
    /// Lines read from stdout by the reader thread.
    lines: Receiver<String>,
    /// Path the engine was started from.
    executable: PathBuf,
    /// Display name; the file stem until the engine reports its own.
    name: String,
    /// Label used in the debug log.
    label: String,
    log: DebugLog,
    /// Remaining clock in milliseconds. Managed by the game driver.
    pub time_left_ms: i64,
}

impl EngineChannel {
    /// Spawns an engine process and starts its reader thread.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Io`] if the process cannot be spawned,
    /// typically because the executable doesn't exist or lacks permissions.
    pub fn spawn<P: AsRef<Path>>(path: P, log: DebugLog) -> Result<Self, ChannelError> {
        Self::spawn_command(&EngineCommand::new(path.as_ref()), None, log)
    }

    /// Spawns `command`, prefixing debug log lines with `label` instead of
    /// the display name. Workers use the label to tell two copies of the
    /// same executable apart.
    pub fn spawn_command(
        command: &EngineCommand,
        label: Option<&str>,
        log: DebugLog,
    ) -> Result<Self, ChannelError> {
        let executable = command.program.clone();
        let mut process = Command::new(&executable)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let (stdin, stdout) = match (process.stdin.take(), process.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = process.kill();
                return Err(ChannelError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "engine pipes unavailable",
                )));
            }
        };

        let name = executable
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| executable.display().to_string());
        let label = label.map_or_else(|| name.clone(), str::to_string);
        let lines = spawn_reader(stdout, label.clone(), log.clone());

        Ok(Self {
            process,
            stdin,
            lines,
            executable,
            name,
            label,
            log,
            time_left_ms: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Writes `line` plus a newline and flushes.
    pub fn send(&mut self, line: &str) -> Result<(), ChannelError> {
        self.log.record(&self.label, Direction::Sent, line);
        writeln!(self.stdin, "{}", line)?;
        self.stdin.flush()?;
        Ok(())
    }

    /// Waits up to `timeout` for the next output line.
    ///
    /// The line is returned verbatim apart from its line terminator.
    pub fn read_line(&mut self, timeout: Duration) -> Result<String, ChannelError> {
        match self.lines.recv_timeout(timeout) {
            Ok(line) => Ok(line),
            Err(RecvTimeoutError::Timeout) => Err(ChannelError::Unresponsive(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(ChannelError::Closed),
        }
    }

    /// Reads lines until one satisfies `accept`, all within `timeout`.
    pub fn read_until<F>(&mut self, timeout: Duration, mut accept: F) -> Result<String, ChannelError>
    where
        F: FnMut(&str) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let line = self
                .read_line(remaining)
                .map_err(|e| match e {
                    ChannelError::Unresponsive(_) => ChannelError::Unresponsive(timeout),
                    other => other,
                })?;
            if accept(&line) {
                return Ok(line);
            }
        }
    }

    /// Performs the UAI greeting.
    ///
    /// Sends `uai` and waits for `uaiok`, taking the display name from an
    /// `id name` line if the engine sends one. Then sends `isready` and
    /// waits for `readyok`.
    pub fn handshake(&mut self, timeout: Duration) -> Result<(), ChannelError> {
        self.send("uai")?;
        let mut reported = None;
        self.read_until(timeout, |line| {
            if let Some(name) = line.strip_prefix("id name ") {
                reported = Some(name.trim().to_string());
            }
            line.trim() == "uaiok"
        })?;
        if let Some(name) = reported.filter(|n| !n.is_empty()) {
            self.name = name;
        }

        self.send("isready")?;
        self.read_until(timeout, |line| line.trim() == "readyok")?;
        Ok(())
    }
}

fn spawn_reader(stdout: ChildStdout, label: String, log: DebugLog) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut reader = BufReader::new(stdout);
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    let line = line.trim_end_matches(&['\r', '\n'][..]).to_string();
                    log.record(&label, Direction::Received, &line);
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!("Reader for {} stopped: {}", label, e);
                    break;
                }
            }
        }
    });
    rx
}

impl Drop for EngineChannel {
    /// Sends `quit`, then kills the process and reaps it.
    fn drop(&mut self) {
        let _ = writeln!(self.stdin, "quit");
        let _ = self.stdin.flush();
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}
