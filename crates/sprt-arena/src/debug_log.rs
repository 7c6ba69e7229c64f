//! Per-worker transcript of engine traffic.
//!
//! Every line a worker sends to or receives from its engines is appended
//! and flushed immediately, so a hung or crashed engine leaves a complete
//! trace behind.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Direction of a logged line, from the worker's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Sent,
    Received,
}

impl Direction {
    fn marker(self) -> char {
        match self {
            Direction::Sent => '>',
            Direction::Received => '<',
        }
    }
}

/// Shared handle to one worker's transcript file.
///
/// Cloning is cheap; both engine channels of a worker and their reader
/// threads write through the same file.
#[derive(Debug, Clone)]
pub struct DebugLog {
    sink: Option<Arc<Mutex<File>>>,
}

impl DebugLog {
    /// Creates (or truncates) `<dir>/<worker_id>.txt`.
    pub fn create<P: AsRef<Path>>(dir: P, worker_id: usize) -> io::Result<Self> {
        let path = Self::path_for(dir, worker_id);
        let file = File::create(path)?;
        Ok(Self {
            sink: Some(Arc::new(Mutex::new(file))),
        })
    }

    /// A log that drops every line.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn path_for<P: AsRef<Path>>(dir: P, worker_id: usize) -> PathBuf {
        dir.as_ref().join(format!("{}.txt", worker_id))
    }

    /// Appends `<label> <dir> <line>` and flushes.
    ///
    /// Write failures are reported through `tracing` and otherwise ignored;
    /// losing the transcript must not abort a game.
    pub fn record(&self, label: &str, direction: Direction, line: &str) {
        let Some(sink) = &self.sink else {
            return;
        };
        let mut file = sink.lock().unwrap_or_else(PoisonError::into_inner);
        let written = writeln!(file, "{} {} {}", label, direction.marker(), line)
            .and_then(|()| file.flush());
        if let Err(e) = written {
            tracing::warn!("Failed to write debug log: {}", e);
        }
    }
}

/// Creates the debug directory, or removes the files left in it by a
/// previous run.
pub fn prepare_debug_dir<P: AsRef<Path>>(dir: P) -> io::Result<()> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return fs::create_dir_all(dir);
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            fs::remove_file(path)?;
        }
    }
    Ok(())
}
