//! Opening book loading, partitioning and per-worker scheduling.

use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::color::{Color, ColorAssignment, EngineId};

/// Errors that can occur when loading an opening book.
#[derive(Debug, Error)]
pub enum OpeningError {
    /// Failed to read the opening book file.
    #[error("failed to read opening book: {0}")]
    IoError(#[from] std::io::Error),

    /// A line has no `x`/`o` side-to-move marker.
    #[error("opening '{0}' has no side-to-move marker")]
    MissingSideToMove(String),

    /// The book has fewer openings than there are workers.
    #[error("{available} openings cannot be split across {workers} workers")]
    NotEnoughOpenings { available: usize, workers: usize },
}

/// A starting position taken from the opening book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opening {
    fen: String,
    side_to_move: Color,
}

impl Opening {
    /// Parses one opening line.
    ///
    /// The side to move is the last whitespace-separated token that is an
    /// `x` or `o` marker, so trailing move counters are skipped.
    pub fn parse(line: &str) -> Result<Self, OpeningError> {
        let fen = line.trim();
        let side_to_move = fen
            .split_whitespace()
            .rev()
            .find_map(Color::from_marker)
            .ok_or_else(|| OpeningError::MissingSideToMove(fen.to_string()))?;
        Ok(Self {
            fen: fen.to_string(),
            side_to_move,
        })
    }

    pub fn fen(&self) -> &str {
        &self.fen
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }
}

/// Reads every non-blank line of an opening book file.
pub fn load_openings<P: AsRef<Path>>(path: P) -> Result<Vec<Opening>, OpeningError> {
    let content = std::fs::read_to_string(path)?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(Opening::parse)
        .collect()
}

/// Splits `openings` into `workers` contiguous partitions.
///
/// Partition sizes differ by at most one; the first `len % workers`
/// partitions receive the extra opening.
pub fn split_openings(
    openings: Vec<Opening>,
    workers: usize,
) -> Result<Vec<Vec<Opening>>, OpeningError> {
    if workers == 0 || openings.len() < workers {
        return Err(OpeningError::NotEnoughOpenings {
            available: openings.len(),
            workers,
        });
    }

    let base = openings.len() / workers;
    let remainder = openings.len() % workers;
    let mut iter = openings.into_iter();
    Ok((0..workers)
        .map(|i| {
            let size = base + usize::from(i < remainder);
            iter.by_ref().take(size).collect()
        })
        .collect())
}

/// Shuffles the book and splits it across workers.
pub fn partition_openings<R: Rng + ?Sized>(
    mut openings: Vec<Opening>,
    workers: usize,
    rng: &mut R,
) -> Result<Vec<Vec<Opening>>, OpeningError> {
    openings.shuffle(rng);
    split_openings(openings, workers)
}

/// Hands out openings to one worker.
///
/// Each opening is played twice in a row, first with engine 1 on Red and
/// then with colors swapped. After the last opening the schedule wraps to
/// the first one.
#[derive(Debug, Clone)]
pub struct OpeningSchedule {
    openings: Vec<Opening>,
    current: usize,
    next: usize,
    repeat_pending: bool,
}

impl OpeningSchedule {
    /// Creates a schedule over a non-empty partition.
    pub fn new(openings: Vec<Opening>) -> Result<Self, OpeningError> {
        if openings.is_empty() {
            return Err(OpeningError::NotEnoughOpenings {
                available: 0,
                workers: 1,
            });
        }
        Ok(Self {
            openings,
            current: 0,
            next: 0,
            repeat_pending: false,
        })
    }

    pub fn len(&self) -> usize {
        self.openings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.openings.is_empty()
    }

    /// Index of the opening most recently handed out.
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Returns the next opening together with its color assignment.
    pub fn next_game(&mut self) -> (&Opening, ColorAssignment) {
        let assignment = if self.repeat_pending {
            self.repeat_pending = false;
            ColorAssignment::with_red(EngineId::Engine2)
        } else {
            self.current = self.next;
            self.next = (self.next + 1) % self.openings.len();
            self.repeat_pending = true;
            ColorAssignment::with_red(EngineId::Engine1)
        };
        (&self.openings[self.current], assignment)
    }
}
