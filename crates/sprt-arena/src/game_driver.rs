//! Plays one game between two engine channels.
//!
//! This module provides the [`GameDriver`], which runs the turn loop from a
//! given opening until the game ends on the board, a side runs out of time,
//! or a side plays an illegal move. Rules questions are delegated to the
//! [`GameAuthority`].

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::authority::{ColorResult, GameAuthority, PositionError};
use crate::color::{Color, ColorAssignment, EngineId};
use crate::engine_channel::{ChannelError, EngineChannel};
use crate::opening::Opening;
use crate::time_control::TimeControl;

/// Errors that abort a game without a result.
#[derive(Error, Debug)]
pub enum GameError {
    /// The engine playing `color` crashed, closed its pipes or stopped
    /// answering.
    #[error("{color} engine failed: {source}")]
    ProcessFailure {
        color: Color,
        #[source]
        source: ChannelError,
    },
    /// The rules engine could not parse the opening.
    #[error(transparent)]
    Position(#[from] PositionError),
}

/// How a completed game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    /// The game ended on the board.
    Normal(ColorResult),
    /// The given side ran out of time.
    Timeout(Color),
    /// The given side sent a move the rules engine rejected.
    IllegalMove(Color),
}

impl GameOutcome {
    /// The result from Red's point of view. Timeouts and illegal moves are
    /// losses for the offending side, never draws.
    pub fn color_result(self) -> ColorResult {
        match self {
            GameOutcome::Normal(result) => result,
            GameOutcome::Timeout(loser) | GameOutcome::IllegalMove(loser) => match loser {
                Color::Red => ColorResult::BlueWins,
                Color::Blue => ColorResult::RedWins,
            },
        }
    }

    /// The side that forfeited, if the game did not end on the board.
    pub fn forfeited_by(self) -> Option<Color> {
        match self {
            GameOutcome::Normal(_) => None,
            GameOutcome::Timeout(loser) | GameOutcome::IllegalMove(loser) => Some(loser),
        }
    }
}

/// A finished game.
#[derive(Debug, Clone)]
pub struct GameRecord {
    pub outcome: GameOutcome,
    /// Moves accepted by the rules engine, as sent by the engines.
    pub moves: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GameState {
    ToMove(Color),
    GameOver(GameOutcome),
}

/// Runs games under a fixed time control.
///
/// # Example
///
/// ```ignore
/// let driver = GameDriver::new(&rules, "8+0.08".parse()?, Duration::from_secs(5));
/// let record = driver.play(&mut engines, &opening, ColorAssignment::with_red(EngineId::Engine1))?;
/// println!("{:?}", record.outcome);
/// ```
pub struct GameDriver<'a, A: GameAuthority> {
    authority: &'a A,
    time_control: TimeControl,
    /// Extra wait past the mover's remaining clock before the engine is
    /// declared unresponsive.
    response_grace: Duration,
}

impl<'a, A: GameAuthority> GameDriver<'a, A> {
    pub fn new(authority: &'a A, time_control: TimeControl, response_grace: Duration) -> Self {
        Self {
            authority,
            time_control,
            response_grace,
        }
    }

    /// Plays a complete game from `opening`.
    ///
    /// `engines` is indexed by [`EngineId`]; `seats` decides who plays Red.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ProcessFailure`] if an engine cannot be written
    /// to, exits, or does not answer `go` within its remaining clock plus
    /// the response grace.
    pub fn play(
        &self,
        engines: &mut [EngineChannel; 2],
        opening: &Opening,
        seats: ColorAssignment,
    ) -> Result<GameRecord, GameError> {
        for engine in engines.iter_mut() {
            engine.time_left_ms = self.time_control.base_ms as i64;
        }
        for id in [EngineId::Engine1, EngineId::Engine2] {
            engines[id.index()]
                .send("uainewgame")
                .map_err(|source| failure(seats.color_of(id), source))?;
        }

        let mut position = self.authority.parse_position(opening.fen())?;
        let mut moves = Vec::new();
        let mut state = GameState::ToMove(opening.side_to_move());

        loop {
            match state {
                GameState::ToMove(side) => {
                    state = self.turn(engines, seats, &mut position, side, &mut moves)?;
                }
                GameState::GameOver(outcome) => return Ok(GameRecord { outcome, moves }),
            }
        }
    }

    fn turn(
        &self,
        engines: &mut [EngineChannel; 2],
        seats: ColorAssignment,
        position: &mut A::Position,
        side: Color,
        moves: &mut Vec<String>,
    ) -> Result<GameState, GameError> {
        let position_cmd = format!("position fen {}", self.authority.serialize(position));
        for color in [Color::Red, Color::Blue] {
            engines[seats.engine(color).index()]
                .send(&position_cmd)
                .map_err(|source| failure(color, source))?;
        }

        let go = format!(
            "go btime {} wtime {} binc {} winc {}",
            engines[seats.engine(Color::Red).index()].time_left_ms,
            engines[seats.engine(Color::Blue).index()].time_left_ms,
            self.time_control.increment_ms,
            self.time_control.increment_ms,
        );
        let mover = &mut engines[seats.engine(side).index()];
        mover.send(&go).map_err(|source| failure(side, source))?;

        let started = Instant::now();
        let budget = Duration::from_millis(mover.time_left_ms.max(0) as u64);
        let line = mover
            .read_until(budget + self.response_grace, |line| {
                line.starts_with("bestmove")
            })
            .map_err(|source| failure(side, source))?;

        mover.time_left_ms -= started.elapsed().as_millis() as i64;
        if mover.time_left_ms <= 0 {
            tracing::debug!("{} ({}) ran out of time", mover.name(), side);
            return Ok(GameState::GameOver(GameOutcome::Timeout(side)));
        }

        let token = line.split_whitespace().last().unwrap_or_default();
        let mv = match self.authority.parse_move(token) {
            Some(mv) if self.authority.is_legal(position, &mv) => mv,
            _ => {
                tracing::debug!("{} ({}) played illegal move '{}'", mover.name(), side, token);
                return Ok(GameState::GameOver(GameOutcome::IllegalMove(side)));
            }
        };

        *position = self.authority.apply(position, &mv);
        moves.push(token.to_string());
        if self.authority.is_terminal(position) {
            let result = self.authority.result(position);
            return Ok(GameState::GameOver(GameOutcome::Normal(result)));
        }

        mover.time_left_ms += self.time_control.increment_ms as i64;
        Ok(GameState::ToMove(side.opposite()))
    }
}

fn failure(color: Color, source: ChannelError) -> GameError {
    GameError::ProcessFailure { color, source }
}
