//! Shared fixtures for the integration tests.
//!
//! `ScriptedRules` is a toy game: any cell like `b2` is a quiet move,
//! `mate` wins for the side that plays it, `draw` ends the game drawn, and
//! the game is drawn after [`MAX_PLIES`] quiet moves. `a1` is always
//! occupied, so it parses but is illegal.

#![allow(dead_code)]

use std::time::Duration;

use sprt_arena::authority::{ColorResult, GameAuthority, PositionError};
use sprt_arena::debug_log::DebugLog;
use sprt_arena::engine_channel::{EngineChannel, EngineCommand};
use sprt_arena::Color;

pub const MAX_PLIES: u32 = 20;

#[derive(Debug, Clone, Default)]
pub struct ScriptedRules;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    pub to_move: Color,
    pub plies: u32,
    pub finished: Option<ColorResult>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedMove {
    Quiet(String),
    Mate,
    Draw,
}

impl GameAuthority for ScriptedRules {
    type Position = Board;
    type Move = ScriptedMove;

    fn parse_position(&self, position: &str) -> Result<Board, PositionError> {
        let to_move = position
            .split_whitespace()
            .rev()
            .find_map(Color::from_marker)
            .ok_or_else(|| PositionError {
                position: position.to_string(),
                reason: "no side to move".to_string(),
            })?;
        Ok(Board {
            to_move,
            plies: 0,
            finished: None,
        })
    }

    fn serialize(&self, board: &Board) -> String {
        let marker = match board.to_move {
            Color::Red => "x",
            Color::Blue => "o",
        };
        format!("ply{} {}", board.plies, marker)
    }

    fn parse_move(&self, token: &str) -> Option<ScriptedMove> {
        match token {
            "mate" => Some(ScriptedMove::Mate),
            "draw" => Some(ScriptedMove::Draw),
            _ => {
                let mut chars = token.chars();
                match (chars.next(), chars.next(), chars.next()) {
                    (Some('a'..='g'), Some('1'..='7'), None) => {
                        Some(ScriptedMove::Quiet(token.to_string()))
                    }
                    _ => None,
                }
            }
        }
    }

    fn is_legal(&self, board: &Board, mv: &ScriptedMove) -> bool {
        board.finished.is_none() && *mv != ScriptedMove::Quiet("a1".to_string())
    }

    fn apply(&self, board: &Board, mv: &ScriptedMove) -> Board {
        let finished = match mv {
            ScriptedMove::Mate => Some(match board.to_move {
                Color::Red => ColorResult::RedWins,
                Color::Blue => ColorResult::BlueWins,
            }),
            ScriptedMove::Draw => Some(ColorResult::Draw),
            ScriptedMove::Quiet(_) => None,
        };
        Board {
            to_move: board.to_move.opposite(),
            plies: board.plies + 1,
            finished,
        }
    }

    fn is_terminal(&self, board: &Board) -> bool {
        board.finished.is_some() || board.plies >= MAX_PLIES
    }

    fn result(&self, board: &Board) -> ColorResult {
        board.finished.unwrap_or(ColorResult::Draw)
    }
}

/// The scripted engine binary started with `args`.
pub fn scripted_engine(args: &[&str]) -> EngineCommand {
    EngineCommand::new(env!("CARGO_BIN_EXE_scripted-engine")).args(args.iter().copied())
}

/// Spawns and greets a scripted engine.
pub fn channel(command: &EngineCommand, label: &str, log: &DebugLog) -> EngineChannel {
    let mut engine = EngineChannel::spawn_command(command, Some(label), log.clone()).unwrap();
    engine.handshake(Duration::from_secs(5)).unwrap();
    engine
}

pub fn opening_line(marker: &str, n: usize) -> String {
    format!("x5o/7/7/7/7/7/o5x {} {} 1", marker, n)
}
