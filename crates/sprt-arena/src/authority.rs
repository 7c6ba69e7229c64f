//! Game rules abstraction.
//!
//! The arena never interprets positions or moves itself. Everything
//! game-specific (legality, move application, terminal detection and the
//! final result) is delegated to a [`GameAuthority`] supplied by the caller.

use thiserror::Error;

/// Final result of a game that ended on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorResult {
    /// Red won the game.
    RedWins,
    /// Blue won the game.
    BlueWins,
    /// The game ended in a draw.
    Draw,
}

/// The rules engine rejected a position string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid position '{position}': {reason}")]
pub struct PositionError {
    /// The position string that failed to parse.
    pub position: String,
    /// Why the rules engine rejected it.
    pub reason: String,
}

/// Trait for the rules engine of the game being played.
///
/// Implementations must be cheap to share: every worker owns its own clone.
///
/// # Example
///
/// ```ignore
/// let position = authority.parse_position(opening.fen())?;
/// if let Some(mv) = authority.parse_move("b2") {
///     if authority.is_legal(&position, &mv) {
///         let next = authority.apply(&position, &mv);
///     }
/// }
/// ```
pub trait GameAuthority: Clone + Send + 'static {
    /// A board state.
    type Position: Clone + Send;
    /// A move in the authority's own representation.
    type Move: Send;

    /// Parses a position string as found in the opening book.
    fn parse_position(&self, position: &str) -> Result<Self::Position, PositionError>;

    /// Serializes a position for the `position fen` command.
    fn serialize(&self, position: &Self::Position) -> String;

    /// Parses a move token sent by an engine. `None` means the token is not
    /// a move at all, which the driver treats as an illegal move.
    fn parse_move(&self, token: &str) -> Option<Self::Move>;

    /// Returns true if `mv` may be played in `position`.
    fn is_legal(&self, position: &Self::Position, mv: &Self::Move) -> bool;

    /// Plays a legal move, returning the resulting position.
    fn apply(&self, position: &Self::Position, mv: &Self::Move) -> Self::Position;

    /// Returns true if the game is over in `position`.
    fn is_terminal(&self, position: &Self::Position) -> bool;

    /// Outcome of a terminal position.
    fn result(&self, position: &Self::Position) -> ColorResult;
}
