//! Sides of the board and the engines seated on them.

/// The two sides of the board.
///
/// Red is the side marked `x` in a position string, Blue the side marked `o`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Color {
    Red = 0,
    Blue = 1,
}

impl Color {
    /// Returns the opposite color.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Color::Red => Color::Blue,
            Color::Blue => Color::Red,
        }
    }

    /// Returns the index (0 for Red, 1 for Blue).
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Parses a side-to-move marker (`x` for Red, `o` for Blue).
    pub fn from_marker(token: &str) -> Option<Self> {
        match token {
            "x" | "X" => Some(Color::Red),
            "o" | "O" => Some(Color::Blue),
            _ => None,
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::Red => write!(f, "Red"),
            Color::Blue => write!(f, "Blue"),
        }
    }
}

/// The two engines under test, in command-line order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EngineId {
    Engine1 = 0,
    Engine2 = 1,
}

impl EngineId {
    #[inline]
    pub const fn other(self) -> Self {
        match self {
            EngineId::Engine1 => EngineId::Engine2,
            EngineId::Engine2 => EngineId::Engine1,
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Which engine plays which color for one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorAssignment {
    seats: [EngineId; 2],
}

impl ColorAssignment {
    /// Seats `red` on Red and the other engine on Blue.
    pub const fn with_red(red: EngineId) -> Self {
        Self {
            seats: [red, red.other()],
        }
    }

    /// The same pairing with colors reversed.
    pub const fn swapped(self) -> Self {
        Self::with_red(self.seats[Color::Blue.index()])
    }

    /// The engine seated on `color`.
    #[inline]
    pub const fn engine(self, color: Color) -> EngineId {
        self.seats[color.index()]
    }

    /// The color `engine` is playing.
    #[inline]
    pub fn color_of(self, engine: EngineId) -> Color {
        if self.seats[Color::Red.index()] == engine {
            Color::Red
        } else {
            Color::Blue
        }
    }
}
