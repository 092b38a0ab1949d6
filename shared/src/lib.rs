use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// Opaque identifier the transport layer hands out per connection.
pub type SessionId = u32;

pub const DEFAULT_GRID_WIDTH: u32 = 30;
pub const DEFAULT_GRID_HEIGHT: u32 = 30;
pub const DEFAULT_CELL_SIZE: u32 = 30;
pub const DEFAULT_TICK_MS: u64 = 100;
pub const DEFAULT_PORT: u16 = 3000;

/// Largest payload a single UDP datagram can carry.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

pub const DEFAULT_PLAYER_NAME: &str = "Player";
/// Longer display names are cut to this many characters.
pub const MAX_NAME_CHARS: usize = 24;
pub const SELF_COLLISION_REASON: &str = "Hit own body";
pub const OTHER_COLLISION_REASON: &str = "Collision with other snake";

/// Points taken from a snake whose body was run into.
pub const COLLISION_SCORE_PENALTY: u32 = 2;
/// Segments cut from a damaged snake's tail.
pub const COLLISION_TAIL_LOSS: usize = 2;
/// A damaged snake only loses tail segments while longer than this.
pub const MIN_LENGTH_FOR_TAIL_LOSS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Cell offset of one step. Y grows downwards, so `Up` is `(0, -1)`.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Renders the color the way browser clients expect it, e.g. `rgb(12, 200, 7)`.
    pub fn to_css(&self) -> String {
        format!("rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

/// A player's snake. The body is stored head-first and is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snake {
    pub body: VecDeque<Position>,
    pub direction: Direction,
    pub score: u32,
    pub name: String,
    pub color: Color,
}

impl Snake {
    pub fn new(head: Position, direction: Direction, name: String, color: Color) -> Self {
        Self {
            body: VecDeque::from([head]),
            direction,
            score: 0,
            name,
            color,
        }
    }

    pub fn head(&self) -> Position {
        self.body[0]
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionKind {
    #[serde(rename = "self")]
    OwnBody,
    #[serde(rename = "other")]
    OtherSnake,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageKind {
    Collision,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Connect {
        name: String,
    },
    ChangeDirection {
        direction: Direction,
    },
    Heartbeat,
    Disconnect,

    Connected {
        session_id: SessionId,
    },
    Rejected {
        reason: String,
    },
    GameState {
        players: BTreeMap<SessionId, Snake>,
        food: Position,
        grid_size: u32,
        grid_width: u32,
        grid_height: u32,
    },
    PlayerJoined {
        id: SessionId,
        player: Snake,
    },
    PlayerLeft {
        id: SessionId,
    },
    FoodEaten {
        food: Position,
        player_id: SessionId,
    },
    GameOver {
        reason: String,
        kind: CollisionKind,
        victims: Option<Vec<SessionId>>,
    },
    SnakeDamaged {
        damage: DamageKind,
        remaining_score: u32,
    },
}
