//! Block positions and cardinal directions on the world grid.

use serde::{Deserialize, Serialize};

/// An absolute block position in the world grid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BlockPos {
    /// East/west coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
    /// North/south coordinate.
    pub z: i32,
}

impl BlockPos {
    /// Create a position from its coordinates.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The cell directly above this one.
    pub const fn up(self) -> Self {
        Self::new(self.x, self.y + 1, self.z)
    }

    /// The cell directly below this one.
    pub const fn down(self) -> Self {
        Self::new(self.x, self.y - 1, self.z)
    }

    /// The neighboring cell in `direction`.
    pub const fn offset(self, direction: Direction) -> Self {
        let (dx, dy, dz) = direction.delta();
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

/// A face direction on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Toward negative z.
    North,
    /// Toward positive z.
    South,
    /// Toward positive x.
    East,
    /// Toward negative x.
    West,
    /// Toward positive y.
    Up,
    /// Toward negative y.
    Down,
}

impl Direction {
    /// The four horizontal cardinal directions, in deterministic order.
    pub const HORIZONTAL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Unit offset for this direction.
    pub const fn delta(self) -> (i32, i32, i32) {
        match self {
            Direction::North => (0, 0, -1),
            Direction::South => (0, 0, 1),
            Direction::East => (1, 0, 0),
            Direction::West => (-1, 0, 0),
            Direction::Up => (0, 1, 0),
            Direction::Down => (0, -1, 0),
        }
    }

    /// The opposite direction.
    pub const fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}
