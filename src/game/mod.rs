//! # Game Module
//!
//! Battle state, grid geometry and the entity model.
//!
//! This module contains the fundamental building blocks of a Skirmish battle:
//! - Grid geometry (bounds, range and tie-break distances)
//! - Characters, teams and the battle aggregate that owns them
//! - Atomic turn resolution with rollback
//! - The persisted projection used for presets and replay

pub mod actions;
pub mod battle;
pub mod character;
pub mod persisted;
pub mod team;
pub mod transaction;

pub use actions::*;
pub use battle::*;
pub use character::*;
pub use persisted::*;
pub use team::*;
pub use transaction::*;

use crate::{config, SkirmishError, SkirmishResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Represents a cell on the battle grid.
///
/// Coordinates are signed so that a tentative move can land outside the grid
/// and be rejected by [`Grid::is_out_of_bounds`].
///
/// # Examples
///
/// ```
/// use skirmish::Position;
///
/// let pos = Position::new(1, 2);
/// assert_eq!(pos.chebyshev_distance(Position::new(4, 0)), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

impl Position {
    /// Creates a new position with the given coordinates.
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance, used for attack range.
    pub fn chebyshev_distance(self, other: Position) -> u64 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        dx.max(dy)
    }

    /// Euclidean distance, used only to pick the nearest target.
    pub fn euclidean_distance(self, other: Position) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

impl std::ops::Add for Position {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

/// Fixed dimensions of a battle grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub width: u32,
    pub height: u32,
}

impl Grid {
    /// Creates a grid, rejecting empty dimensions.
    pub fn new(width: u32, height: u32) -> SkirmishResult<Self> {
        if width == 0 || height == 0 {
            return Err(SkirmishError::ParseError(format!(
                "A battle grid must be at least 1x1 (got {}x{}).",
                width, height
            )));
        }
        if width > config::MAX_GRID_WIDTH || height > config::MAX_GRID_HEIGHT {
            return Err(SkirmishError::ParseError(format!(
                "A battle grid can be at most {}x{} (got {}x{}).",
                config::MAX_GRID_WIDTH,
                config::MAX_GRID_HEIGHT,
                width,
                height
            )));
        }
        Ok(Self { width, height })
    }

    /// True iff the position lies outside the grid.
    pub fn is_out_of_bounds(&self, position: Position) -> bool {
        position.x < 0
            || position.x >= i64::from(self.width)
            || position.y < 0
            || position.y >= i64::from(self.height)
    }

    /// Column on which a side's characters are first placed.
    pub fn starting_column(&self, side: TeamSide) -> i64 {
        match side {
            TeamSide::First => 0,
            TeamSide::Second => i64::from(self.width) - 1,
        }
    }
}

/// Which of the two teams a character belongs to.
///
/// Team order is significant: it fixes the starting edge, the meaning of
/// "forward" and the turn order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamSide {
    First,
    Second,
}

impl TeamSide {
    /// Position of the team in the battle's team list.
    pub fn index(self) -> usize {
        match self {
            TeamSide::First => 0,
            TeamSide::Second => 1,
        }
    }

    /// Side for a team list position.
    pub fn from_index(index: usize) -> Option<TeamSide> {
        match index {
            0 => Some(TeamSide::First),
            1 => Some(TeamSide::Second),
            _ => None,
        }
    }

    /// The opposing side.
    pub fn opponent(self) -> TeamSide {
        match self {
            TeamSide::First => TeamSide::Second,
            TeamSide::Second => TeamSide::First,
        }
    }

    /// Sign of the x axis that counts as "forward" for this side.
    pub fn forward_sign(self) -> i64 {
        match self {
            TeamSide::First => 1,
            TeamSide::Second => -1,
        }
    }
}

/// Movement directions understood by [`Character::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveDirection {
    Left,
    Right,
    Up,
    Down,
    /// Toward the side's own starting edge
    Back,
    /// Away from the side's own starting edge
    Forward,
}

impl MoveDirection {
    /// Converts a direction into a position delta for the given side.
    ///
    /// Up decreases y, matching the board rendering where row 0 is on top.
    pub fn to_delta(self, distance: u64, side: TeamSide) -> Position {
        let distance = i64::try_from(distance).unwrap_or(i64::MAX);
        match self {
            MoveDirection::Left => Position::new(-distance, 0),
            MoveDirection::Right => Position::new(distance, 0),
            MoveDirection::Up => Position::new(0, -distance),
            MoveDirection::Down => Position::new(0, distance),
            MoveDirection::Back => Position::new(-side.forward_sign() * distance, 0),
            MoveDirection::Forward => Position::new(side.forward_sign() * distance, 0),
        }
    }
}

impl FromStr for MoveDirection {
    type Err = SkirmishError;

    fn from_str(word: &str) -> Result<Self, Self::Err> {
        match word.to_ascii_lowercase().as_str() {
            "left" => Ok(MoveDirection::Left),
            "right" => Ok(MoveDirection::Right),
            "up" => Ok(MoveDirection::Up),
            "down" => Ok(MoveDirection::Down),
            "back" | "backward" | "backwards" => Ok(MoveDirection::Back),
            "forward" | "forwards" => Ok(MoveDirection::Forward),
            other => Err(SkirmishError::InvalidAction(format!(
                "Unknown direction '{}'. The directions available are: up, down, left, right, forward and back.",
                other
            ))),
        }
    }
}

impl fmt::Display for MoveDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            MoveDirection::Left => "left",
            MoveDirection::Right => "right",
            MoveDirection::Up => "up",
            MoveDirection::Down => "down",
            MoveDirection::Back => "back",
            MoveDirection::Forward => "forward",
        };
        f.write_str(word)
    }
}

/// Identity of a live character. Never persisted.
pub type CharacterId = Uuid;

/// Creates a new unique character ID.
pub fn new_character_id() -> CharacterId {
    Uuid::new_v4()
}
