//! # Skirmish
//!
//! A turn-based tactical battle engine: two teams of positioned combatants
//! take alternating turns (move, attack) on a bounded grid until one side is
//! eliminated.
//!
//! ## Architecture Overview
//!
//! - **Game**: the battle aggregate, its teams and characters, turn order,
//!   atomic turn resolution and the persisted projection of a battle
//! - **Registry**: one battle per channel, a FIFO turn queue per battle and
//!   automatic scheduling of CPU turns
//! - **Presets**: named, persisted battle snapshots grouped by guild
//! - **Input**: parsing of command text into structured commands
//! - **Session**: dispatch of one channel's commands to the registry and
//!   the preset store
//!
//! Battles never share state. Every turn runs against a single battle behind
//! that battle's lock, and a rejected turn leaves the battle untouched.

pub mod game;
pub mod input;
pub mod presets;
pub mod registry;
pub mod session;

pub use game::*;
pub use input::*;
pub use presets::*;
pub use registry::*;
pub use session::*;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Core error type for the Skirmish battle engine.
#[derive(thiserror::Error, Debug)]
pub enum SkirmishError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A battle is already running in the channel
    #[error("There is already an ongoing battle in channel {0}.")]
    AlreadyExists(String),

    /// No battle or preset with the requested key
    #[error("{0}")]
    NotFound(String),

    /// Roster, preset or command text is malformed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Turn submitted by someone other than the turn holder
    #[error("{0}")]
    WrongTurn(String),

    /// Unrecognized or malformed sub-action
    #[error("{0}")]
    InvalidAction(String),

    /// Movement would leave the grid
    #[error("{0}")]
    OutOfBounds(String),

    /// Target is further away than the attacker's range
    #[error("{0}")]
    OutOfRange(String),

    /// No enemy carries the requested letter
    #[error("{0}")]
    NoSuchTarget(String),

    /// Not enough SPD left for the requested move or attack
    #[error("{0}")]
    InsufficientResource(String),

    /// A creation-time stat exceeds [`config::MAX_STAT_VALUE`]
    #[error("You cannot make a character stat greater than {max}! ({stat} was {value})")]
    StatTooLarge {
        stat: &'static str,
        value: String,
        max: u64,
    },

    /// A battle would hold more than the configured number of characters
    #[error("You cannot make a battle with more than {max} characters! (got {count})")]
    TooManyCharacters { count: usize, max: usize },

    /// The battle has already ended
    #[error("The battle has already concluded.")]
    Concluded,

    /// The guild already stores the maximum number of presets
    #[error("This server has reached the maximum preset limit ({max}).")]
    PresetLimitExceeded { max: usize },

    /// Battle state is internally inconsistent
    #[error("Invalid battle state: {0}")]
    InvalidState(String),
}

impl SkirmishError {
    /// Returns true for expected, user-facing failures.
    ///
    /// Anything else points at a bug or an environment fault and is logged
    /// in addition to being reported.
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            SkirmishError::Io(_) | SkirmishError::Serde(_) | SkirmishError::InvalidState(_)
        )
    }
}

/// Result type used throughout the Skirmish codebase.
pub type SkirmishResult<T> = Result<T, SkirmishError>;

/// Version information for the engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine configuration constants.
pub mod config {
    /// Largest value any stat may take when a character is created
    pub const MAX_STAT_VALUE: u64 = 100_000_000;

    /// Maximum number of characters across both teams of one battle
    pub const MAX_CHARACTER_COUNT: usize = 50;

    /// Maximum number of presets stored per guild
    pub const MAX_PRESET_COUNT: usize = 100;

    /// Grid width used when a start command omits the dimensions
    pub const DEFAULT_GRID_WIDTH: u32 = 6;

    /// Grid height used when a start command omits the dimensions
    pub const DEFAULT_GRID_HEIGHT: u32 = 1;

    /// Widest battle grid that may be created or restored
    pub const MAX_GRID_WIDTH: u32 = 100;

    /// Tallest battle grid that may be created or restored
    pub const MAX_GRID_HEIGHT: u32 = 100;

    /// Delay before a CPU character submits its turn
    pub const CPU_COMMAND_DELAY_MS: u64 = 1000;
}

/// Runtime configuration carried by a [`BattleRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Delay before a CPU character submits its turn
    pub cpu_delay: Duration,
    /// Seed for initial row placement; `None` draws from entropy
    pub placement_seed: Option<u64>,
    /// Maximum number of characters in one battle
    pub max_characters: usize,
}

impl EngineConfig {
    /// Creates the production configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use skirmish::EngineConfig;
    ///
    /// let config = EngineConfig::new();
    /// assert_eq!(config.cpu_delay.as_millis(), 1000);
    /// assert_eq!(config.max_characters, 50);
    /// ```
    pub fn new() -> Self {
        Self {
            cpu_delay: Duration::from_millis(config::CPU_COMMAND_DELAY_MS),
            placement_seed: None,
            max_characters: config::MAX_CHARACTER_COUNT,
        }
    }

    /// Creates a configuration for tests: no CPU delay, fixed placement seed.
    pub fn for_testing() -> Self {
        Self {
            cpu_delay: Duration::ZERO,
            placement_seed: Some(12345),
            max_characters: config::MAX_CHARACTER_COUNT,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_are_distinguished() {
        assert!(SkirmishError::Concluded.is_user_error());
        assert!(SkirmishError::OutOfRange("far".to_string()).is_user_error());
        assert!(!SkirmishError::InvalidState("broken".to_string()).is_user_error());
    }

    #[test]
    fn test_testing_config_has_no_delay() {
        let config = EngineConfig::for_testing();
        assert!(config.cpu_delay.is_zero());
        assert_eq!(config.placement_seed, Some(12345));
    }
}
