//! # Turn Actions
//!
//! Sub-actions that make up a turn, who may submit them, and what a resolved
//! turn reports back.

use crate::{CharacterId, MoveDirection, TeamSide};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One primitive operation within a submitted turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubAction {
    /// Move `distance` cells in a straight line.
    Move {
        distance: u64,
        direction: MoveDirection,
    },
    /// Attack `count` times, optionally restricted to enemies with a letter.
    Attack { count: u64, target: Option<char> },
}

impl fmt::Display for SubAction {
    /// Renders the sub-action in the same text form the command parser reads.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubAction::Move {
                distance,
                direction,
            } => write!(f, "move {} {}", distance, direction),
            SubAction::Attack {
                count,
                target: Some(letter),
            } => write!(f, "attack {} {}", letter, count),
            SubAction::Attack {
                count,
                target: None,
            } => write!(f, "attack {}", count),
        }
    }
}

/// Renders a composite turn as comma separated sub-actions.
pub fn format_turn(actions: &[SubAction]) -> String {
    actions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Who submitted a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitter {
    /// A person acting for the current (non-CPU) turn holder
    Human,
    /// The engine acting for the given CPU character
    Cpu(CharacterId),
}

/// Damage one target took during a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageReport {
    pub target: CharacterId,
    pub letter: char,
    pub damage: u64,
    pub hp: u64,
    pub max_hp: u64,
    pub defeated: bool,
}

/// What happened to the battle after a turn resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnOutcome {
    /// The battle continues with the given turn holder
    NextTurn(CharacterId),
    /// A team was eliminated and the other side won
    Victory(TeamSide),
}

/// Result of a successfully resolved turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnSummary {
    /// Character that took the turn
    pub actor: CharacterId,
    /// Damage per target in first-hit order, zero-damage entries dropped
    pub damage: Vec<DamageReport>,
    /// Board after the turn
    pub board: String,
    pub outcome: TurnOutcome,
}

impl TurnSummary {
    /// Multi-line damage report: damage lines, then HP lines, then defeats.
    pub fn damage_text(&self) -> String {
        let mut damage_lines = String::new();
        let mut hp_lines = String::new();
        let mut defeat_lines = String::new();

        for report in &self.damage {
            damage_lines.push_str(&format!(
                "{} DMG dealt to [{}]!\n",
                report.damage, report.letter
            ));
            hp_lines.push_str(&format!(
                "[{}] HP: {}/{}\n",
                report.letter, report.hp, report.max_hp
            ));
            if report.defeated {
                defeat_lines.push_str(&format!("[{}] was defeated!\n", report.letter));
            }
        }

        damage_lines + &hp_lines + &defeat_lines
    }
}

/// Where the turn state machine currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Waiting for the given character to act
    AwaitingTurn(CharacterId),
    /// The battle is over; `winner` is `None` when it was ended on request
    Concluded { winner: Option<TeamSide> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_action_display() {
        let turn = [
            SubAction::Move {
                distance: 2,
                direction: MoveDirection::Left,
            },
            SubAction::Attack {
                count: 3,
                target: Some('A'),
            },
            SubAction::Attack {
                count: 1,
                target: None,
            },
        ];
        assert_eq!(format_turn(&turn), "move 2 left, attack A 3, attack 1");
    }

    #[test]
    fn test_damage_text_groups_lines() {
        let summary = TurnSummary {
            actor: crate::new_character_id(),
            damage: vec![
                DamageReport {
                    target: crate::new_character_id(),
                    letter: 'B',
                    damage: 10,
                    hp: 0,
                    max_hp: 10,
                    defeated: true,
                },
                DamageReport {
                    target: crate::new_character_id(),
                    letter: 'C',
                    damage: 4,
                    hp: 6,
                    max_hp: 10,
                    defeated: false,
                },
            ],
            board: String::new(),
            outcome: TurnOutcome::Victory(TeamSide::First),
        };

        assert_eq!(
            summary.damage_text(),
            "10 DMG dealt to [B]!\n4 DMG dealt to [C]!\n[B] HP: 0/10\n[C] HP: 6/10\n[B] was defeated!\n"
        );
    }
}
