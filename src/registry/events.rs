//! # Battle Events
//!
//! Outbound notifications for the transport layer.

use crate::{ChannelKey, TeamSide, TurnSummary};

/// Something the players in a channel should be told about.
#[derive(Debug, Clone, PartialEq)]
pub enum BattleEvent {
    /// A battle was started or loaded
    Started { channel: ChannelKey, board: String },
    /// A character now holds the turn
    TurnStarted {
        channel: ChannelKey,
        letter: char,
        role: Option<String>,
        is_cpu: bool,
    },
    /// The engine is submitting a CPU turn
    CpuCommand { channel: ChannelKey, command: String },
    /// A turn was applied
    TurnResolved {
        channel: ChannelKey,
        summary: TurnSummary,
    },
    /// A team was eliminated and the battle is over
    Victory {
        channel: ChannelKey,
        winner: TeamSide,
        text: String,
    },
    /// The battle was ended on request
    Ended { channel: ChannelKey },
}

impl BattleEvent {
    pub fn channel(&self) -> &str {
        match self {
            BattleEvent::Started { channel, .. }
            | BattleEvent::TurnStarted { channel, .. }
            | BattleEvent::CpuCommand { channel, .. }
            | BattleEvent::TurnResolved { channel, .. }
            | BattleEvent::Victory { channel, .. }
            | BattleEvent::Ended { channel } => channel,
        }
    }

    /// Plain text announcement for the event.
    pub fn to_text(&self) -> String {
        match self {
            BattleEvent::Started { board, .. } => format!("Battle start!\n{}", board),
            BattleEvent::TurnStarted { letter, role, .. } => match role {
                Some(role) => format!("<@&{}> [{}]'s turn!", role, letter),
                None => format!("[{}]'s turn!", letter),
            },
            BattleEvent::CpuCommand { command, .. } => format!(">> {}", command),
            BattleEvent::TurnResolved { summary, .. } => {
                format!("{}{}", summary.damage_text(), summary.board)
            }
            BattleEvent::Victory { text, .. } => text.clone(),
            BattleEvent::Ended { .. } => "The battle has concluded.".to_string(),
        }
    }
}
