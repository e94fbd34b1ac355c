//! # Persisted Battles
//!
//! Plain-data projection of a battle used for presets and replay.
//!
//! Only creation-time stats are kept: a restored battle starts fresh, with
//! every character at full HP and SPD and placed again on its side's edge.
//! The turn holder travels as an index into the flattened roster.

use crate::{
    Battle, BattleOptions, ChannelKey, Character, CharacterStats, RosterEntry, SkirmishError,
    SkirmishResult, Team,
};
use serde::{Deserialize, Serialize};

/// Persisted form of a character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedCharacter {
    pub letter: char,
    #[serde(rename = "isCPU")]
    pub is_cpu: bool,
    #[serde(rename = "roleID", default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,
    /// Max HP
    pub hp: u64,
    pub atk: u64,
    pub rng: u64,
    /// Max SPD
    pub spd: u64,
}

/// Persisted form of a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedTeam {
    pub characters: Vec<PersistedCharacter>,
}

/// Persisted form of a battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedBattle {
    pub width: u32,
    pub height: u32,
    pub turn_index: usize,
    pub command_text: String,
    pub teams: Vec<PersistedTeam>,
}

impl From<&Character> for PersistedCharacter {
    fn from(character: &Character) -> Self {
        let stats = character.base_stats();
        Self {
            letter: character.letter,
            is_cpu: character.is_cpu,
            role_id: character.role.clone(),
            hp: stats.hp,
            atk: stats.atk,
            rng: stats.rng,
            spd: stats.spd,
        }
    }
}

impl From<&Team> for PersistedTeam {
    fn from(team: &Team) -> Self {
        Self {
            characters: team.characters.iter().map(PersistedCharacter::from).collect(),
        }
    }
}

impl PersistedCharacter {
    fn to_roster_entry(&self) -> RosterEntry {
        RosterEntry {
            letter: self.letter,
            is_cpu: self.is_cpu,
            role: self.role_id.clone(),
            stats: CharacterStats {
                hp: self.hp,
                atk: self.atk,
                rng: self.rng,
                spd: self.spd,
            },
            first_turn: false,
        }
    }
}

impl PersistedBattle {
    /// Rosters as letters, e.g. `[A][B] vs. [C]`.
    pub fn roster_summary(&self) -> String {
        self.teams
            .iter()
            .map(|team| {
                team.characters
                    .iter()
                    .map(|c| format!("[{}]", c.letter))
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join(" vs. ")
    }

    /// Detailed listing: size, every character's stats with the starting
    /// character marked `*`, and the command that created the battle.
    pub fn describe(&self, name: &str) -> String {
        let mut text = format!("NAME: {}\nSIZE: {}x{}\n\n", name, self.width, self.height);
        let mut index = 0;

        for (team_index, team) in self.teams.iter().enumerate() {
            text.push_str(&format!("TEAM {}:\n", team_index + 1));
            for character in &team.characters {
                let marker = if index == self.turn_index { "*" } else { "" };
                text.push_str(&format!(
                    "  {}[{}] - HP: {}, ATK: {}, RNG: {}, SPD: {}\n",
                    marker, character.letter, character.hp, character.atk, character.rng, character.spd
                ));
                index += 1;
            }
            text.push('\n');
        }

        text.push_str("Here was the command that created this battle:\n");
        text.push_str(&self.command_text);
        text
    }

    /// Saves to JSON.
    pub fn to_json(&self) -> SkirmishResult<String> {
        serde_json::to_string_pretty(self).map_err(SkirmishError::from)
    }

    /// Loads from JSON.
    pub fn from_json(json: &str) -> SkirmishResult<Self> {
        serde_json::from_str(json).map_err(SkirmishError::from)
    }
}

impl Battle {
    /// Projects the battle into its persisted form.
    pub fn to_persisted(&self) -> PersistedBattle {
        PersistedBattle {
            width: self.width(),
            height: self.height(),
            turn_index: self.turn_index().unwrap_or(0),
            command_text: self.origin_text().to_string(),
            teams: self.teams().iter().map(PersistedTeam::from).collect(),
        }
    }

    /// Rebuilds a battle from its persisted form with default options.
    ///
    /// # Examples
    ///
    /// ```
    /// use skirmish::{Battle, Team};
    ///
    /// let mut battle = Battle::new("a".to_string(), 4, 2, "origin").unwrap();
    /// Team::from_roster(&mut battle, "x, N/A, 10, 1, 1, 2").unwrap();
    /// Team::from_roster(&mut battle, "*y, CPU, 10, 1, 1, 2").unwrap();
    ///
    /// let persisted = battle.to_persisted();
    /// let restored = Battle::from_persisted("b".to_string(), &persisted).unwrap();
    /// assert_eq!(restored.turn_holder().unwrap().letter, 'Y');
    /// assert_eq!(restored.to_persisted(), persisted);
    /// ```
    pub fn from_persisted(channel: ChannelKey, persisted: &PersistedBattle) -> SkirmishResult<Battle> {
        Self::from_persisted_with(channel, persisted, BattleOptions::default())
    }

    /// Rebuilds a battle from its persisted form.
    pub fn from_persisted_with(
        channel: ChannelKey,
        persisted: &PersistedBattle,
        options: BattleOptions,
    ) -> SkirmishResult<Battle> {
        if !matches!(persisted.teams.len(), 0 | 2) {
            return Err(SkirmishError::ParseError(format!(
                "A saved battle must have two teams, found {}.",
                persisted.teams.len()
            )));
        }

        let mut battle = Battle::with_options(
            channel,
            persisted.width,
            persisted.height,
            persisted.command_text.clone(),
            options,
        )?;

        for team in &persisted.teams {
            let entries: Vec<RosterEntry> = team
                .characters
                .iter()
                .map(PersistedCharacter::to_roster_entry)
                .collect();
            if entries.is_empty() {
                return Err(SkirmishError::ParseError(
                    "A saved team has no characters.".to_string(),
                ));
            }
            battle.add_team(&entries)?;
        }

        if !persisted.teams.is_empty() {
            battle.set_turn_index(persisted.turn_index)?;
        }
        Ok(battle)
    }
}
