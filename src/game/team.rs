//! # Teams
//!
//! One side of a battle and the roster text it is built from.

use crate::{
    Battle, Character, CharacterId, CharacterStats, SkirmishError, SkirmishResult, TeamSide,
};
use serde::{Deserialize, Serialize};
use std::num::IntErrorKind;

/// One parsed roster line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub letter: char,
    pub is_cpu: bool,
    pub role: Option<String>,
    pub stats: CharacterStats,
    /// The line was prefixed with `*`
    pub first_turn: bool,
}

/// Parses `[*]letter, (N/A|CPU|<@&roleId>), hp, atk, rng, spd`.
///
/// # Examples
///
/// ```
/// use skirmish::parse_roster_line;
///
/// let entry = parse_roster_line("*b, CPU, 10, 2, 1, 3").unwrap();
/// assert!(entry.first_turn);
/// assert!(entry.is_cpu);
/// assert_eq!(entry.letter, 'B');
/// assert_eq!(entry.stats.spd, 3);
/// ```
pub fn parse_roster_line(line: &str) -> SkirmishResult<RosterEntry> {
    let line = line.trim();
    let (first_turn, rest) = match line.strip_prefix('*') {
        Some(rest) => (true, rest),
        None => (false, line),
    };

    let fields: Vec<&str> = rest.split(',').map(str::trim).collect();
    let [letter, controller, hp, atk, rng, spd] = fields.as_slice() else {
        return Err(roster_error(line, "expected 6 comma separated fields"));
    };

    let mut letters = letter.chars();
    let letter = match (letters.next(), letters.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => c.to_ascii_uppercase(),
        _ => return Err(roster_error(line, "the first field must be a single letter")),
    };

    let (is_cpu, role) = if controller.eq_ignore_ascii_case("N/A") {
        (false, None)
    } else if controller.eq_ignore_ascii_case("CPU") {
        (true, None)
    } else if let Some(id) = controller
        .strip_prefix("<@&")
        .and_then(|s| s.strip_suffix('>'))
        .filter(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
    {
        (false, Some(id.to_string()))
    } else {
        return Err(roster_error(
            line,
            "the second field must be N/A, CPU or a role mention",
        ));
    };

    let stats = CharacterStats {
        hp: parse_stat(line, "HP", hp)?,
        atk: parse_stat(line, "ATK", atk)?,
        rng: parse_stat(line, "RNG", rng)?,
        spd: parse_stat(line, "SPD", spd)?,
    };
    stats.validate()?;

    Ok(RosterEntry {
        letter,
        is_cpu,
        role,
        stats,
        first_turn,
    })
}

/// Parses a multi-line roster, skipping blank lines.
pub fn parse_roster(text: &str) -> SkirmishResult<Vec<RosterEntry>> {
    let entries = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_roster_line)
        .collect::<SkirmishResult<Vec<_>>>()?;

    if entries.is_empty() {
        return Err(SkirmishError::ParseError(
            "A team needs at least one character.".to_string(),
        ));
    }
    Ok(entries)
}

fn parse_stat(line: &str, stat: &'static str, field: &str) -> SkirmishResult<u64> {
    field.parse::<u64>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow => SkirmishError::StatTooLarge {
            stat,
            value: field.to_string(),
            max: crate::config::MAX_STAT_VALUE,
        },
        _ => roster_error(line, &format!("{} must be a whole number", stat)),
    })
}

fn roster_error(line: &str, reason: &str) -> SkirmishError {
    SkirmishError::ParseError(format!("Invalid roster line '{}': {}.", line, reason))
}

/// An ordered roster of characters on one side of a battle.
///
/// Roster order seeds the turn order. A defeated character is removed from
/// the roster immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub side: TeamSide,
    pub characters: Vec<Character>,
}

impl Team {
    /// Creates an empty team.
    pub fn new(side: TeamSide) -> Self {
        Self {
            side,
            characters: Vec::new(),
        }
    }

    /// Parses roster text and adds it to the battle as its next team.
    ///
    /// The battle is left untouched if any line fails to parse.
    pub fn from_roster(battle: &mut Battle, text: &str) -> SkirmishResult<TeamSide> {
        let entries = parse_roster(text)?;
        battle.add_team(&entries)
    }

    pub fn is_eliminated(&self) -> bool {
        self.characters.is_empty()
    }

    /// Removes a character from the roster, returning it if it was present.
    pub fn remove(&mut self, id: CharacterId) -> Option<Character> {
        let index = self.characters.iter().position(|c| c.id == id)?;
        Some(self.characters.remove(index))
    }

    pub fn reset_spd(&mut self) {
        for character in &mut self.characters {
            character.reset_spd();
        }
    }

    /// Letters of the roster, e.g. `[A][B]`.
    pub fn roster_letters(&self) -> String {
        self.characters.iter().map(ToString::to_string).collect()
    }

    /// Announcement for this team winning.
    ///
    /// # Examples
    ///
    /// ```
    /// use skirmish::{Team, TeamSide};
    ///
    /// let team = Team::new(TeamSide::First);
    /// assert_eq!(team.victory_text(), " win! The battle has concluded.");
    /// ```
    pub fn victory_text(&self) -> String {
        let mut names: Vec<String> = self.characters.iter().map(ToString::to_string).collect();
        let count = names.len();

        if count > 1 {
            if let Some(last) = names.last_mut() {
                *last = format!("and {}", last);
            }
        }

        let separator = if count == 2 { " " } else { ", " };
        let verb = if count == 1 { "wins" } else { "win" };
        format!(
            "{} {}! The battle has concluded.",
            names.join(separator),
            verb
        )
    }
}
