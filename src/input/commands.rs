//! # Command Definitions
//!
//! Top-level commands a player can send, and their parser.

use super::{parse_turn, strip_prefix, UNKNOWN_COMMAND_TEXT};
use crate::{config, SkirmishError, SkirmishResult, SubAction};

pub const START_BATTLE_USAGE: &str = "To start a battle, follow this format:\n\
    >> start battle [W]x[H]\n\
    [letter], [@Role], [HP], [ATK], [RNG], [SPD]\n\
    vs.\n\
    [letter], [@Role], [HP], [ATK], [RNG], [SPD]\n\
    You can add more characters to either side by making a new line.\n\
    You may also have duplicate letters, such as multiple Enemies (E).";

/// Command names listed by `help`.
pub const COMMAND_NAMES: [&str; 10] = [
    "help",
    "start battle",
    "end battle",
    "move",
    "attack",
    "save battle preset",
    "load battle preset",
    "delete battle preset",
    "list battle presets",
    "view battle preset",
];

/// A parsed player command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    StartBattle {
        width: u32,
        height: u32,
        rosters: [String; 2],
        /// Full command text, kept for presets
        origin: String,
    },
    EndBattle,
    Turn(Vec<SubAction>),
    SavePreset(String),
    LoadPreset(String),
    DeletePreset(String),
    ListPresets,
    ViewPreset(String),
}

/// Text shown for `help`.
pub fn help_text() -> String {
    let mut text = String::from("Here is a list of the commands available:\n");
    for name in COMMAND_NAMES {
        text.push_str(&format!(">> {}\n", name));
    }
    text.push_str("For `attack` and `move`, you can combine them during a turn in a battle.\n");
    text.push_str("A valid turn could be as follows: `>> attack R 1, move 2 back`");
    text
}

/// Parses a full command message. The `>>` prefix is optional.
///
/// # Examples
///
/// ```
/// use skirmish::{parse_command, Command};
///
/// let command = parse_command(">> save battle preset \"duel\"").unwrap();
/// assert_eq!(command, Command::SavePreset("duel".to_string()));
/// ```
pub fn parse_command(text: &str) -> SkirmishResult<Command> {
    let body = strip_prefix(text);
    let first_line = body.lines().next().unwrap_or("").trim();
    let lowered = first_line.to_lowercase();

    if lowered == "help" {
        return Ok(Command::Help);
    }
    if lowered == "end battle" {
        return Ok(Command::EndBattle);
    }
    if lowered == "list battle presets" {
        return Ok(Command::ListPresets);
    }
    if lowered.starts_with("start battle") {
        return parse_start_battle(body, text);
    }
    if lowered.starts_with("move") || lowered.starts_with("attack") {
        return parse_turn(body).map(Command::Turn);
    }

    let preset_commands: [(&str, fn(String) -> Command); 4] = [
        ("save", Command::SavePreset),
        ("load", Command::LoadPreset),
        ("delete", Command::DeletePreset),
        ("view", Command::ViewPreset),
    ];
    for (verb, build) in preset_commands {
        let keyword = format!("{} battle preset", verb);
        if lowered.starts_with(&keyword) {
            let rest = first_line.get(keyword.len()..).unwrap_or("");
            return parse_preset_name(rest, verb).map(build);
        }
    }

    Err(SkirmishError::InvalidAction(UNKNOWN_COMMAND_TEXT.to_string()))
}

fn parse_start_battle(body: &str, origin: &str) -> SkirmishResult<Command> {
    let usage = || SkirmishError::ParseError(START_BATTLE_USAGE.to_string());

    let mut lines = body.lines();
    let header = lines.next().unwrap_or("").trim();
    let size = header.get("start battle".len()..).unwrap_or("").trim();

    let (width, height) = if size.is_empty() {
        (config::DEFAULT_GRID_WIDTH, config::DEFAULT_GRID_HEIGHT)
    } else {
        let (width, height) = size
            .to_lowercase()
            .split_once('x')
            .map(|(w, h)| (w.trim().parse::<u32>(), h.trim().parse::<u32>()))
            .ok_or_else(usage)?;
        (width.map_err(|_| usage())?, height.map_err(|_| usage())?)
    };

    let mut rosters = [String::new(), String::new()];
    let mut current = 0;
    for line in lines {
        let line = line.trim();
        if line.eq_ignore_ascii_case("vs.") {
            if current == 1 {
                return Err(usage());
            }
            current = 1;
        } else if !line.is_empty() {
            rosters[current].push_str(line);
            rosters[current].push('\n');
        }
    }

    if current == 0 || rosters.iter().any(|roster| roster.is_empty()) {
        return Err(usage());
    }

    Ok(Command::StartBattle {
        width,
        height,
        rosters,
        origin: origin.trim().to_string(),
    })
}

fn parse_preset_name(rest: &str, verb: &str) -> SkirmishResult<String> {
    let usage = || {
        SkirmishError::ParseError(format!(
            "To {} a battle preset, follow this format:\n>> {} battle preset \"name_here\"",
            verb, verb
        ))
    };

    let name = rest
        .trim()
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or_else(usage)?;
    crate::validate_preset_name(name)?;
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MoveDirection;

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse_command(">> help").unwrap(), Command::Help);
        assert_eq!(parse_command(">>End Battle").unwrap(), Command::EndBattle);
        assert_eq!(
            parse_command("list battle presets").unwrap(),
            Command::ListPresets
        );
        assert!(matches!(
            parse_command(">> dance"),
            Err(SkirmishError::InvalidAction(_))
        ));
    }

    #[test]
    fn test_start_battle_with_size() {
        let text = ">> start battle 8x3\na, N/A, 10, 2, 1, 3\n*b, N/A, 9, 2, 1, 3\nvs.\nc, CPU, 10, 2, 1, 3";
        match parse_command(text).unwrap() {
            Command::StartBattle {
                width,
                height,
                rosters,
                origin,
            } => {
                assert_eq!((width, height), (8, 3));
                assert_eq!(rosters[0], "a, N/A, 10, 2, 1, 3\n*b, N/A, 9, 2, 1, 3\n");
                assert_eq!(rosters[1], "c, CPU, 10, 2, 1, 3\n");
                assert_eq!(origin, text);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_start_battle_default_size() {
        let command = parse_command("start battle\na, N/A, 1, 1, 1, 1\nvs.\nb, N/A, 1, 1, 1, 1").unwrap();
        assert!(matches!(
            command,
            Command::StartBattle {
                width: 6,
                height: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_start_battle_needs_two_rosters() {
        assert!(parse_command("start battle\na, N/A, 1, 1, 1, 1").is_err());
        assert!(parse_command("start battle\na, N/A, 1, 1, 1, 1\nvs.").is_err());
        assert!(parse_command("start battle 4by4\na, N/A, 1, 1, 1, 1\nvs.\nb, N/A, 1, 1, 1, 1").is_err());
    }

    #[test]
    fn test_turn_command() {
        assert_eq!(
            parse_command(">> move 2 up").unwrap(),
            Command::Turn(vec![SubAction::Move {
                distance: 2,
                direction: MoveDirection::Up
            }])
        );
    }

    #[test]
    fn test_preset_commands() {
        assert_eq!(
            parse_command(">> load battle preset \"Boss-1\"").unwrap(),
            Command::LoadPreset("Boss-1".to_string())
        );
        assert_eq!(
            parse_command(">> view battle preset \"x\"").unwrap(),
            Command::ViewPreset("x".to_string())
        );
        assert!(parse_command(">> delete battle preset boss").is_err());
        assert!(parse_command(">> save battle preset \"two words\"").is_err());
    }

    #[test]
    fn test_help_lists_commands() {
        let text = help_text();
        assert!(text.contains(">> start battle\n"));
        assert!(text.contains(">> view battle preset\n"));
    }
}
