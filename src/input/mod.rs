//! # Input Module
//!
//! Parsing of player command text into structured commands and turns.

pub mod commands;

pub use commands::*;

use crate::{MoveDirection, SkirmishError, SkirmishResult, SubAction};

pub const UNKNOWN_COMMAND_TEXT: &str =
    "I do not recognize that command. For help with commands, type \">> help\".";

pub const MOVE_USAGE: &str = "To use the \"Move\" command, follow this format:\n\
    >> move [distance] [direction]\n\
    The directions available are: \"up\", \"down\", \"left\", \"right\", \"forward\", and \"back\".\n\
    If you do not specify a direction, it will default to \"forward\", which is based on the side you started on.";

pub const ATTACK_USAGE: &str = "To use the \"Attack\" command, follow this format:\n\
    >> attack [target] [count]\n\
    The target is optional and defaults to the closest enemy.\n\
    If you are not in range of the character you chose or the closest enemy, the command fails and you can retry.";

/// Parses a turn such as `attack R 1, move 2 back`.
///
/// Sub-actions are separated by commas and matched case-insensitively.
///
/// # Examples
///
/// ```
/// use skirmish::{parse_turn, MoveDirection, SubAction};
///
/// let actions = parse_turn("Move 2, attack b 1").unwrap();
/// assert_eq!(
///     actions,
///     vec![
///         SubAction::Move { distance: 2, direction: MoveDirection::Forward },
///         SubAction::Attack { count: 1, target: Some('B') },
///     ]
/// );
/// ```
pub fn parse_turn(text: &str) -> SkirmishResult<Vec<SubAction>> {
    let text = strip_prefix(text);
    if text.trim().is_empty() {
        return Err(SkirmishError::InvalidAction(UNKNOWN_COMMAND_TEXT.to_string()));
    }

    text.split(',').map(parse_sub_action).collect()
}

/// Parses one `move` or `attack` sub-action.
pub fn parse_sub_action(text: &str) -> SkirmishResult<SubAction> {
    let text = text.trim().to_lowercase();
    let words: Vec<&str> = text.split_whitespace().collect();

    match words.first().copied() {
        Some("move") => parse_move(&words[1..]),
        Some("attack") => parse_attack(&words[1..]),
        _ => Err(SkirmishError::InvalidAction(UNKNOWN_COMMAND_TEXT.to_string())),
    }
}

fn parse_move(words: &[&str]) -> SkirmishResult<SubAction> {
    let usage = || SkirmishError::InvalidAction(MOVE_USAGE.to_string());

    let (distance, direction) = match words {
        [distance] => (*distance, MoveDirection::Forward),
        [distance, direction] => (*distance, direction.parse().map_err(|_| usage())?),
        _ => return Err(usage()),
    };

    Ok(SubAction::Move {
        distance: parse_count(distance).ok_or_else(usage)?,
        direction,
    })
}

fn parse_attack(words: &[&str]) -> SkirmishResult<SubAction> {
    let usage = || SkirmishError::InvalidAction(ATTACK_USAGE.to_string());

    let (target, count) = match words {
        [count] => (None, *count),
        [target, count] => {
            let mut chars = target.chars();
            match (chars.next(), chars.next()) {
                (Some(letter), None) if letter.is_ascii_alphabetic() => {
                    (Some(letter.to_ascii_uppercase()), *count)
                }
                _ => return Err(usage()),
            }
        }
        _ => return Err(usage()),
    };

    Ok(SubAction::Attack {
        count: parse_count(count).ok_or_else(usage)?,
        target,
    })
}

fn parse_count(text: &str) -> Option<u64> {
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Removes the `>>` command prefix and the optional space after it.
pub(crate) fn strip_prefix(text: &str) -> &str {
    let text = text.trim_start();
    match text.strip_prefix(">>") {
        Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
        None => text,
    }
}
