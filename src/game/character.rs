//! # Characters
//!
//! A combatant on the grid: its stats, its position and the validated
//! operations that change them.

use crate::config::MAX_STAT_VALUE;
use crate::{
    new_character_id, CharacterId, Grid, MoveDirection, Position, SkirmishError, SkirmishResult,
    SubAction, TeamSide,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Creation-time stats of a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterStats {
    pub hp: u64,
    pub atk: u64,
    pub rng: u64,
    pub spd: u64,
}

impl CharacterStats {
    /// Rejects any stat above [`MAX_STAT_VALUE`].
    pub fn validate(&self) -> SkirmishResult<()> {
        for (stat, value) in [
            ("HP", self.hp),
            ("ATK", self.atk),
            ("RNG", self.rng),
            ("SPD", self.spd),
        ] {
            if value > MAX_STAT_VALUE {
                return Err(SkirmishError::StatTooLarge {
                    stat,
                    value: value.to_string(),
                    max: MAX_STAT_VALUE,
                });
            }
        }
        Ok(())
    }
}

/// A combatant belonging to one team of a battle.
///
/// `side` is the only link back to the owning team; the battle owns the team
/// and resolves it on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    /// Upper-case ASCII letter; several characters may share one
    pub letter: char,
    /// Role id announced alongside the character's turn
    pub role: Option<String>,
    pub is_cpu: bool,
    pub side: TeamSide,
    pub hp: u64,
    pub max_hp: u64,
    pub atk: u64,
    pub rng: u64,
    /// SPD left this turn cycle, shared by movement and attacks
    pub spd: u64,
    pub max_spd: u64,
    pub position: Position,
}

impl Character {
    /// Creates a character at full HP and SPD.
    ///
    /// # Examples
    ///
    /// ```
    /// use skirmish::{Character, CharacterStats, Position, TeamSide};
    ///
    /// let stats = CharacterStats { hp: 10, atk: 2, rng: 1, spd: 3 };
    /// let character = Character::new('a', TeamSide::First, false, None, stats, Position::new(0, 0)).unwrap();
    /// assert_eq!(character.letter, 'A');
    /// assert_eq!(character.max_spd, 3);
    /// ```
    pub fn new(
        letter: char,
        side: TeamSide,
        is_cpu: bool,
        role: Option<String>,
        stats: CharacterStats,
        position: Position,
    ) -> SkirmishResult<Self> {
        if !letter.is_ascii_alphabetic() {
            return Err(SkirmishError::ParseError(format!(
                "A character must be identified by a single letter (got '{}').",
                letter
            )));
        }
        stats.validate()?;

        Ok(Self {
            id: new_character_id(),
            letter: letter.to_ascii_uppercase(),
            role,
            is_cpu,
            side,
            hp: stats.hp,
            max_hp: stats.hp,
            atk: stats.atk,
            rng: stats.rng,
            spd: stats.spd,
            max_spd: stats.spd,
            position,
        })
    }

    /// Stats as they were at creation, which is what gets persisted.
    pub fn base_stats(&self) -> CharacterStats {
        CharacterStats {
            hp: self.max_hp,
            atk: self.atk,
            rng: self.rng,
            spd: self.max_spd,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Distance that decides whether an attack reaches.
    pub fn distance_to(&self, other: &Character) -> u64 {
        self.position.chebyshev_distance(other.position)
    }

    /// Straight-line distance that decides which target is nearest.
    pub fn real_distance_to(&self, other: &Character) -> f64 {
        self.position.euclidean_distance(other.position)
    }

    /// Fails with `InsufficientResource` unless `amount` SPD is left.
    fn require_spd(&self, amount: u64, purpose: impl FnOnce() -> String) -> SkirmishResult<()> {
        if amount > self.spd {
            return Err(SkirmishError::InsufficientResource(format!(
                "Character {} only has {}/{} SPD, so you do not have enough SPD to {}.",
                self, self.spd, self.max_spd, purpose()
            )));
        }
        Ok(())
    }

    /// Moves in a straight line, spending one SPD per cell.
    ///
    /// Nothing changes unless the move is affordable and stays on the grid.
    pub fn step(
        &mut self,
        distance: u64,
        direction: MoveDirection,
        grid: &Grid,
    ) -> SkirmishResult<()> {
        self.require_spd(distance, || format!("move a distance of {}", distance))?;

        let destination = self.position + direction.to_delta(distance, self.side);
        if grid.is_out_of_bounds(destination) {
            return Err(SkirmishError::OutOfBounds(format!(
                "You tried to move character {} out of bounds.",
                self
            )));
        }

        self.position = destination;
        self.spd -= distance;
        Ok(())
    }

    /// Checks that `count` attacks are affordable.
    pub fn require_attack_spd(&self, count: u64) -> SkirmishResult<()> {
        self.require_spd(count, || {
            if count == 1 {
                "attack".to_string()
            } else {
                format!("attack {} times", count)
            }
        })
    }

    /// Picks the nearest candidate; the first one enumerated wins ties.
    pub fn nearest_of<'a>(
        &self,
        candidates: impl IntoIterator<Item = &'a Character>,
    ) -> Option<&'a Character> {
        let mut nearest: Option<(&Character, f64)> = None;
        for candidate in candidates {
            let distance = self.real_distance_to(candidate);
            match nearest {
                Some((_, best)) if distance >= best => {}
                _ => nearest = Some((candidate, distance)),
            }
        }
        nearest.map(|(character, _)| character)
    }

    /// Chooses the enemy an attack would hit.
    ///
    /// With a letter only enemies carrying it are considered. The nearest
    /// candidate must be within RNG.
    pub fn select_target<'a>(
        &self,
        enemies: &'a [Character],
        letter: Option<char>,
    ) -> SkirmishResult<&'a Character> {
        let letter = letter.map(|l| l.to_ascii_uppercase());
        let candidates = enemies
            .iter()
            .filter(|enemy| letter.map_or(true, |l| enemy.letter == l));

        let target = self.nearest_of(candidates).ok_or_else(|| match letter {
            Some(l) => {
                SkirmishError::NoSuchTarget(format!("There is no enemy with the letter '{}'.", l))
            }
            None => SkirmishError::NoSuchTarget("There are no enemies left to attack.".to_string()),
        })?;

        if self.distance_to(target) > self.rng {
            return Err(SkirmishError::OutOfRange(format!(
                "Character {} is outside of character {}'s range.",
                target, self
            )));
        }

        Ok(target)
    }

    /// Deducts SPD already validated by [`Character::require_attack_spd`].
    pub fn spend_spd(&mut self, amount: u64) {
        self.spd = self.spd.saturating_sub(amount);
    }

    /// Applies damage, flooring HP at zero. Returns true if this defeated the character.
    pub fn take_damage(&mut self, damage: u64) -> bool {
        let was_alive = self.is_alive();
        self.hp = self.hp.saturating_sub(damage);
        was_alive && !self.is_alive()
    }

    pub fn reset_spd(&mut self) {
        self.spd = self.max_spd;
    }

    /// Plans a CPU turn against the nearest enemy.
    ///
    /// SPD goes first to closing the horizontal gap beyond RNG, then the
    /// vertical gap beyond RNG, and whatever is left becomes attacks on that
    /// same target. Returns an empty plan when there is nobody to fight.
    pub fn plan_cpu_turn(&self, enemies: &[Character]) -> Vec<SubAction> {
        let Some(target) = self.nearest_of(enemies) else {
            return Vec::new();
        };

        let mut plan = Vec::new();
        let mut spd_left = self.spd;

        let x_distance = (self.position.x - target.position.x).unsigned_abs();
        if x_distance > self.rng {
            let distance = (x_distance - self.rng).min(spd_left);
            let direction = if target.position.x < self.position.x {
                MoveDirection::Left
            } else {
                MoveDirection::Right
            };
            if distance > 0 {
                plan.push(SubAction::Move {
                    distance,
                    direction,
                });
                spd_left -= distance;
            }
        }

        let y_distance = (self.position.y - target.position.y).unsigned_abs();
        if y_distance > self.rng {
            let distance = (y_distance - self.rng).min(spd_left);
            let direction = if target.position.y < self.position.y {
                MoveDirection::Up
            } else {
                MoveDirection::Down
            };
            if distance > 0 {
                plan.push(SubAction::Move {
                    distance,
                    direction,
                });
                spd_left -= distance;
            }
        }

        if spd_left > 0 {
            plan.push(SubAction::Attack {
                count: spd_left,
                target: Some(target.letter),
            });
        }

        plan
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.letter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character(letter: char, side: TeamSide, stats: (u64, u64, u64, u64), x: i64, y: i64) -> Character {
        let (hp, atk, rng, spd) = stats;
        Character::new(
            letter,
            side,
            false,
            None,
            CharacterStats { hp, atk, rng, spd },
            Position::new(x, y),
        )
        .unwrap()
    }

    #[test]
    fn test_stat_limit() {
        let stats = CharacterStats {
            hp: MAX_STAT_VALUE + 1,
            atk: 1,
            rng: 1,
            spd: 1,
        };
        let result = Character::new('a', TeamSide::First, false, None, stats, Position::new(0, 0));
        assert!(matches!(result, Err(SkirmishError::StatTooLarge { stat: "HP", .. })));

        let stats = CharacterStats {
            hp: MAX_STAT_VALUE,
            atk: MAX_STAT_VALUE,
            rng: MAX_STAT_VALUE,
            spd: MAX_STAT_VALUE,
        };
        assert!(Character::new('a', TeamSide::First, false, None, stats, Position::new(0, 0)).is_ok());
    }

    #[test]
    fn test_non_letter_rejected() {
        let stats = CharacterStats { hp: 1, atk: 1, rng: 1, spd: 1 };
        let result = Character::new('7', TeamSide::First, false, None, stats, Position::new(0, 0));
        assert!(matches!(result, Err(SkirmishError::ParseError(_))));
    }

    #[test]
    fn test_step_spends_spd() {
        let grid = Grid::new(6, 3).unwrap();
        let mut a = character('a', TeamSide::First, (10, 1, 1, 4), 0, 0);

        a.step(3, MoveDirection::Forward, &grid).unwrap();
        assert_eq!(a.position, Position::new(3, 0));
        assert_eq!(a.spd, 1);

        a.step(1, MoveDirection::Down, &grid).unwrap();
        assert_eq!(a.position, Position::new(3, 1));
        assert_eq!(a.spd, 0);
    }

    #[test]
    fn test_step_failures_leave_character_unchanged() {
        let grid = Grid::new(6, 1).unwrap();
        let mut a = character('a', TeamSide::First, (10, 1, 1, 2), 0, 0);
        let before = a.clone();

        assert!(matches!(
            a.step(3, MoveDirection::Forward, &grid),
            Err(SkirmishError::InsufficientResource(_))
        ));
        assert!(matches!(
            a.step(1, MoveDirection::Back, &grid),
            Err(SkirmishError::OutOfBounds(_))
        ));
        assert!(matches!(
            a.step(1, MoveDirection::Up, &grid),
            Err(SkirmishError::OutOfBounds(_))
        ));
        assert_eq!(a, before);
    }

    #[test]
    fn test_nearest_prefers_first_on_ties() {
        let a = character('a', TeamSide::First, (10, 1, 5, 1), 2, 1);
        let enemies = vec![
            character('x', TeamSide::Second, (10, 1, 1, 1), 3, 0),
            character('y', TeamSide::Second, (10, 1, 1, 1), 3, 2),
            character('z', TeamSide::Second, (10, 1, 1, 1), 5, 1),
        ];
        assert_eq!(a.nearest_of(&enemies).unwrap().letter, 'X');
    }

    #[test]
    fn test_select_target_errors() {
        let a = character('a', TeamSide::First, (10, 1, 1, 1), 0, 0);
        let enemies = vec![character('b', TeamSide::Second, (10, 1, 1, 1), 3, 0)];

        assert!(matches!(
            a.select_target(&enemies, Some('q')),
            Err(SkirmishError::NoSuchTarget(_))
        ));
        assert!(matches!(
            a.select_target(&enemies, None),
            Err(SkirmishError::OutOfRange(_))
        ));
        assert!(matches!(
            a.select_target(&[], None),
            Err(SkirmishError::NoSuchTarget(_))
        ));
    }

    #[test]
    fn test_select_target_by_letter_is_case_insensitive() {
        let a = character('a', TeamSide::First, (10, 1, 3, 1), 0, 0);
        let enemies = vec![
            character('b', TeamSide::Second, (10, 1, 1, 1), 1, 0),
            character('c', TeamSide::Second, (10, 1, 1, 1), 2, 0),
        ];
        assert_eq!(a.select_target(&enemies, Some('c')).unwrap().letter, 'C');
    }

    #[test]
    fn test_take_damage_floors_at_zero() {
        let mut b = character('b', TeamSide::Second, (5, 1, 1, 1), 0, 0);
        assert!(!b.take_damage(3));
        assert_eq!(b.hp, 2);
        assert!(b.take_damage(100));
        assert_eq!(b.hp, 0);
        assert!(!b.take_damage(1));
    }

    #[test]
    fn test_cpu_plan_closes_gap_then_attacks() {
        let cpu = character('c', TeamSide::Second, (10, 2, 1, 5), 5, 0);
        let enemies = vec![character('a', TeamSide::First, (10, 1, 1, 1), 0, 2)];

        let plan = cpu.plan_cpu_turn(&enemies);
        assert_eq!(
            plan,
            vec![
                SubAction::Move {
                    distance: 4,
                    direction: MoveDirection::Left
                },
                SubAction::Move {
                    distance: 1,
                    direction: MoveDirection::Down
                },
            ]
        );
    }

    #[test]
    fn test_cpu_plan_attacks_when_in_range() {
        let cpu = character('c', TeamSide::Second, (10, 2, 2, 3), 2, 0);
        let enemies = vec![character('a', TeamSide::First, (10, 1, 1, 1), 0, 0)];

        assert_eq!(
            cpu.plan_cpu_turn(&enemies),
            vec![SubAction::Attack {
                count: 3,
                target: Some('A')
            }]
        );
    }

    #[test]
    fn test_cpu_plan_moves_up_toward_higher_rows() {
        let cpu = character('c', TeamSide::Second, (10, 2, 0, 3), 0, 3);
        let enemies = vec![character('a', TeamSide::First, (10, 1, 1, 1), 0, 1)];

        assert_eq!(
            cpu.plan_cpu_turn(&enemies),
            vec![
                SubAction::Move {
                    distance: 2,
                    direction: MoveDirection::Up
                },
                SubAction::Attack {
                    count: 1,
                    target: Some('A')
                },
            ]
        );
    }

    #[test]
    fn test_cpu_plan_without_enemies_is_empty() {
        let cpu = character('c', TeamSide::Second, (10, 2, 2, 3), 2, 0);
        assert!(cpu.plan_cpu_turn(&[]).is_empty());
    }
}
