//! # Battle Module
//!
//! The battle aggregate: grid, the two teams and the turn holder.
//!
//! A `Battle` owns every team and character. Characters refer back to their
//! team only through their [`TeamSide`], and the turn holder is kept as a
//! [`CharacterId`] resolved through the battle, so the object graph stays a
//! tree. Turns are resolved with [`Battle::resolve_turn`], which applies all
//! sub-actions atomically and then advances the turn state machine.

use crate::{
    atomically, Character, CharacterId, Checkpoint, DamageReport, EngineConfig, Grid,
    MoveDirection, Position, RosterEntry, SkirmishError, SkirmishResult, SubAction, Submitter,
    Team, TeamSide, TurnOutcome, TurnState, TurnSummary,
};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Key of the channel a battle runs in.
pub type ChannelKey = String;

/// Knobs applied when a battle is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BattleOptions {
    /// Seed for initial row placement; `None` draws from entropy
    pub placement_seed: Option<u64>,
    /// Maximum number of characters across both teams
    pub max_characters: usize,
}

impl Default for BattleOptions {
    fn default() -> Self {
        Self {
            placement_seed: None,
            max_characters: crate::config::MAX_CHARACTER_COUNT,
        }
    }
}

impl From<&EngineConfig> for BattleOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            placement_seed: config.placement_seed,
            max_characters: config.max_characters,
        }
    }
}

/// Mutable part of a battle, captured by value for rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleState {
    pub teams: Vec<Team>,
    pub turn_holder: Option<CharacterId>,
}

/// Outcome of a single attack, read right after the damage landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackResult {
    pub target: CharacterId,
    pub letter: char,
    pub damage: u64,
    pub hp: u64,
    pub max_hp: u64,
    /// The attack brought the target to 0 HP and removed it
    pub defeated: bool,
}

/// One running match between two teams on a grid.
#[derive(Debug)]
pub struct Battle {
    channel: ChannelKey,
    grid: Grid,
    origin_text: String,
    state: BattleState,
    /// `Some(winner)` once concluded; the winner is `None` if ended on request
    conclusion: Option<Option<TeamSide>>,
    max_characters: usize,
    rng: StdRng,
}

impl Battle {
    /// Creates an empty battle with default options.
    ///
    /// # Examples
    ///
    /// ```
    /// use skirmish::{Battle, Team};
    ///
    /// let mut battle = Battle::new("general".to_string(), 6, 1, "start battle").unwrap();
    /// Team::from_roster(&mut battle, "a, N/A, 10, 2, 1, 3").unwrap();
    /// Team::from_roster(&mut battle, "b, CPU, 10, 2, 1, 3").unwrap();
    /// assert_eq!(battle.board_string(), "A - - - - B");
    /// ```
    pub fn new(
        channel: ChannelKey,
        width: u32,
        height: u32,
        origin_text: impl Into<String>,
    ) -> SkirmishResult<Self> {
        Self::with_options(channel, width, height, origin_text, BattleOptions::default())
    }

    /// Creates an empty battle.
    pub fn with_options(
        channel: ChannelKey,
        width: u32,
        height: u32,
        origin_text: impl Into<String>,
        options: BattleOptions,
    ) -> SkirmishResult<Self> {
        let rng = match options.placement_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            channel,
            grid: Grid::new(width, height)?,
            origin_text: origin_text.into(),
            state: BattleState {
                teams: Vec::new(),
                turn_holder: None,
            },
            conclusion: None,
            max_characters: options.max_characters,
            rng,
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn width(&self) -> u32 {
        self.grid.width
    }

    pub fn height(&self) -> u32 {
        self.grid.height
    }

    /// Command text that created the battle.
    pub fn origin_text(&self) -> &str {
        &self.origin_text
    }

    pub fn teams(&self) -> &[Team] {
        &self.state.teams
    }

    pub fn team(&self, side: TeamSide) -> Option<&Team> {
        self.state.teams.get(side.index())
    }

    fn team_mut(&mut self, side: TeamSide) -> Option<&mut Team> {
        self.state.teams.get_mut(side.index())
    }

    /// Live characters in turn order: team 0's roster, then team 1's.
    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.state.teams.iter().flat_map(|team| team.characters.iter())
    }

    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters().find(|c| c.id == id)
    }

    fn character_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.state
            .teams
            .iter_mut()
            .flat_map(|team| team.characters.iter_mut())
            .find(|c| c.id == id)
    }

    fn require_character(&self, id: CharacterId) -> SkirmishResult<&Character> {
        self.character(id).ok_or_else(|| {
            SkirmishError::InvalidState(format!("Character {} is not in this battle", id))
        })
    }

    /// Characters filtered by column and/or row.
    pub fn characters_at(&self, x: Option<i64>, y: Option<i64>) -> Vec<&Character> {
        self.characters()
            .filter(|c| x.map_or(true, |x| c.position.x == x))
            .filter(|c| y.map_or(true, |y| c.position.y == y))
            .collect()
    }

    /// All live characters carrying a letter, on either team.
    pub fn characters_with_letter(&self, letter: char) -> Vec<&Character> {
        let letter = letter.to_ascii_uppercase();
        self.characters().filter(|c| c.letter == letter).collect()
    }

    pub fn is_out_of_bounds(&self, position: Position) -> bool {
        self.grid.is_out_of_bounds(position)
    }

    pub fn turn_holder(&self) -> Option<&Character> {
        self.state.turn_holder.and_then(|id| self.character(id))
    }

    /// Position of the turn holder in the flattened live roster.
    pub fn turn_index(&self) -> Option<usize> {
        let holder = self.state.turn_holder?;
        self.characters().position(|c| c.id == holder)
    }

    pub fn turn_state(&self) -> TurnState {
        match (self.conclusion, self.state.turn_holder) {
            (Some(winner), _) => TurnState::Concluded { winner },
            (None, Some(holder)) => TurnState::AwaitingTurn(holder),
            (None, None) => TurnState::Concluded { winner: None },
        }
    }

    pub fn is_concluded(&self) -> bool {
        self.conclusion.is_some()
    }

    /// Ends the battle without a winner.
    pub fn conclude(&mut self) {
        if self.conclusion.is_none() {
            info!("Battle in {} ended on request", self.channel);
            self.conclusion = Some(None);
        }
    }

    /// Renders the grid, one row per line, `-` for empty cells.
    ///
    /// Letters of characters sharing a cell are concatenated in turn order.
    pub fn board_string(&self) -> String {
        let width = self.grid.width as usize;
        let height = self.grid.height as usize;
        let mut board = vec![vec![String::new(); width]; height];

        for character in self.characters() {
            let (x, y) = (character.position.x as usize, character.position.y as usize);
            if let Some(cell) = board.get_mut(y).and_then(|row| row.get_mut(x)) {
                cell.push(character.letter);
            }
        }

        board
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| if cell.is_empty() { "-" } else { cell.as_str() })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Adds the next team from parsed roster entries.
    ///
    /// Characters start on their side's edge in the least crowded row. The
    /// first character ever added holds the first turn unless a line is
    /// marked with `*`. Nothing is added if any entry is rejected.
    pub fn add_team(&mut self, entries: &[RosterEntry]) -> SkirmishResult<TeamSide> {
        let side = TeamSide::from_index(self.state.teams.len()).ok_or_else(|| {
            SkirmishError::InvalidState("A battle cannot have more than two teams".to_string())
        })?;

        let count = self.characters().count() + entries.len();
        if count > self.max_characters {
            return Err(SkirmishError::TooManyCharacters {
                count,
                max: self.max_characters,
            });
        }

        let x = self.grid.starting_column(side);
        let mut team = Team::new(side);
        let mut holder = self.state.turn_holder;

        for entry in entries {
            let occupied = self
                .state
                .teams
                .iter()
                .chain(std::iter::once(&team))
                .flat_map(|t| t.characters.iter())
                .map(|c| c.position);
            let y = least_crowded_row(&mut self.rng, self.grid.height, x, occupied);

            let character = Character::new(
                entry.letter,
                side,
                entry.is_cpu,
                entry.role.clone(),
                entry.stats,
                Position::new(x, y),
            )?;

            if holder.is_none() || entry.first_turn {
                holder = Some(character.id);
            }
            team.characters.push(character);
        }

        debug!(
            "Added team {:?} with {} characters to battle in {}",
            side,
            team.characters.len(),
            self.channel
        );
        self.state.teams.push(team);
        self.state.turn_holder = holder;
        Ok(side)
    }

    /// Moves a character, validating SPD and bounds.
    pub fn move_character(
        &mut self,
        id: CharacterId,
        distance: u64,
        direction: MoveDirection,
    ) -> SkirmishResult<()> {
        let grid = self.grid;
        let character = self.character_mut(id).ok_or_else(|| {
            SkirmishError::InvalidState(format!("Character {} is not in this battle", id))
        })?;
        character.step(distance, direction, &grid)
    }

    /// Attacks the nearest eligible enemy `count` times.
    ///
    /// A target brought to 0 HP is removed from its team at once.
    pub fn attack(
        &mut self,
        id: CharacterId,
        count: u64,
        letter: Option<char>,
    ) -> SkirmishResult<AttackResult> {
        let attacker = self.require_character(id)?;
        attacker.require_attack_spd(count)?;

        let enemy_side = attacker.side.opponent();
        let enemies = self
            .team(enemy_side)
            .map(|team| team.characters.as_slice())
            .unwrap_or(&[]);
        let target = attacker.select_target(enemies, letter)?.id;
        let damage = attacker.atk.saturating_mul(count);

        let victim = self.character_mut(target).ok_or_else(|| {
            SkirmishError::InvalidState(format!("Target {} vanished mid-attack", target))
        })?;
        let defeated = victim.take_damage(damage);
        let result = AttackResult {
            target,
            letter: victim.letter,
            damage,
            hp: victim.hp,
            max_hp: victim.max_hp,
            defeated,
        };
        if defeated {
            if let Some(team) = self.team_mut(enemy_side) {
                team.remove(target);
            }
        }

        if let Some(attacker) = self.character_mut(id) {
            attacker.spend_spd(count);
        }

        Ok(result)
    }

    /// Plans the turn of a CPU character.
    pub fn plan_cpu_turn(&self, id: CharacterId) -> SkirmishResult<Vec<SubAction>> {
        let character = self.require_character(id)?;
        if !character.is_cpu {
            return Err(SkirmishError::WrongTurn(format!(
                "Character {} is not controlled by the CPU.",
                character
            )));
        }

        let enemies = self
            .team(character.side.opponent())
            .map(|team| team.characters.as_slice())
            .unwrap_or(&[]);
        Ok(character.plan_cpu_turn(enemies))
    }

    /// Resolves one submitted turn.
    ///
    /// All sub-actions apply or none do. On success the turn state machine
    /// advances; on failure the battle is exactly as it was and the first
    /// error is returned. An empty action list passes the turn.
    pub fn resolve_turn(
        &mut self,
        submitter: Submitter,
        actions: &[SubAction],
    ) -> SkirmishResult<TurnSummary> {
        if self.is_concluded() {
            return Err(SkirmishError::Concluded);
        }
        if self.state.teams.len() != 2 {
            return Err(SkirmishError::InvalidState(format!(
                "A battle needs two teams to take turns, found {}",
                self.state.teams.len()
            )));
        }

        let holder = self
            .turn_holder()
            .ok_or_else(|| SkirmishError::InvalidState("No character holds the turn".to_string()))?;
        authorize(submitter, holder, self)?;
        let actor = holder.id;

        let order: Vec<CharacterId> = self.characters().map(|c| c.id).collect();
        let damage = atomically(self, |battle| battle.apply_actions(actor, actions))?;
        let outcome = self.advance_turn(actor, &order)?;

        Ok(TurnSummary {
            actor,
            damage,
            board: self.board_string(),
            outcome,
        })
    }

    fn apply_actions(
        &mut self,
        actor: CharacterId,
        actions: &[SubAction],
    ) -> SkirmishResult<Vec<DamageReport>> {
        let mut reports: Vec<DamageReport> = Vec::new();

        for action in actions {
            match *action {
                SubAction::Move {
                    distance,
                    direction,
                } => self.move_character(actor, distance, direction)?,
                SubAction::Attack { count, target } => {
                    let hit = self.attack(actor, count, target)?;
                    match reports.iter_mut().find(|r| r.target == hit.target) {
                        Some(report) => {
                            report.damage = report.damage.saturating_add(hit.damage);
                            report.hp = hit.hp;
                            report.defeated = hit.defeated;
                        }
                        None => reports.push(DamageReport {
                            target: hit.target,
                            letter: hit.letter,
                            damage: hit.damage,
                            hp: hit.hp,
                            max_hp: hit.max_hp,
                            defeated: hit.defeated,
                        }),
                    }
                }
            }
        }

        reports.retain(|r| r.damage > 0);
        Ok(reports)
    }

    /// Advances the turn state machine after `previous` finished its turn.
    ///
    /// `order` is the flattened roster as it stood when the turn began. The
    /// next holder is the first character after `previous` in that order who
    /// is still alive, so a death never skips or repeats anyone, even when
    /// `previous` itself did not survive.
    fn advance_turn(
        &mut self,
        previous: CharacterId,
        order: &[CharacterId],
    ) -> SkirmishResult<TurnOutcome> {
        for team in &mut self.state.teams {
            team.reset_spd();
        }

        if let Some(loser) = self.state.teams.iter().find(|t| t.is_eliminated()) {
            let winner = loser.side.opponent();
            info!("Team {:?} won the battle in {}", winner, self.channel);
            self.conclusion = Some(Some(winner));
            self.state.turn_holder = None;
            return Ok(TurnOutcome::Victory(winner));
        }

        let start = order.iter().position(|&id| id == previous).unwrap_or(0);
        let next = (1..=order.len())
            .map(|step| order[(start + step) % order.len()])
            .find(|&id| self.character(id).is_some())
            .or_else(|| self.characters().next().map(|c| c.id))
            .ok_or_else(|| SkirmishError::InvalidState("No live characters remain".to_string()))?;

        self.state.turn_holder = Some(next);
        Ok(TurnOutcome::NextTurn(next))
    }

    /// Points the turn at the character at `index` in the live roster.
    pub(crate) fn set_turn_index(&mut self, index: usize) -> SkirmishResult<()> {
        let id = self.characters().nth(index).map(|c| c.id).ok_or_else(|| {
            SkirmishError::ParseError(format!(
                "Turn index {} is outside the roster of {} characters.",
                index,
                self.characters().count()
            ))
        })?;
        self.state.turn_holder = Some(id);
        Ok(())
    }
}

impl Checkpoint for Battle {
    type Saved = BattleState;

    fn checkpoint(&self) -> BattleState {
        self.state.clone()
    }

    fn restore(&mut self, saved: BattleState) {
        self.state = saved;
    }
}

fn authorize(submitter: Submitter, holder: &Character, battle: &Battle) -> SkirmishResult<()> {
    match submitter {
        Submitter::Human if holder.is_cpu => Err(SkirmishError::WrongTurn(format!(
            "It is {}'s turn, and {} is controlled by the CPU.",
            holder, holder
        ))),
        Submitter::Human => Ok(()),
        Submitter::Cpu(id) if id == holder.id && holder.is_cpu => Ok(()),
        Submitter::Cpu(id) => {
            let name = battle
                .character(id)
                .map(ToString::to_string)
                .unwrap_or_else(|| "a defeated character".to_string());
            Err(SkirmishError::WrongTurn(format!(
                "It is {}'s turn, not {}'s.",
                holder, name
            )))
        }
    }
}

/// Picks the row at column `x` with the fewest characters, breaking ties at random.
fn least_crowded_row(
    rng: &mut StdRng,
    height: u32,
    x: i64,
    occupied: impl Iterator<Item = Position>,
) -> i64 {
    let mut counts = vec![0usize; height as usize];
    for position in occupied.filter(|p| p.x == x) {
        if let Some(count) = usize::try_from(position.y)
            .ok()
            .and_then(|y| counts.get_mut(y))
        {
            *count += 1;
        }
    }

    let fewest = counts.iter().copied().min().unwrap_or(0);
    let rows: Vec<i64> = counts
        .iter()
        .enumerate()
        .filter(|(_, count)| **count == fewest)
        .map(|(y, _)| y as i64)
        .collect();
    rows.choose(rng).copied().unwrap_or(0)
}
