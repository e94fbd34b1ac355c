//! # Registry Module
//!
//! Active battles keyed by channel, with one turn in flight per battle.
//!
//! Each battle sits behind its own `tokio::sync::Mutex`. The mutex is fair,
//! so concurrent submissions queue in arrival order and a submission that
//! had to wait re-checks that the battle is still running before it acts.
//! Battles share no lock with each other. CPU turns are spawned as tasks that
//! go through the same queue as everyone else.

pub mod events;

pub use events::*;

use crate::{
    format_turn, Battle, BattleOptions, ChannelKey, CharacterId, EngineConfig, PersistedBattle,
    SkirmishError, SkirmishResult, SubAction, Submitter, Team, TurnOutcome, TurnSummary,
};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, MutexGuard, RwLock};

/// Shared handle to one active battle.
#[derive(Debug, Clone)]
pub struct BattleHandle {
    channel: ChannelKey,
    battle: Arc<Mutex<Battle>>,
}

impl BattleHandle {
    fn new(battle: Battle) -> Self {
        Self {
            channel: battle.channel().to_string(),
            battle: Arc::new(Mutex::new(battle)),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Waits for exclusive access to the battle.
    pub async fn lock(&self) -> MutexGuard<'_, Battle> {
        self.battle.lock().await
    }

    pub async fn to_persisted(&self) -> PersistedBattle {
        self.lock().await.to_persisted()
    }

    pub async fn board_string(&self) -> String {
        self.lock().await.board_string()
    }

    fn is_same_battle(&self, other: &BattleHandle) -> bool {
        Arc::ptr_eq(&self.battle, &other.battle)
    }
}

/// How the actions of a turn are obtained.
enum TurnPlan {
    Given(Vec<SubAction>),
    /// Planned by the engine for the CPU turn holder
    Cpu,
}

struct RegistryInner {
    battles: RwLock<HashMap<ChannelKey, BattleHandle>>,
    config: EngineConfig,
    events: Option<mpsc::UnboundedSender<BattleEvent>>,
}

/// All active battles, at most one per channel.
#[derive(Clone)]
pub struct BattleRegistry {
    inner: Arc<RegistryInner>,
}

impl BattleRegistry {
    /// Creates a registry that does not publish events.
    pub fn new(config: EngineConfig) -> Self {
        Self::build(config, None)
    }

    /// Creates a registry together with the receiving end of its event stream.
    pub fn with_events(config: EngineConfig) -> (Self, mpsc::UnboundedReceiver<BattleEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::build(config, Some(sender)), receiver)
    }

    fn build(config: EngineConfig, events: Option<mpsc::UnboundedSender<BattleEvent>>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                battles: RwLock::new(HashMap::new()),
                config,
                events,
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Options every battle built by this registry is created with.
    pub fn battle_options(&self) -> BattleOptions {
        BattleOptions::from(&self.inner.config)
    }

    /// Registers an empty battle for the channel.
    ///
    /// Teams are added through [`BattleHandle::lock`] and
    /// [`Team::from_roster`]; call [`BattleRegistry::announce_start`] once
    /// they are in place.
    pub async fn create_battle(
        &self,
        channel: &str,
        width: u32,
        height: u32,
        origin_text: &str,
    ) -> SkirmishResult<BattleHandle> {
        let battle = Battle::with_options(
            channel.to_string(),
            width,
            height,
            origin_text,
            self.battle_options(),
        )?;
        self.register(battle).await
    }

    /// Builds a battle from two rosters, registers it and announces it.
    ///
    /// Nothing is registered if either roster is rejected.
    pub async fn start_battle(
        &self,
        channel: &str,
        width: u32,
        height: u32,
        origin_text: &str,
        rosters: [&str; 2],
    ) -> SkirmishResult<BattleHandle> {
        self.ensure_vacant(channel).await?;

        let mut battle = Battle::with_options(
            channel.to_string(),
            width,
            height,
            origin_text,
            self.battle_options(),
        )?;
        for roster in rosters {
            Team::from_roster(&mut battle, roster)?;
        }

        let handle = self.register(battle).await?;
        self.announce_start(&handle).await;
        Ok(handle)
    }

    /// Restores a persisted battle into the channel and announces it.
    pub async fn load_battle(
        &self,
        channel: &str,
        persisted: &PersistedBattle,
    ) -> SkirmishResult<BattleHandle> {
        self.ensure_vacant(channel).await?;
        let battle =
            Battle::from_persisted_with(channel.to_string(), persisted, self.battle_options())?;
        let handle = self.register(battle).await?;
        self.announce_start(&handle).await;
        Ok(handle)
    }

    /// Makes a fully built battle the active one for its channel.
    pub async fn register(&self, battle: Battle) -> SkirmishResult<BattleHandle> {
        let handle = BattleHandle::new(battle);
        let mut battles = self.inner.battles.write().await;
        if battles.contains_key(handle.channel()) {
            return Err(SkirmishError::AlreadyExists(handle.channel().to_string()));
        }
        battles.insert(handle.channel().to_string(), handle.clone());
        info!("Battle registered in {}", handle.channel());
        Ok(handle)
    }

    async fn ensure_vacant(&self, channel: &str) -> SkirmishResult<()> {
        if self.inner.battles.read().await.contains_key(channel) {
            return Err(SkirmishError::AlreadyExists(channel.to_string()));
        }
        Ok(())
    }

    /// Looks up the active battle of a channel.
    pub async fn get_battle(&self, channel: &str) -> SkirmishResult<BattleHandle> {
        self.inner
            .battles
            .read()
            .await
            .get(channel)
            .cloned()
            .ok_or_else(|| {
                SkirmishError::NotFound("There are no ongoing battles in this channel.".to_string())
            })
    }

    /// Channels with an active battle.
    pub async fn active_channels(&self) -> Vec<ChannelKey> {
        let mut channels: Vec<ChannelKey> =
            self.inner.battles.read().await.keys().cloned().collect();
        channels.sort();
        channels
    }

    /// Announces the board and the first turn holder.
    pub async fn announce_start(&self, handle: &BattleHandle) {
        let battle = handle.lock().await;
        self.emit(BattleEvent::Started {
            channel: handle.channel().to_string(),
            board: battle.board_string(),
        });
        self.announce_turn(&battle);
    }

    /// Ends the channel's battle without a winner.
    ///
    /// Submissions already waiting on the battle fail with `Concluded`.
    pub async fn end_battle(&self, channel: &str) -> SkirmishResult<()> {
        let handle = self
            .inner
            .battles
            .write()
            .await
            .remove(channel)
            .ok_or_else(|| {
                SkirmishError::NotFound("There are no ongoing battles in this channel.".to_string())
            })?;

        handle.lock().await.conclude();
        self.emit(BattleEvent::Ended {
            channel: channel.to_string(),
        });
        Ok(())
    }

    /// Submits a turn for the channel's current turn holder.
    pub async fn submit_turn(
        &self,
        channel: &str,
        submitter: Submitter,
        actions: Vec<SubAction>,
    ) -> SkirmishResult<TurnSummary> {
        self.run_turn(channel, submitter, TurnPlan::Given(actions))
            .await
    }

    async fn run_turn(
        &self,
        channel: &str,
        submitter: Submitter,
        plan: TurnPlan,
    ) -> SkirmishResult<TurnSummary> {
        let handle = self.get_battle(channel).await?;
        let mut battle = handle.lock().await;

        // The battle may have ended while this submission was queued.
        if battle.is_concluded() {
            return Err(SkirmishError::Concluded);
        }

        let actions = match plan {
            TurnPlan::Given(actions) => actions,
            TurnPlan::Cpu => {
                let Submitter::Cpu(cpu) = submitter else {
                    return Err(SkirmishError::InvalidState(
                        "Only the engine plans CPU turns".to_string(),
                    ));
                };
                if battle.turn_holder().map(|c| c.id) != Some(cpu) {
                    return Err(SkirmishError::WrongTurn(
                        "The CPU character no longer holds the turn.".to_string(),
                    ));
                }
                let actions = battle.plan_cpu_turn(cpu)?;
                let command = format_turn(&actions);
                info!("CPU turn in {}: {}", channel, command);
                self.emit(BattleEvent::CpuCommand {
                    channel: channel.to_string(),
                    command,
                });
                actions
            }
        };

        let summary = match battle.resolve_turn(submitter, &actions) {
            Ok(summary) => summary,
            Err(error) => {
                if error.is_user_error() {
                    debug!("Turn rejected in {}: {}", channel, error);
                } else {
                    error!("Turn failed in {}: {}", channel, error);
                }
                return Err(error);
            }
        };

        info!(
            "Turn resolved in {}: {} ({} target(s) hit)",
            channel,
            format_turn(&actions),
            summary.damage.len()
        );
        self.emit(BattleEvent::TurnResolved {
            channel: channel.to_string(),
            summary: summary.clone(),
        });

        match summary.outcome {
            TurnOutcome::Victory(winner) => {
                let text = battle
                    .team(winner)
                    .map(Team::victory_text)
                    .unwrap_or_default();
                drop(battle);
                self.remove_if_current(&handle).await;
                self.emit(BattleEvent::Victory {
                    channel: channel.to_string(),
                    winner,
                    text,
                });
            }
            TurnOutcome::NextTurn(_) => self.announce_turn(&battle),
        }

        Ok(summary)
    }

    /// Tells the channel whose turn it is and schedules CPU turns.
    fn announce_turn(&self, battle: &Battle) {
        let Some(holder) = battle.turn_holder() else {
            return;
        };

        self.emit(BattleEvent::TurnStarted {
            channel: battle.channel().to_string(),
            letter: holder.letter,
            role: holder.role.clone(),
            is_cpu: holder.is_cpu,
        });

        if holder.is_cpu && !battle.is_concluded() {
            self.schedule_cpu_turn(battle.channel().to_string(), holder.id);
        }
    }

    fn schedule_cpu_turn(&self, channel: ChannelKey, cpu: CharacterId) {
        let registry = self.clone();
        let delay = self.inner.config.cpu_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            match registry.run_turn(&channel, Submitter::Cpu(cpu), TurnPlan::Cpu).await {
                Ok(_) => {}
                Err(
                    error @ (SkirmishError::WrongTurn(_)
                    | SkirmishError::Concluded
                    | SkirmishError::NotFound(_)),
                ) => {
                    debug!("Dropping stale CPU turn in {}: {}", channel, error);
                }
                Err(error) => {
                    warn!("CPU turn in {} failed ({}); passing instead", channel, error);
                    if let Err(error) = registry
                        .run_turn(&channel, Submitter::Cpu(cpu), TurnPlan::Given(Vec::new()))
                        .await
                    {
                        error!("CPU could not pass its turn in {}: {}", channel, error);
                    }
                }
            }
        });
    }

    async fn remove_if_current(&self, handle: &BattleHandle) {
        let mut battles = self.inner.battles.write().await;
        if battles
            .get(handle.channel())
            .is_some_and(|current| current.is_same_battle(handle))
        {
            battles.remove(handle.channel());
            info!("Battle in {} removed", handle.channel());
        }
    }

    fn emit(&self, event: BattleEvent) {
        if let Some(events) = &self.inner.events {
            if events.send(event).is_err() {
                debug!("Event receiver dropped");
            }
        }
    }
}
