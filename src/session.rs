//! # Session
//!
//! Routes parsed commands from one channel of one guild to the battle
//! registry and the preset store.

use crate::{
    help_text, parse_command, BattleRegistry, Command, PresetRepository, PresetStore,
    SkirmishResult, Submitter,
};
use log::debug;

/// Command dispatcher for a single channel.
pub struct Session {
    registry: BattleRegistry,
    presets: PresetStore,
    guild: String,
    channel: String,
}

impl Session {
    pub fn new(
        registry: BattleRegistry,
        presets: PresetStore,
        guild: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            presets,
            guild: guild.into(),
            channel: channel.into(),
        }
    }

    pub fn registry(&self) -> &BattleRegistry {
        &self.registry
    }

    pub fn presets(&self) -> &PresetStore {
        &self.presets
    }

    /// Handles one message.
    ///
    /// Returns the direct reply, if any. Battle progress is published as
    /// registry events instead.
    pub async fn handle(&mut self, text: &str) -> SkirmishResult<Option<String>> {
        let command = parse_command(text)?;
        debug!("{} in {}: {:?}", self.guild, self.channel, command);

        match command {
            Command::Help => Ok(Some(help_text())),
            Command::StartBattle {
                width,
                height,
                rosters,
                origin,
            } => {
                self.registry
                    .start_battle(
                        &self.channel,
                        width,
                        height,
                        &origin,
                        [rosters[0].as_str(), rosters[1].as_str()],
                    )
                    .await?;
                Ok(None)
            }
            Command::EndBattle => {
                self.registry.end_battle(&self.channel).await?;
                Ok(None)
            }
            Command::Turn(actions) => {
                self.registry
                    .submit_turn(&self.channel, Submitter::Human, actions)
                    .await?;
                Ok(None)
            }
            Command::SavePreset(name) => {
                let battle = self.registry.get_battle(&self.channel).await?;
                let persisted = battle.to_persisted().await;
                self.presets.save(&self.guild, &name, persisted)?;
                Ok(Some(format!("Battle preset \"{}\" saved!", name)))
            }
            Command::LoadPreset(name) => {
                let persisted = self.presets.load(&self.guild, &name)?;
                self.registry.load_battle(&self.channel, &persisted).await?;
                Ok(None)
            }
            Command::DeletePreset(name) => {
                self.presets.delete(&self.guild, &name)?;
                Ok(Some(format!("Preset {} deleted.", name)))
            }
            Command::ListPresets => Ok(Some(self.presets.list_text(&self.guild))),
            Command::ViewPreset(name) => self.presets.view(&self.guild, &name).map(Some),
        }
    }
}
