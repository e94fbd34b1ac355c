//! # Presets Module
//!
//! Named battle snapshots, grouped by guild and optionally backed by a JSON
//! file on disk.
//!
//! Each guild holds at most [`MAX_PRESET_COUNT`](crate::config::MAX_PRESET_COUNT)
//! presets. A guild whose last preset is deleted is dropped entirely.

use crate::{config, PersistedBattle, SkirmishError, SkirmishResult};
use log::{debug, info};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Guild identifier presets are grouped by.
pub type GuildId = String;

type PresetMap = BTreeMap<GuildId, BTreeMap<String, PersistedBattle>>;

/// One line of a preset listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetSummary {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Rosters as letters, e.g. `[A][B] vs. [C]`
    pub rosters: String,
}

impl PresetSummary {
    fn new(name: &str, preset: &PersistedBattle) -> Self {
        Self {
            name: name.to_string(),
            width: preset.width,
            height: preset.height,
            rosters: preset.roster_summary(),
        }
    }
}

/// Storage for battle presets.
pub trait PresetRepository {
    /// Saves or overwrites a preset.
    fn save(&mut self, guild: &str, name: &str, battle: PersistedBattle) -> SkirmishResult<()>;

    fn load(&self, guild: &str, name: &str) -> SkirmishResult<PersistedBattle>;

    fn delete(&mut self, guild: &str, name: &str) -> SkirmishResult<()>;

    /// Presets of a guild, ordered by name.
    fn list(&self, guild: &str) -> Vec<PresetSummary>;
}

/// Checks that a preset name only uses letters, digits, `_` and `-`.
pub fn validate_preset_name(name: &str) -> SkirmishResult<()> {
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(SkirmishError::ParseError(format!(
            "Invalid preset name \"{}\". Preset names can only have letters, numbers, underscores, or hyphens.",
            name
        )));
    }
    Ok(())
}

/// Preset store kept in memory and, when opened from a path, written back to
/// that file after every change.
#[derive(Debug, Default)]
pub struct PresetStore {
    path: Option<PathBuf>,
    presets: PresetMap,
}

impl PresetStore {
    /// A store that never touches the disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the store at `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> SkirmishResult<Self> {
        let path = path.as_ref().to_path_buf();
        let presets = match fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!("No preset file at {}, starting empty", path.display());
                PresetMap::new()
            }
            Err(error) => return Err(error.into()),
        };

        Ok(Self {
            path: Some(path),
            presets,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Detailed description of one preset.
    pub fn view(&self, guild: &str, name: &str) -> SkirmishResult<String> {
        Ok(self.load(guild, name)?.describe(name))
    }

    /// Listing of a guild's presets as display text.
    pub fn list_text(&self, guild: &str) -> String {
        let summaries = self.list(guild);
        if summaries.is_empty() {
            return "There are no saved presets in this server.".to_string();
        }

        let mut text = String::from("List of this server's battle presets:\n");
        for summary in summaries {
            text.push_str(&format!(
                "{} ({}x{})\n  {}\n",
                summary.name, summary.width, summary.height, summary.rosters
            ));
        }
        text
    }

    /// Writes `next` to the backing file, then makes it the current map.
    ///
    /// The in-memory map is left untouched when the write fails.
    fn commit(&mut self, next: PresetMap) -> SkirmishResult<()> {
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, serde_json::to_string_pretty(&next)?)?;
            debug!("Presets written to {}", path.display());
        }
        self.presets = next;
        Ok(())
    }

    fn not_found(name: &str) -> SkirmishError {
        SkirmishError::NotFound(format!(
            "There is no preset saved with the name \"{}\" in this server.",
            name
        ))
    }
}

impl PresetRepository for PresetStore {
    fn save(&mut self, guild: &str, name: &str, battle: PersistedBattle) -> SkirmishResult<()> {
        validate_preset_name(name)?;

        let mut next = self.presets.clone();
        let presets = next.entry(guild.to_string()).or_default();
        if !presets.contains_key(name) && presets.len() >= config::MAX_PRESET_COUNT {
            return Err(SkirmishError::PresetLimitExceeded {
                max: config::MAX_PRESET_COUNT,
            });
        }

        presets.insert(name.to_string(), battle);
        self.commit(next)?;
        info!("Preset \"{}\" saved for guild {}", name, guild);
        Ok(())
    }

    fn load(&self, guild: &str, name: &str) -> SkirmishResult<PersistedBattle> {
        self.presets
            .get(guild)
            .and_then(|presets| presets.get(name))
            .cloned()
            .ok_or_else(|| Self::not_found(name))
    }

    fn delete(&mut self, guild: &str, name: &str) -> SkirmishResult<()> {
        let mut next = self.presets.clone();
        let presets = next.get_mut(guild).ok_or_else(|| Self::not_found(name))?;
        presets.remove(name).ok_or_else(|| Self::not_found(name))?;

        if presets.is_empty() {
            next.remove(guild);
        }
        self.commit(next)?;
        info!("Preset \"{}\" deleted for guild {}", name, guild);
        Ok(())
    }

    fn list(&self, guild: &str) -> Vec<PresetSummary> {
        self.presets
            .get(guild)
            .map(|presets| {
                presets
                    .iter()
                    .map(|(name, preset)| PresetSummary::new(name, preset))
                    .collect()
            })
            .unwrap_or_default()
    }
}
