use std::fs;
use std::path::Path;

use log::info;

use crate::dlc::DlcRecord;
use crate::platform::{self, Platform, PlatformIdentity};
use crate::repair::{self, Issue, RepairState};
use crate::save::{DecodeOptions, Loaded, SaveGame};

use super::error::{CoreError, CoreErrorCode};
use super::types::{DlcSectionSummary, Snapshot};

#[derive(Debug, Default, Clone, Copy)]
pub struct Engine {
    options: DecodeOptions,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DecodeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> DecodeOptions {
        self.options
    }

    pub fn read<P: AsRef<Path>>(&self, path: P) -> Result<Loaded, CoreError> {
        let path_ref = path.as_ref();
        let bytes = fs::read(path_ref).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!("failed to read {}: {e}", path_ref.display()),
            )
        })?;

        self.deserialize(bytes)
            .map_err(|e| e.context(&path_ref.display().to_string()))
    }

    pub fn deserialize<B: AsRef<[u8]>>(&self, bytes: B) -> Result<Loaded, CoreError> {
        let bytes = bytes.as_ref();
        let loaded = SaveGame::parse(bytes, self.options)?;
        info!(
            "decoded {} save revision {:#x} ({} bytes, {} repairs)",
            loaded.save.platform,
            loaded.save.revision,
            bytes.len(),
            loaded.repairs.len()
        );
        Ok(loaded)
    }

    pub fn serialize(&self, save: &SaveGame) -> Result<Vec<u8>, CoreError> {
        save.to_bytes()
    }

    pub fn write<P: AsRef<Path>>(&self, save: &SaveGame, path: P) -> Result<(), CoreError> {
        let path_ref = path.as_ref();
        let bytes = self.serialize(save)?;
        fs::write(path_ref, &bytes).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!("failed to write {}: {e}", path_ref.display()),
            )
        })?;
        info!("wrote {} bytes to {}", bytes.len(), path_ref.display());
        Ok(())
    }

    pub fn discard_raw_data(&self, save: &mut SaveGame) -> usize {
        let dropped = save.discard_raw_data();
        if dropped > 0 {
            info!("discarded {dropped} bytes of raw data");
        }
        dropped
    }

    pub fn resolve_xbox_identity<P: AsRef<Path>>(
        &self,
        container: P,
    ) -> Result<PlatformIdentity, CoreError> {
        platform::resolve_xbox_identity(container.as_ref())
    }

    pub fn select_platform(
        &self,
        save: &mut SaveGame,
        target: Platform,
        container: Option<&Path>,
    ) -> Result<(), CoreError> {
        platform::select_platform(save, target, container)
    }

    pub fn validate(&self, save: &SaveGame) -> Vec<Issue> {
        repair::validate(save)
    }

    /// `Repaired` when anything was removed, `Clean` otherwise.
    pub fn repair(&self, save: &mut SaveGame) -> RepairState {
        if repair::repair(save).is_empty() {
            RepairState::Clean
        } else {
            RepairState::Repaired
        }
    }

    pub fn snapshot(&self, save: &SaveGame) -> Snapshot {
        Snapshot {
            platform: save.platform,
            byte_order: save.byte_order(),
            revision: save.revision,
            character_name: save.character_name.clone(),
            class: save.class.clone(),
            level: save.level,
            experience: save.experience,
            skill_points: save.skill_points,
            cash: save.cash,
            finished_playthrough1: save.finished_playthrough1 != 0,
            total_play_time: save.total_play_time,
            last_played_date: save.last_played_date.clone(),
            current_location: save.current_location.clone(),
            skill_count: save.skills.len(),
            item_count: save.items.len(),
            weapon_count: save.weapons.len(),
            bank_entry_count: save.dlc.bank_entries().len(),
            challenge_count: save.challenges.as_ref().map_or(0, |c| c.entries.len()),
            location_count: save.locations.len(),
            quest_count: save.quest_tables.iter().map(|t| t.quests.len()).sum(),
            echo_count: save.echo_tables.iter().map(|t| t.echoes.len()).sum(),
            dlc_sections: save.dlc.records.iter().map(summarize_record).collect(),
            raw_data_len: save.raw_data_len(),
            has_identity: save.identity.is_some(),
        }
    }
}

fn summarize_record(record: &DlcRecord) -> DlcSectionSummary {
    DlcSectionSummary {
        id: record.id(),
        name: record.name().to_string(),
        state: record.state(),
        raw_len: record.raw().len(),
    }
}
