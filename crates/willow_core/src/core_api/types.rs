use serde::{Deserialize, Serialize};

use crate::byte_order::ByteOrder;
use crate::dlc::SectionState;
use crate::platform::Platform;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DlcSectionSummary {
    pub id: i32,
    pub name: String,
    pub state: SectionState,
    pub raw_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub platform: Platform,
    pub byte_order: ByteOrder,
    pub revision: i32,
    pub character_name: String,
    pub class: String,
    pub level: i32,
    pub experience: i32,
    pub skill_points: i32,
    pub cash: i32,
    pub finished_playthrough1: bool,
    pub total_play_time: i32,
    pub last_played_date: String,
    pub current_location: String,
    pub skill_count: usize,
    pub item_count: usize,
    pub weapon_count: usize,
    pub bank_entry_count: usize,
    pub challenge_count: usize,
    pub location_count: usize,
    pub quest_count: usize,
    pub echo_count: usize,
    pub dlc_sections: Vec<DlcSectionSummary>,
    pub raw_data_len: usize,
    pub has_identity: bool,
}
