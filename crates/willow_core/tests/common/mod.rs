#![allow(dead_code)]

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use willow_core::dlc::{
    BankSection, DlcData, DlcRecord, DlcSection, FlagsSection, SecondaryPackSection,
    TertiarySection,
};
use willow_core::inventory::{ENHANCED_REVISION, ITEM_PART_COUNT, WEAPON_PART_COUNT};
use willow_core::sections::{
    AmmoPool, Challenge, ChallengeBlock, EchoEntry, EchoTable, QuestEntry, QuestObjective,
    QuestTable, Skill,
};
use willow_core::{InventoryKind, InventoryObject, Platform, SaveGame};

pub fn weapon(name: &str, values: [i32; 6]) -> InventoryObject {
    let parts = (0..WEAPON_PART_COUNT)
        .map(|i| format!("gd_weap_{name}.A_Weapon.Part_{i}"))
        .collect();
    InventoryObject::new(InventoryKind::Weapon, parts, values)
}

pub fn item(name: &str, values: [i32; 6]) -> InventoryObject {
    let parts = (0..ITEM_PART_COUNT)
        .map(|i| format!("gd_item_{name}.Item.Part_{i}"))
        .collect();
    InventoryObject::new(InventoryKind::Item, parts, values)
}

pub fn sample_dlc() -> DlcData {
    DlcData {
        records: vec![
            DlcRecord::Bank(BankSection {
                unknown1: 1,
                bank_size: 12,
                entries: vec![
                    weapon("bank_repeater", [0, 3, 0, 22, 0, 1]),
                    item("bank_shield", [1, 2, 0, 18, 1, 0]),
                ],
                raw: Vec::new(),
            }),
            DlcRecord::Flags(FlagsSection {
                unknown2: 0,
                unknown3: 1,
                unknown4: 2,
                skip_dlc2_intro: 1,
                raw: Vec::new(),
            }),
            DlcRecord::Tertiary(TertiarySection {
                unknown5: 1,
                raw: Vec::new(),
            }),
            DlcRecord::SecondaryPack(SecondaryPackSection {
                enabled: 1,
                items: vec![item("pack_grenade", [4, 1, 0, 30, 0, 0])],
                weapons: vec![weapon("pack_launcher", [12, 4, 0, 31, 0, 0])],
                raw: Vec::new(),
            }),
        ],
        trailer: Vec::new(),
    }
}

/// A fully populated save with no uninterpreted bytes.
pub fn sample_save(platform: Platform) -> SaveGame {
    SaveGame {
        platform,
        identity: None,
        revision: ENHANCED_REVISION,
        class: "gd_Roland.Character.CharacterClass_Roland".to_string(),
        level: 34,
        experience: 1_234_567,
        skill_points: 2,
        unknown1: 0,
        cash: 987_654,
        finished_playthrough1: 1,
        skills: vec![
            Skill {
                name: "gd_Skills2_Roland.Scattershot".to_string(),
                level: 5,
                experience: 0,
                in_use: -1,
            },
            Skill {
                name: "gd_Skills2_Roland.Stockpile".to_string(),
                level: 3,
                experience: 0,
                in_use: -1,
            },
        ],
        vehicle_colors: [3, 7],
        vehicle_types: [0, 1],
        ammo_pools: vec![AmmoPool {
            resource: "d_resources.AmmoResources.Ammo_Combat_Shotgun".to_string(),
            pool: "d_resourcepools.AmmoPools.Ammo_Combat_Shotgun_Pool".to_string(),
            remaining: 84.5,
            level: 6,
        }],
        items: vec![
            item("shield", [1, 3, 1, 33, 0, 1]),
            item("medkit", [2, 0, 0, 20, 1, 0]),
        ],
        backpack_size: 42,
        equip_slots: 4,
        weapons: vec![
            weapon("combat_shotgun", [0, 5, 1, 34, 0, 1]),
            weapon("sniper", [0, 5, 0, 3, 0, 0]),
        ],
        challenges: Some(ChallengeBlock {
            block_id: 3,
            entries: vec![
                Challenge {
                    id: 1,
                    type_id: 1,
                    value: 250,
                },
                Challenge {
                    id: 14,
                    type_id: 2,
                    value: 12,
                },
            ],
        }),
        locations: vec![
            "Fyrestone".to_string(),
            "Arid Badlands".to_string(),
            "New Haven".to_string(),
        ],
        current_location: "New Haven".to_string(),
        save_info: [1, 2, 3, 4, 5],
        save_number: 7,
        save_info_ext: [0, 1, 0, 1],
        quest_tables: vec![QuestTable {
            playthrough: 0,
            current_quest: "Z0_Missions.Missions.M_KillSledge".to_string(),
            quests: vec![QuestEntry {
                name: "Z0_Missions.Missions.M_KillSledge".to_string(),
                progress: 1,
                dlc_value1: 0,
                dlc_value2: 0,
                objectives: vec![QuestObjective {
                    description: "Kill Sledge".to_string(),
                    progress: 0,
                }],
            }],
        }],
        total_play_time: 360_000,
        last_played_date: "20091020231254".to_string(),
        character_name: "Rölånd".to_string(),
        colors: [-1, 0x00FF_00FF, 12],
        echo_tables: vec![EchoTable {
            index: 0,
            echoes: vec![EchoEntry {
                name: "dlc1_Echo.Echo_Intro".to_string(),
                dlc_value1: 0,
                dlc_value2: 1,
            }],
        }],
        dlc: sample_dlc(),
        tail: Vec::new(),
    }
}

/// `sample_save` with bytes the codec carries but does not interpret.
pub fn save_with_raw_data(platform: Platform) -> SaveGame {
    let mut save = sample_save(platform);
    if let DlcRecord::Tertiary(tertiary) = &mut save.dlc.records[2] {
        tertiary.raw = vec![0xDE, 0xAD, 0xBE];
    }
    save.dlc.records.push(DlcRecord::Opaque(DlcSection {
        id: 0x1111_2222,
        raw: vec![1, 2, 3, 4, 5],
    }));
    save.tail = vec![0xAA, 0xBB];
    save
}

pub fn container_bytes(magic: &[u8; 4], profile_id: u64, device_id: [u8; 20]) -> Vec<u8> {
    let mut bytes = vec![0u8; 0x1000];
    bytes[..4].copy_from_slice(magic);
    bytes[0x344..0x348].copy_from_slice(&1u32.to_be_bytes());
    bytes[0x360..0x364].copy_from_slice(&0x5454_082Bu32.to_be_bytes());
    bytes[0x371..0x379].copy_from_slice(&profile_id.to_be_bytes());
    bytes[0x3FD..0x411].copy_from_slice(&device_id);
    bytes
}

pub fn temp_output_path(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("{prefix}_{}_{}.sav", std::process::id(), nanos))
}
