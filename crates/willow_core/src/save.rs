use std::io::{self, Cursor, Read, Seek};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::byte_order::ByteOrder;
use crate::core_api::{CoreError, CoreErrorCode};
use crate::dlc::{DlcData, decode_dlc_block, encode_dlc_block};
use crate::inventory::{
    ENHANCED_REVISION, InventoryKind, InventoryObject, decode_objects, encode_objects,
};
use crate::layout::{FileLayout, SectionId};
use crate::platform::{Platform, PlatformIdentity};
use crate::reader::WillowReader;
use crate::repair::{Repair, RepairLog, RepairState, repair, validate};
use crate::sections::{
    AmmoPool, ChallengeBlock, EchoTable, QuestTable, Skill, decode_ammo_pools,
    decode_challenge_block, decode_echo_tables, decode_quest_tables, decode_skills,
    decode_string_list, encode_ammo_pools, encode_challenge_block, encode_echo_tables,
    encode_quest_tables, encode_skills, encode_string_list,
};
use crate::writer::WillowWriter;

pub const SAVE_MAGIC: &[u8; 3] = b"WSG";
pub const PLAYER_MAGIC: &[u8; 4] = b"PLYR";
pub const FORMAT_VERSION: i32 = 2;
pub const MIN_REVISION: i32 = 0x20;
pub const MAX_REVISION: i32 = 0x2F;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Allow the decoder to discard damaged units instead of failing.
    pub auto_repair: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveGame {
    pub platform: Platform,
    /// Xbox profile and device ids. The encoder does not embed them; they
    /// are carried for the step that packages the encoded bytes into a
    /// console container.
    pub identity: Option<PlatformIdentity>,
    pub revision: i32,
    pub class: String,
    pub level: i32,
    pub experience: i32,
    pub skill_points: i32,
    pub unknown1: i32,
    pub cash: i32,
    pub finished_playthrough1: i32,
    pub skills: Vec<Skill>,
    pub vehicle_colors: [i32; 2],
    pub vehicle_types: [i32; 2],
    pub ammo_pools: Vec<AmmoPool>,
    pub items: Vec<InventoryObject>,
    pub backpack_size: i32,
    pub equip_slots: i32,
    pub weapons: Vec<InventoryObject>,
    pub challenges: Option<ChallengeBlock>,
    pub locations: Vec<String>,
    pub current_location: String,
    pub save_info: [i32; 5],
    pub save_number: i32,
    pub save_info_ext: [i32; 4],
    pub quest_tables: Vec<QuestTable>,
    pub total_play_time: i32,
    pub last_played_date: String,
    pub character_name: String,
    pub colors: [i32; 3],
    pub echo_tables: Vec<EchoTable>,
    pub dlc: DlcData,
    /// Bytes after the DLC block, carried opaque.
    pub tail: Vec<u8>,
}

/// Result of a decode: the save plus what, if anything, repair removed.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub save: SaveGame,
    pub layout: FileLayout,
    /// `Clean`, or `Repaired` when anything was removed.
    pub state: RepairState,
    pub required_repair: bool,
    pub repairs: Vec<Repair>,
}

impl SaveGame {
    pub fn byte_order(&self) -> ByteOrder {
        self.platform.byte_order()
    }

    pub fn raw_data_len(&self) -> usize {
        self.dlc.raw_len() + self.tail.len()
    }

    pub fn has_raw_data(&self) -> bool {
        self.raw_data_len() > 0
    }

    /// Irreversibly drop every byte the codec does not interpret. Returns
    /// the number of bytes removed.
    pub fn discard_raw_data(&mut self) -> usize {
        let dropped = self.dlc.discard_raw_data() + self.tail.len();
        self.tail.clear();
        dropped
    }

    /// Backpack objects of `kind`; `InventoryKind::Any` yields both lists.
    pub fn objects(&self, kind: InventoryKind) -> impl Iterator<Item = &InventoryObject> {
        self.items
            .iter()
            .chain(self.weapons.iter())
            .filter(move |object| kind.matches(object.kind))
    }

    pub fn parse(bytes: &[u8], options: DecodeOptions) -> Result<Loaded, CoreError> {
        let order = detect_byte_order(bytes)?;
        let mut r = WillowReader::new(Cursor::new(bytes), order);
        let mut log = RepairLog::new(options.auto_repair);
        let mut layout = FileLayout::new(bytes.len());

        let mut save = decode_sections(&mut r, &mut layout, &mut log)?;
        layout.validate()?;

        let issues = validate(&save);
        if let Some(first) = issues.first() {
            if !log.auto_repair() {
                return Err(CoreError::new(
                    CoreErrorCode::RequiresRepair,
                    format!("{} invalid inventory objects, first: {first}", issues.len()),
                ));
            }
            log.extend(repair(&mut save));
        }

        let repairs = log.into_repairs();
        let state = if repairs.is_empty() {
            RepairState::Clean
        } else {
            RepairState::Repaired
        };
        Ok(Loaded {
            save,
            layout,
            state,
            required_repair: state == RepairState::Repaired,
            repairs,
        })
    }

    /// Encode in the current platform's byte order, always in the enhanced
    /// object format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        encode_sections(self).map_err(|e| CoreError::from(e).context("encoding save"))
    }
}

fn detect_byte_order(bytes: &[u8]) -> Result<ByteOrder, CoreError> {
    if !bytes.starts_with(SAVE_MAGIC) {
        return Err(CoreError::new(
            CoreErrorCode::InvalidSaveHeader,
            "missing WSG signature",
        ));
    }
    let Some(version) = bytes.get(3..7) else {
        return Err(CoreError::new(
            CoreErrorCode::TruncatedStream,
            "file ends inside the save header",
        ));
    };
    let mut word = [0u8; 4];
    word.copy_from_slice(version);

    if i32::from_le_bytes(word) == FORMAT_VERSION {
        Ok(ByteOrder::Little)
    } else if i32::from_be_bytes(word) == FORMAT_VERSION {
        Ok(ByteOrder::Big)
    } else {
        Err(CoreError::new(
            CoreErrorCode::InvalidSaveHeader,
            format!("version word {word:02x?} matches version {FORMAT_VERSION} in neither byte order"),
        ))
    }
}

struct Sections<'a> {
    layout: &'a mut FileLayout,
    mark: usize,
}

impl Sections<'_> {
    fn close<R: Read + Seek>(&mut self, r: &mut WillowReader<R>, id: SectionId) -> io::Result<()> {
        let end = r.position()? as usize;
        self.layout.record(id, self.mark, end);
        debug!("{} section: {} bytes", id.as_str(), end - self.mark);
        self.mark = end;
        Ok(())
    }
}

fn decode_sections<R: Read + Seek>(
    r: &mut WillowReader<R>,
    layout: &mut FileLayout,
    log: &mut RepairLog,
) -> Result<SaveGame, CoreError> {
    let order = r.order();
    let mut sections = Sections { layout, mark: 0 };

    r.expect_magic(SAVE_MAGIC, "save signature")?;
    let _version = r.read_i32()?;
    r.expect_magic(PLAYER_MAGIC, "player marker").map_err(|e| {
        CoreError::new(CoreErrorCode::InvalidSaveHeader, e.to_string())
    })?;
    let revision = r.read_i32()?;
    if !(MIN_REVISION..=MAX_REVISION).contains(&revision) {
        return Err(CoreError::new(
            CoreErrorCode::UnsupportedRevision,
            format!("revision {revision:#x} outside {MIN_REVISION:#x}..={MAX_REVISION:#x}"),
        ));
    }
    let class = r.read_string()?;
    let level = r.read_i32()?;
    let experience = r.read_i32()?;
    let skill_points = r.read_i32()?;
    let unknown1 = r.read_i32()?;
    let cash = r.read_i32()?;
    let finished_playthrough1 = r.read_i32()?;
    sections.close(r, SectionId::Header)?;

    let skills = decode_skills(r)?;
    sections.close(r, SectionId::Skills)?;

    let vehicle_colors = r.read_i32_array::<2>()?;
    let vehicle_types = r.read_i32_array::<2>()?;
    sections.close(r, SectionId::Vehicles)?;

    let ammo_pools = decode_ammo_pools(r)?;
    sections.close(r, SectionId::AmmoPools)?;

    let items = decode_objects(r, InventoryKind::Item, revision)?;
    sections.close(r, SectionId::Items)?;

    let backpack_size = r.read_i32()?;
    let equip_slots = r.read_i32()?;
    sections.close(r, SectionId::Backpack)?;

    let weapons = decode_objects(r, InventoryKind::Weapon, revision)?;
    sections.close(r, SectionId::Weapons)?;

    let challenges = decode_challenges(r, log)?;
    sections.close(r, SectionId::Challenges)?;

    let locations = decode_string_list(r, "location")?;
    let current_location = r.read_string()?;
    sections.close(r, SectionId::Locations)?;

    let save_info = r.read_i32_array::<5>()?;
    let save_number = r.read_i32()?;
    let save_info_ext = r.read_i32_array::<4>()?;
    sections.close(r, SectionId::Progress)?;

    let quest_tables = decode_quest_tables(r)?;
    sections.close(r, SectionId::Quests)?;

    let total_play_time = r.read_i32()?;
    let last_played_date = r.read_string()?;
    let character_name = r.read_string()?;
    let colors = r.read_i32_array::<3>()?;
    sections.close(r, SectionId::Character)?;

    let echo_tables = decode_echo_tables(r)?;
    sections.close(r, SectionId::Echoes)?;

    let dlc = decode_dlc(r, revision, log)?;
    sections.close(r, SectionId::Dlc)?;

    let remaining = r.remaining()? as usize;
    let tail = r.read_bytes(remaining)?;
    if !tail.is_empty() {
        sections.close(r, SectionId::Tail)?;
    }

    Ok(SaveGame {
        platform: Platform::default_for(order),
        identity: None,
        revision,
        class,
        level,
        experience,
        skill_points,
        unknown1,
        cash,
        finished_playthrough1,
        skills,
        vehicle_colors,
        vehicle_types,
        ammo_pools,
        items,
        backpack_size,
        equip_slots,
        weapons,
        challenges,
        locations,
        current_location,
        save_info,
        save_number,
        save_info_ext,
        quest_tables,
        total_play_time,
        last_played_date,
        character_name,
        colors,
        echo_tables,
        dlc,
        tail,
    })
}

fn decode_challenges<R: Read + Seek>(
    r: &mut WillowReader<R>,
    log: &mut RepairLog,
) -> Result<Option<ChallengeBlock>, CoreError> {
    let block_len = r.read_i32()?;
    if block_len == 0 {
        return Ok(None);
    }
    if block_len < 0 {
        return Err(CoreError::new(
            CoreErrorCode::StructuralCorruption,
            format!("negative challenge block length {block_len}"),
        ));
    }

    let block = r.read_bytes(block_len as usize)?;
    match decode_challenge_block(&block, r.order()) {
        Ok(challenges) => Ok(Some(challenges)),
        Err(e) => {
            log.recover("challenge block", e)?;
            Ok(None)
        }
    }
}

fn decode_dlc<R: Read + Seek>(
    r: &mut WillowReader<R>,
    revision: i32,
    log: &mut RepairLog,
) -> Result<DlcData, CoreError> {
    let dlc_size = r.read_i32()?;
    let remaining = r.remaining()?;

    if dlc_size < 0 || dlc_size as u64 > remaining {
        log.recover(
            "DLC block",
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("DLC block declares {dlc_size} bytes, {remaining} remain"),
            ),
        )?;
        // Nothing after a block of unknown extent can be located.
        let end = r.len()?;
        r.seek_to(end)?;
        return Ok(DlcData::default());
    }

    let block = r.read_bytes(dlc_size as usize)?;
    decode_dlc_block(&block, r.order(), revision, log)
}

fn encode_sections(save: &SaveGame) -> io::Result<Vec<u8>> {
    let mut w = WillowWriter::new(save.byte_order());

    w.write_bytes(SAVE_MAGIC);
    w.write_i32(FORMAT_VERSION);
    w.write_bytes(PLAYER_MAGIC);
    w.write_i32(save.revision.max(ENHANCED_REVISION));
    w.write_string(&save.class);
    w.write_i32(save.level);
    w.write_i32(save.experience);
    w.write_i32(save.skill_points);
    w.write_i32(save.unknown1);
    w.write_i32(save.cash);
    w.write_i32(save.finished_playthrough1);

    encode_skills(&mut w, &save.skills);
    w.write_i32_slice(&save.vehicle_colors);
    w.write_i32_slice(&save.vehicle_types);
    encode_ammo_pools(&mut w, &save.ammo_pools);
    encode_objects(&mut w, &save.items, InventoryKind::Item)?;
    w.write_i32(save.backpack_size);
    w.write_i32(save.equip_slots);
    encode_objects(&mut w, &save.weapons, InventoryKind::Weapon)?;
    encode_challenge_block(&mut w, save.challenges.as_ref())?;

    encode_string_list(&mut w, &save.locations);
    w.write_string(&save.current_location);
    w.write_i32_slice(&save.save_info);
    w.write_i32(save.save_number);
    w.write_i32_slice(&save.save_info_ext);

    encode_quest_tables(&mut w, &save.quest_tables);
    w.write_i32(save.total_play_time);
    w.write_string(&save.last_played_date);
    w.write_string(&save.character_name);
    w.write_i32_slice(&save.colors);
    encode_echo_tables(&mut w, &save.echo_tables);

    encode_dlc_block(&mut w, &save.dlc)?;
    w.write_bytes(&save.tail);

    Ok(w.into_bytes())
}
