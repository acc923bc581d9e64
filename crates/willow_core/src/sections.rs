use std::io::{self, Cursor, Read, Seek};

use serde::{Deserialize, Serialize};

use crate::byte_order::ByteOrder;
use crate::reader::WillowReader;
use crate::writer::WillowWriter;

// Minimum encoded widths, used to sanity-check counts before looping.
const SKILL_MIN_WIDTH: u64 = 16;
const AMMO_POOL_MIN_WIDTH: u64 = 16;
const QUEST_TABLE_MIN_WIDTH: u64 = 12;
const QUEST_MIN_WIDTH: u64 = 20;
const OBJECTIVE_MIN_WIDTH: u64 = 8;
const ECHO_TABLE_MIN_WIDTH: u64 = 8;
const ECHO_MIN_WIDTH: u64 = 12;
const STRING_MIN_WIDTH: u64 = 4;
const CHALLENGE_WIDTH: usize = 7;
const CHALLENGE_HEADER_WIDTH: usize = 6;

// --- Skills ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub level: i32,
    pub experience: i32,
    pub in_use: i32,
}

pub fn decode_skills<R: Read + Seek>(r: &mut WillowReader<R>) -> io::Result<Vec<Skill>> {
    let count = r.read_count(SKILL_MIN_WIDTH, "skill")?;
    let mut skills = Vec::with_capacity(count);
    for _ in 0..count {
        skills.push(Skill {
            name: r.read_string()?,
            level: r.read_i32()?,
            experience: r.read_i32()?,
            in_use: r.read_i32()?,
        });
    }
    Ok(skills)
}

pub fn encode_skills(w: &mut WillowWriter, skills: &[Skill]) {
    w.write_count(skills.len());
    for skill in skills {
        w.write_string(&skill.name);
        w.write_i32(skill.level);
        w.write_i32(skill.experience);
        w.write_i32(skill.in_use);
    }
}

// --- Ammo pools ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmmoPool {
    pub resource: String,
    pub pool: String,
    pub remaining: f32,
    pub level: i32,
}

pub fn decode_ammo_pools<R: Read + Seek>(r: &mut WillowReader<R>) -> io::Result<Vec<AmmoPool>> {
    let count = r.read_count(AMMO_POOL_MIN_WIDTH, "ammo pool")?;
    let mut pools = Vec::with_capacity(count);
    for _ in 0..count {
        pools.push(AmmoPool {
            resource: r.read_string()?,
            pool: r.read_string()?,
            remaining: r.read_f32()?,
            level: r.read_i32()?,
        });
    }
    Ok(pools)
}

pub fn encode_ammo_pools(w: &mut WillowWriter, pools: &[AmmoPool]) {
    w.write_count(pools.len());
    for pool in pools {
        w.write_string(&pool.resource);
        w.write_string(&pool.pool);
        w.write_f32(pool.remaining);
        w.write_i32(pool.level);
    }
}

// --- Challenges ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: i16,
    pub type_id: u8,
    pub value: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeBlock {
    pub block_id: i32,
    pub entries: Vec<Challenge>,
}

/// Parse the body of a challenge block whose byte length is already known.
/// The declared entry count must account for every byte of the block.
pub fn decode_challenge_block(
    block: &[u8],
    order: ByteOrder,
) -> io::Result<ChallengeBlock> {
    let mut r = WillowReader::new(Cursor::new(block), order);
    let block_id = r.read_i32()?;
    let count = r.read_i16()?;
    if count < 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("negative challenge count {count}"),
        ));
    }

    let expected = CHALLENGE_HEADER_WIDTH + count as usize * CHALLENGE_WIDTH;
    if expected != block.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "challenge block declares {count} entries ({expected} bytes) but is {} bytes",
                block.len()
            ),
        ));
    }

    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        entries.push(Challenge {
            id: r.read_i16()?,
            type_id: r.read_u8()?,
            value: r.read_i32()?,
        });
    }
    Ok(ChallengeBlock { block_id, entries })
}

pub fn encode_challenge_block(w: &mut WillowWriter, block: Option<&ChallengeBlock>) -> io::Result<()> {
    let Some(block) = block else {
        w.write_i32(0);
        return Ok(());
    };

    let count = i16::try_from(block.entries.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} challenges exceed the 16-bit count", block.entries.len()),
        )
    })?;
    let len = CHALLENGE_HEADER_WIDTH + block.entries.len() * CHALLENGE_WIDTH;
    w.write_count(len);
    w.write_i32(block.block_id);
    w.write_i16(count);
    for entry in &block.entries {
        w.write_i16(entry.id);
        w.write_u8(entry.type_id);
        w.write_i32(entry.value);
    }
    Ok(())
}

// --- Locations ---

pub fn decode_string_list<R: Read + Seek>(
    r: &mut WillowReader<R>,
    what: &str,
) -> io::Result<Vec<String>> {
    let count = r.read_count(STRING_MIN_WIDTH, what)?;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(r.read_string()?);
    }
    Ok(out)
}

pub fn encode_string_list(w: &mut WillowWriter, values: &[String]) {
    w.write_count(values.len());
    for value in values {
        w.write_string(value);
    }
}

// --- Quests ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestObjective {
    pub description: String,
    pub progress: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestEntry {
    pub name: String,
    pub progress: i32,
    pub dlc_value1: i32,
    pub dlc_value2: i32,
    pub objectives: Vec<QuestObjective>,
}

/// Quest state for one playthrough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestTable {
    pub playthrough: i32,
    pub current_quest: String,
    pub quests: Vec<QuestEntry>,
}

pub fn decode_quest_tables<R: Read + Seek>(r: &mut WillowReader<R>) -> io::Result<Vec<QuestTable>> {
    let table_count = r.read_count(QUEST_TABLE_MIN_WIDTH, "quest table")?;
    let mut tables = Vec::with_capacity(table_count);
    for _ in 0..table_count {
        let playthrough = r.read_i32()?;
        let current_quest = r.read_string()?;
        let quest_count = r.read_count(QUEST_MIN_WIDTH, "quest")?;
        let mut quests = Vec::with_capacity(quest_count);
        for _ in 0..quest_count {
            quests.push(decode_quest(r)?);
        }
        tables.push(QuestTable {
            playthrough,
            current_quest,
            quests,
        });
    }
    Ok(tables)
}

fn decode_quest<R: Read + Seek>(r: &mut WillowReader<R>) -> io::Result<QuestEntry> {
    let name = r.read_string()?;
    let progress = r.read_i32()?;
    let dlc_value1 = r.read_i32()?;
    let dlc_value2 = r.read_i32()?;
    let objective_count = r.read_count(OBJECTIVE_MIN_WIDTH, "quest objective")?;
    let mut objectives = Vec::with_capacity(objective_count);
    for _ in 0..objective_count {
        objectives.push(QuestObjective {
            description: r.read_string()?,
            progress: r.read_i32()?,
        });
    }
    Ok(QuestEntry {
        name,
        progress,
        dlc_value1,
        dlc_value2,
        objectives,
    })
}

pub fn encode_quest_tables(w: &mut WillowWriter, tables: &[QuestTable]) {
    w.write_count(tables.len());
    for table in tables {
        w.write_i32(table.playthrough);
        w.write_string(&table.current_quest);
        w.write_count(table.quests.len());
        for quest in &table.quests {
            w.write_string(&quest.name);
            w.write_i32(quest.progress);
            w.write_i32(quest.dlc_value1);
            w.write_i32(quest.dlc_value2);
            w.write_count(quest.objectives.len());
            for objective in &quest.objectives {
                w.write_string(&objective.description);
                w.write_i32(objective.progress);
            }
        }
    }
}

// --- Echoes ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoEntry {
    pub name: String,
    pub dlc_value1: i32,
    pub dlc_value2: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoTable {
    pub index: i32,
    pub echoes: Vec<EchoEntry>,
}

pub fn decode_echo_tables<R: Read + Seek>(r: &mut WillowReader<R>) -> io::Result<Vec<EchoTable>> {
    let table_count = r.read_count(ECHO_TABLE_MIN_WIDTH, "echo table")?;
    let mut tables = Vec::with_capacity(table_count);
    for _ in 0..table_count {
        let index = r.read_i32()?;
        let echo_count = r.read_count(ECHO_MIN_WIDTH, "echo")?;
        let mut echoes = Vec::with_capacity(echo_count);
        for _ in 0..echo_count {
            echoes.push(EchoEntry {
                name: r.read_string()?,
                dlc_value1: r.read_i32()?,
                dlc_value2: r.read_i32()?,
            });
        }
        tables.push(EchoTable { index, echoes });
    }
    Ok(tables)
}

pub fn encode_echo_tables(w: &mut WillowWriter, tables: &[EchoTable]) {
    w.write_count(tables.len());
    for table in tables {
        w.write_i32(table.index);
        w.write_count(table.echoes.len());
        for echo in &table.echoes {
            w.write_string(&echo.name);
            w.write_i32(echo.dlc_value1);
            w.write_i32(echo.dlc_value2);
        }
    }
}
