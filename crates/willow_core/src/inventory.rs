use std::fmt;
use std::io::{self, Read, Seek};

use serde::{Deserialize, Serialize};

use crate::reader::WillowReader;
use crate::writer::WillowWriter;

pub const ITEM_PART_COUNT: usize = 9;
pub const WEAPON_PART_COUNT: usize = 14;
pub const VALUE_SLOT_COUNT: usize = 6;

pub const SLOT_QUANTITY: usize = 0;
pub const SLOT_QUALITY: usize = 1;
pub const SLOT_EQUIPPED: usize = 2;
pub const SLOT_LEVEL: usize = 3;
pub const SLOT_JUNK: usize = 4;
pub const SLOT_LOCKED: usize = 5;

/// First revision whose backpack objects carry the junk and locked flags.
pub const ENHANCED_REVISION: i32 = 0x27;

// Backpack item parts 5 and 6 (material, manufacturer) trade places in the bank.
const BANK_SWAPPED_ITEM_PARTS: (usize, usize) = (5, 6);

// Bank entry: type id, one component-count byte per part, then 4+2+2+1+1+1 value bytes.
const BANK_VALUE_WIDTH: u64 = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InventoryKind {
    Weapon,
    Item,
    Any,
    Unknown,
}

impl InventoryKind {
    pub const WEAPON_RAW: u8 = 0;
    pub const ITEM_RAW: u8 = 1;

    pub fn from_raw(raw: u8) -> Self {
        match raw {
            Self::WEAPON_RAW => Self::Weapon,
            Self::ITEM_RAW => Self::Item,
            _ => Self::Unknown,
        }
    }

    pub fn raw(&self) -> Option<u8> {
        match *self {
            Self::Weapon => Some(Self::WEAPON_RAW),
            Self::Item => Some(Self::ITEM_RAW),
            Self::Any | Self::Unknown => None,
        }
    }

    /// Bank entries store the backpack code plus one.
    pub fn from_bank_type_id(type_id: u8) -> Self {
        match type_id.checked_sub(1) {
            Some(raw) => Self::from_raw(raw),
            None => Self::Unknown,
        }
    }

    pub fn bank_type_id(&self) -> Option<u8> {
        self.raw().map(|raw| raw + 1)
    }

    pub fn part_count(&self) -> Option<usize> {
        match *self {
            Self::Weapon => Some(WEAPON_PART_COUNT),
            Self::Item => Some(ITEM_PART_COUNT),
            Self::Any | Self::Unknown => None,
        }
    }

    pub fn from_part_count(count: usize) -> Self {
        match count {
            WEAPON_PART_COUNT => Self::Weapon,
            ITEM_PART_COUNT => Self::Item,
            _ => Self::Unknown,
        }
    }

    /// `Any` works as a wildcard when filtering.
    pub fn matches(&self, other: InventoryKind) -> bool {
        *self == Self::Any || *self == other
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Weapon => "weapon",
            Self::Item => "item",
            Self::Any => "any",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for InventoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A weapon or item: ordered part identifiers plus six integer slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryObject {
    pub kind: InventoryKind,
    pub parts: Vec<String>,
    pub values: [i32; VALUE_SLOT_COUNT],
}

impl InventoryObject {
    pub fn new(kind: InventoryKind, parts: Vec<String>, values: [i32; VALUE_SLOT_COUNT]) -> Self {
        Self {
            kind,
            parts,
            values,
        }
    }

    /// Quantity for items and bank entries, remaining ammo for weapons.
    pub fn quantity(&self) -> i32 {
        self.values[SLOT_QUANTITY]
    }

    pub fn quality(&self) -> i32 {
        self.values[SLOT_QUALITY]
    }

    pub fn equipped_slot(&self) -> i32 {
        self.values[SLOT_EQUIPPED]
    }

    pub fn level(&self) -> i32 {
        self.values[SLOT_LEVEL]
    }

    pub fn is_junk(&self) -> bool {
        self.values[SLOT_JUNK] != 0
    }

    pub fn is_locked(&self) -> bool {
        self.values[SLOT_LOCKED] != 0
    }

    pub fn is_well_formed(&self) -> bool {
        self.kind.part_count() == Some(self.parts.len())
    }
}

/// Translate item parts between backpack and bank order. The swap is its
/// own inverse and weapons are left alone.
pub fn swap_bank_part_order(kind: InventoryKind, parts: &mut [String]) {
    let (a, b) = BANK_SWAPPED_ITEM_PARTS;
    if kind == InventoryKind::Item && parts.len() > b {
        parts.swap(a, b);
    }
}

/// How an object's part strings are stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartLayout {
    /// One length-prefixed string per part.
    Backpack,
    /// A component-count byte followed by that many dotted components.
    Bank,
}

impl PartLayout {
    fn read_part<R: Read + Seek>(&self, r: &mut WillowReader<R>) -> io::Result<String> {
        match *self {
            Self::Backpack => r.read_string(),
            Self::Bank => read_bank_string(r),
        }
    }

    fn write_part(&self, w: &mut WillowWriter, part: &str) -> io::Result<()> {
        match *self {
            Self::Backpack => {
                w.write_string(part);
                Ok(())
            }
            Self::Bank => write_bank_string(w, part),
        }
    }

    fn min_part_width(&self) -> u64 {
        match *self {
            Self::Backpack => 4,
            Self::Bank => 1,
        }
    }
}

pub fn read_parts<R: Read + Seek>(
    r: &mut WillowReader<R>,
    layout: PartLayout,
    count: usize,
) -> io::Result<Vec<String>> {
    let mut parts = Vec::with_capacity(count);
    for _ in 0..count {
        parts.push(layout.read_part(r)?);
    }
    Ok(parts)
}

pub fn write_parts(w: &mut WillowWriter, layout: PartLayout, parts: &[String]) -> io::Result<()> {
    for part in parts {
        layout.write_part(w, part)?;
    }
    Ok(())
}

fn read_bank_string<R: Read + Seek>(r: &mut WillowReader<R>) -> io::Result<String> {
    let components = r.read_u8()?;
    let mut pieces = Vec::with_capacity(components as usize);
    for _ in 0..components {
        pieces.push(r.read_string()?);
    }
    Ok(pieces.join("."))
}

fn write_bank_string(w: &mut WillowWriter, value: &str) -> io::Result<()> {
    if value.is_empty() {
        w.write_u8(0);
        return Ok(());
    }

    let pieces: Vec<&str> = value.split('.').collect();
    let count = u8::try_from(pieces.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("bank part {value:?} has {} components, limit 255", pieces.len()),
        )
    })?;
    w.write_u8(count);
    for piece in pieces {
        w.write_string(piece);
    }
    Ok(())
}

fn value_width(revision: i32) -> u64 {
    if revision >= ENHANCED_REVISION { 20 } else { 12 }
}

/// Read the backpack value block. Revisions before the enhanced format have
/// no junk/locked fields; those slots come back as 0.
pub fn read_object_values<R: Read + Seek>(
    r: &mut WillowReader<R>,
    revision: i32,
) -> io::Result<[i32; VALUE_SLOT_COUNT]> {
    let quantity = r.read_i32()?;
    let packed = r.read_i32()?;
    let equipped = r.read_i32()?;
    let (junk, locked) = if revision >= ENHANCED_REVISION {
        (r.read_i32()?, r.read_i32()?)
    } else {
        (0, 0)
    };

    let quality = packed as i16 as i32;
    let level = (packed >> 16) as i16 as i32;

    let mut values = [0i32; VALUE_SLOT_COUNT];
    values[SLOT_QUANTITY] = quantity;
    values[SLOT_QUALITY] = quality;
    values[SLOT_EQUIPPED] = equipped;
    values[SLOT_LEVEL] = level;
    values[SLOT_JUNK] = junk;
    values[SLOT_LOCKED] = locked;
    Ok(values)
}

/// Always writes the full enhanced-format block.
pub fn write_object_values(w: &mut WillowWriter, values: &[i32; VALUE_SLOT_COUNT]) -> io::Result<()> {
    let quality = narrow_i16(values[SLOT_QUALITY], "quality")?;
    let level = narrow_i16(values[SLOT_LEVEL], "level")?;
    let packed = (((level as u16 as u32) << 16) | quality as u16 as u32) as i32;

    w.write_i32(values[SLOT_QUANTITY]);
    w.write_i32(packed);
    w.write_i32(values[SLOT_EQUIPPED]);
    w.write_i32(values[SLOT_JUNK]);
    w.write_i32(values[SLOT_LOCKED]);
    Ok(())
}

fn narrow_i16(value: i32, field: &str) -> io::Result<i16> {
    i16::try_from(value).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{field} {value} does not fit in 16 bits"),
        )
    })
}

fn narrow_u8(value: i32, field: &str) -> io::Result<u8> {
    u8::try_from(value).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{field} {value} does not fit in 8 bits"),
        )
    })
}

fn shape_error(kind: InventoryKind, parts: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("{kind} has {parts} parts, expected {:?}", kind.part_count()),
    )
}

/// Decode a counted list of backpack objects of one kind.
pub fn decode_objects<R: Read + Seek>(
    r: &mut WillowReader<R>,
    kind: InventoryKind,
    revision: i32,
) -> io::Result<Vec<InventoryObject>> {
    let part_count = kind.part_count().ok_or_else(|| shape_error(kind, 0))?;
    let min_width = part_count as u64 * PartLayout::Backpack.min_part_width() + value_width(revision);
    let count = r.read_count(min_width, kind.as_str())?;

    let mut objects = Vec::with_capacity(count);
    for _ in 0..count {
        let parts = read_parts(r, PartLayout::Backpack, part_count)?;
        let values = read_object_values(r, revision)?;
        objects.push(InventoryObject::new(kind, parts, values));
    }
    Ok(objects)
}

pub fn encode_objects(
    w: &mut WillowWriter,
    objects: &[InventoryObject],
    kind: InventoryKind,
) -> io::Result<()> {
    w.write_count(objects.len());
    for object in objects {
        if object.kind != kind || !object.is_well_formed() {
            return Err(shape_error(object.kind, object.parts.len()));
        }
        write_parts(w, PartLayout::Backpack, &object.parts)?;
        write_object_values(w, &object.values)?;
    }
    Ok(())
}

/// Decode bank entries. Parts come back in backpack order.
pub fn decode_bank_entries<R: Read + Seek>(
    r: &mut WillowReader<R>,
) -> io::Result<Vec<InventoryObject>> {
    let min_width = 1 + ITEM_PART_COUNT as u64 * PartLayout::Bank.min_part_width() + BANK_VALUE_WIDTH;
    let count = r.read_count(min_width, "bank entry")?;

    let mut entries = Vec::with_capacity(count);
    for index in 0..count {
        let type_id = r.read_u8()?;
        let kind = InventoryKind::from_bank_type_id(type_id);
        let part_count = kind.part_count().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("bank entry {index} has invalid type id {type_id}"),
            )
        })?;

        let mut parts = read_parts(r, PartLayout::Bank, part_count)?;
        swap_bank_part_order(kind, &mut parts);

        let mut values = [0i32; VALUE_SLOT_COUNT];
        values[SLOT_QUANTITY] = r.read_i32()?;
        values[SLOT_QUALITY] = r.read_i16()? as i32;
        values[SLOT_LEVEL] = r.read_i16()? as i32;
        values[SLOT_EQUIPPED] = r.read_u8()? as i32;
        values[SLOT_JUNK] = r.read_u8()? as i32;
        values[SLOT_LOCKED] = r.read_u8()? as i32;

        entries.push(InventoryObject::new(kind, parts, values));
    }
    Ok(entries)
}

pub fn encode_bank_entries(w: &mut WillowWriter, entries: &[InventoryObject]) -> io::Result<()> {
    w.write_count(entries.len());
    for entry in entries {
        let type_id = entry
            .kind
            .bank_type_id()
            .filter(|_| entry.is_well_formed())
            .ok_or_else(|| shape_error(entry.kind, entry.parts.len()))?;

        let mut parts = entry.parts.clone();
        swap_bank_part_order(entry.kind, &mut parts);

        w.write_u8(type_id);
        write_parts(w, PartLayout::Bank, &parts)?;
        w.write_i32(entry.values[SLOT_QUANTITY]);
        w.write_i16(narrow_i16(entry.values[SLOT_QUALITY], "quality")?);
        w.write_i16(narrow_i16(entry.values[SLOT_LEVEL], "level")?);
        w.write_u8(narrow_u8(entry.values[SLOT_EQUIPPED], "equipped slot")?);
        w.write_u8(narrow_u8(entry.values[SLOT_JUNK], "junk flag")?);
        w.write_u8(narrow_u8(entry.values[SLOT_LOCKED], "locked flag")?);
    }
    Ok(())
}
