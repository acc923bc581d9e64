use std::fmt;
use std::io::{self, Cursor, Read, Seek};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::byte_order::ByteOrder;
use crate::core_api::CoreError;
use crate::inventory::{
    InventoryKind, InventoryObject, decode_bank_entries, decode_objects, encode_bank_entries,
    encode_objects,
};
use crate::reader::WillowReader;
use crate::repair::RepairLog;
use crate::writer::WillowWriter;

pub const BANK_SECTION_ID: i32 = 0x4321_1234;
pub const FLAGS_SECTION_ID: i32 = 0x0215_1984;
pub const TERTIARY_SECTION_ID: i32 = 0x3223_5947;
pub const SECONDARY_PACK_SECTION_ID: i32 = 0x234B_A901;

const RECORD_HEADER_WIDTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionState {
    NotPresent,
    PresentKnown,
    /// Present, with bytes the codec carries without interpreting.
    PresentPartial,
}

impl fmt::Display for SectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Self::NotPresent => "not present",
            Self::PresentKnown => "present",
            Self::PresentPartial => "present (partial)",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankSection {
    pub unknown1: u8,
    pub bank_size: i32,
    pub entries: Vec<InventoryObject>,
    pub raw: Vec<u8>,
}

/// The game rewrites these values on every save; they are carried through
/// without meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagsSection {
    pub unknown2: i32,
    pub unknown3: i32,
    pub unknown4: i32,
    pub skip_dlc2_intro: i32,
    pub raw: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TertiarySection {
    pub unknown5: u8,
    pub raw: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryPackSection {
    pub enabled: u8,
    pub items: Vec<InventoryObject>,
    pub weapons: Vec<InventoryObject>,
    pub raw: Vec<u8>,
}

/// A section with an unrecognised id, kept byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DlcSection {
    pub id: i32,
    pub raw: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DlcRecord {
    Bank(BankSection),
    Flags(FlagsSection),
    Tertiary(TertiarySection),
    SecondaryPack(SecondaryPackSection),
    Opaque(DlcSection),
}

impl DlcRecord {
    pub fn id(&self) -> i32 {
        match self {
            Self::Bank(_) => BANK_SECTION_ID,
            Self::Flags(_) => FLAGS_SECTION_ID,
            Self::Tertiary(_) => TERTIARY_SECTION_ID,
            Self::SecondaryPack(_) => SECONDARY_PACK_SECTION_ID,
            Self::Opaque(section) => section.id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Bank(_) => "bank",
            Self::Flags(_) => "flags",
            Self::Tertiary(_) => "tertiary",
            Self::SecondaryPack(_) => "secondary-pack",
            Self::Opaque(_) => "opaque",
        }
    }

    pub fn raw(&self) -> &[u8] {
        match self {
            Self::Bank(s) => &s.raw,
            Self::Flags(s) => &s.raw,
            Self::Tertiary(s) => &s.raw,
            Self::SecondaryPack(s) => &s.raw,
            Self::Opaque(s) => &s.raw,
        }
    }

    fn clear_raw(&mut self) -> usize {
        let raw = match self {
            Self::Bank(s) => &mut s.raw,
            Self::Flags(s) => &mut s.raw,
            Self::Tertiary(s) => &mut s.raw,
            Self::SecondaryPack(s) => &mut s.raw,
            Self::Opaque(s) => &mut s.raw,
        };
        let dropped = raw.len();
        raw.clear();
        dropped
    }

    pub fn state(&self) -> SectionState {
        if self.raw().is_empty() && !matches!(self, Self::Opaque(_)) {
            SectionState::PresentKnown
        } else {
            SectionState::PresentPartial
        }
    }
}

/// Optional DLC sections in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DlcData {
    pub records: Vec<DlcRecord>,
    /// Bytes after the last record, too short to hold a record header.
    #[serde(default)]
    pub trailer: Vec<u8>,
}

impl DlcData {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.trailer.is_empty()
    }

    pub fn state(&self, id: i32) -> SectionState {
        self.records
            .iter()
            .find(|record| record.id() == id)
            .map(DlcRecord::state)
            .unwrap_or(SectionState::NotPresent)
    }

    pub fn bank(&self) -> Option<&BankSection> {
        self.records.iter().find_map(|record| match record {
            DlcRecord::Bank(s) => Some(s),
            _ => None,
        })
    }

    pub fn bank_mut(&mut self) -> Option<&mut BankSection> {
        self.records.iter_mut().find_map(|record| match record {
            DlcRecord::Bank(s) => Some(s),
            _ => None,
        })
    }

    pub fn flags(&self) -> Option<&FlagsSection> {
        self.records.iter().find_map(|record| match record {
            DlcRecord::Flags(s) => Some(s),
            _ => None,
        })
    }

    pub fn tertiary(&self) -> Option<&TertiarySection> {
        self.records.iter().find_map(|record| match record {
            DlcRecord::Tertiary(s) => Some(s),
            _ => None,
        })
    }

    pub fn secondary_pack(&self) -> Option<&SecondaryPackSection> {
        self.records.iter().find_map(|record| match record {
            DlcRecord::SecondaryPack(s) => Some(s),
            _ => None,
        })
    }

    pub fn secondary_pack_mut(&mut self) -> Option<&mut SecondaryPackSection> {
        self.records.iter_mut().find_map(|record| match record {
            DlcRecord::SecondaryPack(s) => Some(s),
            _ => None,
        })
    }

    pub fn bank_entries(&self) -> &[InventoryObject] {
        self.bank().map(|bank| bank.entries.as_slice()).unwrap_or(&[])
    }

    pub fn raw_len(&self) -> usize {
        let records: usize = self.records.iter().map(|record| record.raw().len()).sum();
        records + self.trailer.len()
    }

    /// Drop every uninterpreted byte: trailing blobs of known sections,
    /// whole unknown sections and the block trailer. Returns the number of
    /// bytes removed.
    pub fn discard_raw_data(&mut self) -> usize {
        let mut dropped = self.trailer.len();
        self.trailer.clear();
        self.records.retain_mut(|record| {
            if let DlcRecord::Opaque(section) = record {
                dropped += RECORD_HEADER_WIDTH + section.raw.len();
                return false;
            }
            dropped += record.clear_raw();
            true
        });
        dropped
    }
}

/// Decode the body of the DLC block. Damaged sections are handed to the
/// repair log, which either drops them or aborts the decode. Fewer than a
/// record header's worth of bytes at the end are kept as the trailer.
pub fn decode_dlc_block(
    block: &[u8],
    order: ByteOrder,
    revision: i32,
    log: &mut RepairLog,
) -> Result<DlcData, CoreError> {
    let mut data = DlcData::default();
    let mut offset = 0usize;

    while offset < block.len() {
        let remaining = block.len() - offset;
        if remaining < RECORD_HEADER_WIDTH {
            debug!("DLC block trailer: {remaining} bytes at offset {offset}");
            data.trailer = block[offset..].to_vec();
            break;
        }

        let mut header =
            WillowReader::new(Cursor::new(&block[offset..offset + RECORD_HEADER_WIDTH]), order);
        let id = header.read_i32()?;
        let len = header.read_i32()?;
        let body_start = offset + RECORD_HEADER_WIDTH;
        let available = block.len() - body_start;

        if len < 0 || len as usize > available {
            log.recover(
                format!("DLC section {id:#010x} and the sections after it"),
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("section declares {len} bytes, {available} remain in the DLC block"),
                ),
            )?;
            break;
        }

        let payload = &block[body_start..body_start + len as usize];
        offset = body_start + len as usize;

        let duplicate = data.records.iter().any(|record| record.id() == id);
        match decode_record(id, payload, order, revision, duplicate) {
            Ok(record) => {
                debug!(
                    "DLC section {id:#010x} ({}): {} bytes, {} raw",
                    record.name(),
                    payload.len(),
                    record.raw().len()
                );
                data.records.push(record);
            }
            Err(e) => log.recover(format!("DLC section {id:#010x}"), e)?,
        }
    }

    Ok(data)
}

fn decode_record(
    id: i32,
    payload: &[u8],
    order: ByteOrder,
    revision: i32,
    duplicate: bool,
) -> io::Result<DlcRecord> {
    if duplicate {
        return Ok(DlcRecord::Opaque(DlcSection {
            id,
            raw: payload.to_vec(),
        }));
    }

    let mut r = WillowReader::new(Cursor::new(payload), order);
    let record = match id {
        BANK_SECTION_ID => {
            let unknown1 = r.read_u8()?;
            let bank_size = r.read_i32()?;
            let entries = decode_bank_entries(&mut r)?;
            DlcRecord::Bank(BankSection {
                unknown1,
                bank_size,
                entries,
                raw: rest(&mut r, payload)?,
            })
        }
        FLAGS_SECTION_ID => DlcRecord::Flags(FlagsSection {
            unknown2: r.read_i32()?,
            unknown3: r.read_i32()?,
            unknown4: r.read_i32()?,
            skip_dlc2_intro: r.read_i32()?,
            raw: rest(&mut r, payload)?,
        }),
        TERTIARY_SECTION_ID => DlcRecord::Tertiary(TertiarySection {
            unknown5: r.read_u8()?,
            raw: rest(&mut r, payload)?,
        }),
        SECONDARY_PACK_SECTION_ID => {
            let enabled = r.read_u8()?;
            let items = decode_objects(&mut r, InventoryKind::Item, revision)?;
            let weapons = decode_objects(&mut r, InventoryKind::Weapon, revision)?;
            DlcRecord::SecondaryPack(SecondaryPackSection {
                enabled,
                items,
                weapons,
                raw: rest(&mut r, payload)?,
            })
        }
        _ => DlcRecord::Opaque(DlcSection {
            id,
            raw: payload.to_vec(),
        }),
    };
    Ok(record)
}

fn rest<R: Read + Seek>(r: &mut WillowReader<R>, payload: &[u8]) -> io::Result<Vec<u8>> {
    let pos = r.position()? as usize;
    Ok(payload[pos..].to_vec())
}

/// Encode the size-prefixed DLC block: known fields from current values,
/// each raw blob straight after them.
pub fn encode_dlc_block(w: &mut WillowWriter, dlc: &DlcData) -> io::Result<()> {
    let size_at = w.position();
    w.write_i32(0);

    for record in &dlc.records {
        w.write_i32(record.id());
        let len_at = w.position();
        w.write_i32(0);
        let body_start = w.position();

        match record {
            DlcRecord::Bank(s) => {
                w.write_u8(s.unknown1);
                w.write_i32(s.bank_size);
                encode_bank_entries(w, &s.entries)?;
            }
            DlcRecord::Flags(s) => {
                w.write_i32(s.unknown2);
                w.write_i32(s.unknown3);
                w.write_i32(s.unknown4);
                w.write_i32(s.skip_dlc2_intro);
            }
            DlcRecord::Tertiary(s) => w.write_u8(s.unknown5),
            DlcRecord::SecondaryPack(s) => {
                w.write_u8(s.enabled);
                encode_objects(w, &s.items, InventoryKind::Item)?;
                encode_objects(w, &s.weapons, InventoryKind::Weapon)?;
            }
            DlcRecord::Opaque(_) => {}
        }
        w.write_bytes(record.raw());

        let len = w.position() - body_start;
        w.patch_i32(len_at, len as i32);
    }
    w.write_bytes(&dlc.trailer);

    let size = w.position() - size_at - 4;
    w.patch_i32(size_at, size as i32);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_api::CoreErrorCode;
    use crate::inventory::{ENHANCED_REVISION, ITEM_PART_COUNT};

    fn encode(dlc: &DlcData, order: ByteOrder) -> Vec<u8> {
        let mut w = WillowWriter::new(order);
        encode_dlc_block(&mut w, dlc).expect("encode dlc");
        let bytes = w.into_bytes();
        bytes[4..].to_vec()
    }

    fn decode(block: &[u8], order: ByteOrder, auto_repair: bool) -> Result<(DlcData, RepairLog), CoreError> {
        let mut log = RepairLog::new(auto_repair);
        let data = decode_dlc_block(block, order, ENHANCED_REVISION, &mut log)?;
        Ok((data, log))
    }

    fn sample() -> DlcData {
        DlcData {
            records: vec![
                DlcRecord::Bank(BankSection {
                    unknown1: 1,
                    bank_size: 12,
                    entries: vec![InventoryObject::new(
                        InventoryKind::Item,
                        (0..ITEM_PART_COUNT).map(|i| format!("gd_shields.A.Part{i}")).collect(),
                        [1, 2, 0, 14, 0, 1],
                    )],
                    raw: vec![0xde, 0xad],
                }),
                DlcRecord::Opaque(DlcSection {
                    id: 0x0bad_f00d,
                    raw: vec![1, 2, 3],
                }),
                DlcRecord::Flags(FlagsSection {
                    unknown2: 0,
                    unknown3: 1,
                    unknown4: 0,
                    skip_dlc2_intro: 1,
                    raw: Vec::new(),
                }),
            ],
            trailer: Vec::new(),
        }
    }

    #[test]
    fn raw_blobs_return_to_their_original_position() {
        let dlc = sample();
        let block = encode(&dlc, ByteOrder::Big);
        let (decoded, log) = decode(&block, ByteOrder::Big, false).expect("decode");
        assert!(log.is_empty());
        assert_eq!(decoded, dlc);
        assert_eq!(encode(&decoded, ByteOrder::Big), block);
        assert_eq!(decoded.state(BANK_SECTION_ID), SectionState::PresentPartial);
        assert_eq!(decoded.state(FLAGS_SECTION_ID), SectionState::PresentKnown);
        assert_eq!(decoded.state(TERTIARY_SECTION_ID), SectionState::NotPresent);
    }

    #[test]
    fn discarding_raw_data_keeps_known_fields() {
        let mut dlc = sample();
        let dropped = dlc.discard_raw_data();
        assert_eq!(dropped, 2 + RECORD_HEADER_WIDTH + 3);
        assert_eq!(dlc.raw_len(), 0);
        assert_eq!(dlc.records.len(), 2);
        assert_eq!(dlc.bank_entries().len(), 1);
        assert_eq!(dlc.state(BANK_SECTION_ID), SectionState::PresentKnown);
    }

    #[test]
    fn bank_count_past_section_end_drops_only_that_section() {
        let mut block = encode(&sample(), ByteOrder::Little);
        // Bank payload: id, len, unknown1, bank_size, then the entry count.
        let count_at = RECORD_HEADER_WIDTH + 1 + 4;
        block[count_at..count_at + 4].copy_from_slice(&500i32.to_le_bytes());

        let err = decode(&block, ByteOrder::Little, false).expect_err("repair not authorised");
        assert_eq!(err.code, CoreErrorCode::RequiresRepair);

        let (decoded, log) = decode(&block, ByteOrder::Little, true).expect("repaired decode");
        assert_eq!(log.into_repairs().len(), 1);
        assert!(decoded.bank().is_none());
        assert!(decoded.flags().is_some());
        assert_eq!(decoded.records.len(), 2);
    }

    #[test]
    fn overlong_section_length_drops_the_rest_of_the_block() {
        let mut block = encode(&sample(), ByteOrder::Little);
        block[4..8].copy_from_slice(&10_000i32.to_le_bytes());
        let (decoded, log) = decode(&block, ByteOrder::Little, true).expect("repaired decode");
        assert!(decoded.is_empty());
        assert_eq!(log.into_repairs().len(), 1);
    }

    #[test]
    fn duplicate_known_id_is_kept_opaque() {
        let flags = FlagsSection {
            unknown2: 5,
            unknown3: 6,
            unknown4: 7,
            skip_dlc2_intro: 0,
            raw: Vec::new(),
        };
        let dlc = DlcData {
            records: vec![DlcRecord::Flags(flags.clone()), DlcRecord::Flags(flags)],
            trailer: Vec::new(),
        };
        let block = encode(&dlc, ByteOrder::Little);
        let (decoded, _) = decode(&block, ByteOrder::Little, false).expect("decode");
        assert!(matches!(decoded.records[1], DlcRecord::Opaque(_)));
        assert_eq!(encode(&decoded, ByteOrder::Little), block);
    }

    #[test]
    fn short_trailer_is_kept_as_raw_data() {
        for len in 1..RECORD_HEADER_WIDTH {
            let mut block = encode(&sample(), ByteOrder::Big);
            let trailer: Vec<u8> = (0..len as u8).map(|b| 0xC0 | b).collect();
            block.extend_from_slice(&trailer);

            let (decoded, log) = decode(&block, ByteOrder::Big, false).expect("trailer is not damage");
            assert!(log.is_empty());
            assert_eq!(decoded.trailer, trailer);
            assert_eq!(decoded.raw_len(), sample().raw_len() + len);
            assert_eq!(encode(&decoded, ByteOrder::Big), block);

            let mut stripped = decoded.clone();
            assert_eq!(stripped.discard_raw_data(), sample().discard_raw_data() + len);
            assert!(stripped.trailer.is_empty());
        }
    }

    #[test]
    fn empty_block_encodes_as_zero_size() {
        let mut w = WillowWriter::new(ByteOrder::Big);
        encode_dlc_block(&mut w, &DlcData::default()).expect("encode");
        assert_eq!(w.into_bytes(), vec![0, 0, 0, 0]);
    }
}
