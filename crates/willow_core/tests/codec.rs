mod common;

use willow_core::core_api::CoreErrorCode;
use willow_core::dlc::{DlcRecord, SectionState, TERTIARY_SECTION_ID};
use willow_core::layout::SectionId;
use willow_core::{ByteOrder, DecodeOptions, Engine, InventoryKind, Platform, SaveGame};

use common::{sample_save, save_with_raw_data};

fn decode(bytes: &[u8]) -> SaveGame {
    Engine::new()
        .deserialize(bytes)
        .expect("failed to decode encoded save")
        .save
}

#[test]
fn clean_save_round_trips() {
    let engine = Engine::new();
    let save = sample_save(Platform::Pc);

    let bytes = engine.serialize(&save).expect("encode");
    let loaded = engine.deserialize(&bytes).expect("decode");

    assert!(!loaded.required_repair);
    assert!(loaded.repairs.is_empty());
    assert_eq!(loaded.save, save);
    assert_eq!(engine.serialize(&loaded.save).expect("re-encode"), bytes);
}

#[test]
fn big_endian_save_round_trips_and_is_tagged_ps3() {
    let save = sample_save(Platform::Ps3);
    let bytes = save.to_bytes().expect("encode");
    assert_eq!(&bytes[3..7], &2i32.to_be_bytes());

    let decoded = decode(&bytes);
    assert_eq!(decoded.platform, Platform::Ps3);
    assert_eq!(decoded.byte_order(), ByteOrder::Big);
    assert_eq!(decoded, save);
}

#[test]
fn byte_orders_differ_only_in_encoding() {
    let little = sample_save(Platform::Pc).to_bytes().expect("encode LE");
    let big = sample_save(Platform::Ps3).to_bytes().expect("encode BE");

    assert_eq!(little.len(), big.len());
    assert_ne!(little, big);

    let mut from_little = decode(&little);
    let from_big = decode(&big);
    from_little.platform = Platform::Ps3;
    assert_eq!(from_little, from_big);
}

#[test]
fn partial_sections_are_re_emitted_byte_for_byte() {
    let save = save_with_raw_data(Platform::Pc);
    let bytes = save.to_bytes().expect("encode");

    let decoded = decode(&bytes);
    assert_eq!(decoded, save);
    assert_eq!(decoded.to_bytes().expect("re-encode"), bytes);

    assert_eq!(decoded.dlc.state(TERTIARY_SECTION_ID), SectionState::PresentPartial);
    assert_eq!(decoded.dlc.tertiary().map(|t| t.raw.clone()), Some(vec![0xDE, 0xAD, 0xBE]));
    assert!(matches!(decoded.dlc.records.last(), Some(DlcRecord::Opaque(s)) if s.id == 0x1111_2222));
    assert_eq!(decoded.tail, vec![0xAA, 0xBB]);
    assert!(decoded.has_raw_data());
}

#[test]
fn discarding_raw_data_keeps_known_fields() {
    let mut save = save_with_raw_data(Platform::Pc);
    let dropped = Engine::new().discard_raw_data(&mut save);

    // 3 tertiary bytes, an 8-byte header plus 5 opaque bytes, 2 tail bytes.
    assert_eq!(dropped, 18);
    assert!(!save.has_raw_data());
    assert_eq!(save, sample_save(Platform::Pc));
    assert_eq!(save.discard_raw_data(), 0);
}

#[test]
fn older_revisions_are_written_in_the_enhanced_format() {
    let mut save = sample_save(Platform::Pc);
    save.revision = 0x22;

    let decoded = decode(&save.to_bytes().expect("encode"));
    assert_eq!(decoded.revision, 0x27);
    assert_eq!(decoded.items, save.items);
}

#[test]
fn save_without_challenges_or_dlc_round_trips() {
    let mut save = sample_save(Platform::Pc);
    save.challenges = None;
    save.dlc.records.clear();

    let decoded = decode(&save.to_bytes().expect("encode"));
    assert_eq!(decoded, save);
    assert_eq!(decoded.dlc.state(TERTIARY_SECTION_ID), SectionState::NotPresent);
}

#[test]
fn objects_filter_by_kind() {
    let save = sample_save(Platform::Pc);
    assert_eq!(save.objects(InventoryKind::Weapon).count(), save.weapons.len());
    assert_eq!(save.objects(InventoryKind::Item).count(), save.items.len());
    assert_eq!(
        save.objects(InventoryKind::Any).count(),
        save.items.len() + save.weapons.len()
    );
}

#[test]
fn layout_covers_every_byte() {
    let bytes = save_with_raw_data(Platform::Pc).to_bytes().expect("encode");
    let loaded = Engine::new().deserialize(&bytes).expect("decode");

    loaded.layout.validate().expect("layout must cover the file");
    assert_eq!(loaded.layout.file_len, bytes.len());

    let ids: Vec<SectionId> = loaded.layout.sections.iter().map(|s| s.id).collect();
    assert_eq!(ids.first(), Some(&SectionId::Header));
    assert_eq!(ids.last(), Some(&SectionId::Tail));
    assert_eq!(
        loaded.layout.section(SectionId::Tail).map(|s| s.range.len()),
        Some(2)
    );
}

#[test]
fn header_errors_are_reported_by_kind() {
    let bytes = sample_save(Platform::Pc).to_bytes().expect("encode");
    let engine = Engine::new();

    let mut bad_magic = bytes.clone();
    bad_magic[0] = b'X';
    assert_eq!(
        engine.deserialize(&bad_magic).expect_err("bad magic").code,
        CoreErrorCode::InvalidSaveHeader
    );

    let mut bad_marker = bytes.clone();
    bad_marker[7..11].copy_from_slice(b"PLYX");
    assert_eq!(
        engine.deserialize(&bad_marker).expect_err("bad marker").code,
        CoreErrorCode::InvalidSaveHeader
    );

    let mut future = bytes.clone();
    future[11..15].copy_from_slice(&0x30i32.to_le_bytes());
    assert_eq!(
        engine.deserialize(&future).expect_err("future revision").code,
        CoreErrorCode::UnsupportedRevision
    );

    assert_eq!(
        engine.deserialize(&bytes[..20]).expect_err("truncated").code,
        CoreErrorCode::TruncatedStream
    );
}

#[test]
fn snapshot_summarises_the_save() {
    let engine = Engine::with_options(DecodeOptions::default());
    let save = save_with_raw_data(Platform::Pc);
    let snapshot = engine.snapshot(&save);

    assert_eq!(snapshot.character_name, "Rölånd");
    assert_eq!(snapshot.level, 34);
    assert_eq!(snapshot.item_count, 2);
    assert_eq!(snapshot.weapon_count, 2);
    assert_eq!(snapshot.bank_entry_count, 2);
    assert_eq!(snapshot.challenge_count, 2);
    assert_eq!(snapshot.dlc_sections.len(), 5);
    assert_eq!(snapshot.dlc_sections[2].state, SectionState::PresentPartial);
    assert_eq!(snapshot.raw_data_len, save.raw_data_len());
    assert!(snapshot.finished_playthrough1);
    assert!(!snapshot.has_identity);
}
