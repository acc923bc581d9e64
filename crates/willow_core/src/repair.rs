use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::core_api::{CoreError, CoreErrorCode};
use crate::inventory::{
    InventoryObject, SLOT_EQUIPPED, SLOT_JUNK, SLOT_LEVEL, SLOT_LOCKED, SLOT_QUALITY,
    SLOT_QUANTITY,
};
use crate::save::SaveGame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepairState {
    Clean,
    RequiresRepair,
    Repaired,
}

/// One subtraction made by the repair engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repair {
    pub unit: String,
    pub reason: String,
}

impl fmt::Display for Repair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "discarded {}: {}", self.unit, self.reason)
    }
}

/// Collects decode-time damage. With repair authorised the damaged unit is
/// dropped and noted; otherwise the first finding aborts the decode.
#[derive(Debug)]
pub struct RepairLog {
    auto_repair: bool,
    repairs: Vec<Repair>,
}

impl RepairLog {
    pub fn new(auto_repair: bool) -> Self {
        Self {
            auto_repair,
            repairs: Vec::new(),
        }
    }

    pub fn auto_repair(&self) -> bool {
        self.auto_repair
    }

    pub fn recover(&mut self, unit: impl Into<String>, err: impl Into<CoreError>) -> Result<(), CoreError> {
        let unit = unit.into();
        let err = err.into();
        if !err.is_repairable() {
            return Err(err.context(&unit));
        }
        if !self.auto_repair {
            return Err(CoreError::new(
                CoreErrorCode::RequiresRepair,
                format!("{unit}: {}", err.message),
            ));
        }

        let repair = Repair {
            unit,
            reason: err.message,
        };
        warn!("{repair}");
        self.repairs.push(repair);
        Ok(())
    }

    pub fn extend(&mut self, repairs: Vec<Repair>) {
        self.repairs.extend(repairs);
    }

    pub fn is_empty(&self) -> bool {
        self.repairs.is_empty()
    }

    pub fn into_repairs(self) -> Vec<Repair> {
        self.repairs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectLocation {
    BackpackItems,
    BackpackWeapons,
    SecondaryPackItems,
    SecondaryPackWeapons,
    Bank,
}

impl ObjectLocation {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::BackpackItems => "backpack item",
            Self::BackpackWeapons => "backpack weapon",
            Self::SecondaryPackItems => "secondary pack item",
            Self::SecondaryPackWeapons => "secondary pack weapon",
            Self::Bank => "bank entry",
        }
    }

    fn is_bank(&self) -> bool {
        *self == Self::Bank
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub location: ObjectLocation,
    pub index: usize,
    pub reason: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.location.as_str(), self.index, self.reason)
    }
}

/// Check one object against its shape and the value domains of the place
/// it is stored. Returns the first problem found.
pub fn object_issue(object: &InventoryObject, location: ObjectLocation) -> Option<String> {
    if !object.is_well_formed() {
        return Some(format!(
            "{} parts do not match a {} ({:?} expected)",
            object.parts.len(),
            object.kind,
            object.kind.part_count()
        ));
    }

    let v = &object.values;
    for (slot, name) in [(SLOT_QUALITY, "quality"), (SLOT_LEVEL, "level")] {
        if i16::try_from(v[slot]).is_err() {
            return Some(format!("{name} {} overflows 16 bits", v[slot]));
        }
    }
    for (slot, name) in [(SLOT_JUNK, "junk"), (SLOT_LOCKED, "locked")] {
        if !(0..=1).contains(&v[slot]) {
            return Some(format!("{name} flag {} is not 0 or 1", v[slot]));
        }
    }
    if v[SLOT_QUANTITY] < 0 {
        return Some(format!("negative quantity {}", v[SLOT_QUANTITY]));
    }
    if v[SLOT_EQUIPPED] < 0 {
        return Some(format!("negative equipped slot {}", v[SLOT_EQUIPPED]));
    }
    if location.is_bank() && u8::try_from(v[SLOT_EQUIPPED]).is_err() {
        return Some(format!("equipped slot {} overflows 8 bits", v[SLOT_EQUIPPED]));
    }
    None
}

fn object_lists(save: &SaveGame) -> Vec<(ObjectLocation, &[InventoryObject])> {
    let mut lists = vec![
        (ObjectLocation::BackpackItems, save.items.as_slice()),
        (ObjectLocation::BackpackWeapons, save.weapons.as_slice()),
        (ObjectLocation::Bank, save.dlc.bank_entries()),
    ];
    if let Some(pack) = save.dlc.secondary_pack() {
        lists.push((ObjectLocation::SecondaryPackItems, pack.items.as_slice()));
        lists.push((ObjectLocation::SecondaryPackWeapons, pack.weapons.as_slice()));
    }
    lists
}

/// Post-decode validation over every inventory object in the save.
pub fn validate(save: &SaveGame) -> Vec<Issue> {
    let mut issues = Vec::new();
    for (location, objects) in object_lists(save) {
        for (index, object) in objects.iter().enumerate() {
            if let Some(reason) = object_issue(object, location) {
                issues.push(Issue {
                    location,
                    index,
                    reason,
                });
            }
        }
    }
    issues
}

pub fn assess(save: &SaveGame) -> RepairState {
    if validate(save).is_empty() {
        RepairState::Clean
    } else {
        RepairState::RequiresRepair
    }
}

fn prune(objects: &mut Vec<InventoryObject>, location: ObjectLocation, out: &mut Vec<Repair>) {
    let mut index = 0usize;
    objects.retain(|object| {
        let current = index;
        index += 1;
        match object_issue(object, location) {
            Some(reason) => {
                let repair = Repair {
                    unit: format!("{} {current}", location.as_str()),
                    reason,
                };
                warn!("{repair}");
                out.push(repair);
                false
            }
            None => true,
        }
    });
}

/// Remove every invalid object, and nothing else. A clean save comes back
/// untouched with an empty list.
pub fn repair(save: &mut SaveGame) -> Vec<Repair> {
    let mut repairs = Vec::new();
    prune(&mut save.items, ObjectLocation::BackpackItems, &mut repairs);
    prune(&mut save.weapons, ObjectLocation::BackpackWeapons, &mut repairs);
    if let Some(bank) = save.dlc.bank_mut() {
        prune(&mut bank.entries, ObjectLocation::Bank, &mut repairs);
    }
    if let Some(pack) = save.dlc.secondary_pack_mut() {
        prune(&mut pack.items, ObjectLocation::SecondaryPackItems, &mut repairs);
        prune(&mut pack.weapons, ObjectLocation::SecondaryPackWeapons, &mut repairs);
    }
    repairs
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::inventory::{ITEM_PART_COUNT, InventoryKind, WEAPON_PART_COUNT};

    fn object(kind: InventoryKind, parts: usize, values: [i32; 6]) -> InventoryObject {
        InventoryObject::new(kind, vec!["None".to_string(); parts], values)
    }

    #[test]
    fn well_formed_objects_pass() {
        let weapon = object(InventoryKind::Weapon, WEAPON_PART_COUNT, [0, 5, 0, 3, 0, 0]);
        assert_eq!(object_issue(&weapon, ObjectLocation::BackpackWeapons), None);
    }

    #[test]
    fn shape_and_domain_violations_are_reported() {
        let cases = [
            object(InventoryKind::Item, 11, [0; 6]),
            object(InventoryKind::Unknown, ITEM_PART_COUNT, [0; 6]),
            object(InventoryKind::Item, ITEM_PART_COUNT, [1, 40_000, 0, 1, 0, 0]),
            object(InventoryKind::Item, ITEM_PART_COUNT, [1, 0, 0, 1, 2, 0]),
            object(InventoryKind::Item, ITEM_PART_COUNT, [-1, 0, 0, 1, 0, 0]),
        ];
        for case in &cases {
            assert!(object_issue(case, ObjectLocation::BackpackItems).is_some(), "{case:?}");
        }
    }

    #[test]
    fn bank_equipped_slot_is_limited_to_a_byte() {
        let entry = object(InventoryKind::Item, ITEM_PART_COUNT, [1, 0, 300, 1, 0, 0]);
        assert_eq!(object_issue(&entry, ObjectLocation::BackpackItems), None);
        assert!(object_issue(&entry, ObjectLocation::Bank).is_some());
    }

    #[test]
    fn log_without_authorisation_signals_requires_repair() {
        let mut log = RepairLog::new(false);
        let err = log
            .recover("bank", io::Error::new(io::ErrorKind::UnexpectedEof, "short"))
            .expect_err("must not repair");
        assert_eq!(err.code, CoreErrorCode::RequiresRepair);
        assert!(log.is_empty());
    }

    #[test]
    fn log_never_swallows_non_repairable_errors() {
        let mut log = RepairLog::new(true);
        let err = log
            .recover(
                "bank",
                CoreError::new(CoreErrorCode::UnsupportedRevision, "revision 99"),
            )
            .expect_err("not repairable");
        assert_eq!(err.code, CoreErrorCode::UnsupportedRevision);
    }
}
