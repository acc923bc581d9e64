//! Reading, writing, repairing and re-targeting Willow (`WSG`) save games.

pub mod byte_order;
pub mod container;
pub mod core_api;
pub mod dlc;
pub mod inventory;
pub mod layout;
pub mod platform;
pub mod reader;
pub mod repair;
pub mod save;
pub mod sections;
pub mod writer;

pub use byte_order::ByteOrder;
pub use core_api::{CoreError, CoreErrorCode, Engine, Snapshot};
pub use inventory::{InventoryKind, InventoryObject};
pub use platform::{Platform, PlatformIdentity};
pub use save::{DecodeOptions, Loaded, SaveGame};
