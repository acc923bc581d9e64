//! Identity extraction from Xbox 360 "CON" content packages.
//!
//! Only the fixed-offset package metadata is read; the file table and the
//! payload are never touched.

use std::io::{self, Cursor};

use serde::{Deserialize, Serialize};

use crate::byte_order::ByteOrder;
use crate::core_api::{CoreError, CoreErrorCode};
use crate::platform::PlatformIdentity;
use crate::reader::WillowReader;

pub const CONTAINER_MAGIC: &[u8; 3] = b"CON";

const CONTENT_TYPE_OFFSET: u64 = 0x344;
const TITLE_ID_OFFSET: u64 = 0x360;
const CONSOLE_ID_OFFSET: u64 = 0x36C;
const PROFILE_ID_OFFSET: u64 = 0x371;
const DEVICE_ID_OFFSET: u64 = 0x3FD;

pub const CONSOLE_ID_LEN: usize = 5;
pub const DEVICE_ID_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerHeader {
    pub content_type: u32,
    pub title_id: u32,
    pub console_id: Vec<u8>,
    pub profile_id: u64,
    pub device_id: Vec<u8>,
}

impl ContainerHeader {
    pub fn identity(&self) -> PlatformIdentity {
        PlatformIdentity {
            profile_id: self.profile_id,
            device_id: self.device_id.clone(),
        }
    }
}

pub fn parse_container_header(bytes: &[u8]) -> Result<ContainerHeader, CoreError> {
    if !bytes.starts_with(CONTAINER_MAGIC) {
        let found = &bytes[..bytes.len().min(CONTAINER_MAGIC.len())];
        return Err(CoreError::new(
            CoreErrorCode::InvalidContainerMagic,
            format!(
                "not an Xbox 360 container: expected {:?}, found {:?}",
                String::from_utf8_lossy(CONTAINER_MAGIC),
                String::from_utf8_lossy(found)
            ),
        ));
    }

    read_header(bytes).map_err(|e| CoreError::from(e).context("container header"))
}

fn read_header(bytes: &[u8]) -> io::Result<ContainerHeader> {
    // Package metadata is big-endian on every platform.
    let mut r = WillowReader::new(Cursor::new(bytes), ByteOrder::Big);

    r.seek_to(CONTENT_TYPE_OFFSET)?;
    let content_type = r.read_u32()?;
    r.seek_to(TITLE_ID_OFFSET)?;
    let title_id = r.read_u32()?;
    r.seek_to(CONSOLE_ID_OFFSET)?;
    let console_id = r.read_bytes(CONSOLE_ID_LEN)?;
    r.seek_to(PROFILE_ID_OFFSET)?;
    let profile_id = r.read_u64()?;
    r.seek_to(DEVICE_ID_OFFSET)?;
    let device_id = r.read_bytes(DEVICE_ID_LEN)?;

    Ok(ContainerHeader {
        content_type,
        title_id,
        console_id,
        profile_id,
        device_id,
    })
}
