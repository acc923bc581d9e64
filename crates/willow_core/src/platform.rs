use std::fmt;
use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::byte_order::ByteOrder;
use crate::container::parse_container_header;
use crate::core_api::{CoreError, CoreErrorCode};
use crate::save::SaveGame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Pc,
    Ps3,
    X360,
    X360Jp,
}

impl Platform {
    pub const ALL: [Platform; 4] = [Self::Pc, Self::Ps3, Self::X360, Self::X360Jp];

    pub fn byte_order(&self) -> ByteOrder {
        match *self {
            Self::Pc => ByteOrder::Little,
            Self::Ps3 | Self::X360 | Self::X360Jp => ByteOrder::Big,
        }
    }

    pub fn requires_identity(&self) -> bool {
        matches!(*self, Self::X360 | Self::X360Jp)
    }

    /// The platform assumed for a bare save of the given byte order.
    pub fn default_for(order: ByteOrder) -> Self {
        match order {
            ByteOrder::Little => Self::Pc,
            ByteOrder::Big => Self::Ps3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Pc => "PC",
            Self::Ps3 => "PS3",
            Self::X360 => "X360",
            Self::X360Jp => "X360JP",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Xbox profile and device identifiers taken from a content package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformIdentity {
    pub profile_id: u64,
    pub device_id: Vec<u8>,
}

impl fmt::Display for PlatformIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "profile {:016X}, device ", self.profile_id)?;
        for b in &self.device_id {
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

pub fn resolve_xbox_identity(container_path: &Path) -> Result<PlatformIdentity, CoreError> {
    let bytes = fs::read(container_path).map_err(|e| {
        CoreError::new(
            CoreErrorCode::Io,
            format!("failed to read {}: {e}", container_path.display()),
        )
    })?;
    let header = parse_container_header(&bytes)
        .map_err(|e| e.context(&container_path.display().to_string()))?;
    Ok(header.identity())
}

/// Retarget a save. A byte-order change is refused while uninterpreted
/// bytes remain. Xbox targets keep the attached identity or take one from
/// `container`.
pub fn select_platform(
    save: &mut SaveGame,
    target: Platform,
    container: Option<&Path>,
) -> Result<(), CoreError> {
    let raw = save.raw_data_len();
    if target.byte_order() != save.byte_order() && raw > 0 {
        return Err(CoreError::new(
            CoreErrorCode::RawDataPresentOnConversion,
            format!(
                "{raw} bytes of uninterpreted data cannot be converted from {} to {}; discard raw data first",
                save.platform, target
            ),
        ));
    }

    let identity = if target.requires_identity() {
        match (save.identity.take(), container) {
            (Some(identity), _) => Some(identity),
            (None, Some(path)) => Some(resolve_xbox_identity(path)?),
            (None, None) => {
                return Err(CoreError::new(
                    CoreErrorCode::MissingPlatformIdentity,
                    format!("{target} saves need a profile/device identity; supply a container file"),
                ));
            }
        }
    } else {
        None
    };

    info!("retargeting save from {} to {target}", save.platform);
    save.platform = target;
    save.identity = identity;
    Ok(())
}
