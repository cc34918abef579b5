//! Storage volumes the local index reads from

use crate::snapshot::ALL_VOLUMES;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Backend name of the primary (built-in) volume
pub const PRIMARY_VOLUME: &str = "primary";

/// Instance id of the undivided local provider
pub const UNDIVIDED_INSTANCE_ID: i64 = 0;

/// Mount state reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeState {
    Mounted,
    MountedReadOnly,
    Checking,
    Unmounted,
    Ejecting,
    Removed,
}

impl VolumeState {
    /// States in which the volume content can be read
    pub fn is_readable(&self) -> bool {
        matches!(self, VolumeState::Mounted | VolumeState::MountedReadOnly)
    }
}

/// A storage volume (internal storage, SD card, USB drive)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageVolume {
    /// Platform name (filesystem uuid); `None` for unnamed volumes
    pub name: Option<String>,
    pub description: String,
    pub path: PathBuf,
    pub state: VolumeState,
    pub primary: bool,
}

impl StorageVolume {
    pub fn new(
        name: Option<&str>,
        description: impl Into<String>,
        path: impl Into<PathBuf>,
        state: VolumeState,
        primary: bool,
    ) -> Self {
        Self {
            name: name.map(str::to_string),
            description: description.into(),
            path: path.into(),
            state,
            primary,
        }
    }

    /// Name used in local identifiers
    ///
    /// The primary volume is always [`PRIMARY_VOLUME`]; other volumes use
    /// their platform name, and unnamed ones have none. A platform name
    /// equal to the all-volumes authority is not addressable either.
    pub fn backend_name(&self) -> Option<&str> {
        if self.primary {
            Some(PRIMARY_VOLUME)
        } else {
            self.name
                .as_deref()
                .filter(|n| !n.is_empty() && *n != ALL_VOLUMES)
        }
    }

    /// Readable and addressable
    pub fn is_eligible(&self) -> bool {
        self.state.is_readable() && self.backend_name().is_some()
    }

    /// Absolute path of a file given relative to the volume root
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.path.join(Path::new(relative.trim_start_matches('/')))
    }
}

/// Stable provider instance id of a volume
///
/// First 8 bytes of the SHA-256 of the backend name, read big-endian.
/// Never equals [`UNDIVIDED_INSTANCE_ID`].
pub fn volume_instance_id(backend_name: &str) -> i64 {
    let digest = Sha256::digest(backend_name.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    match i64::from_be_bytes(bytes) {
        UNDIVIDED_INSTANCE_ID => 1,
        id => id,
    }
}
