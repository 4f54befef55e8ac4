// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Boolean enumeration with string serialization support
///
/// Represents yes/no values with support for various string representations
/// including "Yes"/"No", "true"/"false", and "1"/"0".
#[derive(Deserialize, Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum YesNo {
    #[serde(
        rename = "Yes",
        alias = "yes",
        alias = "YES",
        alias = "true",
        alias = "True",
        alias = "1"
    )]
    Yes,
    #[default]
    #[serde(
        rename = "No",
        alias = "no",
        alias = "NO",
        alias = "false",
        alias = "False",
        alias = "0"
    )]
    No,
}
impl fmt::Display for YesNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            YesNo::Yes => "Yes",
            YesNo::No => "No",
        })
    }
}
impl From<bool> for YesNo {
    fn from(b: bool) -> Self {
        if b { YesNo::Yes } else { YesNo::No }
    }
}
impl YesNo {
    pub fn as_bool(self) -> bool {
        matches!(self, YesNo::Yes)
    }
}

/// Implementation behind the `Bus` trait.
#[derive(Deserialize, Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum BusBackend {
    /// In-memory bus; no initiator is connected unless a test scripts one.
    #[default]
    #[serde(rename = "Virtual", alias = "virtual", alias = "VIRTUAL")]
    Virtual,
}

/// Closed set of emulated device types.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// SASI hard disk (`.hdf`).
    SasiHd,
    /// Generic SCSI hard disk (`.hds`, `.hdi`, `.hda`).
    ScsiHd,
    /// SCSI hard disk presenting as a NEC drive (`.hdn`, `.nhd`).
    ScsiHdNec,
    /// SCSI hard disk presenting as an Apple-compatible drive.
    ScsiHdApple,
    /// Magneto-optical disk (`.mos`).
    ScsiMo,
    /// CD-ROM (`.iso`).
    ScsiCd,
    /// Host bridge (path `bridge`).
    HostBridge,
}

impl DeviceKind {
    /// Infers the device type from an image path the way the attach
    /// command does.
    pub fn from_path(path: &Path) -> Option<Self> {
        if path.as_os_str().eq_ignore_ascii_case("bridge") {
            return Some(DeviceKind::HostBridge);
        }
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Some(match ext.as_str() {
            "hdf" => DeviceKind::SasiHd,
            "hds" | "hdi" | "hda" => DeviceKind::ScsiHd,
            "hdn" | "nhd" => DeviceKind::ScsiHdNec,
            "mos" => DeviceKind::ScsiMo,
            "iso" => DeviceKind::ScsiCd,
            _ => return None,
        })
    }

    #[inline]
    pub fn is_sasi(self) -> bool {
        matches!(self, DeviceKind::SasiHd)
    }

    /// Whether the device reads and writes an image file.
    #[inline]
    pub fn needs_image(self) -> bool {
        !matches!(self, DeviceKind::HostBridge)
    }

    /// Four-letter tag shown by the device listing.
    pub fn tag(self) -> &'static str {
        match self {
            DeviceKind::SasiHd => "SAHD",
            DeviceKind::ScsiHd => "SCHD",
            DeviceKind::ScsiHdNec => "SCHN",
            DeviceKind::ScsiHdApple => "SCHA",
            DeviceKind::ScsiMo => "SCMO",
            DeviceKind::ScsiCd => "SCCD",
            DeviceKind::HostBridge => "SCBR",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
