// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Logical units: the closed set of emulated device types and the
//! attributes they share.

use std::io;

use enum_dispatch::enum_dispatch;
use thiserror::Error;

use crate::{
    cfg::enums::DeviceKind,
    control_block::{CommandContext, Outcome, ScsiError, mode_sense::ModePages},
    models::opcode::ScsiOpcode,
};

/// Builds a unit from its configuration.
pub mod factory;
/// Host bridge (processor device with a loopback message queue).
pub mod host_bridge;
/// SASI hard disk.
pub mod sasi_hd;
/// SCSI CD-ROM.
pub mod scsi_cd;
/// SCSI hard disk and its vendor flavours.
pub mod scsi_hd;
/// SCSI magneto-optical disk.
pub mod scsi_mo;
/// State shared by every unit.
pub mod state;
/// Image backing stores.
pub mod storage;

pub use host_bridge::HostBridge;
pub use sasi_hd::SasiHd;
pub use scsi_cd::ScsiCd;
pub use scsi_hd::{HdFlavor, ScsiHd};
pub use scsi_mo::ScsiMo;
pub use state::DiskState;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("sector size {size} not supported (allowed: {allowed:?})")]
    UnsupportedSectorSize { size: u32, allowed: &'static [u32] },
    #[error("{0} needs an image file")]
    MissingImage(DeviceKind),
    #[error("cannot infer device type")]
    UnknownKind,
    #[error("medium is not removable")]
    NotRemovable,
    #[error("a medium is already inserted")]
    MediumPresent,
    #[error("image I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Which opcodes a unit answers before device-specific handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSet {
    /// SASI disk commands only.
    Sasi,
    /// SCSI direct-access / optical block commands.
    Block,
    /// Processor device: identification and sense only.
    Processor,
}

impl CommandSet {
    pub fn accepts(self, op: ScsiOpcode) -> bool {
        use ScsiOpcode::*;
        match self {
            CommandSet::Sasi => matches!(
                op,
                TestUnitReady
                    | Rezero
                    | RequestSense
                    | FormatUnit
                    | FormatTrack
                    | ReassignBlocks
                    | Read6
                    | Write6
                    | Seek6
                    | Assign
                    | Specify
            ),
            CommandSet::Block => !matches!(op, FormatTrack | Assign | Specify | ReadToc),
            CommandSet::Processor => matches!(
                op,
                TestUnitReady | RequestSense | Inquiry | ReportLuns | SendDiagnostic
            ),
        }
    }
}

/// Strings and peripheral type reported by INQUIRY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub peripheral_type: u8,
    pub vendor: &'static str,
    pub product: &'static str,
    pub revision: &'static str,
}

/// Capabilities the dispatcher and controller use on every unit.
#[enum_dispatch]
pub trait LogicalUnit {
    fn kind(&self) -> DeviceKind;

    fn state(&self) -> &DiskState;

    fn state_mut(&mut self) -> &mut DiskState;

    fn identity(&self) -> Identity;

    fn command_set(&self) -> CommandSet {
        CommandSet::Block
    }

    /// MODE SENSE medium-type byte.
    fn medium_type(&self) -> u8 {
        0x00
    }

    /// Adds device-specific mode pages matching `page`; returns whether
    /// any was added.
    fn add_mode_pages(&self, _page: u8, _changeable: bool, _pages: &mut ModePages) -> bool {
        false
    }

    /// Handles opcodes the common table does not know or that this device
    /// overloads. `None` falls through to the common table.
    fn dispatch_specific(
        &mut self,
        _ctx: &CommandContext,
    ) -> Option<Result<Outcome, ScsiError>> {
        None
    }
}

/// One attached logical unit.
#[enum_dispatch(LogicalUnit)]
#[derive(Debug)]
pub enum Device {
    SasiHd(SasiHd),
    ScsiHd(ScsiHd),
    ScsiMo(ScsiMo),
    ScsiCd(ScsiCd),
    HostBridge(HostBridge),
}

impl Device {
    #[inline]
    pub fn is_sasi(&self) -> bool {
        self.kind().is_sasi()
    }

    /// Administrative eject; see [`DiskState::eject`].
    pub fn eject(&mut self, force: bool) -> bool {
        self.state_mut().eject(force)
    }

    pub fn flush_cache(&mut self) {
        self.state_mut().flush_cache();
    }
}
