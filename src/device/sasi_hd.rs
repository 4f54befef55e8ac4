// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{
    cfg::enums::DeviceKind,
    device::{CommandSet, DiskState, Identity, LogicalUnit},
};

pub const SASI_SECTOR_SIZES: &[u32] = &[256, 1024];

/// SASI hard disk. Speaks the reduced SASI command set and never reports
/// itself through INQUIRY.
#[derive(Debug)]
pub struct SasiHd {
    state: DiskState,
}

impl SasiHd {
    pub fn new() -> Self {
        Self {
            state: DiskState::new(SASI_SECTOR_SIZES, 256),
        }
    }
}

impl Default for SasiHd {
    fn default() -> Self {
        Self::new()
    }
}

impl LogicalUnit for SasiHd {
    fn kind(&self) -> DeviceKind {
        DeviceKind::SasiHd
    }

    fn state(&self) -> &DiskState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut DiskState {
        &mut self.state
    }

    fn identity(&self) -> Identity {
        Identity {
            peripheral_type: 0x00,
            vendor: "SASI",
            product: "HARDDISK",
            revision: "0100",
        }
    }

    fn command_set(&self) -> CommandSet {
        CommandSet::Sasi
    }
}
