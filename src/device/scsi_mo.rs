// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{
    cfg::enums::DeviceKind,
    control_block::mode_sense::{ALL_PAGES, ModePages},
    device::{DiskState, Identity, LogicalUnit},
};

pub const MO_SECTOR_SIZES: &[u32] = &[512, 2048];

/// Optical memory, reversible or erasable.
const MEDIUM_TYPE_OPTICAL: u8 = 0x03;
const OPTION_PAGE: u8 = 0x06;

/// Magneto-optical disk: removable and write-protectable.
#[derive(Debug)]
pub struct ScsiMo {
    state: DiskState,
}

impl ScsiMo {
    pub fn new() -> Self {
        Self {
            state: DiskState::new(MO_SECTOR_SIZES, 512)
                .removable(true)
                .protectable(true),
        }
    }
}

impl Default for ScsiMo {
    fn default() -> Self {
        Self::new()
    }
}

impl LogicalUnit for ScsiMo {
    fn kind(&self) -> DeviceKind {
        DeviceKind::ScsiMo
    }

    fn state(&self) -> &DiskState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut DiskState {
        &mut self.state
    }

    fn identity(&self) -> Identity {
        Identity {
            peripheral_type: 0x07,
            vendor: "FUJITSU",
            product: "M2513A",
            revision: "0100",
        }
    }

    fn medium_type(&self) -> u8 {
        MEDIUM_TYPE_OPTICAL
    }

    fn add_mode_pages(&self, page: u8, _changeable: bool, pages: &mut ModePages) -> bool {
        if page != OPTION_PAGE && page != ALL_PAGES {
            return false;
        }
        // Optical memory page: no option bits supported.
        pages.insert(OPTION_PAGE, vec![OPTION_PAGE, 0x02, 0x00, 0x00]);
        true
    }
}
