// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{
    cfg::enums::DeviceKind,
    control_block::mode_sense::{ALL_PAGES, ModePages},
    device::{DiskState, Identity, LogicalUnit},
};

pub const HD_SECTOR_SIZES: &[u32] = &[512, 1024, 2048, 4096];
pub const NEC_SECTOR_SIZES: &[u32] = &[512];

/// Apple vendor page (0x30), 30 bytes.
const APPLE_PAGE: u8 = 0x30;
const APPLE_PAGE_LEN: usize = 30;
const APPLE_SIGNATURE: &[u8; 20] = b"APPLE COMPUTER, INC.";

/// Vendor personality of a SCSI hard disk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum HdFlavor {
    #[default]
    Generic,
    /// Fixed 512-byte sectors, NEC identification.
    Nec,
    /// Adds the vendor page Apple formatters look for.
    Apple,
}

/// SCSI direct-access disk.
#[derive(Debug)]
pub struct ScsiHd {
    state: DiskState,
    flavor: HdFlavor,
}

impl ScsiHd {
    pub fn new(flavor: HdFlavor) -> Self {
        let state = match flavor {
            HdFlavor::Nec => DiskState::new(NEC_SECTOR_SIZES, 512),
            _ => DiskState::new(HD_SECTOR_SIZES, 512),
        };
        Self {
            state: state.protectable(true),
            flavor,
        }
    }

    pub fn flavor(&self) -> HdFlavor {
        self.flavor
    }
}

impl LogicalUnit for ScsiHd {
    fn kind(&self) -> DeviceKind {
        match self.flavor {
            HdFlavor::Generic => DeviceKind::ScsiHd,
            HdFlavor::Nec => DeviceKind::ScsiHdNec,
            HdFlavor::Apple => DeviceKind::ScsiHdApple,
        }
    }

    fn state(&self) -> &DiskState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut DiskState {
        &mut self.state
    }

    fn identity(&self) -> Identity {
        let (vendor, product) = match self.flavor {
            HdFlavor::Generic => ("RSSCSI", "HARDDISK"),
            HdFlavor::Nec => ("NEC", "D3126"),
            HdFlavor::Apple => ("QUANTUM", "FIREBALL"),
        };
        Identity {
            peripheral_type: 0x00,
            vendor,
            product,
            revision: "0100",
        }
    }

    fn add_mode_pages(&self, page: u8, changeable: bool, pages: &mut ModePages) -> bool {
        if self.flavor != HdFlavor::Apple || (page != APPLE_PAGE && page != ALL_PAGES) {
            return false;
        }
        let mut buf = vec![0u8; APPLE_PAGE_LEN];
        buf[0] = APPLE_PAGE;
        buf[1] = (APPLE_PAGE_LEN - 2) as u8;
        if !changeable {
            buf[0x0A..0x0A + APPLE_SIGNATURE.len()].copy_from_slice(APPLE_SIGNATURE);
        }
        pages.insert(APPLE_PAGE, buf);
        true
    }
}
