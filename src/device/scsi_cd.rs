// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{
    cfg::enums::DeviceKind,
    control_block::{
        CommandContext, Outcome, ScsiError,
        mode_sense::{ALL_PAGES, ModePages},
        read_toc,
    },
    device::{DiskState, Identity, LogicalUnit},
    models::opcode::ScsiOpcode,
};

pub const CD_SECTOR_SIZES: &[u32] = &[512, 2048];

const CDROM_PAGE: u8 = 0x0D;
const CDDA_PAGE: u8 = 0x0E;

/// Read-only CD-ROM with a single data track.
#[derive(Debug)]
pub struct ScsiCd {
    state: DiskState,
}

impl ScsiCd {
    pub fn new() -> Self {
        Self {
            state: DiskState::new(CD_SECTOR_SIZES, 2048)
                .removable(true)
                .read_only(true),
        }
    }
}

impl Default for ScsiCd {
    fn default() -> Self {
        Self::new()
    }
}

impl LogicalUnit for ScsiCd {
    fn kind(&self) -> DeviceKind {
        DeviceKind::ScsiCd
    }

    fn state(&self) -> &DiskState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut DiskState {
        &mut self.state
    }

    fn identity(&self) -> Identity {
        Identity {
            peripheral_type: 0x05,
            vendor: "RSSCSI",
            product: "CD-ROM",
            revision: "0100",
        }
    }

    fn add_mode_pages(&self, page: u8, changeable: bool, pages: &mut ModePages) -> bool {
        let mut added = false;
        if page == CDROM_PAGE || page == ALL_PAGES {
            let mut buf = vec![0u8; 8];
            buf[0] = CDROM_PAGE;
            buf[1] = 0x06;
            if !changeable {
                // inactivity timer 2 s, 60 S-units per M, 75 F-units per S
                buf[3] = 0x05;
                buf[5] = 60;
                buf[7] = 75;
            }
            pages.insert(CDROM_PAGE, buf);
            added = true;
        }
        if page == CDDA_PAGE || page == ALL_PAGES {
            let mut buf = vec![0u8; 16];
            buf[0] = CDDA_PAGE;
            buf[1] = 0x0E;
            if !changeable {
                // audio play returns immediately
                buf[2] = 0x04;
            }
            pages.insert(CDDA_PAGE, buf);
            added = true;
        }
        added
    }

    fn dispatch_specific(
        &mut self,
        ctx: &CommandContext,
    ) -> Option<Result<Outcome, ScsiError>> {
        (ctx.opcode() == u8::from(ScsiOpcode::ReadToc))
            .then(|| read_toc::execute(&self.state, ctx))
    }
}
