// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{
    control_block::{
        CommandContext, Outcome, ScsiError,
        common::{Access, block_range, check_capacity},
    },
    device::DiskState,
};

/// BYTCHK: compare the Data-Out blocks against the medium.
const BYTCHK: u8 = 0x02;

/// VERIFY(10/16). Without BYTCHK only the range and readiness are checked.
pub fn execute(
    state: &DiskState,
    ctx: &CommandContext,
    access: Access,
) -> Result<Outcome, ScsiError> {
    let (lba, blocks) = block_range(&ctx.cdb, access)?;
    check_capacity(state, lba, blocks)?;
    if blocks == 0 {
        return Ok(Outcome::Status);
    }
    state.check_ready()?;
    if ctx.cdb[1] & BYTCHK != 0 {
        Ok(Outcome::VerifyBlocks { lba, blocks })
    } else {
        Ok(Outcome::Status)
    }
}
