// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use tracing::debug;

use crate::{
    control_block::{
        CommandContext, Outcome, ScsiError,
        common::{Access, block_range, check_capacity},
    },
    device::DiskState,
};

/// WRITE(6/10/16) and WRITE AND VERIFY(10).
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
    state.check_writable()?;
    debug!(lba, blocks, ?access, "WRITE");
    Ok(Outcome::WriteBlocks { lba, blocks })
}
