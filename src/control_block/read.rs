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

/// READ(6/10/16).
///
/// Capacity is checked before readiness; a zero-length 10/16-byte read
/// completes without a data phase.
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
    debug!(lba, blocks, ?access, "READ");
    Ok(Outcome::ReadBlocks { lba, blocks })
}
