// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{
    control_block::{CommandContext, Outcome, ScsiError, common::Access},
    device::DiskState,
    models::sense_data::SenseCode,
    utils::{get_be24, get_be32},
};

/// REZERO UNIT.
pub fn rezero(state: &DiskState) -> Result<Outcome, ScsiError> {
    state.check_ready()?;
    Ok(Outcome::Status)
}

/// SEEK(6) / SEEK(10). There is no head to move; the target block is only
/// validated.
pub fn seek(state: &DiskState, ctx: &CommandContext, access: Access) -> Result<Outcome, ScsiError> {
    let lba = match access {
        Access::Rw6 => (get_be24(&ctx.cdb, 1) & 0x001F_FFFF) as u64,
        _ => get_be32(&ctx.cdb, 2) as u64,
    };
    if state.block_count() == 0 {
        return Err(ScsiError(SenseCode::LbaOutOfRange));
    }
    state.check_ready()?;
    if lba >= state.block_count() {
        return Err(ScsiError(SenseCode::LbaOutOfRange));
    }
    Ok(Outcome::Status)
}
