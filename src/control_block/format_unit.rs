// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Medium maintenance commands. Images need no low-level format and carry
//! no defects, so these only validate their CDB.

use crate::{
    control_block::{CommandContext, Outcome, ScsiError},
    device::DiskState,
    models::sense_data::SenseCode,
    utils::get_be16,
};

/// FMTDATA: a defect list follows in Data-Out.
const FMTDATA: u8 = 0x10;
/// Header of an empty defect list.
const DEFECT_HEADER_LEN: usize = 4;

/// FORMAT UNIT (and SASI FORMAT TRACK).
pub fn format(state: &DiskState, ctx: &CommandContext) -> Result<Outcome, ScsiError> {
    state.check_ready()?;
    if ctx.cdb[1] & FMTDATA != 0 && ctx.cdb[4] != 0 {
        return Err(ScsiError(SenseCode::InvalidFieldInCdb));
    }
    Ok(Outcome::Status)
}

/// REASSIGN BLOCKS.
pub fn reassign(state: &DiskState) -> Result<Outcome, ScsiError> {
    state.check_ready()?;
    Ok(Outcome::Status)
}

/// READ DEFECT DATA(10): an empty list in the requested format.
pub fn read_defect_data(ctx: &CommandContext) -> Result<Outcome, ScsiError> {
    let alloc = get_be16(&ctx.cdb, 7) as usize;
    let mut out = vec![0u8, ctx.cdb[2] & 0x1F, 0, 0];
    out.truncate(alloc.min(DEFECT_HEADER_LEN));
    Ok(Outcome::DataIn(out))
}
