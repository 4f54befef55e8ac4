// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use tracing::debug;

use crate::{
    control_block::{CommandContext, Outcome, ScsiError},
    device::{Device, LogicalUnit},
    models::sense_data::SenseCode,
};

/// Encodes `code` the way the addressed unit's protocol expects.
///
/// SASI initiators ask with an allocation length of zero and get the
/// 4-byte non-extended block; any other request gets fixed-format data.
pub fn encode(code: SenseCode, ctx: &CommandContext, sasi: bool) -> Vec<u8> {
    let alloc = ctx.cdb[4] as usize;
    if sasi && alloc == 0 {
        code.to_sasi(ctx.lun).to_vec()
    } else {
        code.to_fixed(alloc)
    }
}

/// REQUEST SENSE: reports and clears the pending sense.
pub fn execute(unit: &mut Device, ctx: &CommandContext) -> Result<Outcome, ScsiError> {
    let sasi = unit.is_sasi();
    let code = unit.state_mut().take_sense();
    debug!(key = %code.key(), asc = code.asc(), ascq = code.ascq(), "REQUEST SENSE");
    Ok(Outcome::DataIn(encode(code, ctx, sasi)))
}
