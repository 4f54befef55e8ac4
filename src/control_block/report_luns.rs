// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{
    control_block::{CommandContext, Outcome, ScsiError},
    models::sense_data::SenseCode,
    utils::{get_be32, put_be32},
};

/// Smallest allocation length SPC allows.
const MIN_ALLOC: usize = 16;
const HEADER_LEN: usize = 8;
const ENTRY_LEN: usize = 8;

/// REPORT LUNS: one single-level entry per attached unit of this target.
pub fn execute(ctx: &CommandContext) -> Result<Outcome, ScsiError> {
    let alloc = get_be32(&ctx.cdb, 6) as usize;
    if alloc < MIN_ALLOC {
        return Err(ScsiError(SenseCode::InvalidFieldInCdb));
    }

    let luns = (0..8u8).filter(|lun| ctx.lun_map & (1 << lun) != 0);
    let mut out = vec![0u8; HEADER_LEN];
    for lun in luns {
        let mut entry = [0u8; ENTRY_LEN];
        entry[1] = lun;
        out.extend_from_slice(&entry);
    }
    let list_len = (out.len() - HEADER_LEN) as u32;
    put_be32(&mut out, 0, list_len);
    out.truncate(alloc);
    Ok(Outcome::DataIn(out))
}
