// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! READ LONG / WRITE LONG. Only the zero-length form is supported: the
//! command validates its address and returns GOOD.

use crate::{
    control_block::{CommandContext, Outcome, ScsiError},
    device::DiskState,
    models::sense_data::SenseCode,
    utils::{get_be16, get_be32, get_be64},
};

/// LBA and byte count of the 10-byte form.
fn fields10(ctx: &CommandContext) -> (u64, u16) {
    (get_be32(&ctx.cdb, 2) as u64, get_be16(&ctx.cdb, 7))
}

/// LBA and byte count of the 16-byte service-action form.
fn fields16(ctx: &CommandContext) -> (u64, u16) {
    (get_be64(&ctx.cdb, 2), get_be16(&ctx.cdb, 12))
}

fn check(state: &DiskState, lba: u64, length: u16) -> Result<Outcome, ScsiError> {
    if length != 0 {
        return Err(ScsiError(SenseCode::InvalidFieldInCdb));
    }
    if lba >= state.block_count() {
        return Err(ScsiError(SenseCode::LbaOutOfRange));
    }
    Ok(Outcome::Status)
}

/// READ LONG(10) / WRITE LONG(10).
pub fn execute10(state: &DiskState, ctx: &CommandContext) -> Result<Outcome, ScsiError> {
    let (lba, length) = fields10(ctx);
    check(state, lba, length)
}

/// READ LONG(16) / WRITE LONG(16).
pub fn execute16(state: &DiskState, ctx: &CommandContext) -> Result<Outcome, ScsiError> {
    let (lba, length) = fields16(ctx);
    check(state, lba, length)
}
