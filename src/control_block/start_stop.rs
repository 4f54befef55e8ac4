// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use tracing::{debug, info};

use crate::{
    control_block::{CommandContext, Outcome, ScsiError},
    device::DiskState,
    models::sense_data::SenseCode,
};

const START: u8 = 0x01;
const LOEJ: u8 = 0x02;

/// START STOP UNIT.
///
/// A stop with LoEj ejects the medium; it fails while removal is prevented
/// or when the unit cannot eject. A plain stop flushes the cache.
pub fn start_stop_unit(state: &mut DiskState, ctx: &CommandContext) -> Result<Outcome, ScsiError> {
    let start = ctx.cdb[4] & START != 0;
    let load_eject = ctx.cdb[4] & LOEJ != 0;

    if !start {
        if load_eject {
            if state.is_locked() {
                return Err(ScsiError(SenseCode::MediumRemovalPrevented));
            }
            if !state.eject(false) {
                return Err(ScsiError(SenseCode::MediumNotPresent));
            }
            info!(path = ?state.path(), "medium ejected by initiator");
        } else {
            state.flush_cache();
        }
    }

    state.set_stopped(!start);
    debug!(start, load_eject, "START STOP UNIT");
    Ok(Outcome::Status)
}

/// PREVENT ALLOW MEDIUM REMOVAL.
pub fn prevent_allow(state: &mut DiskState, ctx: &CommandContext) -> Result<Outcome, ScsiError> {
    state.check_ready()?;
    let lock = ctx.cdb[4] & 0x01 != 0;
    state.set_locked(lock);
    debug!(lock, "PREVENT ALLOW MEDIUM REMOVAL");
    Ok(Outcome::Status)
}
