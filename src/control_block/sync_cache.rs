// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{
    control_block::{Outcome, ScsiError},
    device::DiskState,
};

/// SYNCHRONIZE CACHE(10/16). The whole image is flushed whatever range the
/// CDB names.
pub fn execute(state: &mut DiskState) -> Result<Outcome, ScsiError> {
    state.flush_cache();
    Ok(Outcome::Status)
}
