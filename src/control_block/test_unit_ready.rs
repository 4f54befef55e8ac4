// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{
    control_block::{Outcome, ScsiError},
    device::DiskState,
};

/// TEST UNIT READY: GOOD when a medium is present.
pub fn execute(state: &DiskState) -> Result<Outcome, ScsiError> {
    state.check_ready()?;
    Ok(Outcome::Status)
}

/// SEND DIAGNOSTIC: the self test always passes.
pub fn send_diagnostic() -> Result<Outcome, ScsiError> {
    Ok(Outcome::Status)
}
