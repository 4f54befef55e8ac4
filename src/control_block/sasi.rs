// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! SASI-only commands whose parameter blocks are accepted and ignored.

use crate::control_block::{DataSink, Outcome, ScsiError};

/// ASSIGN parameter block length.
pub const ASSIGN_LEN: usize = 4;
/// SPECIFY parameter block length.
pub const SPECIFY_LEN: usize = 10;

pub fn assign() -> Result<Outcome, ScsiError> {
    Ok(Outcome::DataOut {
        length: ASSIGN_LEN,
        sink: DataSink::Discard,
    })
}

pub fn specify() -> Result<Outcome, ScsiError> {
    Ok(Outcome::DataOut {
        length: SPECIFY_LEN,
        sink: DataSink::Discard,
    })
}
