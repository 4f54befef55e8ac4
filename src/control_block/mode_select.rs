// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! MODE SELECT(6) / MODE SELECT(10).
//!
//! Nothing is actually changeable: the parameter list is accepted as long
//! as every sector size it names matches the current one.

use tracing::debug;

use crate::{
    control_block::{CommandContext, DataSink, Outcome, ScsiError, mode_sense::FORMAT_PAGE},
    device::DiskState,
    models::sense_data::SenseCode,
    utils::{get_be16, get_be24, get_be32},
};

const HEADER6_LEN: usize = 4;
const HEADER10_LEN: usize = 8;
const LONGLBA: u8 = 0x01;

/// Requests the parameter list; a zero length completes at once.
pub fn execute(ctx: &CommandContext, ten: bool) -> Result<Outcome, ScsiError> {
    let length = if ten {
        get_be16(&ctx.cdb, 7) as usize
    } else {
        ctx.cdb[4] as usize
    };
    if length == 0 {
        return Ok(Outcome::Status);
    }
    Ok(Outcome::DataOut {
        length,
        sink: DataSink::ModeSelect { ten },
    })
}

fn check_size(state: &DiskState, size: u32) -> Result<(), ScsiError> {
    if size == state.sector_size() {
        Ok(())
    } else {
        debug!(size, current = state.sector_size(), "MODE SELECT sector size rejected");
        Err(ScsiError(SenseCode::InvalidFieldInParameterList))
    }
}

/// Validates a received parameter list.
pub fn apply(state: &DiskState, ten: bool, data: &[u8]) -> Result<(), ScsiError> {
    let header_len = if ten { HEADER10_LEN } else { HEADER6_LEN };
    if data.len() < header_len {
        return Err(ScsiError(SenseCode::ParameterListLengthError));
    }
    let (descriptor_len, long_lba) = if ten {
        (get_be16(data, 6) as usize, data[4] & LONGLBA != 0)
    } else {
        (data[3] as usize, false)
    };

    let mut offset = header_len;
    if descriptor_len > 0 {
        let end = offset + descriptor_len;
        let descriptor = data
            .get(offset..end)
            .ok_or(ScsiError(SenseCode::ParameterListLengthError))?;
        let size = if long_lba && descriptor.len() >= 16 {
            get_be32(descriptor, 12)
        } else {
            get_be24(descriptor, 5)
        };
        check_size(state, size)?;
        offset = end;
    }

    while offset + 2 <= data.len() {
        let page = data[offset] & 0x3F;
        let page_len = data[offset + 1] as usize + 2;
        let body = data
            .get(offset..offset + page_len)
            .ok_or(ScsiError(SenseCode::ParameterListLengthError))?;
        if page == FORMAT_PAGE && body.len() >= 14 {
            check_size(state, get_be16(body, 12) as u32)?;
        }
        offset += page_len;
    }
    Ok(())
}
