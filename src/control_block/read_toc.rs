// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! READ TOC for a single-session disc holding one data track.

use crate::{
    control_block::{CommandContext, Outcome, ScsiError},
    device::DiskState,
    models::sense_data::SenseCode,
    utils::{get_be16, lba_to_msf, put_be16, put_be32},
};

const MSF: u8 = 0x02;
/// ADR 1 (current position), CONTROL 4 (data track).
const ADR_CONTROL_DATA: u8 = 0x14;
const DATA_TRACK: u8 = 1;
const LEAD_OUT: u8 = 0xAA;
const HEADER_LEN: usize = 4;
const DESCRIPTOR_LEN: usize = 8;

fn descriptor(track: u8, lba: u64, msf: bool) -> [u8; DESCRIPTOR_LEN] {
    let mut buf = [0u8; DESCRIPTOR_LEN];
    buf[1] = ADR_CONTROL_DATA;
    buf[2] = track;
    if msf {
        buf[5..8].copy_from_slice(&lba_to_msf(lba));
    } else {
        put_be32(&mut buf, 4, u32::try_from(lba).unwrap_or(u32::MAX));
    }
    buf
}

pub fn execute(state: &DiskState, ctx: &CommandContext) -> Result<Outcome, ScsiError> {
    state.check_ready()?;
    let msf = ctx.cdb[1] & MSF != 0;
    let start_track = ctx.cdb[6];
    let alloc = get_be16(&ctx.cdb, 7) as usize;

    let mut out = vec![0u8; HEADER_LEN];
    out[2] = DATA_TRACK;
    out[3] = DATA_TRACK;
    match start_track {
        0 | DATA_TRACK => out.extend_from_slice(&descriptor(DATA_TRACK, 0, msf)),
        LEAD_OUT => {},
        _ => return Err(ScsiError(SenseCode::InvalidFieldInCdb)),
    }
    out.extend_from_slice(&descriptor(LEAD_OUT, state.block_count(), msf));

    let data_len = (out.len() - 2) as u16;
    put_be16(&mut out, 0, data_len);
    out.truncate(alloc);
    Ok(Outcome::DataIn(out))
}
