// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! INQUIRY (6) — standard data only.
//!
//! Response layout (36 bytes):
//!   [0]      = peripheral qualifier / device type
//!   [1]      = RMB (bit 7)
//!   [2]      = version (SCSI-2)
//!   [3]      = response data format
//!   [4]      = additional length (n - 4)
//!   [8..16]  = vendor, space padded
//!   [16..32] = product, space padded
//!   [32..36] = revision, space padded

use tracing::debug;

use crate::{
    control_block::{CommandContext, Outcome, ScsiError},
    device::{Device, Identity, LogicalUnit},
    models::sense_data::SenseCode,
};

pub const INQUIRY_LEN: usize = 36;
/// Peripheral qualifier 3, type 0x1F: no unit at this LUN.
pub const PERIPHERAL_NOT_PRESENT: u8 = 0x7F;

const EVPD: u8 = 0x01;
const RMB: u8 = 0x80;
const VERSION_SCSI2: u8 = 0x02;
const RESPONSE_FORMAT: u8 = 0x02;

fn put_ascii(dst: &mut [u8], text: &str) {
    dst.fill(b' ');
    let n = text.len().min(dst.len());
    dst[..n].copy_from_slice(&text.as_bytes()[..n]);
}

/// Standard INQUIRY data for `identity`.
pub fn standard_data(identity: &Identity, removable: bool) -> [u8; INQUIRY_LEN] {
    let mut buf = [0u8; INQUIRY_LEN];
    buf[0] = identity.peripheral_type;
    if removable {
        buf[1] = RMB;
    }
    buf[2] = VERSION_SCSI2;
    buf[3] = RESPONSE_FORMAT;
    buf[4] = (INQUIRY_LEN - 5) as u8;
    put_ascii(&mut buf[8..16], identity.vendor);
    put_ascii(&mut buf[16..32], identity.product);
    put_ascii(&mut buf[32..36], identity.revision);
    buf
}

fn respond(mut data: Vec<u8>, ctx: &CommandContext) -> Result<Outcome, ScsiError> {
    if ctx.cdb[1] & EVPD != 0 {
        return Err(ScsiError(SenseCode::InvalidFieldInCdb));
    }
    data.truncate(ctx.cdb[4] as usize);
    Ok(Outcome::DataIn(data))
}

pub fn execute(unit: &Device, ctx: &CommandContext) -> Result<Outcome, ScsiError> {
    let identity = unit.identity();
    debug!(vendor = identity.vendor, product = identity.product, "INQUIRY");
    let data = standard_data(&identity, unit.state().is_removable());
    respond(data.to_vec(), ctx)
}

/// INQUIRY addressed to an unattached LUN: the data of `template` (unit 0
/// when present) with the peripheral byte replaced by "not present".
pub fn missing_lun(template: Option<&Device>, ctx: &CommandContext) -> Result<Outcome, ScsiError> {
    let mut data = match template {
        Some(unit) => standard_data(&unit.identity(), unit.state().is_removable()),
        None => [0u8; INQUIRY_LEN],
    };
    data[0] = PERIPHERAL_NOT_PRESENT;
    data[1] = 0;
    respond(data.to_vec(), ctx)
}
