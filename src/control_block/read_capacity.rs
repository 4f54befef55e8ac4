// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use tracing::debug;
use zerocopy::{
    Immutable, IntoBytes, KnownLayout,
    byteorder::{BigEndian, U32, U64},
};

use crate::{
    control_block::{CommandContext, Outcome, ScsiError},
    device::DiskState,
    models::sense_data::SenseCode,
    utils::get_be32,
};

/// Full READ CAPACITY(16) parameter data length.
pub const RC16_LEN: usize = 32;

/// 8-byte parameter data returned by READ CAPACITY(10).
#[repr(C)]
#[derive(IntoBytes, KnownLayout, Immutable, Debug)]
pub struct Rc10Data {
    /// Last addressable LBA, saturated at `0xFFFF_FFFF`.
    pub max_lba: U32<BigEndian>,
    /// Block length in bytes.
    pub block_len: U32<BigEndian>,
}

/// 32-byte parameter data returned by READ CAPACITY(16).
#[repr(C)]
#[derive(IntoBytes, KnownLayout, Immutable, Debug)]
pub struct Rc16Data {
    /// Number of logical blocks on the medium.
    pub block_count: U64<BigEndian>,
    /// Block length in bytes.
    pub block_len: U32<BigEndian>,
    pub reserved: [u8; 20],
}

impl Rc10Data {
    pub fn new(block_count: u64, block_len: u32) -> Self {
        let max_lba = u32::try_from(block_count.saturating_sub(1)).unwrap_or(u32::MAX);
        Self {
            max_lba: U32::new(max_lba),
            block_len: U32::new(block_len),
        }
    }
}

impl Rc16Data {
    pub fn new(block_count: u64, block_len: u32) -> Self {
        Self {
            block_count: U64::new(block_count),
            block_len: U32::new(block_len),
            reserved: [0; 20],
        }
    }
}

fn check_medium(state: &DiskState) -> Result<(), ScsiError> {
    state.check_ready()?;
    if state.block_count() == 0 {
        return Err(ScsiError(SenseCode::MediumNotPresent));
    }
    Ok(())
}

/// READ CAPACITY(10).
pub fn execute10(state: &DiskState) -> Result<Outcome, ScsiError> {
    check_medium(state)?;
    let data = Rc10Data::new(state.block_count(), state.sector_size());
    debug!(max_lba = data.max_lba.get(), "READ CAPACITY(10)");
    Ok(Outcome::DataIn(data.as_bytes().to_vec()))
}

/// READ CAPACITY(16); the allocation length only truncates when it is
/// non-zero and shorter than the full response.
pub fn execute16(state: &DiskState, ctx: &CommandContext) -> Result<Outcome, ScsiError> {
    check_medium(state)?;
    let data = Rc16Data::new(state.block_count(), state.sector_size());
    let mut out = data.as_bytes().to_vec();
    let alloc = get_be32(&ctx.cdb, 10) as usize;
    if alloc != 0 && alloc < RC16_LEN {
        out.truncate(alloc);
    }
    Ok(Outcome::DataIn(out))
}
