// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! CDB layouts shared by the block commands.

use zerocopy::{
    FromBytes, Immutable, KnownLayout,
    byteorder::{BigEndian, U16, U32, U64},
};

use crate::{
    control_block::ScsiError,
    device::DiskState,
    models::{opcode::CDB_MAX, sense_data::SenseCode},
    utils::get_be24,
};

/// READ(6)/WRITE(6) carry a 21-bit LBA.
const LBA6_MASK: u32 = 0x001F_FFFF;
/// A zero transfer length in a 6-byte CDB means 256 blocks.
const BLOCKS6_ZERO: u64 = 256;

/// Generic 10-byte CDB (READ(10), WRITE(10), VERIFY(10), ...).
#[repr(C)]
#[derive(FromBytes, KnownLayout, Immutable, Debug)]
pub struct Cdb10 {
    pub opcode: u8,
    pub flags: u8,
    pub lba: U32<BigEndian>,
    pub group: u8,
    pub length: U16<BigEndian>,
    pub control: u8,
}

/// Generic 16-byte CDB (READ(16), WRITE(16), VERIFY(16), ...).
#[repr(C)]
#[derive(FromBytes, KnownLayout, Immutable, Debug)]
pub struct Cdb16 {
    pub opcode: u8,
    pub flags: u8,
    pub lba: U64<BigEndian>,
    pub length: U32<BigEndian>,
    pub group: u8,
    pub control: u8,
}

/// Addressing form of a block command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Rw6,
    Rw10,
    Rw16,
}

/// Starting LBA and block count of a READ/WRITE/VERIFY CDB.
pub fn block_range(cdb: &[u8; CDB_MAX], access: Access) -> Result<(u64, u64), ScsiError> {
    Ok(match access {
        Access::Rw6 => {
            let lba = (get_be24(cdb, 1) & LBA6_MASK) as u64;
            let blocks = match cdb[4] {
                0 => BLOCKS6_ZERO,
                n => n as u64,
            };
            (lba, blocks)
        },
        Access::Rw10 => {
            let (raw, _) = Cdb10::ref_from_prefix(cdb)
                .map_err(|_| ScsiError(SenseCode::InvalidFieldInCdb))?;
            (raw.lba.get() as u64, raw.length.get() as u64)
        },
        Access::Rw16 => {
            let (raw, _) = Cdb16::ref_from_prefix(cdb)
                .map_err(|_| ScsiError(SenseCode::InvalidFieldInCdb))?;
            (raw.lba.get(), raw.length.get() as u64)
        },
    })
}

/// Rejects empty media and ranges past the last block.
pub fn check_capacity(state: &DiskState, lba: u64, blocks: u64) -> Result<(), ScsiError> {
    let capacity = state.block_count();
    if capacity == 0 {
        return Err(ScsiError(SenseCode::LbaOutOfRange));
    }
    match lba.checked_add(blocks) {
        Some(end) if lba < capacity && end <= capacity => Ok(()),
        _ => Err(ScsiError(SenseCode::LbaOutOfRange)),
    }
}
