// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! MODE SENSE(6) / MODE SENSE(10) and the mode pages common to block
//! devices. Device types add their own pages through
//! [`LogicalUnit::add_mode_pages`].

use std::collections::BTreeMap;

use tracing::debug;
use zerocopy::{
    FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout,
    byteorder::{BigEndian, U32, U64},
};

use crate::{
    control_block::{CommandContext, Outcome, ScsiError},
    device::{Device, DiskState, LogicalUnit},
    models::sense_data::SenseCode,
    utils::{get_be16, put_be16, put_be24},
};

pub const ALL_PAGES: u8 = 0x3F;
pub const ERROR_RECOVERY_PAGE: u8 = 0x01;
pub const FORMAT_PAGE: u8 = 0x03;
pub const DRIVE_PAGE: u8 = 0x04;
pub const CACHE_PAGE: u8 = 0x08;

/// WP bit of the device-specific header byte.
const WRITE_PROTECT: u8 = 0x80;
const DBD: u8 = 0x08;
const LLBAA: u8 = 0x10;
/// Page saveable bit in a page code byte.
const PS: u8 = 0x80;

const HEADER6_LEN: usize = 4;

/// Mode pages keyed by page code; iteration yields them in ascending order.
pub type ModePages = BTreeMap<u8, Vec<u8>>;
const HEADER10_LEN: usize = 8;

/// Page control field of CDB byte 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageControl {
    Current,
    Changeable,
    Default,
    Saved,
}

impl From<u8> for PageControl {
    fn from(b: u8) -> Self {
        match b >> 6 {
            0 => PageControl::Current,
            1 => PageControl::Changeable,
            2 => PageControl::Default,
            _ => PageControl::Saved,
        }
    }
}

/// 8-byte block descriptor.
#[repr(C)]
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Debug)]
pub struct ShortBlockDescriptor {
    pub blocks: U32<BigEndian>,
    pub block_len: U32<BigEndian>,
}

/// 16-byte block descriptor (MODE SENSE(10) with LONGLBA).
#[repr(C)]
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Debug)]
pub struct LongBlockDescriptor {
    pub blocks: U64<BigEndian>,
    pub reserved: U32<BigEndian>,
    pub block_len: U32<BigEndian>,
}

impl ShortBlockDescriptor {
    fn for_state(state: &DiskState) -> Self {
        if !state.is_ready() {
            return Self::new_zeroed();
        }
        let blocks = u32::try_from(state.block_count()).unwrap_or(u32::MAX);
        Self {
            blocks: U32::new(blocks),
            block_len: U32::new(state.sector_size()),
        }
    }
}

impl LongBlockDescriptor {
    fn for_state(state: &DiskState) -> Self {
        if !state.is_ready() {
            return Self::new_zeroed();
        }
        Self {
            blocks: U64::new(state.block_count()),
            reserved: U32::new(0),
            block_len: U32::new(state.sector_size()),
        }
    }
}

fn page_request(ctx: &CommandContext) -> Result<(u8, bool), ScsiError> {
    let page = ctx.cdb[2] & 0x3F;
    match PageControl::from(ctx.cdb[2]) {
        PageControl::Saved => Err(ScsiError(SenseCode::SavingParametersNotSupported)),
        pc => Ok((page, pc == PageControl::Changeable)),
    }
}

fn device_specific(state: &DiskState) -> u8 {
    if state.is_protected_writable() {
        WRITE_PROTECT
    } else {
        0
    }
}

fn error_recovery_page() -> Vec<u8> {
    let mut buf = vec![0u8; 12];
    buf[0] = ERROR_RECOVERY_PAGE;
    buf[1] = 0x0A;
    buf
}

fn format_page(state: &DiskState, changeable: bool) -> Vec<u8> {
    let mut buf = vec![0u8; 24];
    buf[0] = PS | FORMAT_PAGE;
    buf[1] = 0x16;
    if changeable {
        // only the sector size may be changed
        put_be16(&mut buf, 12, 0xFFFF);
        return buf;
    }
    if state.is_ready() {
        // 8 tracks per zone, 25 sectors per track
        buf[3] = 0x08;
        put_be16(&mut buf, 10, 25);
        put_be16(&mut buf, 12, state.sector_size() as u16);
        put_be16(&mut buf, 14, 1);
        put_be16(&mut buf, 16, 11);
        put_be16(&mut buf, 18, 20);
    }
    if state.is_removable() {
        buf[20] = 0x20;
    }
    // hard sectored
    buf[20] |= 0x40;
    buf
}

fn drive_page(state: &DiskState, changeable: bool) -> Vec<u8> {
    let mut buf = vec![0u8; 24];
    buf[0] = DRIVE_PAGE;
    buf[1] = 0x16;
    if !changeable && state.is_ready() {
        // 8 heads, 25 sectors per track
        let cylinders = (state.block_count() >> 3) / 25;
        put_be24(&mut buf, 2, cylinders.min(0x00FF_FFFF) as u32);
        buf[5] = 0x08;
        put_be16(&mut buf, 20, 7200);
    }
    buf
}

fn cache_page(changeable: bool) -> Vec<u8> {
    let mut buf = vec![0u8; 12];
    buf[0] = CACHE_PAGE;
    buf[1] = 0x0A;
    if !changeable {
        // disable prefetch transfer length, maximum prefetch, ceiling
        put_be16(&mut buf, 4, 0xFFFF);
        put_be16(&mut buf, 8, 0xFFFF);
        put_be16(&mut buf, 10, 0xFFFF);
    }
    buf
}

/// Appends the pages selected by `page` in ascending page-code order. Page
/// 0 is accepted and yields no pages; a code nothing recognises is INVALID
/// FIELD IN CDB.
pub fn add_pages(
    unit: &Device,
    page: u8,
    changeable: bool,
    out: &mut Vec<u8>,
) -> Result<(), ScsiError> {
    let state = unit.state();
    let all = page == ALL_PAGES;
    let mut pages = ModePages::new();

    if all || page == ERROR_RECOVERY_PAGE {
        pages.insert(ERROR_RECOVERY_PAGE, error_recovery_page());
    }
    if all || page == FORMAT_PAGE {
        pages.insert(FORMAT_PAGE, format_page(state, changeable));
    }
    if all || page == DRIVE_PAGE {
        pages.insert(DRIVE_PAGE, drive_page(state, changeable));
    }
    if all || page == CACHE_PAGE {
        pages.insert(CACHE_PAGE, cache_page(changeable));
    }
    let device_pages = unit.add_mode_pages(page, changeable, &mut pages);

    if !(all || page == 0x00 || device_pages || !pages.is_empty()) {
        return Err(ScsiError(SenseCode::InvalidFieldInCdb));
    }
    for body in pages.values() {
        out.extend_from_slice(body);
    }
    Ok(())
}

/// MODE SENSE(6).
pub fn mode_sense6(unit: &Device, ctx: &CommandContext) -> Result<Outcome, ScsiError> {
    let (page, changeable) = page_request(ctx)?;
    let alloc = ctx.cdb[4] as usize;
    let state = unit.state();

    let mut out = vec![0u8; HEADER6_LEN];
    out[1] = unit.medium_type();
    out[2] = device_specific(state);
    if ctx.cdb[1] & DBD == 0 {
        out[3] = 8;
        out.extend_from_slice(ShortBlockDescriptor::for_state(state).as_bytes());
    }
    add_pages(unit, page, changeable, &mut out)?;

    out[0] = (out.len() - 1).min(0xFF) as u8;
    debug!(page, changeable, len = out.len(), "MODE SENSE(6)");
    out.truncate(alloc);
    Ok(Outcome::DataIn(out))
}

/// MODE SENSE(10). The long block descriptor is only used when LLBAA is
/// set and the block count does not fit 32 bits.
pub fn mode_sense10(unit: &Device, ctx: &CommandContext) -> Result<Outcome, ScsiError> {
    let (page, changeable) = page_request(ctx)?;
    let alloc = get_be16(&ctx.cdb, 7) as usize;
    let state = unit.state();

    let mut out = vec![0u8; HEADER10_LEN];
    out[2] = unit.medium_type();
    out[3] = device_specific(state);
    if ctx.cdb[1] & DBD == 0 {
        let long = ctx.cdb[1] & LLBAA != 0 && state.block_count() > u32::MAX as u64;
        if long {
            out[4] = 0x01;
            out[7] = 16;
            out.extend_from_slice(LongBlockDescriptor::for_state(state).as_bytes());
        } else {
            out[7] = 8;
            out.extend_from_slice(ShortBlockDescriptor::for_state(state).as_bytes());
        }
    }
    add_pages(unit, page, changeable, &mut out)?;

    let data_len = (out.len() - 2).min(0xFFFF) as u16;
    put_be16(&mut out, 0, data_len);
    debug!(page, changeable, len = out.len(), "MODE SENSE(10)");
    out.truncate(alloc);
    Ok(Outcome::DataIn(out))
}
