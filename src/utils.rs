// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Big-endian field accessors shared by CDB decoding and response building.

/// Reads a big-endian `u16` at `off`; missing bytes read as zero.
#[inline]
pub fn get_be16(buf: &[u8], off: usize) -> u16 {
    (get_byte(buf, off) as u16) << 8 | get_byte(buf, off + 1) as u16
}

/// Reads a big-endian 24-bit value at `off`.
#[inline]
pub fn get_be24(buf: &[u8], off: usize) -> u32 {
    (get_byte(buf, off) as u32) << 16
        | (get_byte(buf, off + 1) as u32) << 8
        | get_byte(buf, off + 2) as u32
}

/// Reads a big-endian `u32` at `off`.
#[inline]
pub fn get_be32(buf: &[u8], off: usize) -> u32 {
    (get_be16(buf, off) as u32) << 16 | get_be16(buf, off + 2) as u32
}

/// Reads a big-endian `u64` at `off`.
#[inline]
pub fn get_be64(buf: &[u8], off: usize) -> u64 {
    (get_be32(buf, off) as u64) << 32 | get_be32(buf, off + 4) as u64
}

#[inline]
fn get_byte(buf: &[u8], off: usize) -> u8 {
    buf.get(off).copied().unwrap_or(0)
}

/// Writes `value` big-endian at `off`. The buffer must be large enough.
#[inline]
pub fn put_be16(buf: &mut [u8], off: usize, value: u16) {
    buf[off..off + 2].copy_from_slice(&value.to_be_bytes());
}

/// Writes the low 24 bits of `value` big-endian at `off`.
#[inline]
pub fn put_be24(buf: &mut [u8], off: usize, value: u32) {
    buf[off..off + 3].copy_from_slice(&value.to_be_bytes()[1..]);
}

#[inline]
pub fn put_be32(buf: &mut [u8], off: usize, value: u32) {
    buf[off..off + 4].copy_from_slice(&value.to_be_bytes());
}

/// Converts a logical block address to CD-ROM minute/second/frame,
/// including the 2-second lead-in.
pub fn lba_to_msf(lba: u64) -> [u8; 3] {
    let frames = lba + 150;
    let minutes = frames / (75 * 60);
    let seconds = (frames / 75) % 60;
    let frame = frames % 75;
    [minutes.min(0xFF) as u8, seconds as u8, frame as u8]
}
