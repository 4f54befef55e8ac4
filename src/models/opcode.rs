// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Helpers for decoding the very first byte of every **Command Descriptor
//! Block** (CDB).
//!
//! ```text
//!  7   6   5   4   3   2   1   0      bit position
//! +-----------+-------------------+
//! |   GROUP   |   COMMAND CODE    |  ← CDB byte 0
//! +-----------+-------------------+
//! ```
//!
//! The group code fixes the CDB length on the wire: the target must know
//! how many bytes to pull during the Command phase before it has decoded
//! anything else.

use core::fmt;
use std::convert::TryFrom;

use thiserror::Error;

/// Longest CDB this target accepts (group 4 commands).
pub const CDB_MAX: usize = 16;

/// Operation codes understood by the dispatcher.
///
/// Opcodes that SCSI overloads through a service-action field
/// (`0x9E`, `0x9F`) appear once here; the dispatcher splits them.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScsiOpcode {
    TestUnitReady = 0x00,
    Rezero = 0x01,
    RequestSense = 0x03,
    FormatUnit = 0x04,
    /// SASI only: format a single track; handled as FORMAT UNIT.
    FormatTrack = 0x06,
    ReassignBlocks = 0x07,
    Read6 = 0x08,
    Write6 = 0x0A,
    Seek6 = 0x0B,
    /// SASI only: alternate track assignment.
    Assign = 0x0E,
    Inquiry = 0x12,
    ModeSelect6 = 0x15,
    ModeSense6 = 0x1A,
    StartStopUnit = 0x1B,
    SendDiagnostic = 0x1D,
    PreventAllowMediumRemoval = 0x1E,
    ReadCapacity10 = 0x25,
    /// READ(10); GET MESSAGE(10) on a host bridge.
    Read10 = 0x28,
    /// WRITE(10); SEND MESSAGE(10) on a host bridge.
    Write10 = 0x2A,
    Seek10 = 0x2B,
    WriteAndVerify10 = 0x2E,
    Verify10 = 0x2F,
    SynchronizeCache10 = 0x35,
    ReadDefectData10 = 0x37,
    ReadLong10 = 0x3E,
    WriteLong10 = 0x3F,
    ReadToc = 0x43,
    ModeSelect10 = 0x55,
    ModeSense10 = 0x5A,
    Read16 = 0x88,
    Write16 = 0x8A,
    Verify16 = 0x8F,
    SynchronizeCache16 = 0x91,
    /// SERVICE ACTION IN(16): READ CAPACITY(16) / READ LONG(16).
    ServiceActionIn16 = 0x9E,
    /// SERVICE ACTION OUT(16): WRITE LONG(16).
    ServiceActionOut16 = 0x9F,
    ReportLuns = 0xA0,
    /// SASI only: drive parameter specification.
    Specify = 0xC2,
}

/// Service action selecting READ CAPACITY(16) under opcode 0x9E.
pub const SA_READ_CAPACITY16: u8 = 0x10;
/// Service action selecting READ LONG(16) / WRITE LONG(16).
pub const SA_LONG16: u8 = 0x11;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid opcode: 0x{0:02x}")]
pub struct UnknownOpcode(pub u8);

impl TryFrom<u8> for ScsiOpcode {
    type Error = UnknownOpcode;

    fn try_from(b: u8) -> Result<Self, Self::Error> {
        use ScsiOpcode::*;
        Ok(match b {
            0x00 => TestUnitReady,
            0x01 => Rezero,
            0x03 => RequestSense,
            0x04 => FormatUnit,
            0x06 => FormatTrack,
            0x07 => ReassignBlocks,
            0x08 => Read6,
            0x0A => Write6,
            0x0B => Seek6,
            0x0E => Assign,
            0x12 => Inquiry,
            0x15 => ModeSelect6,
            0x1A => ModeSense6,
            0x1B => StartStopUnit,
            0x1D => SendDiagnostic,
            0x1E => PreventAllowMediumRemoval,
            0x25 => ReadCapacity10,
            0x28 => Read10,
            0x2A => Write10,
            0x2B => Seek10,
            0x2E => WriteAndVerify10,
            0x2F => Verify10,
            0x35 => SynchronizeCache10,
            0x37 => ReadDefectData10,
            0x3E => ReadLong10,
            0x3F => WriteLong10,
            0x43 => ReadToc,
            0x55 => ModeSelect10,
            0x5A => ModeSense10,
            0x88 => Read16,
            0x8A => Write16,
            0x8F => Verify16,
            0x91 => SynchronizeCache16,
            0x9E => ServiceActionIn16,
            0x9F => ServiceActionOut16,
            0xA0 => ReportLuns,
            0xC2 => Specify,
            other => return Err(UnknownOpcode(other)),
        })
    }
}

impl From<ScsiOpcode> for u8 {
    #[inline]
    fn from(op: ScsiOpcode) -> Self {
        op as u8
    }
}

impl fmt::Display for ScsiOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}(0x{:02x})", *self as u8)
    }
}

/// Number of CDB bytes the initiator sends for `opcode`.
///
/// - group 0 (`0x00..=0x1F`) and vendor groups 6/7: 6 bytes
/// - groups 1, 2 and 3 (`0x20..=0x7F`): 10 bytes
/// - group 4 (`0x80..=0x9F`): 16 bytes
/// - group 5 (`0xA0..=0xBF`): 12 bytes
#[inline]
pub const fn cdb_length(opcode: u8) -> usize {
    match opcode {
        0x20..=0x7F => 10,
        0x80..=0x9F => 16,
        0xA0..=0xBF => 12,
        _ => 6,
    }
}
