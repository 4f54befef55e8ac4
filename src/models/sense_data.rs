// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::fmt;

/// Sense data must be ≥ 18 bytes for fixed format.
pub const FIXED_MIN_LEN: usize = 18;
/// Length of the SASI non-extended sense block.
pub const SASI_SENSE_LEN: usize = 4;

/// Response code of current errors in fixed format.
const RESPONSE_CODE_CURRENT: u8 = 0x70;

/// SPC-4 Table 47 — sense keys.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SenseKey {
    #[default]
    NoSense = 0x0,
    RecoveredError = 0x1,
    NotReady = 0x2,
    MediumError = 0x3,
    HardwareError = 0x4,
    IllegalRequest = 0x5,
    UnitAttention = 0x6,
    DataProtect = 0x7,
    AbortedCommand = 0xB,
    Miscompare = 0xE,
}

impl fmt::Display for SenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SenseKey::NoSense => "NO SENSE",
            SenseKey::RecoveredError => "RECOVERED ERROR",
            SenseKey::NotReady => "NOT READY",
            SenseKey::MediumError => "MEDIUM ERROR",
            SenseKey::HardwareError => "HARDWARE ERROR",
            SenseKey::IllegalRequest => "ILLEGAL REQUEST",
            SenseKey::UnitAttention => "UNIT ATTENTION",
            SenseKey::DataProtect => "DATA PROTECT",
            SenseKey::AbortedCommand => "ABORTED COMMAND",
            SenseKey::Miscompare => "MISCOMPARE",
        })
    }
}

/// Every failure condition the target reports.
///
/// The discriminant indexes [`SENSE_TABLE`].
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SenseCode {
    #[default]
    NoSense = 0,
    MediumNotPresent,
    InvalidCommandOperationCode,
    LbaOutOfRange,
    InvalidFieldInCdb,
    LogicalUnitNotSupported,
    InvalidFieldInParameterList,
    ParameterListLengthError,
    SavingParametersNotSupported,
    MediumRemovalPrevented,
    WriteProtected,
    UnrecoveredReadError,
    WriteFault,
    InternalTargetFailure,
    MediumChanged,
    PowerOnReset,
    Miscompare,
    DataPhaseError,
}

/// One row of the sense table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenseEntry {
    pub code: SenseCode,
    pub key: SenseKey,
    pub asc: u8,
    pub ascq: u8,
    /// Error class/code reported in the SASI 4-byte sense block.
    pub sasi: u8,
}

const fn entry(code: SenseCode, key: SenseKey, asc: u8, ascq: u8, sasi: u8) -> SenseEntry {
    SenseEntry {
        code,
        key,
        asc,
        ascq,
        sasi,
    }
}

/// Sense key, ASC/ASCQ and SASI error code for every [`SenseCode`], in
/// discriminant order.
pub static SENSE_TABLE: [SenseEntry; 18] = {
    use SenseCode as C;
    use SenseKey as K;
    [
        entry(C::NoSense, K::NoSense, 0x00, 0x00, 0x00),
        entry(C::MediumNotPresent, K::NotReady, 0x3A, 0x00, 0x04),
        entry(C::InvalidCommandOperationCode, K::IllegalRequest, 0x20, 0x00, 0x20),
        entry(C::LbaOutOfRange, K::IllegalRequest, 0x21, 0x00, 0x21),
        entry(C::InvalidFieldInCdb, K::IllegalRequest, 0x24, 0x00, 0x20),
        entry(C::LogicalUnitNotSupported, K::IllegalRequest, 0x25, 0x00, 0x20),
        entry(C::InvalidFieldInParameterList, K::IllegalRequest, 0x26, 0x00, 0x20),
        entry(C::ParameterListLengthError, K::IllegalRequest, 0x1A, 0x00, 0x20),
        entry(C::SavingParametersNotSupported, K::IllegalRequest, 0x39, 0x00, 0x20),
        entry(C::MediumRemovalPrevented, K::IllegalRequest, 0x53, 0x02, 0x20),
        entry(C::WriteProtected, K::DataProtect, 0x27, 0x00, 0x03),
        entry(C::UnrecoveredReadError, K::MediumError, 0x11, 0x00, 0x11),
        entry(C::WriteFault, K::MediumError, 0x03, 0x00, 0x03),
        entry(C::InternalTargetFailure, K::HardwareError, 0x44, 0x00, 0x04),
        entry(C::MediumChanged, K::UnitAttention, 0x28, 0x00, 0x06),
        entry(C::PowerOnReset, K::UnitAttention, 0x29, 0x00, 0x06),
        entry(C::Miscompare, K::Miscompare, 0x1D, 0x00, 0x11),
        entry(C::DataPhaseError, K::AbortedCommand, 0x4B, 0x00, 0x20),
    ]
};

impl SenseCode {
    #[inline]
    pub fn entry(self) -> &'static SenseEntry {
        &SENSE_TABLE[self as usize]
    }

    #[inline]
    pub fn key(self) -> SenseKey {
        self.entry().key
    }

    #[inline]
    pub fn asc(self) -> u8 {
        self.entry().asc
    }

    #[inline]
    pub fn ascq(self) -> u8 {
        self.entry().ascq
    }

    #[inline]
    pub fn description(self) -> &'static str {
        asc_ascq_to_str(self.asc(), self.ascq())
    }

    /// Fixed-format sense block, truncated to `alloc_len`.
    pub fn to_fixed(self, alloc_len: usize) -> Vec<u8> {
        let mut out = SenseData::from(self).encode().to_vec();
        out.truncate(alloc_len);
        out
    }

    /// SASI non-extended sense: error code, then LUN and a zero block address.
    pub fn to_sasi(self, lun: u8) -> [u8; SASI_SENSE_LEN] {
        [self.entry().sasi, (lun & 0x07) << 5, 0, 0]
    }
}

/// SPC-4 Table 43 — Fixed format sense-data byte layout
#[repr(C)]
#[derive(Default, PartialEq)]
pub struct SenseData {
    pub valid: bool,        // bit7 of byte0
    pub response_code: u8,  // low-7 bits of byte0
    pub sense_key: u8,      // low-4 bits of byte2
    pub ili: bool,          // bit5 of byte2
    pub eom: bool,          // bit6 of byte2
    pub filemark: bool,     // bit7 of byte2
    pub information: u32,   // bytes 3-6
    pub additional_len: u8, // byte7
    pub cmd_specific: u32,  // bytes 8-11
    pub asc: u8,            // Additional Sense Code
    pub ascq: u8,           // Additional Sense Code Qualifier
}

impl From<SenseCode> for SenseData {
    fn from(code: SenseCode) -> Self {
        Self {
            valid: false,
            response_code: RESPONSE_CODE_CURRENT,
            sense_key: code.key() as u8,
            additional_len: (FIXED_MIN_LEN - 8) as u8,
            asc: code.asc(),
            ascq: code.ascq(),
            ..Default::default()
        }
    }
}

impl SenseData {
    /// Serialise into the 18-byte fixed format (SPC-4 § 4.5.3).
    pub fn encode(&self) -> [u8; FIXED_MIN_LEN] {
        let mut buf = [0u8; FIXED_MIN_LEN];
        buf[0] = (self.response_code & 0x7F) | if self.valid { 0x80 } else { 0 };
        buf[2] = (self.sense_key & 0x0F)
            | if self.filemark { 0x80 } else { 0 }
            | if self.eom { 0x40 } else { 0 }
            | if self.ili { 0x20 } else { 0 };
        buf[3..7].copy_from_slice(&self.information.to_be_bytes());
        buf[7] = self.additional_len;
        buf[8..12].copy_from_slice(&self.cmd_specific.to_be_bytes());
        buf[12] = self.asc;
        buf[13] = self.ascq;
        buf
    }
}

impl fmt::Debug for SenseData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenseData")
            .field("valid", &self.valid)
            .field(
                "response_code",
                &format_args!("{:#04x}", self.response_code),
            )
            .field("sense_key", &format_args!("{:#x}", self.sense_key))
            .field("filemark", &self.filemark)
            .field("eom", &self.eom)
            .field("ili", &self.ili)
            .field("information", &self.information)
            .field("cmd_specific", &self.cmd_specific)
            .field("asc", &format_args!("{:#04x}", self.asc))
            .field("ascq", &format_args!("{:#04x}", self.ascq))
            .field("description", &asc_ascq_to_str(self.asc, self.ascq))
            .finish()
    }
}

/// Return the SPC-4 description for a given ASC/ASCQ pair.
///
/// * If the pair is not present in the table, returns `"UNSPECIFIED /
///   vendor specific"`.
#[inline]
pub fn asc_ascq_to_str(asc: u8, ascq: u8) -> &'static str {
    hot_table(asc, ascq).unwrap_or("UNSPECIFIED / vendor specific")
}

fn hot_table(asc: u8, ascq: u8) -> Option<&'static str> {
    Some(match (asc, ascq) {
        (0x00, 0x00) => "No additional sense information",
        (0x03, 0x00) => "Peripheral device write fault",
        (0x11, 0x00) => "Unrecovered read error",
        (0x1A, 0x00) => "Parameter list length error",
        (0x1D, 0x00) => "Miscompare during verify operation",
        (0x20, 0x00) => "Invalid command operation code",
        (0x21, 0x00) => "Logical block address out of range",
        (0x24, 0x00) => "Invalid field in CDB",
        (0x25, 0x00) => "Logical unit not supported",
        (0x26, 0x00) => "Invalid field in parameter list",
        (0x27, 0x00) => "Write protected",
        (0x28, 0x00) => "Not ready to ready change, medium may have changed",
        (0x29, 0x00) => "Power on, reset, or bus device reset occurred",
        (0x39, 0x00) => "Saving parameters not supported",
        (0x3A, 0x00) => "Medium not present",
        (0x44, 0x00) => "Internal target failure",
        (0x4B, 0x00) => "Data phase error",
        (0x53, 0x02) => "Medium removal prevented",
        _ => return None,
    })
}
