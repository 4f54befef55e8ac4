// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use thiserror::Error;

/// The 1-byte status sent during the Status phase (SAM-2 § 5.3.1).
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ScsiStatus {
    #[default]
    Good = 0x00,
    CheckCondition = 0x02,
    ConditionMet = 0x04,
    Busy = 0x08,
    ReservationConflict = 0x18,
}

#[derive(Debug, Error)]
#[error("invalid SCSI status: 0x{0:02x}")]
pub struct UnknownScsiStatus(pub u8);

impl From<ScsiStatus> for u8 {
    #[inline]
    fn from(value: ScsiStatus) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for ScsiStatus {
    type Error = UnknownScsiStatus;

    fn try_from(b: u8) -> Result<Self, Self::Error> {
        Ok(match b {
            0x00 => ScsiStatus::Good,
            0x02 => ScsiStatus::CheckCondition,
            0x04 => ScsiStatus::ConditionMet,
            0x08 => ScsiStatus::Busy,
            0x18 => ScsiStatus::ReservationConflict,
            other => return Err(UnknownScsiStatus(other)),
        })
    }
}

/// Single-byte messages exchanged in the Message-In / Message-Out phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    CommandComplete,
    /// Start of a multi-byte message; the rest is skipped.
    Extended,
    Abort,
    MessageReject,
    NoOperation,
    BusDeviceReset,
    /// IDENTIFY carries the addressed LUN in its low bits.
    Identify { lun: u8 },
    Other(u8),
}

impl Message {
    pub const COMMAND_COMPLETE: u8 = 0x00;

    /// Mask selecting the LUN field of an IDENTIFY message.
    const IDENTIFY_LUN_MASK: u8 = 0x07;
}

impl From<u8> for Message {
    fn from(b: u8) -> Self {
        match b {
            0x00 => Message::CommandComplete,
            0x01 => Message::Extended,
            0x06 => Message::Abort,
            0x07 => Message::MessageReject,
            0x08 => Message::NoOperation,
            0x0C => Message::BusDeviceReset,
            0x80..=0xFF => Message::Identify {
                lun: b & Message::IDENTIFY_LUN_MASK,
            },
            other => Message::Other(other),
        }
    }
}
