// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Target-side SCSI commands: CDB decoding, precondition checks and
//! response building, plus the dispatcher that routes an opcode to them.

use thiserror::Error;

use crate::models::{
    opcode::{CDB_MAX, ScsiOpcode},
    sense_data::SenseCode,
};

pub mod common;
pub mod dispatch;
pub mod format_unit;
pub mod inquiry;
pub mod mode_select;
pub mod mode_sense;
pub mod read;
pub mod read_capacity;
pub mod read_long;
pub mod read_toc;
pub mod report_luns;
pub mod request_sense;
pub mod sasi;
pub mod seek;
pub mod start_stop;
pub mod sync_cache;
pub mod test_unit_ready;
pub mod verify;
pub mod write;

pub use dispatch::{complete_data_out, dispatch};

/// A command ended in CHECK CONDITION with the carried sense.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("CHECK CONDITION: {} ({})", .0.key(), .0.description())]
pub struct ScsiError(pub SenseCode);

impl ScsiError {
    #[inline]
    pub fn sense(&self) -> SenseCode {
        self.0
    }
}

impl From<SenseCode> for ScsiError {
    fn from(code: SenseCode) -> Self {
        ScsiError(code)
    }
}

/// Everything a handler sees of the current command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandContext {
    /// CDB, zero padded to the longest form.
    pub cdb: [u8; CDB_MAX],
    /// Addressed logical unit.
    pub lun: u8,
    /// Bit `n` set when unit `n` of this target is attached.
    pub lun_map: u8,
}

impl CommandContext {
    pub fn new(cdb: &[u8]) -> Self {
        let mut buf = [0u8; CDB_MAX];
        let n = cdb.len().min(CDB_MAX);
        buf[..n].copy_from_slice(&cdb[..n]);
        Self {
            cdb: buf,
            lun: 0,
            lun_map: 0x01,
        }
    }

    pub fn with_lun(mut self, lun: u8, lun_map: u8) -> Self {
        self.lun = lun;
        self.lun_map = lun_map;
        self
    }

    #[inline]
    pub fn opcode(&self) -> u8 {
        self.cdb[0]
    }

    /// Service action field of 0x9E / 0x9F.
    #[inline]
    pub fn service_action(&self) -> u8 {
        self.cdb[1] & 0x1F
    }
}

impl From<ScsiOpcode> for CommandContext {
    fn from(op: ScsiOpcode) -> Self {
        Self::new(&[op.into()])
    }
}

/// What the controller does after a handler succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Straight to Status with GOOD.
    Status,
    /// Send these bytes in Data-In; an empty buffer skips the data phase.
    DataIn(Vec<u8>),
    /// Stream `blocks` blocks from `lba` in Data-In, one block per step.
    ReadBlocks { lba: u64, blocks: u64 },
    /// Receive `length` bytes in Data-Out and hand them to `sink`.
    DataOut { length: usize, sink: DataSink },
    /// Receive and store `blocks` blocks at `lba`, one block per step.
    WriteBlocks { lba: u64, blocks: u64 },
    /// Receive `blocks` blocks and compare them with the medium.
    VerifyBlocks { lba: u64, blocks: u64 },
}

/// Consumer of a Data-Out parameter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSink {
    ModeSelect { ten: bool },
    /// Accepted and dropped (SASI ASSIGN / SPECIFY).
    Discard,
    /// Queued on a host bridge.
    BridgeMessage,
}
