// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::control_block::{DataSink, Outcome};

/// Position inside a multi-block transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockCursor {
    pub lba: u64,
    pub remaining: u64,
}

impl BlockCursor {
    pub fn new(lba: u64, blocks: u64) -> Self {
        Self {
            lba,
            remaining: blocks,
        }
    }

    /// Moves past one block; true when nothing is left.
    pub fn advance(&mut self) -> bool {
        self.lba += 1;
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }
}

/// Data phase still to run for the current command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transfer {
    /// Prepared Data-In bytes.
    Buffer(Vec<u8>),
    /// Blocks read from the medium one per step.
    Read(BlockCursor),
    /// Parameter list collected in one step.
    Collect { length: usize, sink: DataSink },
    /// Blocks written to the medium one per step.
    Write(BlockCursor),
    /// Blocks compared with the medium one per step.
    Verify(BlockCursor),
}

impl Transfer {
    /// Builds the data stage of `outcome`; `None` when it goes straight to
    /// Status.
    pub fn from_outcome(outcome: Outcome) -> Option<Self> {
        match outcome {
            Outcome::Status => None,
            Outcome::DataIn(data) if data.is_empty() => None,
            Outcome::DataIn(data) => Some(Transfer::Buffer(data)),
            Outcome::ReadBlocks { lba, blocks } => Some(Transfer::Read(BlockCursor::new(lba, blocks))),
            Outcome::DataOut { length, sink } => Some(Transfer::Collect { length, sink }),
            Outcome::WriteBlocks { lba, blocks } => {
                Some(Transfer::Write(BlockCursor::new(lba, blocks)))
            },
            Outcome::VerifyBlocks { lba, blocks } => {
                Some(Transfer::Verify(BlockCursor::new(lba, blocks)))
            },
        }
    }

    /// True when the initiator sends the data.
    pub fn is_data_out(&self) -> bool {
        matches!(
            self,
            Transfer::Collect { .. } | Transfer::Write(_) | Transfer::Verify(_)
        )
    }
}
