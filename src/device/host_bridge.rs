// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::collections::VecDeque;

use tracing::debug;

use crate::{
    cfg::enums::DeviceKind,
    control_block::{CommandContext, DataSink, Outcome, ScsiError},
    device::{CommandSet, DiskState, Identity, LogicalUnit},
    models::{opcode::ScsiOpcode, sense_data::SenseCode},
    utils::get_be24,
};

/// Largest payload accepted by SEND MESSAGE(10).
pub const MAX_MESSAGE_LEN: usize = 0x10000;
/// Messages kept before the oldest is dropped.
const QUEUE_DEPTH: usize = 64;

/// Processor device relaying messages between initiator and host.
///
/// The host side is a loopback queue: SEND MESSAGE(10) enqueues a payload,
/// GET MESSAGE(10) dequeues the oldest one.
#[derive(Debug)]
pub struct HostBridge {
    state: DiskState,
    queue: VecDeque<Vec<u8>>,
}

impl HostBridge {
    pub fn new() -> Self {
        let mut state = DiskState::new(&[], 0);
        state.set_ready(true);
        Self {
            state,
            queue: VecDeque::new(),
        }
    }

    /// Stores a payload received through SEND MESSAGE(10).
    pub fn push_message(&mut self, message: Vec<u8>) {
        if self.queue.len() == QUEUE_DEPTH {
            self.queue.pop_front();
        }
        debug!(len = message.len(), "bridge message queued");
        self.queue.push_back(message);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    fn get_message(&mut self, ctx: &CommandContext) -> Result<Outcome, ScsiError> {
        let alloc = get_be24(&ctx.cdb, 6) as usize;
        let mut message = self.queue.pop_front().unwrap_or_default();
        message.truncate(alloc);
        Ok(Outcome::DataIn(message))
    }

    fn send_message(&mut self, ctx: &CommandContext) -> Result<Outcome, ScsiError> {
        let length = get_be24(&ctx.cdb, 6) as usize;
        if length > MAX_MESSAGE_LEN {
            return Err(SenseCode::InvalidFieldInCdb.into());
        }
        if length == 0 {
            return Ok(Outcome::Status);
        }
        Ok(Outcome::DataOut {
            length,
            sink: DataSink::BridgeMessage,
        })
    }
}

impl Default for HostBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl LogicalUnit for HostBridge {
    fn kind(&self) -> DeviceKind {
        DeviceKind::HostBridge
    }

    fn state(&self) -> &DiskState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut DiskState {
        &mut self.state
    }

    fn identity(&self) -> Identity {
        Identity {
            peripheral_type: 0x03,
            vendor: "RSSCSI",
            product: "HOST BRIDGE",
            revision: "0100",
        }
    }

    fn command_set(&self) -> CommandSet {
        CommandSet::Processor
    }

    fn dispatch_specific(
        &mut self,
        ctx: &CommandContext,
    ) -> Option<Result<Outcome, ScsiError>> {
        match ScsiOpcode::try_from(ctx.opcode()).ok()? {
            // GET MESSAGE(10) shares its opcode with READ(10)
            ScsiOpcode::Read10 => Some(self.get_message(ctx)),
            // SEND MESSAGE(10) shares its opcode with WRITE(10)
            ScsiOpcode::Write10 => Some(self.send_message(ctx)),
            _ => None,
        }
    }
}
