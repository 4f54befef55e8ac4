// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;

use tracing::{debug, trace, warn};

use crate::{
    bus::{Bus, BusSignals, Phase},
    cfg::config::UNIT_MAX,
    control_block::{self, CommandContext, Outcome, ScsiError, inquiry, request_sense},
    device::{Device, LogicalUnit},
    models::{
        opcode::{CDB_MAX, ScsiOpcode, cdb_length},
        sense_data::SenseCode,
        status::{Message, ScsiStatus},
    },
    state_machine::{common::Transition, transfer::Transfer},
};

/// Protocol family spoken by every unit of one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerMode {
    Sasi,
    Scsi,
}

impl ControllerMode {
    pub fn for_unit(unit: &Device) -> Self {
        if unit.is_sasi() {
            ControllerMode::Sasi
        } else {
            ControllerMode::Scsi
        }
    }
}

impl fmt::Display for ControllerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ControllerMode::Sasi => "SASI",
            ControllerMode::Scsi => "SCSI",
        })
    }
}

/// Counters kept across transactions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ControllerStats {
    pub selections: u64,
    pub commands: u64,
    pub check_conditions: u64,
    pub resets: u64,
}

/// Phase state machine of one target id and the units behind it.
///
/// [`Controller::process`] performs at most one phase step per call. Data
/// phases of block commands move one block per call.
#[derive(Debug)]
pub struct Controller {
    id: u8,
    mode: ControllerMode,
    units: [Option<Device>; UNIT_MAX],
    phase: Phase,
    cdb: [u8; CDB_MAX],
    cdb_len: usize,
    /// LUN from an IDENTIFY message of this transaction.
    identified: Option<u8>,
    /// LUN the current command addresses.
    lun: u8,
    status: ScsiStatus,
    transfer: Option<Transfer>,
    /// Status and COMMAND COMPLETE went out for this transaction.
    completed: bool,
    stats: ControllerStats,
}

impl Controller {
    pub fn new(id: u8, mode: ControllerMode) -> Self {
        Self {
            id,
            mode,
            units: std::array::from_fn(|_| None),
            phase: Phase::BusFree,
            cdb: [0; CDB_MAX],
            cdb_len: 0,
            identified: None,
            lun: 0,
            status: ScsiStatus::Good,
            transfer: None,
            completed: false,
            stats: ControllerStats::default(),
        }
    }

    #[inline]
    pub fn id(&self) -> u8 {
        self.id
    }

    #[inline]
    pub fn mode(&self) -> ControllerMode {
        self.mode
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn stats(&self) -> ControllerStats {
        self.stats
    }

    pub fn unit(&self, lun: usize) -> Option<&Device> {
        self.units.get(lun)?.as_ref()
    }

    pub fn unit_mut(&mut self, lun: usize) -> Option<&mut Device> {
        self.units.get_mut(lun)?.as_mut()
    }

    /// Stores `device` at `lun` (`< UNIT_MAX`), returning the unit it
    /// replaces.
    pub fn set_unit(&mut self, lun: usize, device: Device) -> Option<Device> {
        self.units[lun].replace(device)
    }

    pub fn take_unit(&mut self, lun: usize) -> Option<Device> {
        self.units.get_mut(lun)?.take()
    }

    /// Attached units with their numbers.
    pub fn units(&self) -> impl Iterator<Item = (usize, &Device)> {
        self.units
            .iter()
            .enumerate()
            .filter_map(|(n, unit)| unit.as_ref().map(|u| (n, u)))
    }

    pub fn units_mut(&mut self) -> impl Iterator<Item = &mut Device> {
        self.units.iter_mut().flatten()
    }

    pub fn has_units(&self) -> bool {
        self.units.iter().any(Option::is_some)
    }

    /// Bit `n` set for every attached unit `n`.
    pub fn lun_map(&self) -> u8 {
        self.units().fold(0u8, |map, (n, _)| map | (1 << n))
    }

    /// Returns to BusFree, drops the current command and puts every unit
    /// through a reset: locks released, "power on, reset" queued.
    pub fn reset(&mut self) {
        self.phase = Phase::BusFree;
        self.clear_command();
        for unit in self.units_mut() {
            let state = unit.state_mut();
            state.set_locked(false);
            state.queue_attention(SenseCode::PowerOnReset);
        }
    }

    /// Advances the protocol by at most one phase step and returns the
    /// phase reached.
    pub fn process(&mut self, bus: &mut dyn Bus) -> Phase {
        let signals = bus.acquire();
        if signals.contains(BusSignals::RST) {
            self.bus_reset(bus);
            return self.phase;
        }

        let transition = match self.phase {
            Phase::BusFree => self.bus_free(signals, bus),
            Phase::Selection => self.selection(bus),
            Phase::MsgOut => self.msg_out(bus),
            Phase::Command => self.command(bus),
            Phase::DataIn => self.data_in(bus),
            Phase::DataOut => self.data_out(bus),
            Phase::Status => self.status(bus),
            Phase::MsgIn => self.msg_in(bus),
        };
        match transition {
            Transition::Next(phase) => self.enter(phase, bus),
            Transition::Stay => {},
            Transition::Done => self.enter(Phase::BusFree, bus),
        }
        self.phase
    }

    fn enter(&mut self, phase: Phase, bus: &mut dyn Bus) {
        match phase {
            Phase::BusFree => {
                for line in [
                    BusSignals::REQ,
                    BusSignals::MSG,
                    BusSignals::CD,
                    BusSignals::IO,
                    BusSignals::BSY,
                ] {
                    bus.set_signal(line, false);
                }
                self.clear_command();
            },
            Phase::Selection => {
                bus.set_signal(BusSignals::BSY, true);
                self.stats.selections += 1;
            },
            _ => bus.set_phase(phase),
        }
        trace!(id = self.id, from = %self.phase, to = %phase, "phase");
        self.phase = phase;
    }

    fn clear_command(&mut self) {
        self.cdb = [0; CDB_MAX];
        self.cdb_len = 0;
        self.identified = None;
        self.lun = 0;
        self.transfer = None;
        self.completed = false;
    }

    fn bus_reset(&mut self, bus: &mut dyn Bus) {
        warn!(id = self.id, phase = %self.phase, "bus reset");
        self.stats.resets += 1;
        self.reset();
        bus.reset();
    }

    fn bus_free(&mut self, signals: BusSignals, bus: &mut dyn Bus) -> Transition<Phase> {
        if !signals.contains(BusSignals::SEL) || signals.contains(BusSignals::BSY) {
            return Transition::Stay;
        }
        if bus.dat() & (1 << self.id) == 0 || !self.has_units() {
            return Transition::Stay;
        }
        Transition::Next(Phase::Selection)
    }

    fn selection(&mut self, bus: &mut dyn Bus) -> Transition<Phase> {
        if !bus.wait_signal(BusSignals::SEL, false) {
            if bus.acquire().contains(BusSignals::RST) {
                self.bus_reset(bus);
            } else {
                warn!(id = self.id, "initiator kept SEL asserted");
            }
            return Transition::Done;
        }
        self.status = ScsiStatus::Good;
        let attention = bus.acquire().contains(BusSignals::ATN);
        if self.mode == ControllerMode::Scsi && attention {
            Transition::Next(Phase::MsgOut)
        } else {
            Transition::Next(Phase::Command)
        }
    }

    fn msg_out(&mut self, bus: &mut dyn Bus) -> Transition<Phase> {
        let mut byte = [0u8; 1];
        if bus.receive_handshake(&mut byte) != 1 {
            return self.error(bus);
        }
        match Message::from(byte[0]) {
            Message::Identify { lun } => {
                trace!(id = self.id, lun, "IDENTIFY");
                self.identified = Some(lun);
            },
            Message::Abort => {
                debug!(id = self.id, "ABORT");
                return Transition::Done;
            },
            Message::BusDeviceReset => {
                debug!(id = self.id, "BUS DEVICE RESET");
                self.stats.resets += 1;
                self.reset();
                return Transition::Done;
            },
            other => trace!(id = self.id, ?other, "message ignored"),
        }

        if bus.acquire().contains(BusSignals::ATN) {
            Transition::Stay
        } else if self.completed {
            Transition::Done
        } else {
            Transition::Next(Phase::Command)
        }
    }

    fn command(&mut self, bus: &mut dyn Bus) -> Transition<Phase> {
        self.lun = self.identified.unwrap_or(0);
        self.cdb = [0; CDB_MAX];
        let count = bus.command_handshake(&mut self.cdb);
        if count == 0 || count != cdb_length(self.cdb[0]) {
            warn!(id = self.id, count, "short command phase");
            return self.error(bus);
        }
        self.cdb_len = count;
        self.stats.commands += 1;
        self.execute()
    }

    /// Resolves the LUN and runs the received CDB.
    fn execute(&mut self) -> Transition<Phase> {
        let cdb_lun = self.cdb[1] >> 5;
        let lun = match self.mode {
            ControllerMode::Scsi => self.identified.unwrap_or(cdb_lun),
            ControllerMode::Sasi => cdb_lun,
        } & 0x07;
        self.lun = lun;

        let cdb = &self.cdb[..self.cdb_len];
        debug!(id = self.id, lun, cdb = %hex::encode(cdb), "command");
        let ctx = CommandContext::new(cdb).with_lun(lun, self.lun_map());

        let result = match self.units.get_mut(lun as usize).and_then(Option::as_mut) {
            Some(unit) => control_block::dispatch(unit, &ctx),
            None => self.missing_lun(&ctx),
        };
        match result {
            Ok(outcome) => self.begin(outcome),
            Err(e) => self.check_condition(e),
        }
    }

    /// Commands addressed to a LUN with no unit behind it.
    fn missing_lun(&self, ctx: &CommandContext) -> Result<Outcome, ScsiError> {
        let sasi = self.mode == ControllerMode::Sasi;
        match ScsiOpcode::try_from(ctx.opcode()) {
            Ok(ScsiOpcode::Inquiry) if !sasi => inquiry::missing_lun(self.unit(0), ctx),
            Ok(ScsiOpcode::RequestSense) => Ok(Outcome::DataIn(request_sense::encode(
                SenseCode::LogicalUnitNotSupported,
                ctx,
                sasi,
            ))),
            _ => Err(ScsiError(SenseCode::LogicalUnitNotSupported)),
        }
    }

    fn begin(&mut self, outcome: Outcome) -> Transition<Phase> {
        self.status = ScsiStatus::Good;
        match Transfer::from_outcome(outcome) {
            None => Transition::Next(Phase::Status),
            Some(transfer) => {
                let phase = if transfer.is_data_out() {
                    Phase::DataOut
                } else {
                    Phase::DataIn
                };
                self.transfer = Some(transfer);
                Transition::Next(phase)
            },
        }
    }

    /// Ends the command with CHECK CONDITION, leaving the sense in the unit.
    fn check_condition(&mut self, e: ScsiError) -> Transition<Phase> {
        let code = e.sense();
        debug!(
            id = self.id,
            lun = self.lun,
            key = %code.key(),
            sense = code.description(),
            "CHECK CONDITION"
        );
        if let Some(unit) = self.unit_mut(self.lun as usize) {
            unit.state_mut().set_sense(code);
        }
        self.status = ScsiStatus::CheckCondition;
        self.transfer = None;
        self.stats.check_conditions += 1;
        Transition::Next(Phase::Status)
    }

    /// Runs `f` on the unit of the current command.
    fn with_unit<T>(
        &mut self,
        f: impl FnOnce(&mut Device) -> Result<T, ScsiError>,
    ) -> Result<T, ScsiError> {
        match self.unit_mut(self.lun as usize) {
            Some(unit) => f(unit),
            None => Err(ScsiError(SenseCode::LogicalUnitNotSupported)),
        }
    }

    fn data_in(&mut self, bus: &mut dyn Bus) -> Transition<Phase> {
        let Some(transfer) = self.transfer.take() else {
            return Transition::Next(Phase::Status);
        };
        match transfer {
            Transfer::Buffer(data) => {
                if bus.send_handshake(&data) != data.len() {
                    return self.error(bus);
                }
                Transition::Next(Phase::Status)
            },
            Transfer::Read(mut cursor) => {
                let block = match self.with_unit(|unit| unit.state_mut().read_block(cursor.lba)) {
                    Ok(block) => block,
                    Err(e) => return self.check_condition(e),
                };
                if bus.send_handshake(&block) != block.len() {
                    return self.error(bus);
                }
                if cursor.advance() {
                    Transition::Next(Phase::Status)
                } else {
                    self.transfer = Some(Transfer::Read(cursor));
                    Transition::Stay
                }
            },
            _ => self.check_condition(ScsiError(SenseCode::InternalTargetFailure)),
        }
    }

    fn data_out(&mut self, bus: &mut dyn Bus) -> Transition<Phase> {
        let Some(transfer) = self.transfer.take() else {
            return Transition::Next(Phase::Status);
        };
        match transfer {
            Transfer::Collect { length, sink } => {
                let mut data = vec![0u8; length];
                if bus.receive_handshake(&mut data) != length {
                    return self.error(bus);
                }
                match self.with_unit(|unit| control_block::complete_data_out(unit, sink, &data)) {
                    Ok(()) => Transition::Next(Phase::Status),
                    Err(e) => self.check_condition(e),
                }
            },
            Transfer::Write(mut cursor) | Transfer::Verify(mut cursor) => {
                let verify = matches!(transfer, Transfer::Verify(_));
                let size = self
                    .unit(self.lun as usize)
                    .map_or(0, |unit| unit.state().sector_size() as usize);
                let mut block = vec![0u8; size];
                if bus.receive_handshake(&mut block) != size {
                    return self.error(bus);
                }
                let lba = cursor.lba;
                let result = self.with_unit(|unit| {
                    let state = unit.state_mut();
                    if !verify {
                        return state.write_block(lba, &block);
                    }
                    if state.read_block(lba)? != block {
                        return Err(ScsiError(SenseCode::Miscompare));
                    }
                    Ok(())
                });
                if let Err(e) = result {
                    return self.check_condition(e);
                }
                if cursor.advance() {
                    Transition::Next(Phase::Status)
                } else {
                    self.transfer = Some(if verify {
                        Transfer::Verify(cursor)
                    } else {
                        Transfer::Write(cursor)
                    });
                    Transition::Stay
                }
            },
            Transfer::Buffer(_) | Transfer::Read(_) => {
                self.check_condition(ScsiError(SenseCode::InternalTargetFailure))
            },
        }
    }

    fn status(&mut self, bus: &mut dyn Bus) -> Transition<Phase> {
        if bus.send_handshake(&[u8::from(self.status)]) != 1 {
            return self.error(bus);
        }
        Transition::Next(Phase::MsgIn)
    }

    fn msg_in(&mut self, bus: &mut dyn Bus) -> Transition<Phase> {
        if bus.send_handshake(&[Message::COMMAND_COMPLETE]) != 1 {
            return self.error(bus);
        }
        self.completed = true;
        let attention = bus.acquire().contains(BusSignals::ATN);
        if self.mode == ControllerMode::Scsi && attention {
            Transition::Next(Phase::MsgOut)
        } else {
            Transition::Done
        }
    }

    /// Handshake failure in the current phase.
    ///
    /// RST resets everything. A failure while reporting status ends the
    /// transaction; anywhere else the command ends with a data phase error.
    fn error(&mut self, bus: &mut dyn Bus) -> Transition<Phase> {
        if bus.acquire().contains(BusSignals::RST) {
            self.bus_reset(bus);
            return Transition::Done;
        }
        warn!(id = self.id, phase = %self.phase, "handshake failed");
        if matches!(self.phase, Phase::Status | Phase::MsgIn) {
            return Transition::Done;
        }
        self.check_condition(ScsiError(SenseCode::DataPhaseError))
    }
}
