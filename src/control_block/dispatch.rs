// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use tracing::{debug, trace};

use crate::{
    control_block::{
        CommandContext, DataSink, Outcome, ScsiError,
        common::Access,
        format_unit, inquiry, mode_select, mode_sense, read, read_capacity, read_long,
        report_luns, request_sense, sasi, seek, start_stop, sync_cache, test_unit_ready,
        verify, write,
    },
    device::{Device, LogicalUnit},
    models::{
        opcode::{SA_LONG16, SA_READ_CAPACITY16, ScsiOpcode},
        sense_data::SenseCode,
    },
};

/// Routes one command to its handler.
///
/// Every command but REQUEST SENSE starts by clearing the unit's sense, and
/// every command but INQUIRY and REQUEST SENSE first reports a pending
/// unit attention. The device type then gets a chance to claim the
/// opcode before the common table is consulted.
pub fn dispatch(unit: &mut Device, ctx: &CommandContext) -> Result<Outcome, ScsiError> {
    let op = ScsiOpcode::try_from(ctx.opcode());
    trace!(opcode = ctx.opcode(), lun = ctx.lun, kind = %unit.kind(), "dispatch");

    if !matches!(op, Ok(ScsiOpcode::RequestSense)) {
        unit.state_mut().set_sense(SenseCode::NoSense);
    }
    if !matches!(op, Ok(ScsiOpcode::Inquiry | ScsiOpcode::RequestSense))
        && let Some(code) = unit.state_mut().take_attention()
    {
        debug!(?code, "reporting unit attention");
        return Err(ScsiError(code));
    }

    if let Some(result) = unit.dispatch_specific(ctx) {
        return result;
    }

    let op = op.map_err(|e| {
        debug!("{e}");
        ScsiError(SenseCode::InvalidCommandOperationCode)
    })?;
    if !unit.command_set().accepts(op) {
        debug!(%op, kind = %unit.kind(), "opcode not supported by device");
        return Err(ScsiError(SenseCode::InvalidCommandOperationCode));
    }

    use ScsiOpcode::*;
    match op {
        TestUnitReady => test_unit_ready::execute(unit.state()),
        SendDiagnostic => test_unit_ready::send_diagnostic(),
        Rezero => seek::rezero(unit.state()),
        Seek6 => seek::seek(unit.state(), ctx, Access::Rw6),
        Seek10 => seek::seek(unit.state(), ctx, Access::Rw10),
        RequestSense => request_sense::execute(unit, ctx),
        FormatUnit | FormatTrack => format_unit::format(unit.state(), ctx),
        ReassignBlocks => format_unit::reassign(unit.state()),
        ReadDefectData10 => format_unit::read_defect_data(ctx),
        Read6 => read::execute(unit.state(), ctx, Access::Rw6),
        Read10 => read::execute(unit.state(), ctx, Access::Rw10),
        Read16 => read::execute(unit.state(), ctx, Access::Rw16),
        Write6 => write::execute(unit.state(), ctx, Access::Rw6),
        Write10 | WriteAndVerify10 => write::execute(unit.state(), ctx, Access::Rw10),
        Write16 => write::execute(unit.state(), ctx, Access::Rw16),
        Verify10 => verify::execute(unit.state(), ctx, Access::Rw10),
        Verify16 => verify::execute(unit.state(), ctx, Access::Rw16),
        Assign => sasi::assign(),
        Specify => sasi::specify(),
        Inquiry => inquiry::execute(unit, ctx),
        ModeSelect6 => mode_select::execute(ctx, false),
        ModeSelect10 => mode_select::execute(ctx, true),
        ModeSense6 => mode_sense::mode_sense6(unit, ctx),
        ModeSense10 => mode_sense::mode_sense10(unit, ctx),
        StartStopUnit => start_stop::start_stop_unit(unit.state_mut(), ctx),
        PreventAllowMediumRemoval => start_stop::prevent_allow(unit.state_mut(), ctx),
        SynchronizeCache10 | SynchronizeCache16 => sync_cache::execute(unit.state_mut()),
        ReadCapacity10 => read_capacity::execute10(unit.state()),
        ReadLong10 | WriteLong10 => read_long::execute10(unit.state(), ctx),
        ServiceActionIn16 => match ctx.service_action() {
            SA_READ_CAPACITY16 => read_capacity::execute16(unit.state(), ctx),
            SA_LONG16 => read_long::execute16(unit.state(), ctx),
            _ => Err(ScsiError(SenseCode::InvalidFieldInCdb)),
        },
        ServiceActionOut16 => match ctx.service_action() {
            SA_LONG16 => read_long::execute16(unit.state(), ctx),
            _ => Err(ScsiError(SenseCode::InvalidFieldInCdb)),
        },
        ReportLuns => report_luns::execute(ctx),
        // claimed by the CD-ROM before the table is reached
        ReadToc => Err(ScsiError(SenseCode::InvalidCommandOperationCode)),
    }
}

/// Hands a completed Data-Out parameter list to its consumer.
pub fn complete_data_out(unit: &mut Device, sink: DataSink, data: &[u8]) -> Result<(), ScsiError> {
    match sink {
        DataSink::ModeSelect { ten } => mode_select::apply(unit.state(), ten, data),
        DataSink::Discard => Ok(()),
        DataSink::BridgeMessage => match unit {
            Device::HostBridge(bridge) => {
                bridge.push_message(data.to_vec());
                Ok(())
            },
            _ => Err(ScsiError(SenseCode::InternalTargetFailure)),
        },
    }
}
