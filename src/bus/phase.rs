// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;

use crate::bus::BusSignals;

/// Protocol stage of one target on the bus.
///
/// The information phases are encoded on the MSG, C/D and I/O lines,
/// driven by the target:
///
/// | MSG | C/D | I/O | phase       |
/// |-----|-----|-----|-------------|
/// |  0  |  0  |  0  | Data-Out    |
/// |  0  |  0  |  1  | Data-In     |
/// |  0  |  1  |  0  | Command     |
/// |  0  |  1  |  1  | Status      |
/// |  1  |  1  |  0  | Message-Out |
/// |  1  |  1  |  1  | Message-In  |
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    #[default]
    BusFree,
    Selection,
    MsgOut,
    Command,
    DataIn,
    DataOut,
    Status,
    MsgIn,
}

impl Phase {
    /// Phase-select lines the target drives in this phase.
    pub fn lines(self) -> BusSignals {
        match self {
            Phase::BusFree | Phase::Selection | Phase::DataOut => BusSignals::empty(),
            Phase::DataIn => BusSignals::IO,
            Phase::Command => BusSignals::CD,
            Phase::Status => BusSignals::CD | BusSignals::IO,
            Phase::MsgOut => BusSignals::MSG | BusSignals::CD,
            Phase::MsgIn => BusSignals::MSG | BusSignals::CD | BusSignals::IO,
        }
    }

    /// Decodes the information phase from a snapshot; `None` for the two
    /// reserved MSG encodings.
    pub fn from_lines(signals: BusSignals) -> Option<Self> {
        let msg = signals.contains(BusSignals::MSG);
        let cd = signals.contains(BusSignals::CD);
        let io = signals.contains(BusSignals::IO);
        Some(match (msg, cd, io) {
            (false, false, false) => Phase::DataOut,
            (false, false, true) => Phase::DataIn,
            (false, true, false) => Phase::Command,
            (false, true, true) => Phase::Status,
            (true, true, false) => Phase::MsgOut,
            (true, true, true) => Phase::MsgIn,
            (true, false, _) => return None,
        })
    }

    /// True when the target sends bytes to the initiator.
    #[inline]
    pub fn is_target_to_initiator(self) -> bool {
        self.lines().contains(BusSignals::IO)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::BusFree => "busfree",
            Phase::Selection => "selection",
            Phase::MsgOut => "msgout",
            Phase::Command => "command",
            Phase::DataIn => "datain",
            Phase::DataOut => "dataout",
            Phase::Status => "status",
            Phase::MsgIn => "msgin",
        })
    }
}
