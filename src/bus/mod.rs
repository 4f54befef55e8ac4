//! Bus interface seen by the target: signal lines, the phase encoding and
//! the REQ/ACK byte handshakes.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use thiserror::Error;

use crate::{
    cfg::{config::BusConfig, enums::BusBackend},
    models::opcode::{CDB_MAX, cdb_length},
};

/// Phase enumeration and MSG/C-D/I-O encoding.
pub mod phase;
/// In-memory bus with a scripted initiator.
pub mod virtual_bus;

pub use phase::Phase;

/// Bound applied to every single REQ/ACK wait unless a bus overrides it.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(3);

bitflags::bitflags! {
    /// Control lines of the parallel bus. DAT is read separately.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct BusSignals: u16 {
        const BSY = 1 << 0;
        const SEL = 1 << 1;
        const ATN = 1 << 2;
        const ACK = 1 << 3;
        const RST = 1 << 4;
        const MSG = 1 << 5;
        const CD  = 1 << 6;
        const IO  = 1 << 7;
        const REQ = 1 << 8;
    }
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus interface initialisation failed: {0}")]
    Init(String),
    #[error("selection wait interrupted")]
    Interrupted,
}

/// Electrical bus as driven by the target side.
///
/// Implementors provide the line primitives and a monotonic clock; phase
/// switching and the byte handshakes are built on top of them. `now` and
/// `pause` are the only time sources the protocol code uses, so a bus with
/// a manual clock makes every timeout deterministic.
pub trait Bus: Send {
    /// Brings the interface up. Failure here is fatal for the process.
    fn init(&mut self) -> Result<(), BusError> {
        Ok(())
    }

    /// Releases every line driven by the target.
    fn reset(&mut self);

    /// Samples all control lines and returns the snapshot.
    fn acquire(&mut self) -> BusSignals;

    fn set_signal(&mut self, line: BusSignals, asserted: bool);

    /// Current value of the 8-bit data bus.
    fn dat(&self) -> u8;

    fn set_dat(&mut self, value: u8);

    /// Monotonic time since the bus was opened.
    fn now(&self) -> Duration;

    /// Yields between two idle polls.
    fn pause(&mut self) {}

    fn handshake_timeout(&self) -> Duration {
        DEFAULT_HANDSHAKE_TIMEOUT
    }

    /// Drives MSG, C/D and I/O for `phase`.
    fn set_phase(&mut self, phase: Phase) {
        let lines = phase.lines();
        for line in [BusSignals::MSG, BusSignals::CD, BusSignals::IO] {
            self.set_signal(line, lines.contains(line));
        }
    }

    /// Waits until `line` reaches `asserted`. Gives up on RST or after the
    /// handshake timeout.
    fn wait_signal(&mut self, line: BusSignals, asserted: bool) -> bool {
        let timeout = self.handshake_timeout();
        let start = self.now();
        loop {
            let signals = self.acquire();
            if signals.contains(BusSignals::RST) {
                return false;
            }
            if signals.contains(line) == asserted {
                return true;
            }
            if self.now().saturating_sub(start) >= timeout {
                return false;
            }
        }
    }

    /// Polls for SEL for at most `timeout`.
    ///
    /// Returns `Ok(false)` when nothing happened so the caller can check its
    /// stop flag.
    fn wait_select_event(&mut self, timeout: Duration) -> Result<bool, BusError> {
        let start = self.now();
        loop {
            if self.acquire().contains(BusSignals::SEL) {
                return Ok(true);
            }
            if self.now().saturating_sub(start) >= timeout {
                return Ok(false);
            }
            self.pause();
        }
    }

    /// Receives bytes from the initiator; returns how many arrived.
    fn receive_handshake(&mut self, buf: &mut [u8]) -> usize {
        for (i, slot) in buf.iter_mut().enumerate() {
            self.set_signal(BusSignals::REQ, true);
            let acked = self.wait_signal(BusSignals::ACK, true);
            if acked {
                *slot = self.dat();
            }
            self.set_signal(BusSignals::REQ, false);
            if !acked || !self.wait_signal(BusSignals::ACK, false) {
                return i;
            }
        }
        buf.len()
    }

    /// Sends bytes to the initiator; returns how many were acknowledged.
    fn send_handshake(&mut self, buf: &[u8]) -> usize {
        for (i, byte) in buf.iter().enumerate() {
            self.set_dat(*byte);
            self.set_signal(BusSignals::REQ, true);
            let acked = self.wait_signal(BusSignals::ACK, true);
            self.set_signal(BusSignals::REQ, false);
            if !acked || !self.wait_signal(BusSignals::ACK, false) {
                return i;
            }
        }
        buf.len()
    }

    /// Receives a whole CDB. The opcode byte decides how many more bytes
    /// follow.
    fn command_handshake(&mut self, buf: &mut [u8; CDB_MAX]) -> usize {
        if self.receive_handshake(&mut buf[..1]) != 1 {
            return 0;
        }
        let len = cdb_length(buf[0]);
        1 + self.receive_handshake(&mut buf[1..len])
    }
}

impl<B: Bus + ?Sized> Bus for Box<B> {
    fn init(&mut self) -> Result<(), BusError> {
        (**self).init()
    }

    fn reset(&mut self) {
        (**self).reset();
    }

    fn acquire(&mut self) -> BusSignals {
        (**self).acquire()
    }

    fn set_signal(&mut self, line: BusSignals, asserted: bool) {
        (**self).set_signal(line, asserted);
    }

    fn dat(&self) -> u8 {
        (**self).dat()
    }

    fn set_dat(&mut self, value: u8) {
        (**self).set_dat(value);
    }

    fn now(&self) -> Duration {
        (**self).now()
    }

    fn pause(&mut self) {
        (**self).pause();
    }

    fn handshake_timeout(&self) -> Duration {
        (**self).handshake_timeout()
    }

    fn wait_select_event(&mut self, timeout: Duration) -> Result<bool, BusError> {
        (**self).wait_select_event(timeout)
    }
}

/// Sleep between idle polls of a bus without selection interrupts.
const IDLE_PAUSE: Duration = Duration::from_millis(1);

/// Opens and initialises the configured bus backend.
pub fn open(cfg: &BusConfig) -> Result<Box<dyn Bus>, BusError> {
    let mut bus: Box<dyn Bus> = match cfg.backend {
        BusBackend::Virtual => Box::new(
            virtual_bus::VirtualBus::new(virtual_bus::VirtualClock::system(IDLE_PAUSE))
                .with_timeout(cfg.handshake_timeout),
        ),
    };
    bus.init()?;
    Ok(bus)
}
