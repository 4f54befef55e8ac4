// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A bus living entirely in memory.
//!
//! The target side behaves exactly as on hardware. The initiator side is an
//! optional [`Initiator`] script that reacts every time the target samples
//! the lines: it selects, answers REQ with ACK, feeds CDB / message / data
//! bytes and records everything the target sends back.

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use crate::bus::{Bus, BusSignals, DEFAULT_HANDSHAKE_TIMEOUT, Phase};

/// Time source of a [`VirtualBus`].
#[derive(Debug, Clone)]
pub enum VirtualClock {
    /// Advances by `tick` on every sample and every pause; never sleeps.
    Manual { now: Duration, tick: Duration },
    /// Wall clock; `pause` sleeps for `idle`.
    System { origin: Instant, idle: Duration },
}

impl VirtualClock {
    pub fn manual(tick: Duration) -> Self {
        VirtualClock::Manual {
            now: Duration::ZERO,
            tick,
        }
    }

    pub fn system(idle: Duration) -> Self {
        VirtualClock::System {
            origin: Instant::now(),
            idle,
        }
    }

    fn now(&self) -> Duration {
        match self {
            VirtualClock::Manual { now, .. } => *now,
            VirtualClock::System { origin, .. } => origin.elapsed(),
        }
    }

    fn tick(&mut self) {
        if let VirtualClock::Manual { now, tick } = self {
            *now += *tick;
        }
    }

    fn pause(&mut self) {
        match self {
            VirtualClock::Manual { now, tick } => *now += *tick,
            VirtualClock::System { idle, .. } => std::thread::sleep(*idle),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Stage {
    #[default]
    Selecting,
    Connected,
    Finished,
}

/// Scripted initiator for one transaction.
#[derive(Debug, Default, Clone)]
pub struct Initiator {
    select_mask: u8,
    settle: u32,
    message_out: VecDeque<u8>,
    late_message_out: Vec<u8>,
    command: VecDeque<u8>,
    data_out: VecDeque<u8>,
    reset_after: Option<usize>,
    transferred: usize,
    attention: bool,
    stage: Stage,
    /// Bytes received in Data-In.
    pub data_in: Vec<u8>,
    /// Bytes received in Status.
    pub status: Vec<u8>,
    /// Bytes received in Message-In.
    pub message_in: Vec<u8>,
    /// Information phases in the order the target entered them.
    pub phases: Vec<Phase>,
}

impl Initiator {
    /// Selects every target whose bit is set in `mask`.
    pub fn select(mask: u8) -> Self {
        Self {
            select_mask: mask,
            ..Default::default()
        }
    }

    /// Selects a single target id.
    pub fn select_id(id: u8) -> Self {
        Self::select(1 << id)
    }

    /// Keeps BSY asserted for `samples` samples after raising SEL.
    pub fn busy_settle(mut self, samples: u32) -> Self {
        self.settle = samples;
        self
    }

    /// Raises ATN with selection and sends `messages` in Message-Out.
    pub fn with_messages(mut self, messages: &[u8]) -> Self {
        self.message_out.extend(messages);
        self.attention = !self.message_out.is_empty();
        self
    }

    /// Raises ATN once the status byte has arrived.
    pub fn messages_after_status(mut self, messages: &[u8]) -> Self {
        self.late_message_out = messages.to_vec();
        self
    }

    pub fn command(mut self, cdb: &[u8]) -> Self {
        self.command.extend(cdb);
        self
    }

    pub fn data_out(mut self, bytes: &[u8]) -> Self {
        self.data_out.extend(bytes);
        self
    }

    /// Pulses RST once `bytes` bytes have been exchanged.
    pub fn reset_after(mut self, bytes: usize) -> Self {
        self.reset_after = Some(bytes);
        self
    }

    /// True once the target released BSY after being connected.
    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Finished
    }

    /// The status byte, when one was received.
    pub fn status_byte(&self) -> Option<u8> {
        self.status.first().copied()
    }

    fn record(&mut self, phase: Phase) {
        if self.phases.last() != Some(&phase) {
            self.phases.push(phase);
        }
    }
}

/// Bus whose both sides live in this process.
#[derive(Debug)]
pub struct VirtualBus {
    target: BusSignals,
    initiator: BusSignals,
    data: u8,
    clock: VirtualClock,
    timeout: Duration,
    script: Option<Initiator>,
    samples: u64,
}

impl VirtualBus {
    pub fn new(clock: VirtualClock) -> Self {
        Self {
            target: BusSignals::empty(),
            initiator: BusSignals::empty(),
            data: 0,
            clock,
            timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            script: None,
            samples: 0,
        }
    }

    /// Bus with a manual clock advancing 1 ms per sample.
    pub fn manual() -> Self {
        Self::new(VirtualClock::manual(Duration::from_millis(1)))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Installs a new initiator script, replacing any finished one.
    pub fn attach_initiator(&mut self, initiator: Initiator) {
        self.initiator = BusSignals::empty();
        self.script = Some(initiator);
    }

    pub fn initiator(&self) -> Option<&Initiator> {
        self.script.as_ref()
    }

    pub fn take_initiator(&mut self) -> Option<Initiator> {
        self.initiator = BusSignals::empty();
        self.script.take()
    }

    /// Lines currently driven by the target.
    pub fn target_lines(&self) -> BusSignals {
        self.target
    }

    /// Number of samples taken so far.
    pub fn samples(&self) -> u64 {
        self.samples
    }

    fn react(&mut self) {
        let Some(script) = self.script.as_mut() else {
            return;
        };
        match script.stage {
            Stage::Selecting => {
                if self.target.contains(BusSignals::BSY) {
                    self.initiator.remove(BusSignals::SEL | BusSignals::BSY);
                    script.stage = Stage::Connected;
                    return;
                }
                let mut lines = BusSignals::SEL;
                if script.settle > 0 {
                    script.settle -= 1;
                    lines |= BusSignals::BSY;
                }
                if script.attention {
                    lines |= BusSignals::ATN;
                }
                self.initiator = lines;
                self.data = script.select_mask;
            },
            Stage::Connected => {
                if !self.target.contains(BusSignals::BSY) {
                    script.stage = Stage::Finished;
                    self.initiator = BusSignals::empty();
                    return;
                }
                if script.reset_after.is_some_and(|n| script.transferred >= n) {
                    script.reset_after = None;
                    self.initiator = BusSignals::RST;
                    return;
                }
                let req = self.target.contains(BusSignals::REQ);
                let ack = self.initiator.contains(BusSignals::ACK);
                if req && !ack {
                    let Some(phase) = Phase::from_lines(self.target) else {
                        return;
                    };
                    script.record(phase);
                    if phase.is_target_to_initiator() {
                        match phase {
                            Phase::DataIn => script.data_in.push(self.data),
                            Phase::Status => {
                                script.status.push(self.data);
                                if !script.late_message_out.is_empty() {
                                    let late = std::mem::take(&mut script.late_message_out);
                                    script.message_out.extend(late);
                                    self.initiator.insert(BusSignals::ATN);
                                }
                            },
                            _ => script.message_in.push(self.data),
                        }
                    } else {
                        let next = match phase {
                            Phase::MsgOut => script.message_out.pop_front(),
                            Phase::Command => script.command.pop_front(),
                            _ => script.data_out.pop_front(),
                        };
                        let Some(byte) = next else {
                            return;
                        };
                        self.data = byte;
                        if phase == Phase::MsgOut && script.message_out.is_empty() {
                            self.initiator.remove(BusSignals::ATN);
                        }
                    }
                    script.transferred += 1;
                    self.initiator.insert(BusSignals::ACK);
                } else if !req && ack {
                    self.initiator.remove(BusSignals::ACK);
                }
            },
            Stage::Finished => {},
        }
    }
}

impl Bus for VirtualBus {
    fn reset(&mut self) {
        self.target = BusSignals::empty();
        self.initiator.remove(BusSignals::RST | BusSignals::ACK | BusSignals::ATN);
        self.data = 0;
        if let Some(script) = self.script.as_mut() {
            script.stage = Stage::Finished;
        }
    }

    fn acquire(&mut self) -> BusSignals {
        self.samples += 1;
        self.clock.tick();
        self.react();
        self.target | self.initiator
    }

    fn set_signal(&mut self, line: BusSignals, asserted: bool) {
        self.target.set(line, asserted);
    }

    fn dat(&self) -> u8 {
        self.data
    }

    fn set_dat(&mut self, value: u8) {
        self.data = value;
    }

    fn now(&self) -> Duration {
        self.clock.now()
    }

    fn pause(&mut self) {
        self.clock.pause();
    }

    fn handshake_timeout(&self) -> Duration {
        self.timeout
    }
}
