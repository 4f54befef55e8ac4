// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, info, trace, warn};

use crate::{
    bus::{Bus, BusError, BusSignals, Phase},
    cfg::config::{BusConfig, TARGET_MAX},
    target::Registry,
};

/// What one arbitration cycle ended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// No selection within one poll interval.
    Idle,
    /// BSY stayed asserted past the settle ceiling.
    Busy,
    /// SEL was gone once BSY cleared.
    Spurious,
    /// No controller answered the selected ids.
    Unclaimed,
    /// `target` ran a transaction of `steps` phase steps back to BusFree.
    Completed { target: u8, steps: u64 },
    /// The stop token fired.
    Cancelled,
}

/// Watches the bus for selections and drives the selected controller
/// until the bus is free again.
pub struct Arbiter<B: Bus> {
    bus: B,
    registry: Arc<Registry>,
    busy_settle: Duration,
    select_poll: Duration,
}

impl<B: Bus> Arbiter<B> {
    pub fn new(bus: B, registry: Arc<Registry>, cfg: &BusConfig) -> Self {
        Self {
            bus,
            registry,
            busy_settle: cfg.busy_settle,
            select_poll: cfg.select_poll,
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn into_bus(self) -> B {
        self.bus
    }

    /// Re-samples while the initiator still drives BSY. `None` once the
    /// settle ceiling is reached.
    fn settle(&mut self) -> Option<BusSignals> {
        let start = self.bus.now();
        loop {
            let signals = self.bus.acquire();
            if !signals.contains(BusSignals::BSY) {
                return Some(signals);
            }
            if self.bus.now().saturating_sub(start) >= self.busy_settle {
                return None;
            }
        }
    }

    /// One arbitration cycle: wait for SEL, let BSY settle, find the
    /// selected controller and run its transaction to BusFree.
    ///
    /// The registry stays locked from the selection scan to the end of the
    /// transaction.
    pub fn step(&mut self, cancel: &CancellationToken) -> Result<StepOutcome, BusError> {
        if cancel.is_cancelled() {
            return Ok(StepOutcome::Cancelled);
        }
        if !self.bus.wait_select_event(self.select_poll)? {
            return Ok(StepOutcome::Idle);
        }

        let Some(signals) = self.settle() else {
            debug!("BSY did not clear, selection abandoned");
            return Ok(StepOutcome::Busy);
        };
        if !signals.contains(BusSignals::SEL) {
            trace!("spurious selection wake");
            return Ok(StepOutcome::Spurious);
        }

        let mask = self.bus.dat();
        let registry = Arc::clone(&self.registry);
        let mut table = registry.lock();

        let mut selected = None;
        for id in (0..TARGET_MAX).filter(|id| mask & (1 << *id) != 0) {
            if let Some(controller) = table.controller_mut(id)
                && controller.process(&mut self.bus) == Phase::Selection
            {
                selected = Some(id);
                break;
            }
        }
        let Some(controller) = selected.and_then(|id| table.controller_mut(id)) else {
            trace!(mask, "no controller answered");
            return Ok(StepOutcome::Unclaimed);
        };

        let target = controller.id();
        debug!(target, mask = %format!("{mask:#04x}"), "selected");
        let _span = debug_span!("transaction", target_id = target).entered();
        let mut steps = 1u64;
        loop {
            if cancel.is_cancelled() {
                warn!(target, phase = %controller.phase(), "stopped mid-transaction");
                controller.reset();
                self.bus.reset();
                return Ok(StepOutcome::Cancelled);
            }
            steps += 1;
            if controller.process(&mut self.bus) == Phase::BusFree {
                break;
            }
        }
        trace!(target, steps, "transaction finished");
        Ok(StepOutcome::Completed { target, steps })
    }

    /// Runs arbitration cycles until `cancel` fires. Bus errors end only
    /// the cycle they occur in.
    pub fn run(&mut self, cancel: &CancellationToken) {
        info!("arbiter started");
        loop {
            match self.step(cancel) {
                Ok(StepOutcome::Cancelled) => break,
                Ok(StepOutcome::Busy) => warn!("BSY held past the settle ceiling"),
                Ok(_) => {},
                Err(e) => warn!("selection wait failed: {e}"),
            }
        }
        self.bus.reset();
        info!("arbiter stopped");
    }
}
