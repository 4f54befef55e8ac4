// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The target side as a whole: the table of controllers, the bus arbiter
//! serving it and the process-wide instance.

use thiserror::Error;

use crate::{
    cfg::config::{TARGET_MAX, UNIT_MAX},
    device::DeviceError,
    state_machine::ControllerMode,
};

/// Selection loop.
pub mod arbiter;
/// Owning table of controllers and units.
pub mod registry;
/// Process-wide registry instance.
pub mod service;

pub use arbiter::{Arbiter, StepOutcome};
pub use registry::{Listing, Registry};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("target id {0} out of range (0..{TARGET_MAX})")]
    InvalidTarget(u8),
    #[error("unit {0} out of range (0..{UNIT_MAX})")]
    InvalidUnit(u8),
    #[error("id {id} is a {existing} controller, cannot attach a {requested} unit")]
    MixedProtocol {
        id: u8,
        existing: ControllerMode,
        requested: ControllerMode,
    },
    #[error("no unit attached at {id}:{unit}")]
    NotAttached { id: u8, unit: u8 },
    #[error("unit {id}:{unit} has no removable medium")]
    NotRemovable { id: u8, unit: u8 },
    #[error("unit {id}:{unit} refused to eject")]
    EjectRefused { id: u8, unit: u8 },
    #[error("unit {id}:{unit} cannot be write protected")]
    NotProtectable { id: u8, unit: u8 },
    #[error("registry already initialised")]
    AlreadyInitialized,
    #[error(transparent)]
    Device(#[from] DeviceError),
}
