// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Per-target protocol engine driving one transaction phase by phase.

/// Common structures and traits for state machines.
pub mod common;
/// Controller: the phase state machine of one target id.
pub mod controller;
/// Data phase bookkeeping.
pub mod transfer;

pub use controller::{Controller, ControllerMode, ControllerStats};
