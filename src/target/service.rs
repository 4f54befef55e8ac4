// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The registry shared by the arbiter and the administration side.
//!
//! It is set exactly once per process; a second [`init`] is an error rather
//! than a silent replacement.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::info;

use crate::target::{Registry, RegistryError};

static INSTANCE: OnceCell<Arc<Registry>> = OnceCell::new();

/// Publishes `registry` as the process-wide instance.
pub fn init(registry: Arc<Registry>) -> Result<(), RegistryError> {
    INSTANCE
        .set(registry)
        .map_err(|_| RegistryError::AlreadyInitialized)?;
    info!("registry service initialised");
    Ok(())
}

/// The process-wide registry, once [`init`] ran.
pub fn instance() -> Option<Arc<Registry>> {
    INSTANCE.get().cloned()
}

pub fn is_initialized() -> bool {
    INSTANCE.get().is_some()
}
