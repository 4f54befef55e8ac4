// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::{Context, Result};
use scsi_target_rs::{
    bus,
    cfg::{
        cli::{config_path_from_args, resolve_config_path},
        config::Config,
        logger::init_logger,
    },
    device::factory,
    target::{Arbiter, Registry, service},
};
use tokio::{main, signal, task};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancels `cancel` on Ctrl-C or SIGTERM.
fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                },
                Err(e) => {
                    warn!("cannot install SIGTERM handler: {e}");
                    std::future::pending::<()>().await;
                },
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            res = signal::ctrl_c() => {
                if let Err(e) = res {
                    warn!("ctrl-c listener failed: {e}");
                }
            },
            _ = terminate => {},
        }
        info!("shutdown requested");
        cancel.cancel();
    });
}

#[main]
async fn main() -> Result<()> {
    let config_path = config_path_from_args(std::env::args());
    let config = resolve_config_path(&config_path)
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;

    let _init_logger = init_logger(&config.runtime.logger_config)?;
    info!(config = %config_path, "starting SCSI target");

    let bus = bus::open(&config.bus).context("bus interface initialisation failed")?;

    let registry = Arc::new(Registry::new());
    service::init(Arc::clone(&registry))?;

    for dev in &config.devices {
        let device = factory::build(dev)
            .with_context(|| format!("failed to create device {}:{}", dev.id, dev.unit))?;
        registry.attach(dev.id, dev.unit, device)?;
    }
    info!("attached devices:\n{}", registry.list());

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    let mut arbiter = Arbiter::new(bus, Arc::clone(&registry), &config.bus);
    task::spawn_blocking(move || arbiter.run(&cancel))
        .await
        .context("arbiter task failed")?;

    registry.flush_all();
    info!("SCSI target stopped");
    Ok(())
}
