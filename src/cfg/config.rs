// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{collections::HashMap, fs, path::Path, path::PathBuf, time::Duration};

use anyhow::{Context, Result, bail, ensure};
use serde::{Deserialize, Serialize};

use crate::cfg::enums::{BusBackend, DeviceKind, YesNo};

/// Number of target ids on the bus.
pub const TARGET_MAX: usize = 8;
/// Logical units per target.
pub const UNIT_MAX: usize = 2;

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// Bus backend and protocol timing.
    #[serde(rename = "Bus", default)]
    pub bus: BusConfig,
    /// Units attached at startup.
    #[serde(rename = "Devices", default)]
    pub devices: Vec<DeviceConfig>,
    /// Implementation/runtime parameters outside the bus protocol.
    #[serde(rename = "Runtime", default)]
    pub runtime: RuntimeConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
/// Bus backend selection and the bounded waits of the main loop.
pub struct BusConfig {
    #[serde(rename = "Backend", default)]
    /// Which `Bus` implementation to open.
    pub backend: BusBackend,

    #[serde(
        rename = "HandshakeTimeoutMs",
        with = "serde_millis",
        default = "default_handshake_timeout"
    )]
    /// Upper bound for a single REQ/ACK wait.
    pub handshake_timeout: Duration,

    #[serde(
        rename = "BusySettleMs",
        with = "serde_millis",
        default = "default_busy_settle"
    )]
    /// How long the arbiter waits for BSY to drop after SEL was seen.
    pub busy_settle: Duration,

    #[serde(
        rename = "SelectPollMs",
        with = "serde_millis",
        default = "default_select_poll"
    )]
    /// Bound for one selection-event wait between two stop-flag checks.
    pub select_poll: Duration,
}

fn default_handshake_timeout() -> Duration {
    Duration::from_secs(3)
}

fn default_busy_settle() -> Duration {
    Duration::from_secs(3)
}

fn default_select_poll() -> Duration {
    Duration::from_millis(10)
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            backend: BusBackend::default(),
            handshake_timeout: default_handshake_timeout(),
            busy_settle: default_busy_settle(),
            select_poll: default_select_poll(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
/// One unit to attach at startup.
pub struct DeviceConfig {
    #[serde(rename = "Id")]
    /// Target id (0..8).
    pub id: u8,
    #[serde(rename = "Unit", default)]
    /// Logical unit number under the target.
    pub unit: u8,
    #[serde(rename = "Kind", default, skip_serializing_if = "Option::is_none")]
    /// Device type; inferred from `path` when omitted.
    pub kind: Option<DeviceKind>,
    #[serde(rename = "Path", default, skip_serializing_if = "Option::is_none")]
    /// Image file backing the unit.
    pub path: Option<PathBuf>,
    #[serde(rename = "SectorSize", default, skip_serializing_if = "Option::is_none")]
    /// Overrides the device's default sector size.
    pub sector_size: Option<u32>,
    #[serde(rename = "Protected", default)]
    /// Attach write-protected.
    pub protected: YesNo,
}

impl DeviceConfig {
    /// Explicit kind, or the kind implied by the image path.
    pub fn resolved_kind(&self) -> Option<DeviceKind> {
        self.kind
            .or_else(|| self.path.as_deref().and_then(DeviceKind::from_path))
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
/// Runtime-only settings.
pub struct RuntimeConfig {
    #[serde(rename = "LoggerConfig", default = "default_logger_config")]
    /// Path to the logger YAML.
    pub logger_config: PathBuf,
}

fn default_logger_config() -> PathBuf {
    PathBuf::from("tests/config_logger.yaml")
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            logger_config: default_logger_config(),
        }
    }
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let s = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {path:?}"))?;
        Self::from_yaml_str(&s)
    }

    /// Same as [`Config::load_from_file`] for an in-memory document.
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let mut cfg: Config =
            serde_yaml::from_str(s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants and normalizes derived fields.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(
            !self.bus.handshake_timeout.is_zero(),
            "HandshakeTimeoutMs must be > 0"
        );
        ensure!(!self.bus.select_poll.is_zero(), "SelectPollMs must be > 0");

        let mut modes: HashMap<u8, bool> = HashMap::new();
        let mut seen = Vec::with_capacity(self.devices.len());
        for dev in &mut self.devices {
            ensure!(
                (dev.id as usize) < TARGET_MAX,
                "device id {} out of range (0..{TARGET_MAX})",
                dev.id
            );
            ensure!(
                (dev.unit as usize) < UNIT_MAX,
                "unit {} of id {} out of range (0..{UNIT_MAX})",
                dev.unit,
                dev.id
            );
            ensure!(
                !seen.contains(&(dev.id, dev.unit)),
                "id {} unit {} configured twice",
                dev.id,
                dev.unit
            );
            seen.push((dev.id, dev.unit));

            let Some(kind) = dev.resolved_kind() else {
                bail!(
                    "cannot infer device kind of id {} unit {} from {:?}",
                    dev.id,
                    dev.unit,
                    dev.path
                );
            };
            dev.kind = Some(kind);

            if kind.needs_image() {
                ensure!(
                    dev.path.is_some(),
                    "{kind} at id {} unit {} needs an image Path",
                    dev.id,
                    dev.unit
                );
            }

            let sasi = kind.is_sasi();
            if let Some(prev) = modes.insert(dev.id, sasi) {
                ensure!(prev == sasi, "SASI and SCSI can't be mixed on id {}", dev.id);
            }
        }

        Ok(())
    }
}

mod serde_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}
