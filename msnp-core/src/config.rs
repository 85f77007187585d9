// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Client Configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MsnpResult;

/// Default delay between scheduler drain passes.
pub const DEFAULT_SCHEDULER_DELAY_MS: u64 = 5_000;

/// Default delay of the per-owner coalescing scheduler.
pub const DEFAULT_INVITATION_DELAY_MS: u64 = 1_000;

/// Largest payload accepted by the framer.
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// Configuration for a client core instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Delay of the general message scheduler (milliseconds).
    pub scheduler_delay_ms: u64,

    /// Delay of the request-coalescing scheduler (milliseconds).
    pub invitation_delay_ms: u64,

    /// Whether schedulers spawn a background drain thread on enqueue.
    ///
    /// Hosts that drive [`Scheduler::drain_pass`](crate::scheduler::Scheduler::drain_pass)
    /// themselves turn this off.
    pub background_drain: bool,

    /// Maximum payload size accepted from the server (bytes).
    pub max_payload_size: usize,

    /// Endpoint id of this machine, sent as `epid` in routing headers.
    pub machine_guid: Uuid,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            scheduler_delay_ms: DEFAULT_SCHEDULER_DELAY_MS,
            invitation_delay_ms: DEFAULT_INVITATION_DELAY_MS,
            background_drain: true,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            machine_guid: Uuid::new_v4(),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from `MSNP_*` environment variables, falling back
    /// to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(ms) = env_parse::<u64>("MSNP_SCHEDULER_DELAY_MS") {
            config.scheduler_delay_ms = ms;
        }
        if let Some(ms) = env_parse::<u64>("MSNP_INVITATION_DELAY_MS") {
            config.invitation_delay_ms = ms;
        }
        if let Some(flag) = env_parse::<bool>("MSNP_BACKGROUND_DRAIN") {
            config.background_drain = flag;
        }
        if let Some(size) = env_parse::<usize>("MSNP_MAX_PAYLOAD_SIZE") {
            config.max_payload_size = size;
        }
        if let Some(guid) = env_parse::<Uuid>("MSNP_MACHINE_GUID") {
            config.machine_guid = guid;
        }

        config
    }

    /// Reads a JSON configuration file.
    pub fn load(path: &Path) -> MsnpResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Writes this configuration as pretty JSON.
    pub fn save(&self, path: &Path) -> MsnpResult<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Sets the general scheduler delay.
    pub fn with_scheduler_delay(mut self, delay: Duration) -> Self {
        self.scheduler_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Sets the coalescing scheduler delay.
    pub fn with_invitation_delay(mut self, delay: Duration) -> Self {
        self.invitation_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Disables background drain threads (manual draining).
    pub fn without_background_drain(mut self) -> Self {
        self.background_drain = false;
        self
    }

    /// Sets the largest payload the framer accepts.
    pub fn with_max_payload(mut self, bytes: usize) -> Self {
        self.max_payload_size = bytes;
        self
    }

    /// Sets the machine guid.
    pub fn with_machine_guid(mut self, guid: Uuid) -> Self {
        self.machine_guid = guid;
        self
    }

    pub fn scheduler_delay(&self) -> Duration {
        Duration::from_millis(self.scheduler_delay_ms)
    }

    pub fn invitation_delay(&self) -> Duration {
        Duration::from_millis(self.invitation_delay_ms)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "ignoring unparsable config value");
            None
        }
    }
}
