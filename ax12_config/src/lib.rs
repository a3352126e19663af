#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the servo stack.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Every key has a default, so an empty file (or no file) is a usable
//!   simulated-backend configuration.
use eyre::WrapErr;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BusCfg {
    /// Serial device the servo chain hangs off.
    pub device: String,
    /// Shared bus rate; servos ship at 1 Mbaud, common rigs run 115200.
    pub baud_rate: u32,
}

impl Default for BusCfg {
    fn default() -> Self {
        Self {
            device: "/dev/serial0".to_owned(),
            baud_rate: 115_200,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct SimCfg {
    /// How long a simulated move takes to settle (ms).
    pub settle_ms: u64,
    /// Post-construction settle delay before the priming self-move (ms).
    pub startup_delay_ms: u64,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            settle_ms: 500,
            startup_delay_ms: 200,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    /// Path to a JSON-lines log file; console-only when absent.
    pub file: Option<String>,
    /// Level for the file layer ("info", "debug"); info when absent.
    pub level: Option<String>,
    /// File rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub bus: BusCfg,
    pub sim: SimCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse a config file.
pub fn load_path(path: impl AsRef<std::path::Path>) -> eyre::Result<Config> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading config file {}", path.display()))?;
    let cfg = load_toml(&raw).wrap_err_with(|| format!("parsing config file {}", path.display()))?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Bus
        if self.bus.device.trim().is_empty() {
            eyre::bail!("bus.device must not be empty");
        }
        if self.bus.baud_rate < 7343 || self.bus.baud_rate > 1_000_000 {
            eyre::bail!("bus.baud_rate must be in [7343, 1000000]");
        }

        // Sim timing
        if self.sim.settle_ms == 0 {
            eyre::bail!("sim.settle_ms must be >= 1");
        }
        if self.sim.settle_ms > 60 * 1000 {
            eyre::bail!("sim.settle_ms is unreasonably large (>60s)");
        }
        if self.sim.startup_delay_ms > 10 * 1000 {
            eyre::bail!("sim.startup_delay_ms is unreasonably large (>10s)");
        }

        Ok(())
    }
}
