//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();
/// Bus parameters of the current run (for JSON error details).
pub static LAST_BUS: OnceLock<CliBus> = OnceLock::new();

#[derive(Clone, Debug)]
pub struct CliBus {
    pub device: String,
    pub baud_rate: u32,
}

/// Looked up first; when absent the built-in defaults apply.
pub const DEFAULT_CONFIG_PATH: &str = "etc/ax12.toml";

#[derive(Parser, Debug)]
#[command(name = "ax12", version, about = "AX12 servo chain CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Readable runtime value of a servo, for `read`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ReadField {
    /// Present position in degrees
    Position,
    /// Present speed as a signed percent
    Speed,
    /// Present load as a signed percent
    Load,
    /// Supply voltage in volts
    Voltage,
    /// Internal temperature in degrees Celsius
    Temperature,
    /// Whether the shaft is in motion
    Moving,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum LedState {
    On,
    Off,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sweep the chain for responding servos
    Scan,
    /// Positional move with asynchronous completion
    Move {
        /// Servo id on the chain
        #[arg(long)]
        id: u8,
        /// Goal position in degrees, -150 to 150
        #[arg(long, allow_hyphen_values = true)]
        degrees: f64,
        /// How long to wait for arrival before giving up on the notification
        #[arg(long, value_name = "MS", default_value_t = 5_000)]
        timeout_ms: u64,
        /// Dispatch the move and return without waiting
        #[arg(long, action = ArgAction::SetTrue)]
        no_wait: bool,
    },
    /// Continuous rotation (wheel mode) at a signed percent speed
    Turn {
        #[arg(long)]
        id: u8,
        /// Signed percent of full speed; 0 stops
        #[arg(long, allow_hyphen_values = true)]
        percent: f64,
    },
    /// Check whether one servo answers on the chain
    Ping {
        #[arg(long)]
        id: u8,
    },
    /// Read every runtime value of one servo
    Status {
        #[arg(long)]
        id: u8,
    },
    /// Read a single runtime value of one servo
    Read {
        #[arg(long)]
        id: u8,
        /// Which value to read
        #[arg(value_enum)]
        field: ReadField,
    },
    /// Set the moving speed as a signed percent
    SetSpeed {
        #[arg(long)]
        id: u8,
        /// Magnitude above 100 saturates at the wire encoding
        #[arg(long, allow_hyphen_values = true)]
        percent: f64,
    },
    /// Set the torque limit in percent; 0 releases the servo
    SetTorque {
        #[arg(long)]
        id: u8,
        #[arg(long)]
        percent: f64,
    },
    /// Switch the servo LED on or off
    SetLed {
        #[arg(long)]
        id: u8,
        #[arg(long, value_enum)]
        state: LedState,
    },
    /// Switch between positional (default) and wheel mode
    SetMode {
        #[arg(long)]
        id: u8,
        /// Mode name (default|wheel) or its numeric wire code
        #[arg(long)]
        mode: String,
    },
    /// Quick health check (bus reachable / sim ok)
    SelfCheck,
    /// Wipe one servo's EEPROM back to factory state
    #[cfg(feature = "hardware")]
    FactoryReset {
        #[arg(long)]
        id: u8,
        /// Required acknowledgement; the reset also reverts id and baud rate
        #[arg(long, action = ArgAction::SetTrue)]
        yes: bool,
    },
}
