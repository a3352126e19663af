#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core servo control logic (link-agnostic).
//!
//! This crate provides the link-independent servo engine. All wire
//! interactions go through the `ax12_traits::Transport` trait.
//!
//! ## Architecture
//!
//! - **Bus**: shared-chain singleton, baud ownership, ping and scan (`bus` module)
//! - **Actuator**: one capability contract, two variants (`actuator`, `hardware`, `sim`)
//! - **Move Controller**: pending-completion state machine, supersession and
//!   cancellation with exactly-once callbacks (`mover` module)
//! - **Errors**: init/comm taxonomy mapped from transport status codes (`error` module)
//!
//! Completions are delivered asynchronously: a settle-timer thread for the
//! simulated backend, the transport's arrival watcher for hardware.

// Module declarations
pub mod actuator;
pub mod bus;
pub mod error;
pub mod hardware;
pub mod mocks;
pub mod mover;
pub mod sim;

pub use actuator::{Actuator, POSITION_MAX_DEG, POSITION_MIN_DEG};
pub use bus::{BAUD_RATE_MAX, BAUD_RATE_MIN, Bus, SCAN_LAST_ID};
pub use error::{AxError, CommError, InitError, Result};
pub use hardware::HardwareActuator;
pub use mover::MoveController;
pub use sim::{SimTiming, SimulatedActuator};

pub use ax12_traits::{Clock, CompletionToken, Mode, MoveCallback, SystemClock, Transport};
