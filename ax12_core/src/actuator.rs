//! Capability surface shared by the wire-backed and simulated servos.

use std::time::Duration;

use ax12_traits::{Mode, MoveCallback};

use crate::error::{AxError, Result};

/// Positional range of the output shaft in joint mode, degrees.
pub const POSITION_MIN_DEG: f64 = -150.0;
pub const POSITION_MAX_DEG: f64 = 150.0;

/// One servo, hardware or simulated. Implementations are interchangeable:
/// callers depend on this trait only.
///
/// Getters never fail on a missed exchange; they surface the transport's
/// raw/sentinel values. Setters and motion commands return `Err` with the
/// mapped error taxonomy.
pub trait Actuator {
    fn id(&self) -> u8;

    /// 0 when the servo answers, negative transfer code otherwise.
    fn ping(&mut self) -> i32;
    /// Device error bitfield (0 = healthy) or negative transfer code.
    fn status(&mut self) -> i32;
    /// Degrees in [-150, 150], increasing clockwise.
    fn position(&mut self) -> f64;
    /// Percent of full speed, signed (positive = clockwise).
    fn speed(&mut self) -> f64;
    /// Percent of stall load, signed.
    fn load(&mut self) -> f64;
    /// Supply voltage in volts.
    fn voltage(&mut self) -> f64;
    /// Internal temperature in degrees Celsius.
    fn temperature(&mut self) -> i32;
    fn is_moving(&mut self) -> bool;

    fn set_mode(&mut self, mode: Mode) -> Result<()>;
    /// Signed percent; magnitude above 100 saturates at the wire level.
    fn set_speed(&mut self, percent: f64) -> Result<()>;
    /// Torque limit in [0, 100]; 0 releases the servo entirely.
    fn set_torque(&mut self, percent: f64) -> Result<()>;
    fn set_led(&mut self, on: bool) -> Result<()>;

    /// Start a positional move and return immediately with the fate of the
    /// request. The callback (if any) fires exactly once on arrival, unless
    /// a newer `move_to`/`turn` supersedes it or it is cancelled.
    fn move_to(&mut self, position_deg: f64, callback: Option<MoveCallback>) -> Result<()>;

    /// Clear the pending completion notification; the motion itself (and the
    /// simulated settle bookkeeping) continues. Idempotent.
    fn cancel_callback(&mut self);

    /// Continuous rotation at signed `percent` speed; `moving` becomes
    /// `percent != 0`. Abandons any pending move completion.
    fn turn(&mut self, percent: f64) -> Result<()>;

    /// Blocking convenience over `move_to`: wait for arrival up to `timeout`.
    /// `Ok(false)` means the wait timed out and the notification was
    /// cancelled; the motion itself still finishes on its own.
    fn move_and_wait(&mut self, position_deg: f64, timeout: Duration) -> Result<bool> {
        let (tx, rx) = crossbeam_channel::bounded::<()>(1);
        self.move_to(
            position_deg,
            Some(Box::new(move || {
                let _ = tx.send(());
            })),
        )?;
        match rx.recv_timeout(timeout) {
            Ok(()) => Ok(true),
            Err(_) => {
                self.cancel_callback();
                Ok(false)
            }
        }
    }
}

pub(crate) fn validate_position(position_deg: f64) -> Result<()> {
    if !position_deg.is_finite()
        || !(POSITION_MIN_DEG..=POSITION_MAX_DEG).contains(&position_deg)
    {
        return Err(AxError::InvalidArgument(format!(
            "position {position_deg} degrees outside [{POSITION_MIN_DEG}, {POSITION_MAX_DEG}]"
        ))
        .into());
    }
    Ok(())
}

pub(crate) fn validate_torque(percent: f64) -> Result<()> {
    if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
        return Err(AxError::InvalidArgument(format!(
            "torque {percent}% outside [0, 100]"
        ))
        .into());
    }
    Ok(())
}

pub(crate) fn validate_speed(percent: f64) -> Result<()> {
    if !percent.is_finite() {
        return Err(AxError::InvalidArgument(format!("speed {percent}% is not finite")).into());
    }
    Ok(())
}
