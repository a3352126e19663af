//! Wire-backed servo: reads come fresh from the device, commands go through
//! the shared bus. The device is authoritative for all physical state.

use std::sync::Arc;
use std::time::Duration;

use ax12_traits::clock::{Clock, SystemClock};
use ax12_traits::{CompletionToken, Mode, MoveCallback};

use crate::actuator::{Actuator, validate_position, validate_speed, validate_torque};
use crate::bus::Bus;
use crate::error::{AxError, CommError, Result};
use crate::mover::MoveController;

/// Settle pause between bus configuration and the priming self-move.
const STARTUP_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug)]
pub struct HardwareActuator {
    bus: Arc<Bus>,
    id: u8,
    mover: MoveController,
    /// Last mode this instance commanded. A second instance bound to the
    /// same id can silently invalidate it; the device itself is the truth.
    mode: Option<Mode>,
}

impl HardwareActuator {
    /// Bind to `id` on an already-opened bus, settle, then prime the servo
    /// with a self-move to wherever it currently sits.
    ///
    /// Reconfiguring the shared rate is deliberately not done here: call
    /// `Bus::open`/`Bus::ensure_baud_rate` first, so the side effect on
    /// shared infrastructure stays visible at the call site.
    pub fn new(bus: Arc<Bus>, id: u8) -> Result<Self> {
        Self::with_startup_delay(bus, id, STARTUP_DELAY)
    }

    pub fn with_startup_delay(bus: Arc<Bus>, id: u8, delay: Duration) -> Result<Self> {
        let mut servo = Self {
            bus,
            id,
            mover: MoveController::default(),
            mode: None,
        };
        SystemClock::new().sleep(delay);
        let here = servo.position();
        tracing::debug!(id, position = here, "servo responding, priming");
        servo.move_to(here, None)?;
        Ok(servo)
    }

    /// Write the mode register only when this instance believes it differs.
    fn ensure_mode(&mut self, mode: Mode) -> Result<()> {
        if self.mode != Some(mode) {
            let code = self.bus.with_transport(|t| t.set_mode(self.id, mode));
            ensure_ok(code)?;
            self.mode = Some(mode);
        }
        Ok(())
    }
}

impl Actuator for HardwareActuator {
    fn id(&self) -> u8 {
        self.id
    }

    fn ping(&mut self) -> i32 {
        self.bus.ping(self.id)
    }

    fn status(&mut self) -> i32 {
        self.bus.with_transport(|t| t.status(self.id))
    }

    fn position(&mut self) -> f64 {
        self.bus.with_transport(|t| t.position(self.id))
    }

    fn speed(&mut self) -> f64 {
        self.bus.with_transport(|t| t.speed(self.id))
    }

    fn load(&mut self) -> f64 {
        self.bus.with_transport(|t| t.load(self.id))
    }

    fn voltage(&mut self) -> f64 {
        self.bus.with_transport(|t| t.voltage(self.id))
    }

    fn temperature(&mut self) -> i32 {
        self.bus.with_transport(|t| t.temperature(self.id))
    }

    fn is_moving(&mut self) -> bool {
        self.bus.with_transport(|t| t.is_moving(self.id))
    }

    fn set_mode(&mut self, mode: Mode) -> Result<()> {
        let code = self.bus.with_transport(|t| t.set_mode(self.id, mode));
        ensure_ok(code)?;
        self.mode = Some(mode);
        Ok(())
    }

    fn set_speed(&mut self, percent: f64) -> Result<()> {
        validate_speed(percent)?;
        let code = self.bus.with_transport(|t| t.set_speed(self.id, percent));
        ensure_ok(code)
    }

    fn set_torque(&mut self, percent: f64) -> Result<()> {
        validate_torque(percent)?;
        let code = self.bus.with_transport(|t| t.set_torque(self.id, percent));
        ensure_ok(code)
    }

    fn set_led(&mut self, on: bool) -> Result<()> {
        let code = self.bus.with_transport(|t| t.set_led(self.id, on));
        ensure_ok(code)
    }

    fn move_to(&mut self, position_deg: f64, callback: Option<MoveCallback>) -> Result<()> {
        validate_position(position_deg)?;
        // The new request supersedes the old completion even if it then
        // fails: a failed request leaves no pending completion behind.
        self.mover.supersede();
        self.ensure_mode(Mode::Default)?;
        let token = CompletionToken::new(callback);
        let code = self
            .bus
            .with_transport(|t| t.start_move(self.id, position_deg, token.clone()));
        if code < 0 {
            return Err(AxError::Comm(CommError::from_status(code)).into());
        }
        self.mover.arm(token);
        tracing::debug!(id = self.id, position = position_deg, "move dispatched");
        Ok(())
    }

    fn cancel_callback(&mut self) {
        self.mover.cancel_callback();
        self.bus.with_transport(|t| t.cancel_callback(self.id));
    }

    fn turn(&mut self, percent: f64) -> Result<()> {
        validate_speed(percent)?;
        // A turn abandons the positional goal along with its notification.
        self.mover.supersede();
        self.ensure_mode(Mode::Wheel)?;
        let code = self.bus.with_transport(|t| t.turn(self.id, percent));
        ensure_ok(code)
    }
}

impl Drop for HardwareActuator {
    // Free the transport's watch slot; the mover's own drop revokes the
    // pending token right after.
    fn drop(&mut self) {
        self.bus.with_transport(|t| t.cancel_callback(self.id));
    }
}

fn ensure_ok(code: i32) -> Result<()> {
    if code < 0 {
        return Err(AxError::Comm(CommError::from_status(code)).into());
    }
    Ok(())
}
