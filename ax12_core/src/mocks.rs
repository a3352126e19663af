//! Test and helper mocks for ax12_core

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ax12_traits::{CompletionToken, Mode, Transport};

/// In-memory transport scripted from the outside.
///
/// Clones share state, so tests keep one handle for assertions while the
/// bus owns another. Per-id device registers can be preloaded, exchanges
/// can be forced to fail with a chosen status code, and registered move
/// watches are completed on demand via [`MockTransport::complete_move`].
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockInner>>,
}

#[derive(Debug, Default, Clone, Copy)]
struct DeviceRegs {
    position: f64,
    speed: f64,
    load: f64,
    voltage: f64,
    temperature: i32,
    moving: bool,
    status: i32,
    goal: Option<f64>,
}

#[derive(Default)]
struct MockInner {
    /// None = every id answers; Some = only the listed ids do.
    responding: Option<Vec<u8>>,
    devices: HashMap<u8, DeviceRegs>,
    forced_code: Option<i32>,
    opened: Vec<u32>,
    reset_alls: u32,
    pings: Vec<u8>,
    mode_writes: Vec<(u8, Mode)>,
    speed_writes: Vec<(u8, f64)>,
    torque_writes: Vec<(u8, f64)>,
    led_writes: Vec<(u8, bool)>,
    turn_writes: Vec<(u8, f64)>,
    goal_writes: Vec<(u8, f64)>,
    watches: Vec<(u8, f64, CompletionToken)>,
}

/// Watch-table capacity shared with the serial transport.
const WATCH_CAPACITY: usize = 40;

impl MockTransport {
    /// Every id answers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the given ids answer pings.
    #[must_use]
    pub fn responding(ids: impl IntoIterator<Item = u8>) -> Self {
        let mock = Self::default();
        mock.lock().responding = Some(ids.into_iter().collect());
        mock
    }

    /// Force every subsequent fallible exchange to report `code`.
    pub fn fail_with(&self, code: i32) {
        self.lock().forced_code = Some(code);
    }

    pub fn clear_failure(&self) {
        self.lock().forced_code = None;
    }

    // Device register scripting.
    pub fn set_position(&self, id: u8, degrees: f64) {
        self.lock().devices.entry(id).or_default().position = degrees;
    }

    pub fn set_speed_reading(&self, id: u8, percent: f64) {
        self.lock().devices.entry(id).or_default().speed = percent;
    }

    pub fn set_load(&self, id: u8, percent: f64) {
        self.lock().devices.entry(id).or_default().load = percent;
    }

    pub fn set_voltage(&self, id: u8, volts: f64) {
        self.lock().devices.entry(id).or_default().voltage = volts;
    }

    pub fn set_temperature(&self, id: u8, celsius: i32) {
        self.lock().devices.entry(id).or_default().temperature = celsius;
    }

    pub fn set_moving(&self, id: u8, moving: bool) {
        self.lock().devices.entry(id).or_default().moving = moving;
    }

    pub fn set_status(&self, id: u8, status: i32) {
        self.lock().devices.entry(id).or_default().status = status;
    }

    /// Emulate the device arriving at its last written goal: land the
    /// position, clear `moving`, and fire any watched token (outside the
    /// lock). Works with or without a watch, like the real device.
    pub fn complete_move(&self, id: u8) {
        let fired = {
            let mut inner = self.lock();
            let mut fired = Vec::new();
            let mut kept = Vec::new();
            for (wid, goal, token) in inner.watches.drain(..) {
                if wid == id {
                    fired.push((goal, token));
                } else {
                    kept.push((wid, goal, token));
                }
            }
            inner.watches = kept;
            let regs = inner.devices.entry(id).or_default();
            if let Some(goal) = regs.goal.take() {
                regs.position = goal;
            }
            regs.moving = false;
            fired
        };
        for (_, token) in fired {
            token.fire();
        }
    }

    // Assertion helpers.
    #[must_use]
    pub fn opened_rates(&self) -> Vec<u32> {
        self.lock().opened.clone()
    }

    #[must_use]
    pub fn reset_all_count(&self) -> u32 {
        self.lock().reset_alls
    }

    #[must_use]
    pub fn ping_count(&self) -> usize {
        self.lock().pings.len()
    }

    #[must_use]
    pub fn mode_writes(&self) -> Vec<(u8, Mode)> {
        self.lock().mode_writes.clone()
    }

    #[must_use]
    pub fn speed_writes(&self) -> Vec<(u8, f64)> {
        self.lock().speed_writes.clone()
    }

    #[must_use]
    pub fn torque_writes(&self) -> Vec<(u8, f64)> {
        self.lock().torque_writes.clone()
    }

    #[must_use]
    pub fn led_writes(&self) -> Vec<(u8, bool)> {
        self.lock().led_writes.clone()
    }

    #[must_use]
    pub fn turn_writes(&self) -> Vec<(u8, f64)> {
        self.lock().turn_writes.clone()
    }

    #[must_use]
    pub fn goal_writes(&self) -> Vec<(u8, f64)> {
        self.lock().goal_writes.clone()
    }

    #[must_use]
    pub fn watch_count(&self) -> usize {
        self.lock().watches.len()
    }

    #[must_use]
    pub fn has_watch(&self, id: u8) -> bool {
        self.lock().watches.iter().any(|(wid, _, _)| *wid == id)
    }

    /// Total fallible exchanges seen, for "no transport traffic" assertions.
    #[must_use]
    pub fn exchange_count(&self) -> usize {
        let inner = self.lock();
        inner.pings.len()
            + inner.mode_writes.len()
            + inner.speed_writes.len()
            + inner.torque_writes.len()
            + inner.led_writes.len()
            + inner.turn_writes.len()
            + inner.goal_writes.len()
    }

    fn lock(&self) -> MutexGuard<'_, MockInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn forced(&self) -> Option<i32> {
        self.lock().forced_code
    }

    fn regs(&self, id: u8) -> DeviceRegs {
        self.lock().devices.get(&id).copied().unwrap_or_default()
    }
}

impl Transport for MockTransport {
    fn open(&mut self, baud_rate: u32) -> i32 {
        if let Some(code) = self.forced() {
            return code;
        }
        self.lock().opened.push(baud_rate);
        0
    }

    fn reset_all(&mut self) -> i32 {
        if let Some(code) = self.forced() {
            return code;
        }
        self.lock().reset_alls += 1;
        0
    }

    fn ping(&mut self, id: u8) -> i32 {
        self.lock().pings.push(id);
        if let Some(code) = self.forced() {
            return code;
        }
        let answers = {
            let inner = self.lock();
            inner.responding.as_ref().is_none_or(|ids| ids.contains(&id))
        };
        if answers { 0 } else { -4 }
    }

    fn status(&mut self, id: u8) -> i32 {
        if let Some(code) = self.forced() {
            return code;
        }
        self.regs(id).status
    }

    fn position(&mut self, id: u8) -> f64 {
        self.regs(id).position
    }

    fn speed(&mut self, id: u8) -> f64 {
        self.regs(id).speed
    }

    fn load(&mut self, id: u8) -> f64 {
        self.regs(id).load
    }

    fn voltage(&mut self, id: u8) -> f64 {
        self.regs(id).voltage
    }

    fn temperature(&mut self, id: u8) -> i32 {
        self.regs(id).temperature
    }

    fn is_moving(&mut self, id: u8) -> bool {
        self.regs(id).moving
    }

    fn set_mode(&mut self, id: u8, mode: Mode) -> i32 {
        let forced = self.forced();
        let mut inner = self.lock();
        inner.mode_writes.push((id, mode));
        forced.unwrap_or(0)
    }

    fn set_speed(&mut self, id: u8, percent: f64) -> i32 {
        let forced = self.forced();
        let mut inner = self.lock();
        inner.speed_writes.push((id, percent));
        if forced.is_none() {
            inner.devices.entry(id).or_default().speed = percent;
        }
        forced.unwrap_or(0)
    }

    fn set_torque(&mut self, id: u8, percent: f64) -> i32 {
        let forced = self.forced();
        let mut inner = self.lock();
        inner.torque_writes.push((id, percent));
        forced.unwrap_or(0)
    }

    fn set_led(&mut self, id: u8, on: bool) -> i32 {
        let forced = self.forced();
        let mut inner = self.lock();
        inner.led_writes.push((id, on));
        forced.unwrap_or(0)
    }

    fn start_move(&mut self, id: u8, position_deg: f64, token: CompletionToken) -> i32 {
        let forced = self.forced();
        let mut inner = self.lock();
        inner.goal_writes.push((id, position_deg));
        if let Some(code) = forced {
            return code;
        }
        {
            let regs = inner.devices.entry(id).or_default();
            regs.moving = true;
            regs.goal = Some(position_deg);
        }
        // At most one watch per id; the superseded token is already revoked.
        inner.watches.retain(|(wid, _, _)| *wid != id);
        // Tokens without a callback complete unobserved, like the real link.
        if token.has_callback() {
            if inner.watches.len() >= WATCH_CAPACITY {
                return -5;
            }
            inner.watches.push((id, position_deg, token));
        }
        0
    }

    fn cancel_callback(&mut self, id: u8) {
        self.lock().watches.retain(|(wid, _, _)| *wid != id);
    }

    fn turn(&mut self, id: u8, percent: f64) -> i32 {
        let forced = self.forced();
        let mut inner = self.lock();
        inner.turn_writes.push((id, percent));
        if forced.is_none() {
            let regs = inner.devices.entry(id).or_default();
            regs.speed = percent;
            regs.moving = percent != 0.0;
            regs.goal = None;
        }
        forced.unwrap_or(0)
    }
}
