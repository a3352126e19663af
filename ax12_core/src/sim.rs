//! In-memory servo: same capability contract as the wire-backed one, no bus.
//!
//! State is plain fields behind a mutex; a positional move is a one-shot
//! settle timer thread that lands the bookkeeping and fires the completion
//! unless the move was superseded in the meantime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use ax12_traits::clock::{Clock, SystemClock};
use ax12_traits::{CompletionToken, Mode, MoveCallback};

use crate::actuator::{Actuator, validate_position, validate_speed, validate_torque};
use crate::error::Result;
use crate::mover::MoveController;

/// Timing knobs of the simulated backend.
#[derive(Debug, Clone, Copy)]
pub struct SimTiming {
    /// How long any positional move takes to settle. The half-second
    /// default is an acknowledged placeholder, not a physical model.
    pub settle: Duration,
    /// Pause between construction and the priming self-move.
    pub startup_delay: Duration,
}

impl Default for SimTiming {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(500),
            startup_delay: Duration::from_millis(200),
        }
    }
}

#[derive(Debug)]
struct SimState {
    position: f64,
    target: Option<f64>,
    speed: f64,
    moving: bool,
    mode: Mode,
    torque: f64,
    led: bool,
}

impl Default for SimState {
    // Factory defaults of a freshly powered servo.
    fn default() -> Self {
        Self {
            position: 0.0,
            target: None,
            speed: 100.0,
            moving: false,
            mode: Mode::Default,
            torque: 100.0,
            led: true,
        }
    }
}

static TIMER_SEQ: AtomicU64 = AtomicU64::new(0);

pub struct SimulatedActuator {
    id: u8,
    state: Arc<Mutex<SimState>>,
    mover: MoveController,
    timing: SimTiming,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl SimulatedActuator {
    #[must_use]
    pub fn new(id: u8) -> Self {
        Self::with_timing(id, SimTiming::default())
    }

    #[must_use]
    pub fn with_timing(id: u8, timing: SimTiming) -> Self {
        Self::with_clock(id, timing, Arc::new(SystemClock::new()))
    }

    /// Full-control constructor; tests inject short timings or fake clocks.
    #[must_use]
    pub fn with_clock(id: u8, timing: SimTiming, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let mut sim = Self {
            id,
            state: Arc::new(Mutex::new(SimState::default())),
            mover: MoveController::default(),
            timing,
            clock,
        };
        sim.clock.sleep(timing.startup_delay);
        let here = sim.position();
        tracing::debug!(id, position = here, "simulated servo ready, priming");
        if let Err(error) = sim.start_move(here, None) {
            tracing::error!(%error, id, "priming self-move failed");
        }
        sim
    }

    /// Discovery needs a physical chain; the simulation has none.
    #[must_use]
    pub fn scan() -> Vec<u8> {
        tracing::info!("scan on the simulated backend: no bus, nothing to find");
        Vec::new()
    }

    /// Arm a fresh token and schedule the one-shot settle timer. Assumes an
    /// already-validated target.
    fn start_move(&mut self, target: f64, callback: Option<MoveCallback>) -> Result<()> {
        let token = CompletionToken::new(callback);
        {
            let mut st = lock_sim(&self.state);
            st.moving = true;
            st.target = Some(target);
        }
        self.mover.arm(token.clone());

        let state = Arc::clone(&self.state);
        let clock = Arc::clone(&self.clock);
        let settle = self.timing.settle;
        let id = self.id;
        let seq = TIMER_SEQ.fetch_add(1, Ordering::Relaxed);
        let spawned = thread::Builder::new()
            .name(format!("ax12-settle-{id}-{seq}"))
            .spawn(move || {
                clock.sleep(settle);
                // Losing the claim means a newer move or turn superseded us.
                if token.disarm() {
                    {
                        let mut st = lock_sim(&state);
                        st.position = target;
                        st.target = None;
                        st.moving = false;
                    }
                    tracing::debug!(id, position = target, "simulated move settled");
                    if let Some(cb) = token.take_callback() {
                        cb();
                    }
                }
            });
        if let Err(e) = spawned {
            self.mover.supersede();
            let mut st = lock_sim(&self.state);
            st.moving = false;
            st.target = None;
            return Err(eyre::eyre!("settle timer thread failed to start: {e}"));
        }
        Ok(())
    }

    // Register-level inspection of the simulated device. The wire protocol
    // has no readback for these, so they live here rather than on the trait.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.lock_state().mode
    }

    #[must_use]
    pub fn torque_percent(&self) -> f64 {
        self.lock_state().torque
    }

    #[must_use]
    pub fn led_on(&self) -> bool {
        self.lock_state().led
    }

    #[must_use]
    pub fn target(&self) -> Option<f64> {
        self.lock_state().target
    }

    fn lock_state(&self) -> MutexGuard<'_, SimState> {
        lock_sim(&self.state)
    }
}

impl Actuator for SimulatedActuator {
    fn id(&self) -> u8 {
        self.id
    }

    fn ping(&mut self) -> i32 {
        0
    }

    fn status(&mut self) -> i32 {
        0
    }

    fn position(&mut self) -> f64 {
        self.lock_state().position
    }

    fn speed(&mut self) -> f64 {
        self.lock_state().speed
    }

    // Load, voltage and temperature have no model; report inert readings.
    fn load(&mut self) -> f64 {
        0.0
    }

    fn voltage(&mut self) -> f64 {
        0.0
    }

    fn temperature(&mut self) -> i32 {
        0
    }

    fn is_moving(&mut self) -> bool {
        self.lock_state().moving
    }

    fn set_mode(&mut self, mode: Mode) -> Result<()> {
        self.lock_state().mode = mode;
        Ok(())
    }

    fn set_speed(&mut self, percent: f64) -> Result<()> {
        validate_speed(percent)?;
        // The wire encoding saturates at full scale; mirror it here.
        self.lock_state().speed = percent.clamp(-100.0, 100.0);
        Ok(())
    }

    fn set_torque(&mut self, percent: f64) -> Result<()> {
        validate_torque(percent)?;
        self.lock_state().torque = percent;
        Ok(())
    }

    fn set_led(&mut self, on: bool) -> Result<()> {
        self.lock_state().led = on;
        Ok(())
    }

    fn move_to(&mut self, position_deg: f64, callback: Option<MoveCallback>) -> Result<()> {
        validate_position(position_deg)?;
        // A positional goal implies joint mode, same as on the wire.
        self.lock_state().mode = Mode::Default;
        self.start_move(position_deg, callback)
    }

    fn cancel_callback(&mut self) {
        self.mover.cancel_callback();
    }

    fn turn(&mut self, percent: f64) -> Result<()> {
        validate_speed(percent)?;
        // A turn abandons the positional goal along with its notification.
        self.mover.supersede();
        let mut st = self.lock_state();
        st.mode = Mode::Wheel;
        st.speed = percent.clamp(-100.0, 100.0);
        st.moving = percent != 0.0;
        st.target = None;
        Ok(())
    }
}

fn lock_sim(state: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> SimTiming {
        SimTiming {
            settle: Duration::from_millis(30),
            startup_delay: Duration::ZERO,
        }
    }

    /// Records every requested wait and returns immediately.
    #[derive(Default)]
    struct InstantClock {
        slept: Mutex<Vec<Duration>>,
    }

    impl Clock for InstantClock {
        fn sleep(&self, d: Duration) {
            lock_sleeps(&self.slept).push(d);
        }
    }

    fn lock_sleeps(m: &Mutex<Vec<Duration>>) -> MutexGuard<'_, Vec<Duration>> {
        m.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[test]
    fn factory_defaults() {
        let mut sim = SimulatedActuator::with_timing(9, fast());
        assert_eq!(sim.id(), 9);
        assert_eq!(sim.position(), 0.0);
        assert_eq!(sim.speed(), 100.0);
        assert_eq!(sim.torque_percent(), 100.0);
        assert!(sim.led_on());
        assert_eq!(sim.ping(), 0);
        assert_eq!(sim.status(), 0);
        assert_eq!(sim.load(), 0.0);
        assert_eq!(sim.voltage(), 0.0);
        assert_eq!(sim.temperature(), 0);
    }

    #[test]
    fn construction_primes_a_self_move() {
        let mut sim = SimulatedActuator::with_timing(2, fast());
        assert!(sim.is_moving(), "priming self-move should be in flight");
        thread::sleep(Duration::from_millis(90));
        assert!(!sim.is_moving());
        assert_eq!(sim.position(), 0.0);
    }

    #[test]
    fn scan_returns_nothing() {
        assert!(SimulatedActuator::scan().is_empty());
    }

    fn settle(sim: &mut SimulatedActuator) {
        for _ in 0..500 {
            if !sim.is_moving() {
                return;
            }
            thread::sleep(Duration::from_millis(1));
        }
        panic!("simulated move never settled");
    }

    #[test]
    fn injected_clock_absorbs_every_wait() {
        let clock = Arc::new(InstantClock::default());
        let hour = Duration::from_secs(3600);
        let timing = SimTiming {
            settle: hour,
            startup_delay: Duration::from_secs(60),
        };
        let mut sim = SimulatedActuator::with_clock(4, timing, clock.clone());
        // The settle threads run on the instant clock; only thread scheduling
        // separates dispatch from landing.
        settle(&mut sim);

        sim.move_to(120.0, None).expect("move accepted");
        settle(&mut sim);
        assert_eq!(sim.position(), 120.0);

        let slept = lock_sleeps(&clock.slept).clone();
        assert_eq!(
            slept.first(),
            Some(&Duration::from_secs(60)),
            "startup pause goes through the clock"
        );
        assert!(slept.contains(&hour), "settle wait goes through the clock");
    }

    #[test]
    fn positional_move_restores_joint_mode() {
        let mut sim = SimulatedActuator::with_timing(6, fast());
        sim.turn(25.0).expect("turn");
        assert_eq!(sim.mode(), Mode::Wheel);

        sim.move_to(10.0, None).expect("move");
        assert_eq!(sim.mode(), Mode::Default);
    }
}
