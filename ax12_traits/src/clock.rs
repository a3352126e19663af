use std::thread;
use std::time::Duration;

/// Waiting seam for the timers in the stack.
///
/// The simulated backend routes its startup pause and settle timers through
/// this trait, so tests can swap in a clock that returns instantly instead of
/// holding the suite on wall time.
pub trait Clock {
    fn sleep(&self, d: Duration);
}

/// Real wall-clock waiting.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}
