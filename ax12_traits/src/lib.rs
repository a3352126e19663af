pub mod clock;
pub mod token;

pub use clock::{Clock, SystemClock};
pub use token::{CompletionToken, MoveCallback};

/// Rotation mode of a servo output shaft.
///
/// `Default` is positional (joint) mode with the full angular range;
/// `Wheel` removes the angle limits and drives continuous rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Default,
    Wheel,
}

impl Mode {
    /// Parse the numeric mode code callers pass around (0 default, 1 wheel).
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Mode::Default),
            1 => Some(Mode::Wheel),
            _ => None,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Default => write!(f, "default"),
            Mode::Wheel => write!(f, "wheel"),
        }
    }
}

/// Byte-level servo bus backend: one implementation per physical link.
///
/// Status convention: zero or positive is success, negative is an error slot
/// that callers map onto their error taxonomy (-1 not initialized, -2 bad
/// checksum, -3 id mismatch, -4 timeout, -5 watch table full).
///
/// Read accessors return their last-known/neutral value on a failed exchange
/// rather than an error; `status()` and the setters surface the raw code.
pub trait Transport: Send {
    /// (Re)open the link at `baud_rate`. Idempotent per rate.
    fn open(&mut self, baud_rate: u32) -> i32;

    /// Broadcast the default runtime profile to every listening servo.
    fn reset_all(&mut self) -> i32 {
        0
    }

    fn ping(&mut self, id: u8) -> i32;

    /// Device error bitfield (0 = healthy) or a negative transfer code.
    fn status(&mut self, id: u8) -> i32;

    fn position(&mut self, id: u8) -> f64;
    fn speed(&mut self, id: u8) -> f64;
    fn load(&mut self, id: u8) -> f64;
    fn voltage(&mut self, id: u8) -> f64;
    fn temperature(&mut self, id: u8) -> i32;
    fn is_moving(&mut self, id: u8) -> bool;

    fn set_mode(&mut self, id: u8, mode: Mode) -> i32;
    fn set_speed(&mut self, id: u8, percent: f64) -> i32;
    fn set_torque(&mut self, id: u8, percent: f64) -> i32;
    fn set_led(&mut self, id: u8, on: bool) -> i32;

    /// Command a positional move and hand over the completion token.
    ///
    /// On success the transport owns the token: it fires it exactly once when
    /// the device settles at (or stalls near) the goal. A token whose callback
    /// was cancelled fires as a no-op; a transport may skip watching a token
    /// that never carried a callback. On a negative return the transport must
    /// not retain the token.
    fn start_move(&mut self, id: u8, position_deg: f64, token: CompletionToken) -> i32;

    /// Stop watching `id` for arrival. No-op when nothing is watched.
    fn cancel_callback(&mut self, id: u8);

    /// Continuous rotation at `percent` of full speed, sign = direction.
    fn turn(&mut self, id: u8, percent: f64) -> i32;
}
