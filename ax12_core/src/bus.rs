//! Shared-bus handle: owns the transport and the current baud rate.
//!
//! One `Bus` per physical chain, handed out as `Arc` clones. Every exchange
//! and every (re)initialization goes through one mutex, mirroring the single
//! half-duplex wire underneath.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ax12_traits::Transport;

use crate::error::{AxError, InitError, Result};

/// Lowest rate the servo baud divisor can express.
pub const BAUD_RATE_MIN: u32 = 7_343;
/// Highest rate supported on the shared serial link.
pub const BAUD_RATE_MAX: u32 = 1_000_000;

/// Last id swept by `scan`. The broadcast id (0xFE) is never pinged;
/// 253 rather than 254 is a carried-over convention of the protocol stack.
pub const SCAN_LAST_ID: u8 = 253;

struct BusState {
    transport: Box<dyn Transport>,
    baud_rate: u32,
}

pub struct Bus {
    state: Mutex<BusState>,
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus").finish_non_exhaustive()
    }
}

impl Bus {
    /// Open the transport at `baud_rate` and broadcast the default profile.
    ///
    /// The returned handle is the single owner of the chain; clone the `Arc`
    /// for every actuator sharing it.
    pub fn open(transport: impl Transport + 'static, baud_rate: u32) -> Result<Arc<Self>> {
        validate_baud(baud_rate)?;
        let mut transport: Box<dyn Transport> = Box::new(transport);
        let code = transport.open(baud_rate);
        if code < 0 {
            return Err(AxError::Init(InitError::from_status(code)).into());
        }
        apply_default_profile(transport.as_mut());
        tracing::info!(baud_rate, "servo bus initialized");
        Ok(Arc::new(Self {
            state: Mutex::new(BusState {
                transport,
                baud_rate,
            }),
        }))
    }

    /// Reconfigure the shared rate. A same-rate call is a no-op with no
    /// transport traffic; a different rate re-opens the transport and
    /// re-applies the default profile. Concurrent callers are serialized.
    pub fn ensure_baud_rate(&self, baud_rate: u32) -> Result<()> {
        validate_baud(baud_rate)?;
        let mut st = self.lock_state();
        if st.baud_rate == baud_rate {
            return Ok(());
        }
        tracing::warn!(
            current = st.baud_rate,
            requested = baud_rate,
            "bus baud rate does not match previously established rate, changing it"
        );
        let code = st.transport.open(baud_rate);
        if code < 0 {
            return Err(AxError::Init(InitError::from_status(code)).into());
        }
        apply_default_profile(st.transport.as_mut());
        st.baud_rate = baud_rate;
        Ok(())
    }

    #[must_use]
    pub fn baud_rate(&self) -> u32 {
        self.lock_state().baud_rate
    }

    /// Raw ping status: 0 when the servo answered, negative otherwise.
    /// Never an error; absence of an answer is an expected outcome.
    pub fn ping(&self, id: u8) -> i32 {
        self.lock_state().transport.ping(id)
    }

    /// Sweep every scannable id in ascending order. Blocks for the full
    /// sweep; cancellation belongs to the caller's boundary, not here.
    pub fn scan(&self) -> Vec<u8> {
        self.scan_with(|_| {})
    }

    /// Like `scan`, streaming each responding id to `on_found` as it is
    /// discovered. The observer runs outside the bus lock.
    pub fn scan_with(&self, mut on_found: impl FnMut(u8)) -> Vec<u8> {
        let mut found = Vec::new();
        for id in 0..=SCAN_LAST_ID {
            if self.ping(id) == 0 {
                tracing::debug!(id, "scan hit");
                on_found(id);
                found.push(id);
            }
        }
        found
    }

    /// Run `f` with exclusive access to the transport.
    pub(crate) fn with_transport<R>(&self, f: impl FnOnce(&mut dyn Transport) -> R) -> R {
        let mut st = self.lock_state();
        f(st.transport.as_mut())
    }

    fn lock_state(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Broadcast the runtime defaults of the chain. Best-effort: broadcasts get
/// no answers, so a failure here only means the write itself did not go out.
fn apply_default_profile(transport: &mut dyn Transport) {
    let code = transport.reset_all();
    if code < 0 {
        tracing::warn!(code, "default profile broadcast failed");
    }
}

fn validate_baud(baud_rate: u32) -> Result<()> {
    if !(BAUD_RATE_MIN..=BAUD_RATE_MAX).contains(&baud_rate) {
        return Err(AxError::InvalidArgument(format!(
            "baud rate {baud_rate} outside [{BAUD_RATE_MIN}, {BAUD_RATE_MAX}]"
        ))
        .into());
    }
    Ok(())
}
