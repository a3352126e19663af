//! Serial servo transport: exchange engine plus the arrival watcher.
//!
//! One instruction/answer exchange at a time goes over the half-duplex
//! line: the engine sits behind a mutex shared with the watcher thread,
//! flushes stale RX bytes before each send, retries corrupt or unanswered
//! exchanges, and spaces transactions out so the servo electronics get
//! their recovery window.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use ax12_traits::{CompletionToken, Mode, Transport};

use crate::convert;
use crate::frame::{self, BROADCAST_ID, FrameParser, StatusFrame, instruction};
use crate::link::SerialLink;
use crate::registers;
use crate::watcher::ArrivalWatcher;

/// Retries after the first failed exchange.
const SEND_RETRIES: usize = 2;
/// Per-attempt budget for the status answer.
const ANSWER_TIMEOUT: Duration = Duration::from_millis(10);
/// Pause the servo electronics need between consecutive transactions.
const RECOVERY_GAP: Duration = Duration::from_millis(15);
/// Polling interval while waiting for answer bytes.
const RX_POLL: Duration = Duration::from_micros(200);

/// Most servos an arrival watch table will hold at once.
pub const WATCH_CAPACITY: usize = 40;

/// `Transport` over a byte-level serial link.
///
/// Exchanges run under an internal lock, so the arrival watcher thread and
/// the owning bus interleave whole transactions, never bytes. Status codes
/// follow the shared convention: 0 success, -1 not initialized, -2 bad
/// checksum, -3 id mismatch, -4 timeout, -5 watch table full.
pub struct SerialTransport {
    engine: Arc<Mutex<Engine>>,
    watcher: ArrivalWatcher,
}

impl SerialTransport {
    pub fn new(link: impl SerialLink + 'static) -> crate::error::Result<Self> {
        let engine = Arc::new(Mutex::new(Engine::new(Box::new(link))));
        let watcher = ArrivalWatcher::spawn(Arc::clone(&engine))?;
        Ok(Self { engine, watcher })
    }

    /// Transport over the Pi UART device node.
    #[cfg(feature = "hardware")]
    pub fn uart(path: impl Into<std::path::PathBuf>) -> crate::error::Result<Self> {
        Self::new(crate::uart::UartLink::new(path))
    }

    /// Wipe a servo's EEPROM back to factory state (id becomes 1, baud
    /// 1 Mbps). Deliberately not on the `Transport` trait: it is a bench
    /// maintenance action, not part of driving.
    pub fn factory_reset(&mut self, id: u8) -> i32 {
        let mut eng = self.lock_engine();
        match eng.transact_logged(id, instruction::FACTORY_RESET, &[]) {
            Ok(_) => 0,
            Err(code) => code,
        }
    }

    fn lock_engine(&self) -> MutexGuard<'_, Engine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for SerialTransport {
    fn open(&mut self, baud_rate: u32) -> i32 {
        let mut eng = self.lock_engine();
        match eng.link.reopen(baud_rate) {
            Ok(()) => {
                eng.open = true;
                0
            }
            Err(e) => {
                tracing::warn!(%e, baud_rate, "cannot open servo serial link");
                -1
            }
        }
    }

    fn reset_all(&mut self) -> i32 {
        self.lock_engine().broadcast_defaults()
    }

    fn ping(&mut self, id: u8) -> i32 {
        self.lock_engine().ping(id)
    }

    fn status(&mut self, id: u8) -> i32 {
        self.lock_engine().device_status(id)
    }

    fn position(&mut self, id: u8) -> f64 {
        self.lock_engine().position_deg(id)
    }

    fn speed(&mut self, id: u8) -> f64 {
        self.lock_engine().speed_percent(id)
    }

    fn load(&mut self, id: u8) -> f64 {
        self.lock_engine().load_percent(id)
    }

    fn voltage(&mut self, id: u8) -> f64 {
        self.lock_engine().voltage_volts(id)
    }

    fn temperature(&mut self, id: u8) -> i32 {
        self.lock_engine().temperature_celsius(id)
    }

    fn is_moving(&mut self, id: u8) -> bool {
        self.lock_engine().moving(id)
    }

    fn set_mode(&mut self, id: u8, mode: Mode) -> i32 {
        self.lock_engine().set_mode(id, mode)
    }

    fn set_speed(&mut self, id: u8, percent: f64) -> i32 {
        self.lock_engine().set_speed(id, percent)
    }

    fn set_torque(&mut self, id: u8, percent: f64) -> i32 {
        self.lock_engine().set_torque(id, percent)
    }

    fn set_led(&mut self, id: u8, on: bool) -> i32 {
        self.lock_engine().set_led(id, on)
    }

    fn start_move(&mut self, id: u8, position_deg: f64, token: CompletionToken) -> i32 {
        let code = self.lock_engine().write_goal(id, position_deg);
        if code < 0 {
            return code;
        }
        // The new goal replaces whatever watch the previous move left.
        self.watcher.unwatch(id);
        if token.has_callback() && !self.watcher.watch(id, position_deg, token) {
            tracing::warn!(id, "arrival watch table full, completion will not be reported");
            return -5;
        }
        code
    }

    fn cancel_callback(&mut self, id: u8) {
        self.watcher.unwatch(id);
    }

    fn turn(&mut self, id: u8, percent: f64) -> i32 {
        // Same register as set_speed; in wheel mode it drives rotation.
        self.lock_engine().set_speed(id, percent)
    }
}

/// Exchange engine: owns the link and the transaction discipline.
pub(crate) struct Engine {
    link: Box<dyn SerialLink>,
    open: bool,
    last_exchange: Option<Instant>,
}

impl Engine {
    fn new(link: Box<dyn SerialLink>) -> Self {
        Self {
            link,
            open: false,
            last_exchange: None,
        }
    }

    /// Idempotent runtime profile broadcast: answers on, 6 µs return delay,
    /// alarms on overheat/overload/voltage error, full torque, half speed.
    pub(crate) fn broadcast_defaults(&mut self) -> i32 {
        let codes = [
            self.write8(BROADCAST_ID, registers::STATUS_RETURN_LEVEL, 2),
            self.write8(BROADCAST_ID, registers::RETURN_DELAY, 3),
            self.write8(BROADCAST_ID, registers::ALARM_SHUTDOWN, 0x25),
            self.write8(BROADCAST_ID, registers::ALARM_LED, 0x25),
            self.set_torque(BROADCAST_ID, 100.0),
            self.set_speed(BROADCAST_ID, 50.0),
        ];
        codes.into_iter().find(|c| *c < 0).unwrap_or(0)
    }

    pub(crate) fn ping(&mut self, id: u8) -> i32 {
        match self.transact_logged(id, instruction::PING, &[]) {
            Ok(_) => 0,
            Err(code) => code,
        }
    }

    /// Device error bitfield from a ping answer, or the negative transfer
    /// code when the exchange itself failed.
    pub(crate) fn device_status(&mut self, id: u8) -> i32 {
        match self.transact_logged(id, instruction::PING, &[]) {
            Ok(frame) => i32::from(frame.error),
            Err(code) => code,
        }
    }

    pub(crate) fn position_deg(&mut self, id: u8) -> f64 {
        self.read16(id, registers::PRESENT_POSITION)
            .map_or(0.0, convert::degrees_from_ticks)
    }

    pub(crate) fn speed_percent(&mut self, id: u8) -> f64 {
        self.read16(id, registers::PRESENT_SPEED)
            .map_or(0.0, convert::percent_from_raw)
    }

    pub(crate) fn load_percent(&mut self, id: u8) -> f64 {
        self.read16(id, registers::PRESENT_LOAD)
            .map_or(0.0, convert::percent_from_raw)
    }

    pub(crate) fn voltage_volts(&mut self, id: u8) -> f64 {
        self.read8(id, registers::PRESENT_VOLTAGE)
            .map_or(0.0, convert::volts_from_raw)
    }

    pub(crate) fn temperature_celsius(&mut self, id: u8) -> i32 {
        self.read8(id, registers::PRESENT_TEMPERATURE)
            .map_or(0, i32::from)
    }

    /// Polled continuously by the watcher; a failed poll reads as "not
    /// moving" and is only worth a trace line.
    pub(crate) fn moving(&mut self, id: u8) -> bool {
        match self.transact(id, instruction::READ_DATA, &[registers::MOVING, 1]) {
            Ok(frame) => frame.value() == 1,
            Err(code) => {
                tracing::trace!(id, code, "moving poll failed");
                false
            }
        }
    }

    pub(crate) fn set_mode(&mut self, id: u8, mode: Mode) -> i32 {
        let limit = match mode {
            Mode::Wheel => 0,
            Mode::Default => 0x3FF,
        };
        self.write16(id, registers::CCW_ANGLE_LIMIT, limit)
    }

    pub(crate) fn set_speed(&mut self, id: u8, percent: f64) -> i32 {
        self.write16(id, registers::MOVING_SPEED, convert::raw_from_percent(percent))
    }

    /// Zero torque drops the torque-enable flag instead of writing a zero
    /// ceiling; anything else re-enables and sets the ceiling.
    pub(crate) fn set_torque(&mut self, id: u8, percent: f64) -> i32 {
        let disable = (percent * 100.0).round() == 0.0;
        let mut code = self.write8(id, registers::TORQUE_ENABLE, u8::from(!disable));
        if !disable {
            code = self.write16(id, registers::MAX_TORQUE, convert::raw_magnitude(percent));
        }
        code
    }

    pub(crate) fn set_led(&mut self, id: u8, on: bool) -> i32 {
        self.write8(id, registers::LED, u8::from(on))
    }

    pub(crate) fn write_goal(&mut self, id: u8, position_deg: f64) -> i32 {
        self.write16(
            id,
            registers::GOAL_POSITION,
            convert::ticks_from_degrees(position_deg),
        )
    }

    fn write8(&mut self, id: u8, reg: u8, value: u8) -> i32 {
        match self.transact_logged(id, instruction::WRITE_DATA, &[reg, value]) {
            Ok(_) => 0,
            Err(code) => code,
        }
    }

    fn write16(&mut self, id: u8, reg: u8, value: u16) -> i32 {
        let [lo, hi] = value.to_le_bytes();
        match self.transact_logged(id, instruction::WRITE_DATA, &[reg, lo, hi]) {
            Ok(_) => 0,
            Err(code) => code,
        }
    }

    fn read8(&mut self, id: u8, reg: u8) -> Result<u8, i32> {
        self.transact_logged(id, instruction::READ_DATA, &[reg, 1])
            .map(|frame| frame.params.first().copied().unwrap_or(0))
    }

    fn read16(&mut self, id: u8, reg: u8) -> Result<u16, i32> {
        self.transact_logged(id, instruction::READ_DATA, &[reg, 2])
            .map(|frame| frame.value())
    }

    fn transact_logged(
        &mut self,
        id: u8,
        instruction: u8,
        params: &[u8],
    ) -> Result<StatusFrame, i32> {
        self.transact(id, instruction, params).map_err(|code| {
            tracing::warn!(id, code, "servo exchange failed");
            code
        })
    }

    /// One full transaction: flush, send, await the answer, retrying failed
    /// attempts. Broadcasts are fire-and-forget. Always leaves the recovery
    /// timestamp behind for the next caller.
    fn transact(&mut self, id: u8, instruction: u8, params: &[u8]) -> Result<StatusFrame, i32> {
        if !self.open {
            return Err(-1);
        }
        self.honor_recovery_gap();

        let request = frame::instruction_frame(id, instruction, params);
        let mut outcome: Result<StatusFrame, i32> = Err(-4);
        for _ in 0..=SEND_RETRIES {
            if let Err(e) = self.link.flush_input() {
                tracing::warn!(%e, id, "serial link failure");
                outcome = Err(-1);
                break;
            }
            if let Err(e) = self.link.send(&request) {
                tracing::warn!(%e, id, "serial link failure");
                outcome = Err(-1);
                break;
            }
            if id == BROADCAST_ID {
                outcome = Ok(StatusFrame {
                    id,
                    error: 0,
                    params: Vec::new(),
                });
                break;
            }
            outcome = self.receive_answer(id);
            if outcome.is_ok() {
                break;
            }
        }

        self.last_exchange = Some(Instant::now());
        outcome
    }

    fn receive_answer(&mut self, expected_id: u8) -> Result<StatusFrame, i32> {
        let deadline = Instant::now() + ANSWER_TIMEOUT;
        let mut parser = FrameParser::new();
        loop {
            if Instant::now() >= deadline {
                return Err(-4);
            }
            match self.link.recv_byte() {
                Ok(Some(byte)) => match parser.push(byte) {
                    Ok(Some(frame)) => {
                        if frame.id != expected_id {
                            return Err(-3);
                        }
                        return Ok(frame);
                    }
                    Ok(None) => {}
                    Err(_) => return Err(-2),
                },
                Ok(None) => thread::sleep(RX_POLL),
                Err(e) => {
                    tracing::warn!(%e, "serial link failure");
                    return Err(-1);
                }
            }
        }
    }

    fn honor_recovery_gap(&mut self) {
        if let Some(at) = self.last_exchange {
            let since = at.elapsed();
            if since < RECOVERY_GAP {
                thread::sleep(RECOVERY_GAP - since);
            }
        }
    }
}
