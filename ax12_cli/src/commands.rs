//! Command execution: backend assembly and one function per subcommand.
//!
//! Everything that drives a servo takes `impl Actuator`, so the hardware and
//! simulated backends share the same code paths; only construction differs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde_json::json;

use ax12_config::Config;
use ax12_core::{Actuator, AxError, CommError, Mode};

use crate::cli::{LedState, ReadField};

/// Slice length for shutdown-aware waits.
const WAIT_SLICE: Duration = Duration::from_millis(50);

/// Stable names for the JSON `reason` field.
pub fn reason_name(err: &AxError) -> &'static str {
    use ax12_core::InitError;
    match err {
        AxError::Init(InitError::PortOpenFailed) => "PortOpenFailed",
        AxError::Init(InitError::MutexCreateFailed) => "MutexCreateFailed",
        AxError::Init(InitError::Unknown(_)) => "InitFailed",
        AxError::Comm(CommError::NotInitialized) => "NotInitialized",
        AxError::Comm(CommError::BadChecksum) => "BadChecksum",
        AxError::Comm(CommError::IdMismatch) => "IdMismatch",
        AxError::Comm(CommError::Timeout) => "Timeout",
        AxError::Comm(CommError::CallbackBufferFull) => "CallbackBufferFull",
        AxError::Comm(CommError::Unknown(_)) => "CommFailed",
        AxError::InvalidArgument(_) => "InvalidArgument",
    }
}

#[cfg(not(feature = "hardware"))]
fn sim_timing(cfg: &Config) -> ax12_core::SimTiming {
    ax12_core::SimTiming {
        settle: Duration::from_millis(cfg.sim.settle_ms),
        startup_delay: Duration::from_millis(cfg.sim.startup_delay_ms),
    }
}

#[cfg(not(feature = "hardware"))]
pub fn actuator(cfg: &Config, id: u8) -> eyre::Result<ax12_core::SimulatedActuator> {
    Ok(ax12_core::SimulatedActuator::with_timing(id, sim_timing(cfg)))
}

#[cfg(feature = "hardware")]
pub fn open_bus(cfg: &Config) -> eyre::Result<std::sync::Arc<ax12_core::Bus>> {
    use eyre::WrapErr;
    let transport = ax12_hardware::SerialTransport::uart(cfg.bus.device.as_str())
        .wrap_err_with(|| format!("opening serial device {}", cfg.bus.device))?;
    ax12_core::Bus::open(transport, cfg.bus.baud_rate)
}

#[cfg(feature = "hardware")]
pub fn actuator(cfg: &Config, id: u8) -> eyre::Result<ax12_core::HardwareActuator> {
    let bus = open_bus(cfg)?;
    ax12_core::HardwareActuator::new(bus, id)
}

pub fn run_scan(cfg: &Config, json_mode: bool, shutdown: &AtomicBool) -> eyre::Result<()> {
    #[cfg(feature = "hardware")]
    {
        let bus = open_bus(cfg)?;
        let mut ids = Vec::new();
        let mut interrupted = false;
        for id in 0..=ax12_core::SCAN_LAST_ID {
            if shutdown.load(Ordering::Relaxed) {
                tracing::warn!(next_id = id, "scan interrupted");
                interrupted = true;
                break;
            }
            if bus.ping(id) == 0 {
                if !json_mode {
                    println!("found servo id {id}");
                }
                ids.push(id);
            }
        }
        report_scan(&ids, !interrupted, json_mode);
    }
    #[cfg(not(feature = "hardware"))]
    {
        let _ = (cfg, shutdown); // the simulated sweep has no bus to cancel
        let ids = ax12_core::SimulatedActuator::scan();
        report_scan(&ids, true, json_mode);
    }
    Ok(())
}

fn report_scan(ids: &[u8], complete: bool, json_mode: bool) {
    if json_mode {
        println!("{}", json!({ "ids": ids, "complete": complete }));
    } else if ids.is_empty() {
        println!("no servos found");
    } else {
        println!("{} servo(s) found", ids.len());
    }
}

pub fn run_move(
    act: &mut impl Actuator,
    degrees: f64,
    timeout: Duration,
    no_wait: bool,
    json_mode: bool,
    shutdown: &AtomicBool,
) -> eyre::Result<()> {
    let started = Instant::now();
    let id = act.id();

    if no_wait {
        act.move_to(degrees, None)?;
        tracing::info!(id, degrees, "move dispatched");
        confirm(
            json_mode,
            format!("move dispatched: id {id} toward {degrees:.2} deg"),
            json!({
                "timestamp": unix_millis(),
                "id": id,
                "target_deg": degrees,
                "final_deg": serde_json::Value::Null,
                "settled": false,
                "duration_ms": elapsed_ms(started),
            }),
        );
        return Ok(());
    }

    let (tx, rx) = crossbeam_channel::bounded::<()>(1);
    act.move_to(
        degrees,
        Some(Box::new(move || {
            let _ = tx.send(());
        })),
    )?;
    tracing::info!(id, degrees, timeout_ms = timeout.as_millis() as u64, "move dispatched, waiting");

    let settled = wait_for_completion(&rx, timeout, shutdown);
    if !settled {
        // Motion continues on the servo; only the notification is dropped.
        act.cancel_callback();
    }
    let final_deg = act.position();
    let duration_ms = elapsed_ms(started);
    if settled {
        tracing::info!(id, final_deg, duration_ms, "move complete");
    } else {
        tracing::warn!(id, "gave up waiting; motion continues on the servo");
    }
    confirm(
        json_mode,
        if settled {
            format!("move complete: id {id} at {final_deg:.2} deg in {duration_ms} ms")
        } else {
            format!("move still settling: id {id}, last read {final_deg:.2} deg")
        },
        json!({
            "timestamp": unix_millis(),
            "id": id,
            "target_deg": degrees,
            "final_deg": if settled { json!(final_deg) } else { serde_json::Value::Null },
            "settled": settled,
            "duration_ms": duration_ms,
        }),
    );
    Ok(())
}

/// Wait for the completion rendezvous in short slices so Ctrl-C stays
/// responsive while the servo travels.
fn wait_for_completion(
    rx: &crossbeam_channel::Receiver<()>,
    timeout: Duration,
    shutdown: &AtomicBool,
) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        let slice = WAIT_SLICE.min(deadline - now);
        match rx.recv_timeout(slice) {
            Ok(()) => return true,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return false,
        }
    }
}

pub fn run_turn(act: &mut impl Actuator, percent: f64, json_mode: bool) -> eyre::Result<()> {
    act.turn(percent)?;
    let id = act.id();
    tracing::info!(id, percent, "turn commanded");
    confirm(
        json_mode,
        if percent == 0.0 {
            format!("turn stopped: id {id}")
        } else {
            format!("turning: id {id} at {percent:.1}%")
        },
        json!({ "id": id, "percent": percent, "moving": percent != 0.0 }),
    );
    Ok(())
}

pub fn run_ping(cfg: &Config, id: u8, json_mode: bool) -> eyre::Result<()> {
    let code = ping_code(cfg, id)?;
    if code < 0 {
        return Err(AxError::Comm(CommError::from_status(code)).into());
    }
    confirm(
        json_mode,
        format!("servo {id} responding"),
        json!({ "id": id, "responding": true }),
    );
    Ok(())
}

#[cfg(feature = "hardware")]
fn ping_code(cfg: &Config, id: u8) -> eyre::Result<i32> {
    Ok(open_bus(cfg)?.ping(id))
}

#[cfg(not(feature = "hardware"))]
fn ping_code(cfg: &Config, id: u8) -> eyre::Result<i32> {
    let mut sim = ax12_core::SimulatedActuator::with_timing(id, sim_timing(cfg));
    Ok(sim.ping())
}

pub fn run_status(act: &mut impl Actuator, json_mode: bool) -> eyre::Result<()> {
    let id = act.id();
    let position = act.position();
    let speed = act.speed();
    let load = act.load();
    let voltage = act.voltage();
    let temperature = act.temperature();
    let moving = act.is_moving();
    let status = act.status();

    if json_mode {
        println!(
            "{}",
            json!({
                "id": id,
                "position_deg": position,
                "speed_pct": speed,
                "load_pct": load,
                "voltage_v": voltage,
                "temperature_c": temperature,
                "moving": moving,
                "error_bits": status,
            })
        );
    } else {
        println!("servo {id}");
        println!("  position     {position:>8.2} deg");
        println!("  speed        {speed:>8.2} %");
        println!("  load         {load:>8.2} %");
        println!("  voltage      {voltage:>8.1} V");
        println!("  temperature  {temperature:>5} C");
        println!("  moving       {moving}");
        if status >= 0 {
            println!("  error bits   0x{status:02x}");
        } else {
            println!("  error bits   unavailable (status {status})");
        }
    }
    Ok(())
}

pub fn run_read(act: &mut impl Actuator, field: ReadField, json_mode: bool) -> eyre::Result<()> {
    let (key, value) = match field {
        ReadField::Position => ("position_deg", json!(act.position())),
        ReadField::Speed => ("speed_pct", json!(act.speed())),
        ReadField::Load => ("load_pct", json!(act.load())),
        ReadField::Voltage => ("voltage_v", json!(act.voltage())),
        ReadField::Temperature => ("temperature_c", json!(act.temperature())),
        ReadField::Moving => ("moving", json!(act.is_moving())),
    };
    if json_mode {
        let mut obj = serde_json::Map::new();
        obj.insert("id".to_owned(), json!(act.id()));
        obj.insert(key.to_owned(), value);
        println!("{}", serde_json::Value::Object(obj));
    } else {
        println!("{value}");
    }
    Ok(())
}

pub fn run_set_speed(act: &mut impl Actuator, percent: f64, json_mode: bool) -> eyre::Result<()> {
    act.set_speed(percent)?;
    confirm(
        json_mode,
        format!("speed set: id {} to {percent:.1}%", act.id()),
        json!({ "id": act.id(), "speed_pct": percent }),
    );
    Ok(())
}

pub fn run_set_torque(act: &mut impl Actuator, percent: f64, json_mode: bool) -> eyre::Result<()> {
    act.set_torque(percent)?;
    confirm(
        json_mode,
        format!("torque set: id {} to {percent:.1}%", act.id()),
        json!({ "id": act.id(), "torque_pct": percent }),
    );
    Ok(())
}

pub fn run_set_led(act: &mut impl Actuator, state: LedState, json_mode: bool) -> eyre::Result<()> {
    let on = matches!(state, LedState::On);
    act.set_led(on)?;
    confirm(
        json_mode,
        format!("led {}: id {}", if on { "on" } else { "off" }, act.id()),
        json!({ "id": act.id(), "led": on }),
    );
    Ok(())
}

pub fn run_set_mode(act: &mut impl Actuator, mode: &str, json_mode: bool) -> eyre::Result<()> {
    let mode = parse_mode(mode)?;
    act.set_mode(mode)?;
    confirm(
        json_mode,
        format!("mode set: id {} to {mode}", act.id()),
        json!({ "id": act.id(), "mode": mode.to_string() }),
    );
    Ok(())
}

/// Accepts the mode name or its numeric wire code (0 default, 1 wheel).
fn parse_mode(s: &str) -> eyre::Result<Mode> {
    match s.to_ascii_lowercase().as_str() {
        "wheel" => Ok(Mode::Wheel),
        "default" | "joint" => Ok(Mode::Default),
        other => {
            let code = other.parse::<u8>().map_err(|_| {
                AxError::InvalidArgument(format!(
                    "unknown mode {other:?} (expected wheel, default, or a wire code)"
                ))
            })?;
            Mode::from_code(code)
                .ok_or_else(|| AxError::InvalidArgument(format!("unknown mode code {code}")).into())
        }
    }
}

pub fn run_self_check(cfg: &Config, json_mode: bool) -> eyre::Result<()> {
    #[cfg(feature = "hardware")]
    {
        let bus = open_bus(cfg)?;
        tracing::info!(baud_rate = bus.baud_rate(), "bus reachable");
        confirm(
            json_mode,
            "self-check: ok (bus open)".to_owned(),
            json!({ "ok": true, "backend": "hardware" }),
        );
    }
    #[cfg(not(feature = "hardware"))]
    {
        let mut probe = ax12_core::SimulatedActuator::with_timing(0, sim_timing(cfg));
        let code = probe.ping();
        tracing::info!(code, "simulated probe answered");
        confirm(
            json_mode,
            "self-check: ok (simulated backend)".to_owned(),
            json!({ "ok": true, "backend": "sim" }),
        );
    }
    Ok(())
}

#[cfg(feature = "hardware")]
pub fn run_factory_reset(cfg: &Config, id: u8, yes: bool, json_mode: bool) -> eyre::Result<()> {
    use ax12_core::{InitError, Transport};
    use eyre::WrapErr;

    if !yes {
        return Err(AxError::InvalidArgument(
            "factory-reset wipes the servo's id and baud settings; pass --yes to confirm".to_owned(),
        )
        .into());
    }
    // Raw maintenance path: the reset reverts the servo's baud rate, so the
    // bus-level default profile would be pointless right after it.
    let mut transport = ax12_hardware::SerialTransport::uart(cfg.bus.device.as_str())
        .wrap_err_with(|| format!("opening serial device {}", cfg.bus.device))?;
    let code = transport.open(cfg.bus.baud_rate);
    if code < 0 {
        return Err(AxError::Init(InitError::from_status(code)).into());
    }
    let code = transport.factory_reset(id);
    if code < 0 {
        return Err(AxError::Comm(CommError::from_status(code)).into());
    }
    tracing::warn!(id, "factory reset sent; the servo answers as id 1 at 1 Mbaud from now on");
    confirm(
        json_mode,
        format!("factory reset sent to id {id}"),
        json!({ "event": "factory_reset", "id": id }),
    );
    Ok(())
}

fn confirm(json_mode: bool, human: String, obj: serde_json::Value) {
    if json_mode {
        println!("{obj}");
    } else {
        println!("{human}");
    }
}

fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}
