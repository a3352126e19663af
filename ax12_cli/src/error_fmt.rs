//! Human-readable error descriptions and structured JSON error formatting.

use crate::cli::LAST_BUS;
use crate::commands::reason_name;
use ax12_core::{AxError, CommError, InitError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(ax) = err.downcast_ref::<AxError>() {
        return match ax {
            AxError::Init(InitError::PortOpenFailed) => {
                "What happened: The servo serial port could not be opened.\nLikely causes: Wrong [bus] device path, missing permissions on the device node, or another process holding the port.\nHow to fix: Check bus.device in the config (default /dev/serial0), add the user to the dialout group, and stop competing readers.".to_string()
            }
            AxError::Init(InitError::MutexCreateFailed) => {
                "What happened: The bus lock could not be created during initialization.\nLikely causes: Resource exhaustion at startup.\nHow to fix: Retry; if it persists, check system limits and free memory.".to_string()
            }
            AxError::Init(InitError::Unknown(code)) => format!(
                "What happened: Bus initialization failed with status {code}.\nLikely causes: A transport failure outside the known table.\nHow to fix: Re-run with --log-level=debug to see the underlying exchange."
            ),
            AxError::Comm(CommError::NotInitialized) => {
                "What happened: A servo exchange ran before the bus was opened.\nLikely causes: The serial port dropped out from under the transport.\nHow to fix: Check the cable and rerun; the bus reopens on the next start.".to_string()
            }
            AxError::Comm(CommError::BadChecksum) => {
                "What happened: The servo answer arrived corrupted (checksum mismatch).\nLikely causes: Electrical noise, long unshielded wiring, or a marginal baud rate.\nHow to fix: Shorten or shield the data line, verify bus.baud_rate, and retry.".to_string()
            }
            AxError::Comm(CommError::IdMismatch) => {
                "What happened: A different servo answered than the one addressed.\nLikely causes: Two servos share one id, or answers crossed on the half-duplex line.\nHow to fix: Run `ax12 scan`, give each servo a unique id, and retry.".to_string()
            }
            AxError::Comm(CommError::Timeout) => {
                "What happened: The servo did not answer within the allowed time.\nLikely causes: Wrong id, servo unpowered, or a baud mismatch with the chain.\nHow to fix: Run `ax12 scan`, check the supply voltage, and verify bus.baud_rate matches the servos.".to_string()
            }
            AxError::Comm(CommError::CallbackBufferFull) => {
                "What happened: The transport cannot watch another move for arrival.\nLikely causes: Too many concurrent watched moves on one chain.\nHow to fix: Wait for pending moves to finish or cancel their callbacks, then retry.".to_string()
            }
            AxError::Comm(CommError::Unknown(code)) => format!(
                "What happened: A servo exchange failed with status {code}.\nLikely causes: A transport failure outside the known table.\nHow to fix: Re-run with --log-level=debug to see the underlying exchange."
            ),
            AxError::InvalidArgument(msg) => format!(
                "What happened: Invalid argument ({msg}).\nLikely causes: A value outside the servo's physical range.\nHow to fix: Positions are -150..150 degrees, torque 0..100 percent, baud 7343..1000000."
            ),
        };
    }

    // String-based heuristics for errors coming from config loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("reading config file") {
        return "What happened: The config file could not be read.\nLikely causes: Wrong --config path or missing read permission.\nHow to fix: Point --config at an existing TOML file, or drop the flag to use built-in defaults.".to_string();
    }
    if lower.contains("parsing config file") {
        return "What happened: The config file is not valid TOML for this schema.\nLikely causes: A typo, a wrong value type, or a misplaced key.\nHow to fix: Compare against the sample config ([bus], [sim], [logging]) and fix the reported line.".to_string();
    }
    if lower.contains("bus.") || lower.contains("sim.") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Map the error taxonomy to stable exit codes; everything else returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(ax) = err.downcast_ref::<AxError>() {
        return match ax {
            AxError::InvalidArgument(_) => 2,
            AxError::Init(_) => 3,
            AxError::Comm(CommError::Timeout) => 4,
            AxError::Comm(CommError::CallbackBufferFull) => 5,
            AxError::Comm(_) => 6,
        };
    }
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    if let Some(ax) = err.downcast_ref::<AxError>() {
        let msg = humanize(err);
        let reason = reason_name(ax);

        let details = match ax {
            AxError::Init(_) | AxError::Comm(CommError::NotInitialized) => LAST_BUS
                .get()
                .map(|b| json!({ "device": b.device, "baud_rate": b.baud_rate })),
            _ => None,
        };

        let obj = if let Some(d) = details {
            json!({ "reason": reason, "details": d, "message": msg })
        } else {
            json!({ "reason": reason, "message": msg })
        };
        return obj.to_string();
    }

    // Generic error JSON
    json!({ "reason": "Error", "message": humanize(err) }).to_string()
}
