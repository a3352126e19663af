//! `ax12` binary: argument parsing, logging setup, and dispatch.
//!
//! Backend selection is a compile-time concern: with the `hardware` feature
//! the commands drive the serial chain from the config's `[bus]` section,
//! without it they drive the in-memory simulated servo.

mod cli;
mod commands;
mod error_fmt;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use eyre::WrapErr;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::cli::{Cli, CliBus, Commands, DEFAULT_CONFIG_PATH, FILE_GUARD, JSON_MODE, LAST_BUS};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = color_eyre::install() {
        eprintln!("error report handler failed to install: {e}");
    }

    if let Err(e) = run(&cli) {
        if *JSON_MODE.get().unwrap_or(&false) {
            println!("{}", error_fmt::format_error_json(&e));
        } else {
            println!("{}", error_fmt::humanize(&e));
        }
        tracing::error!(error = %e, "command failed");
        std::process::exit(error_fmt::exit_code_for_error(&e));
    }
}

fn run(cli: &Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli.config)?;
    init_tracing(cli, &cfg.logging);
    let _ = LAST_BUS.set(CliBus {
        device: cfg.bus.device.clone(),
        baud_rate: cfg.bus.baud_rate,
    });

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::Relaxed);
        })
        .wrap_err("installing the Ctrl-C handler")?;
    }

    match &cli.cmd {
        Commands::Scan => commands::run_scan(&cfg, cli.json, &shutdown),
        Commands::Move {
            id,
            degrees,
            timeout_ms,
            no_wait,
        } => {
            let mut act = commands::actuator(&cfg, *id)?;
            commands::run_move(
                &mut act,
                *degrees,
                Duration::from_millis(*timeout_ms),
                *no_wait,
                cli.json,
                &shutdown,
            )
        }
        Commands::Turn { id, percent } => {
            let mut act = commands::actuator(&cfg, *id)?;
            commands::run_turn(&mut act, *percent, cli.json)
        }
        Commands::Ping { id } => commands::run_ping(&cfg, *id, cli.json),
        Commands::Status { id } => {
            let mut act = commands::actuator(&cfg, *id)?;
            commands::run_status(&mut act, cli.json)
        }
        Commands::Read { id, field } => {
            let mut act = commands::actuator(&cfg, *id)?;
            commands::run_read(&mut act, *field, cli.json)
        }
        Commands::SetSpeed { id, percent } => {
            let mut act = commands::actuator(&cfg, *id)?;
            commands::run_set_speed(&mut act, *percent, cli.json)
        }
        Commands::SetTorque { id, percent } => {
            let mut act = commands::actuator(&cfg, *id)?;
            commands::run_set_torque(&mut act, *percent, cli.json)
        }
        Commands::SetLed { id, state } => {
            let mut act = commands::actuator(&cfg, *id)?;
            commands::run_set_led(&mut act, *state, cli.json)
        }
        Commands::SetMode { id, mode } => {
            let mut act = commands::actuator(&cfg, *id)?;
            commands::run_set_mode(&mut act, mode, cli.json)
        }
        Commands::SelfCheck => commands::run_self_check(&cfg, cli.json),
        #[cfg(feature = "hardware")]
        Commands::FactoryReset { id, yes } => {
            commands::run_factory_reset(&cfg, *id, *yes, cli.json)
        }
    }
}

/// Load the config file. The default path is allowed to be absent (built-in
/// defaults apply); an explicitly named file must load.
fn load_config(path: &Path) -> eyre::Result<ax12_config::Config> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG_PATH) {
        let cfg = ax12_config::Config::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let cfg = ax12_config::load_path(path)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Console layer on stderr (pretty or JSON per `--json`), plus an optional
/// JSON-lines file sink from the `[logging]` config section.
fn init_tracing(cli: &Cli, logging: &ax12_config::Logging) {
    // RUST_LOG wins over --log-level when set.
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console = if cli.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    };

    let file = logging.file.as_deref().and_then(|path| {
        match file_writer(path, logging.rotation.as_deref()) {
            Ok(writer) => {
                let filter = EnvFilter::try_new(logging.level.as_deref().unwrap_or("info"))
                    .unwrap_or_else(|_| EnvFilter::new("info"));
                Some(fmt::layer().json().with_writer(writer).with_filter(filter))
            }
            Err(e) => {
                eprintln!("log file disabled: {e}");
                None
            }
        }
    });

    tracing_subscriber::registry().with(console).with(file).init();
}

fn file_writer(
    path: &str,
    rotation: Option<&str>,
) -> eyre::Result<tracing_appender::non_blocking::NonBlocking> {
    let p = Path::new(path);
    let dir = match p.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    let name = p
        .file_name()
        .ok_or_else(|| eyre::eyre!("log path {path:?} has no file name"))?;
    let appender = match rotation.unwrap_or("never") {
        "daily" => tracing_appender::rolling::daily(dir, name),
        "hourly" => tracing_appender::rolling::hourly(dir, name),
        "never" => tracing_appender::rolling::never(dir, name),
        other => {
            eprintln!("unknown log rotation {other:?}, using never");
            tracing_appender::rolling::never(dir, name)
        }
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = FILE_GUARD.set(guard);
    Ok(writer)
}
