//! `thermaloop` – closed-loop thermal regulation demo.
//!
//! This binary wires the full stack together against simulated hardware:
//!
//! 1. Loads `thermaloop.toml` (path from the first CLI argument, defaulting
//!    to the current directory) and applies `THERMALOOP_*` env overrides.
//! 2. Builds a rig of [`SimCamera`]s watching a first-order [`ThermalPlant`]
//!    driven by a [`SimHeater`].
//! 3. Runs the [`ControlLoop`] at the configured tick interval, printing a
//!    status line as the temperature converges on the setpoint.
//! 4. Intercepts **Ctrl-C** to stop regulation and drive the heater to 0 V
//!    before exiting.

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use colored::Colorize;
use tracing::{info, warn};

use thermaloop_control::{AggregationMode, ControlLoop, ControlQuery, PidController, PidSettings};
use thermaloop_hal::{Actuator, CameraBank, SimCamera, SimHeater, ThermalPlant};
use thermaloop_types::{Frame, ThermalError};

/// Simulated plant parameters: ambient 25 °C, 30 s time constant, 8 °C/s of
/// heating authority per volt.
const AMBIENT_C: f32 = 25.0;
const PLANT_TAU_S: f32 = 30.0;
const VOLTS_TO_DEG_PER_S: f32 = 8.0;

/// Simulated sensor resolution.
const FRAME_ROWS: usize = 8;
const FRAME_COLS: usize = 6;

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // Initialise tracing-subscriber using RUST_LOG (defaults to "info").
    // Set THERMALOOP_LOG_FORMAT=json to emit newline-delimited JSON logs for
    // log aggregators.  Operator-facing output still uses println!.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("THERMALOOP_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    print_banner();

    // ── Configuration ─────────────────────────────────────────────────────
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("thermaloop.toml"));

    let cfg = match config::load_from(&path) {
        Ok(Some(cfg)) => {
            println!("  Config loaded from {}", path.display().to_string().bold());
            cfg
        }
        Ok(None) => {
            println!(
                "  No config at {}; using defaults.",
                path.display().to_string().dimmed()
            );
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!(
            "{}",
            "⚠  Ctrl-C received – stopping regulation …".yellow().bold()
        );
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    if let Err(e) = run(&cfg, &shutdown) {
        println!("{}: {}", "Fatal".red().bold(), e);
        std::process::exit(1);
    }
}

/// Build the simulated rig and run the control loop until shutdown.
fn run(cfg: &config::Config, shutdown: &AtomicBool) -> Result<(), ThermalError> {
    let mode: AggregationMode = cfg.aggregation_mode.parse()?;

    // ── Simulated rig ─────────────────────────────────────────────────────
    let mut plant = ThermalPlant::new(AMBIENT_C, PLANT_TAU_S, VOLTS_TO_DEG_PER_S);

    let camera_count = cfg.cameras.max(1);
    let mut feeders: Vec<SimCamera> = Vec::with_capacity(camera_count);
    let mut bank = CameraBank::new();
    for i in 0..camera_count {
        let cam = SimCamera::new(format!("sim-cam{i}"));
        feeders.push(cam.clone());
        bank.add_camera(Box::new(cam));
    }

    let heater = SimHeater::new("sim-siggen");
    let observer = heater.clone();

    let pid = PidController::new(PidSettings {
        kp: cfg.kp,
        ki: cfg.ki,
        kd: cfg.kd,
        setpoint: cfg.setpoint,
        output_limits: (cfg.min_voltage, cfg.max_voltage),
        sample_time: Duration::from_millis(cfg.sample_time_ms),
    })?;

    let mut ctrl = ControlLoop::new(
        bank,
        Box::new(heater),
        pid,
        ControlQuery {
            camera_indices: cfg.camera_indices.clone(),
            mode,
        },
        cfg.trend_capacity,
    )?;

    info!(
        setpoint = cfg.setpoint,
        mode = %mode,
        cameras = camera_count,
        "control loop assembled"
    );
    println!(
        "  Regulating {} camera(s) to {} via {} (Ctrl-C to stop)\n",
        camera_count.to_string().bold(),
        format!("{:.1} °C", cfg.setpoint).bold().cyan(),
        cfg.aggregation_mode.bold()
    );

    // ── Tick loop ─────────────────────────────────────────────────────────
    let tick_interval = Duration::from_millis(cfg.tick_interval_ms.max(1));
    let dt = tick_interval.as_secs_f32();
    let mut ticks: u64 = 0;

    while !shutdown.load(Ordering::SeqCst) {
        // Advance the plant under the last heater command, then let each
        // camera observe it with a mild per-camera offset.
        let temperature = plant.step(observer.voltage(), dt);
        for (i, cam) in feeders.iter().enumerate() {
            cam.inject(plant_frame(temperature + i as f32 * 0.2)?);
        }

        let sample = ctrl.tick();
        ticks += 1;

        if ticks % 5 == 0
            && let Some(s) = sample
        {
            let stable = ctrl.trend().is_stable(20, 0.5);
            let marker = if stable {
                "stable".green()
            } else {
                "settling".yellow()
            };
            println!(
                "  {}  reading {:>7.2} °C  setpoint {:>6.1}  output {:>5.2} V  [{}]",
                format!("t+{:>5.1}s", ticks as f32 * dt).dimmed(),
                s.reading,
                s.setpoint,
                s.output,
                marker
            );
        }

        std::thread::sleep(tick_interval);
    }

    // ── Shutdown ──────────────────────────────────────────────────────────
    ctrl.stop()?;
    println!("{}", "  ✓ Regulation stopped, heater at 0 V.".green());
    Ok(())
}

/// Render the plant temperature as a small thermal frame with a mild spatial
/// gradient, so per-frame mean and max genuinely differ.
fn plant_frame(temperature: f32) -> Result<Frame, ThermalError> {
    let mut data = Vec::with_capacity(FRAME_ROWS * FRAME_COLS);
    for r in 0..FRAME_ROWS {
        for c in 0..FRAME_COLS {
            data.push(temperature + r as f32 * 0.05 - c as f32 * 0.03);
        }
    }
    Frame::new(FRAME_ROWS, FRAME_COLS, data)
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   __  __                          __                 "#.bold().cyan());
    println!("{}", r#"  / /_/ /  ___ ______ _  ___ _/ /__  ___  ___        "#.bold().cyan());
    println!("{}", r#" / __/ _ \/ -_) __/  ' \/ _ `/ / _ \/ _ \/ _ \       "#.bold().cyan());
    println!("{}", r#" \__/_//_/\__/_/ /_/_/_/\_,_/_/\___/\___/ .__/       "#.bold().cyan());
    println!("{}", r#"                                       /_/           "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "thermaloop".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Multi-camera thermal aggregation and PID control");
    println!();
}
