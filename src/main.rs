//! # Glucose Matrix Application Entry Point
//!
//! This binary wires the library together: configuration, logging, the
//! Nightscout client, the clock source and a framebuffer whose frames go to
//! the terminal. It supports both device mode (supervised tick loop) and
//! development mode (render one value and exit).

// Test modules
#[cfg(test)]
mod tests;

use anyhow::Context;
use glucose_matrix_lib::clock::SystemClockSource;
use glucose_matrix_lib::config::Config;
use glucose_matrix_lib::controller::{Controller, ControllerState, Fault};
use glucose_matrix_lib::framebuffer::{FrameBuffer, TerminalSink};
use glucose_matrix_lib::nightscout::{GlucoseSource, NightscoutClient};
use glucose_matrix_lib::renderer::Renderer;
use glucose_matrix_lib::supervisor::{supervise, RESTART_EXIT_CODE};
use glucose_matrix_lib::GlucoseReading;
use log::{error, info};
use std::convert::Infallible;
use std::env;
use std::process::ExitCode;

/// Value following `flag` on the command line, if any.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|index| args.get(index + 1))
        .map(String::as_str)
}

/// One boot: acquire every handle, sync the clock, tick until a fault.
fn boot(config: &Config) -> Result<Infallible, Fault> {
    let source = NightscoutClient::new(&config.nightscout)?;
    info!("polling {}", source.url().origin().ascii_serialization());
    let clock_source = SystemClockSource::new(config.clock.tz_offset_hours)?;
    let surface = FrameBuffer::from_config(&config.display, &config.palette, TerminalSink::stdout());

    let mut controller = Controller::start(config, surface, source, clock_source)?;
    controller.run(ControllerState::primed(&config.schedule))
}

/// Development mode: draw one reading upright at full brightness and exit.
fn render_once(config: &Config, reading: GlucoseReading) -> anyhow::Result<()> {
    let mut surface =
        FrameBuffer::from_config(&config.display, &config.palette, TerminalSink::stdout())
            .with_rotation(false)
            .with_brightness(1.0);
    Renderer::new(config.thresholds, config.palette)
        .render(&mut surface, reading)
        .context("render to terminal")?;
    println!("{}", reading);
    Ok(())
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let config = match flag_value(&args, "--config") {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };
    config.validate().context("invalid configuration")?;

    // Development mode: a given value, no network
    if let Some(value) = flag_value(&args, "--once") {
        let value: f64 = value
            .parse()
            .with_context(|| format!("--once expects a number, got {:?}", value))?;
        render_once(&config, GlucoseReading::from_value(value)?)?;
        return Ok(ExitCode::SUCCESS);
    }

    // Development mode: fetch the latest value once
    if args.iter().any(|arg| arg == "--stdout") {
        let mut source = NightscoutClient::new(&config.nightscout)?;
        let sgv = source.fetch_sgv().context("fetch latest entry")?;
        render_once(&config, GlucoseReading::from_sgv(sgv)?)?;
        return Ok(ExitCode::SUCCESS);
    }

    let fault = supervise(&config.device, config.schedule.poll_period(), || boot(&config));
    error!("exiting for a process restart: {}", fault);
    Ok(ExitCode::from(RESTART_EXIT_CODE))
}
