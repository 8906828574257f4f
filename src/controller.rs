//! # Tick Controller
//!
//! The cooperative loop that drives the device. Every tick advances two
//! counters and performs at most one big action:
//!
//! 1. **Clock resync** when the resync counter passes `clock_refresh_cycles`.
//!    Resetting both counters pushes the next poll back by a full cycle.
//! 2. **Poll** when the poll counter passes `update_cycles`. Inside the night
//!    window the display is suppressed and nothing is fetched; otherwise the
//!    latest value is fetched and rendered.
//! 3. **Idle** otherwise: one more pixel of the progress bar on row 0.
//!
//! The tick always ends with a present. Errors are never handled here: any
//! failure ends [`Controller::run`] and the supervisor decides what happens next.

use crate::clock::{clock_label, ClockError, ClockSource, WallClock};
use crate::config::{Config, PaletteConfig, ScheduleConfig};
use crate::nightscout::{FetchError, GlucoseSource};
use crate::renderer::Renderer;
use crate::surface::{DisplayError, Surface};
use crate::{DisplayPowerState, GlucoseReading, ReadingError};
use chrono::Timelike;
use log::info;
use std::convert::Infallible;
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Row holding the progress bar.
pub const PROGRESS_ROW: i32 = 0;

/// Any failure that ends the loop.
#[derive(Error, Debug)]
pub enum Fault {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("unusable reading: {0}")]
    Reading(#[from] ReadingError),

    #[error("clock failed: {0}")]
    Clock(#[from] ClockError),

    #[error("display failed: {0}")]
    Display(#[from] DisplayError),

    /// The wall clock was read before any sync
    #[error("wall clock was never synchronized")]
    ClockNotSet,
}

/// Local hours during which the display is off, inclusive on both ends.
///
/// `begin > end` wraps past midnight (22..=6 covers 22:00 to 06:59).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NightWindow {
    pub begin: u32,
    pub end: u32,
}

impl NightWindow {
    pub fn new(begin: u32, end: u32) -> Self {
        Self { begin, end }
    }

    pub fn contains(&self, hour: u32) -> bool {
        if self.begin <= self.end {
            hour >= self.begin && hour <= self.end
        } else {
            hour >= self.begin || hour <= self.end
        }
    }
}

/// Mutable loop state, threaded through every tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControllerState {
    pub poll_counter: u32,
    pub resync_counter: u32,
    pub power: DisplayPowerState,
}

impl ControllerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State whose first tick polls right away.
    pub fn primed(schedule: &ScheduleConfig) -> Self {
        Self {
            poll_counter: schedule.update_cycles,
            ..Self::default()
        }
    }
}

/// What a tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    ClockResync,
    Rendered(GlucoseReading),
    NightTime { hour: u32 },
    Idle { progress: u32 },
}

/// Owns the device handles for one boot.
pub struct Controller<S, G, C> {
    surface: S,
    source: G,
    clock_source: C,
    clock: WallClock,
    renderer: Renderer,
    night: NightWindow,
    schedule: ScheduleConfig,
    palette: PaletteConfig,
    width: i32,
}

impl<S: Surface, G: GlucoseSource, C: ClockSource> Controller<S, G, C> {
    /// One-time setup: take the handles and sync the wall clock.
    pub fn start(config: &Config, surface: S, source: G, clock_source: C) -> Result<Self, Fault> {
        let mut controller = Self {
            surface,
            source,
            clock_source,
            clock: WallClock::new(),
            renderer: Renderer::new(config.thresholds, config.palette),
            night: NightWindow::new(config.night.off_hours_begin, config.night.off_hours_end),
            schedule: config.schedule.clone(),
            palette: config.palette,
            width: config.display.width as i32,
        };
        controller.resync_clock()?;
        Ok(controller)
    }

    /// Tick forever, sleeping `tick_ms` after each one. Returns only on a fault.
    pub fn run(&mut self, mut state: ControllerState) -> Result<Infallible, Fault> {
        let pause = Duration::from_millis(self.schedule.tick_ms);
        loop {
            self.tick(&mut state)?;
            thread::sleep(pause);
        }
    }

    /// Advance the counters, act, present.
    pub fn tick(&mut self, state: &mut ControllerState) -> Result<TickOutcome, Fault> {
        state.poll_counter += 1;
        state.resync_counter += 1;

        let outcome = if state.resync_counter > self.schedule.clock_refresh_cycles {
            self.resync_clock()?;
            state.resync_counter = 0;
            state.poll_counter = 0;
            TickOutcome::ClockResync
        } else if state.poll_counter > self.schedule.update_cycles {
            let outcome = self.poll(state)?;
            state.poll_counter = 0;
            outcome
        } else {
            let progress = state.poll_counter;
            info!("{}: waiting {}ms", progress, self.schedule.tick_ms);
            self.surface.line(
                0,
                PROGRESS_ROW,
                progress as i32 - 1,
                PROGRESS_ROW,
                self.palette.foreground(),
            );
            TickOutcome::Idle { progress }
        };

        self.surface.set_power(state.power);
        self.surface.present()?;
        Ok(outcome)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn clock(&self) -> &WallClock {
        &self.clock
    }

    fn resync_clock(&mut self) -> Result<(), Fault> {
        let now = self.clock_source.fetch_time()?;
        self.clock.set(now);
        info!("clock synchronized: {}", clock_label(&now));
        Ok(())
    }

    fn poll(&mut self, state: &mut ControllerState) -> Result<TickOutcome, Fault> {
        let now = self.clock.now().ok_or(Fault::ClockNotSet)?;
        let hour = now.hour();

        if self.night.contains(hour) {
            state.power = DisplayPowerState::Suppressed;
            self.surface.set_power(state.power);
            info!("night time {}, no updates", clock_label(&now));
            return Ok(TickOutcome::NightTime { hour });
        }

        state.power = DisplayPowerState::Enabled;
        self.surface.set_power(state.power);
        info!("getting sgv data on {}...", clock_label(&now));
        let sgv = self.source.fetch_sgv()?;
        let reading = GlucoseReading::from_sgv(sgv)?;
        info!("got {}", reading);

        self.renderer.render(&mut self.surface, reading)?;
        self.surface.line(
            0,
            PROGRESS_ROW,
            self.width - 1,
            PROGRESS_ROW,
            self.palette.background(),
        );
        Ok(TickOutcome::Rendered(reading))
    }
}
