//! # Glucose Matrix Core Library
//!
//! This library provides the rendering and scheduling core for a small LED matrix
//! that shows the latest Nightscout glucose value. It targets tiny Linux boards
//! (Raspberry Pi Zero class) driving a 16×10 pixel grid.
//!
//! ## Design Philosophy
//!
//! ### Fixed-point readings
//! - **Tenths, not floats**: a [`GlucoseReading`] stores its value as integer tenths,
//!   so splitting it into the integer part and the decimal digit is plain integer
//!   division and never depends on how a float happens to format
//! - **Validated once**: negative, non-finite and three-digit values are rejected when
//!   the reading is built, so the renderer only ever sees drawable input
//!
//! ### Cooperative scheduling
//! A single loop owns everything. Each tick either resyncs the clock, polls and renders
//! a fresh value, or advances a one-pixel progress bar, then presents the frame and
//! sleeps. There is no local error recovery: any fault ends the loop and the
//! [`supervisor`] restarts the device program from scratch.
//!
//! ### Data Flow
//! 1. **Fetch**: Nightscout `entries.json` → raw SGV → `sgv / 18.0` rounded to one decimal
//! 2. **Classify**: integer part → [`severity::Severity`] → palette color
//! 3. **Render**: compact two-digit layout drawn on a [`framebuffer::FrameBuffer`]
//! 4. **Present**: frame pushed to a pixel sink, blanked during night hours
//!
//! ## Core Types
//!
//! - [`GlucoseReading`]: one validated value with one decimal
//! - [`DisplayPowerState`]: the presentation-time night override

use std::fmt;
use thiserror::Error;

// Module declarations
pub mod clock;
pub mod config;
pub mod controller;
pub mod framebuffer;
pub mod glyphs;
pub mod nightscout;
pub mod renderer;
pub mod severity;
pub mod supervisor;
pub mod surface;

/// Conversion factor from a raw sensor glucose value (mg/dL) to the displayed unit.
pub const SGV_PER_UNIT: f64 = 18.0;

/// Largest reading the two-digit layout can draw (99.9).
pub const MAX_TENTHS: u16 = 999;

/// Errors raised when a value cannot become a drawable reading.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadingError {
    /// NaN or infinite input
    #[error("glucose value is not a finite number")]
    NotFinite,

    /// Below zero
    #[error("glucose value {0} is negative")]
    Negative(f64),

    /// Integer part would need three digits
    #[error("glucose value {0} does not fit in two digits")]
    TooLarge(f64),
}

/// A single glucose value with exactly one decimal digit.
///
/// The value is held as tenths (`9.7` is stored as `97`), which keeps the
/// digit split exact:
/// - `integer_part()` = tenths / 10
/// - `decimal_digit()` = tenths % 10
///
/// # Example
/// ```
/// use glucose_matrix_lib::GlucoseReading;
///
/// // 175 mg/dL is 9.72..., shown as 9.7
/// let reading = GlucoseReading::from_sgv(175.0).unwrap();
/// assert_eq!(reading.integer_part(), 9);
/// assert_eq!(reading.decimal_digit(), 7);
/// assert_eq!(reading.to_string(), "9.7");
///
/// assert!(GlucoseReading::from_value(-1.0).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlucoseReading {
    tenths: u16,
}

impl GlucoseReading {
    /// Build a reading from a raw SGV in mg/dL.
    pub fn from_sgv(sgv: f64) -> Result<Self, ReadingError> {
        if !sgv.is_finite() {
            return Err(ReadingError::NotFinite);
        }
        Self::from_value(sgv / SGV_PER_UNIT)
    }

    /// Build a reading from a displayed value, rounding to one decimal.
    pub fn from_value(value: f64) -> Result<Self, ReadingError> {
        if !value.is_finite() {
            return Err(ReadingError::NotFinite);
        }
        if value < 0.0 {
            return Err(ReadingError::Negative(value));
        }
        let tenths = (value * 10.0).round();
        if tenths > f64::from(MAX_TENTHS) {
            return Err(ReadingError::TooLarge(value));
        }
        Ok(Self {
            tenths: tenths as u16,
        })
    }

    /// Build a reading from integer tenths (`97` is 9.7).
    pub fn from_tenths(tenths: u16) -> Result<Self, ReadingError> {
        if tenths > MAX_TENTHS {
            return Err(ReadingError::TooLarge(f64::from(tenths) / 10.0));
        }
        Ok(Self { tenths })
    }

    pub fn tenths(self) -> u16 {
        self.tenths
    }

    /// Whole units, 0–99.
    pub fn integer_part(self) -> u16 {
        self.tenths / 10
    }

    /// The single decimal digit, 0–9.
    pub fn decimal_digit(self) -> u8 {
        (self.tenths % 10) as u8
    }
}

impl fmt::Display for GlucoseReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.integer_part(), self.decimal_digit())
    }
}

/// Whether presented frames show the drawn content or are forced off.
///
/// This is applied when a frame is presented, never while drawing: a
/// suppressed display keeps its buffer intact underneath.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisplayPowerState {
    #[default]
    Enabled,
    Suppressed,
}
