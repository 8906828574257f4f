//! # Glucose Numeral Rendering
//!
//! Draws one [`GlucoseReading`] on the 16×10 matrix using a compact layout:
//!
//! ```text
//!  col 0-1   col 3-7     col 9   col 11-15
//!  ┌──────┬───────────┬───────┬───────────┐
//!  │ tens │ unit digit│  dot  │  decimal  │   readings below 20
//!  └──────┴───────────┴───────┴───────────┘
//!  ┌──────┬───────────────────────────────┐
//!  │      │ two digits from column 3      │   readings of 20 and above
//!  └──────┴───────────────────────────────┘
//! ```
//!
//! Values 10–19 reuse the 0–9 glyph plus a thin "1" marker in columns 0–1.
//! The whole numeral takes the severity color of its integer part.
//!
//! The pixel corrections below are tied to [`crate::glyphs::DIGITS_5X8`]: its
//! "1" has a foot on glyph row 6, and the two outer foot pixels are cleared.

use crate::config::PaletteConfig;
use crate::severity::Thresholds;
use crate::surface::{DisplayError, Surface};
use crate::GlucoseReading;
use embedded_graphics::pixelcolor::Rgb888;

/// Top-left corner of the integer glyphs.
pub const INTEGER_ANCHOR: (i32, i32) = (3, 2);
/// Top-left corner of the decimal glyph.
pub const DECIMAL_ANCHOR: (i32, i32) = (11, 2);
/// The decimal point pixel.
pub const DECIMAL_POINT: (i32, i32) = (9, 8);
/// Row the glyph feet sit on (anchor row + 6).
const FOOT_ROW: i32 = 8;

/// Readings at or above this integer part are drawn without a decimal.
pub const NO_DECIMAL_FROM: u16 = 20;

/// Maps readings to colored draw calls.
#[derive(Clone, Debug)]
pub struct Renderer {
    thresholds: Thresholds,
    palette: PaletteConfig,
}

impl Renderer {
    pub fn new(thresholds: Thresholds, palette: PaletteConfig) -> Self {
        Self {
            thresholds,
            palette,
        }
    }

    /// Severity color for a whole-unit value.
    pub fn color_for(&self, integer_part: u16) -> Rgb888 {
        self.palette
            .severity(self.thresholds.classify(i32::from(integer_part)))
    }

    /// Clear the surface, draw `reading` and present it.
    pub fn render<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        reading: GlucoseReading,
    ) -> Result<(), DisplayError> {
        let background = self.palette.background();
        surface.fill(background);

        let mut integer = reading.integer_part();
        let decimal = reading.decimal_digit();
        let color = self.color_for(integer);
        let (ix, iy) = INTEGER_ANCHOR;

        if integer >= NO_DECIMAL_FROM {
            surface.text(&integer.to_string(), ix, iy, color);
            if integer == 21 {
                // foot of the second glyph
                surface.pixel(10, FOOT_ROW, background);
                surface.pixel(12, FOOT_ROW, background);
            }
            return surface.present();
        }

        if integer >= 10 {
            surface.pixel(0, 3, color);
            surface.line(1, 2, 1, FOOT_ROW, color);
            integer -= 10;
        }

        surface.text(&integer.to_string(), ix, iy, color);
        if integer == 1 {
            trim_one_foot(surface, ix, background);
        }

        let (px, py) = DECIMAL_POINT;
        surface.pixel(px, py, color);

        let (dx, dy) = DECIMAL_ANCHOR;
        surface.text(&decimal.to_string(), dx, dy, color);
        if decimal == 1 {
            trim_one_foot(surface, dx, background);
        }

        surface.present()
    }
}

/// Clear the outer pixels of the "1" foot for a glyph anchored at column `x`.
fn trim_one_foot<S: Surface + ?Sized>(surface: &mut S, x: i32, background: Rgb888) {
    surface.pixel(x + 1, FOOT_ROW, background);
    surface.pixel(x + 3, FOOT_ROW, background);
}
