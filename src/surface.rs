//! Drawing capability shared by the renderer and the controller.
//!
//! A surface is an off-screen pixel grid plus a `present` that pushes it to
//! whatever shows it. The core only ever commands a surface; it never reads
//! pixels back.

use crate::DisplayPowerState;
use embedded_graphics::pixelcolor::Rgb888;
use std::io;
use thiserror::Error;

/// Failure while pushing a frame out.
#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("display output failed: {0}")]
    Io(#[from] io::Error),
}

/// Fill/pixel/line/text drawing plus presentation.
///
/// Coordinates outside the grid are clipped, not errors.
pub trait Surface {
    /// Set every pixel.
    fn fill(&mut self, color: Rgb888);

    fn pixel(&mut self, x: i32, y: i32, color: Rgb888);

    /// One-pixel-wide segment, both end points included.
    fn line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb888);

    /// Blit digit glyphs with their top-left corner at `(x, y)`.
    fn text(&mut self, text: &str, x: i32, y: i32, color: Rgb888);

    /// Select the presentation-time override used by the next `present`.
    fn set_power(&mut self, state: DisplayPowerState);

    /// Flush the buffer to the device.
    fn present(&mut self) -> Result<(), DisplayError>;
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;

    /// One recorded surface command.
    #[derive(Clone, Debug, PartialEq)]
    pub enum DrawCall {
        Fill(Rgb888),
        Pixel(i32, i32, Rgb888),
        Line(i32, i32, i32, i32, Rgb888),
        Text(String, i32, i32, Rgb888),
        Power(DisplayPowerState),
        Present,
    }

    /// Surface that records commands instead of drawing.
    #[derive(Default)]
    pub struct RecordingSurface {
        pub calls: Vec<DrawCall>,
        /// Make the n-th `present` (0-based) fail
        pub fail_present_at: Option<usize>,
        presents: usize,
    }

    impl RecordingSurface {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn take(&mut self) -> Vec<DrawCall> {
            std::mem::take(&mut self.calls)
        }

        pub fn presents(&self) -> usize {
            self.presents
        }
    }

    impl Surface for RecordingSurface {
        fn fill(&mut self, color: Rgb888) {
            self.calls.push(DrawCall::Fill(color));
        }

        fn pixel(&mut self, x: i32, y: i32, color: Rgb888) {
            self.calls.push(DrawCall::Pixel(x, y, color));
        }

        fn line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb888) {
            self.calls.push(DrawCall::Line(x0, y0, x1, y1, color));
        }

        fn text(&mut self, text: &str, x: i32, y: i32, color: Rgb888) {
            self.calls.push(DrawCall::Text(text.to_string(), x, y, color));
        }

        fn set_power(&mut self, state: DisplayPowerState) {
            self.calls.push(DrawCall::Power(state));
        }

        fn present(&mut self) -> Result<(), DisplayError> {
            let index = self.presents;
            self.presents += 1;
            if self.fail_present_at == Some(index) {
                return Err(DisplayError::Io(io::Error::other("panel unplugged")));
            }
            self.calls.push(DrawCall::Present);
            Ok(())
        }
    }
}
