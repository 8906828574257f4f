//! # Matrix Framebuffer
//!
//! An off-screen RGB grid that implements both the embedded-graphics
//! [`DrawTarget`] and the crate's [`Surface`] capability. Drawing never
//! touches the output; [`Surface::present`] builds the outgoing frame and
//! hands it to a [`PixelSink`].
//!
//! ## Presentation pipeline
//! 1. **Power**: a suppressed display presents a frame of the off color, the
//!    buffer itself is left untouched
//! 2. **Brightness**: every channel is scaled by the global brightness
//! 3. **Rotation**: a matrix mounted upside down gets the frame rotated by 180°
//!
//! ## Sinks
//! - [`TerminalSink`]: ANSI truecolor preview for development on a desktop
//! - [`MemorySink`]: keeps the last frame, for headless runs and tests

use crate::config::{DisplayConfig, PaletteConfig};
use crate::glyphs::DIGITS_5X8;
use crate::surface::{DisplayError, Surface};
use crate::DisplayPowerState;
use embedded_graphics::{
    mono_font::MonoTextStyle,
    pixelcolor::{Rgb888, RgbColor},
    prelude::*,
    primitives::{Line, PrimitiveStyle},
    text::{Baseline, Text},
};
use std::convert::Infallible;
use std::io::{self, Write};

/// Destination for presented frames.
pub trait PixelSink {
    /// `frame` is row-major, `width * height` long.
    fn show(&mut self, frame: &[Rgb888], width: u32, height: u32) -> Result<(), DisplayError>;
}

/// Off-screen pixel grid with a presentation-time night override.
pub struct FrameBuffer<K> {
    width: u32,
    height: u32,
    pixels: Vec<Rgb888>,
    power: DisplayPowerState,
    off_color: Rgb888,
    brightness: f32,
    rotate_180: bool,
    sink: K,
    outgoing: Vec<Rgb888>,
}

impl<K: PixelSink> FrameBuffer<K> {
    /// Full brightness, no rotation, black off color.
    pub fn new(width: u32, height: u32, sink: K) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: vec![Rgb888::BLACK; len],
            power: DisplayPowerState::Enabled,
            off_color: Rgb888::BLACK,
            brightness: 1.0,
            rotate_180: false,
            sink,
            outgoing: Vec::with_capacity(len),
        }
    }

    pub fn from_config(display: &DisplayConfig, palette: &PaletteConfig, sink: K) -> Self {
        let mut buffer = Self::new(display.width, display.height, sink);
        buffer.off_color = palette.off();
        buffer.brightness = display.brightness;
        buffer.rotate_180 = display.rotate_180;
        buffer.pixels.fill(palette.background());
        buffer
    }

    pub fn with_brightness(mut self, brightness: f32) -> Self {
        self.brightness = brightness.clamp(0.0, 1.0);
        self
    }

    pub fn with_rotation(mut self, rotate_180: bool) -> Self {
        self.rotate_180 = rotate_180;
        self
    }

    pub fn with_off_color(mut self, color: Rgb888) -> Self {
        self.off_color = color;
        self
    }

    /// Buffered color at `(x, y)`, `None` outside the grid.
    pub fn get_pixel(&self, x: i32, y: i32) -> Option<Rgb888> {
        self.index(Point::new(x, y)).map(|i| self.pixels[i])
    }

    pub fn power(&self) -> DisplayPowerState {
        self.power
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    fn index(&self, point: Point) -> Option<usize> {
        let (x, y) = (point.x, point.y);
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    fn scale(&self, color: Rgb888) -> Rgb888 {
        if self.brightness >= 1.0 {
            return color;
        }
        let channel = |c: u8| (f32::from(c) * self.brightness).round() as u8;
        Rgb888::new(channel(color.r()), channel(color.g()), channel(color.b()))
    }
}

impl<K> OriginDimensions for FrameBuffer<K> {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl<K: PixelSink> DrawTarget for FrameBuffer<K> {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let Some(i) = self.index(point) {
                self.pixels[i] = color;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.pixels.fill(color);
        Ok(())
    }
}

impl<K: PixelSink> Surface for FrameBuffer<K> {
    fn fill(&mut self, color: Rgb888) {
        self.pixels.fill(color);
    }

    fn pixel(&mut self, x: i32, y: i32, color: Rgb888) {
        if let Some(i) = self.index(Point::new(x, y)) {
            self.pixels[i] = color;
        }
    }

    fn line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb888) {
        if (x0, y0) == (x1, y1) {
            self.pixel(x0, y0, color);
            return;
        }
        Line::new(Point::new(x0, y0), Point::new(x1, y1))
            .into_styled(PrimitiveStyle::with_stroke(color, 1))
            .draw(self)
            .ok();
    }

    fn text(&mut self, text: &str, x: i32, y: i32, color: Rgb888) {
        let style = MonoTextStyle::new(&DIGITS_5X8, color);
        Text::with_baseline(text, Point::new(x, y), style, Baseline::Top)
            .draw(self)
            .ok();
    }

    fn set_power(&mut self, state: DisplayPowerState) {
        self.power = state;
    }

    fn present(&mut self) -> Result<(), DisplayError> {
        let mut outgoing = std::mem::take(&mut self.outgoing);
        outgoing.clear();
        match self.power {
            DisplayPowerState::Suppressed => {
                let off = self.scale(self.off_color);
                outgoing.resize(self.pixels.len(), off);
            }
            DisplayPowerState::Enabled => {
                outgoing.extend(self.pixels.iter().map(|&c| self.scale(c)));
            }
        }
        // Row-major order reversed is the grid turned by 180 degrees
        if self.rotate_180 {
            outgoing.reverse();
        }
        let result = self.sink.show(&outgoing, self.width, self.height);
        self.outgoing = outgoing;
        result
    }
}

/// Prints each frame as colored blocks on an ANSI terminal.
pub struct TerminalSink<W> {
    out: W,
}

impl TerminalSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> PixelSink for TerminalSink<W> {
    fn show(&mut self, frame: &[Rgb888], width: u32, _height: u32) -> Result<(), DisplayError> {
        let mut text = String::with_capacity(frame.len() * 24);
        for row in frame.chunks(width as usize) {
            for c in row {
                if *c == Rgb888::BLACK {
                    text.push_str("\x1b[0m· ");
                } else {
                    text.push_str(&format!("\x1b[38;2;{};{};{}m██", c.r(), c.g(), c.b()));
                }
            }
            text.push_str("\x1b[0m\n");
        }
        text.push('\n');
        self.out.write_all(text.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}

/// Keeps the most recently presented frame in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    last: Vec<Rgb888>,
    width: u32,
    frames: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames presented so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn last_frame(&self) -> &[Rgb888] {
        &self.last
    }

    /// Color presented at `(x, y)` in the last frame.
    pub fn presented(&self, x: u32, y: u32) -> Option<Rgb888> {
        if x >= self.width {
            return None;
        }
        self.last
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

impl PixelSink for MemorySink {
    fn show(&mut self, frame: &[Rgb888], width: u32, _height: u32) -> Result<(), DisplayError> {
        self.last.clear();
        self.last.extend_from_slice(frame);
        self.width = width;
        self.frames += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb888 = Rgb888::new(200, 0, 0);

    fn buffer() -> FrameBuffer<MemorySink> {
        FrameBuffer::new(16, 10, MemorySink::new())
    }

    #[test]
    fn test_pixels_clip_outside_grid() {
        let mut fb = buffer();
        fb.pixel(-1, 0, RED);
        fb.pixel(16, 0, RED);
        fb.pixel(0, 10, RED);
        fb.pixel(15, 9, RED);
        assert_eq!(fb.get_pixel(15, 9), Some(RED));
        assert_eq!(fb.get_pixel(16, 9), None);
        let lit = (0..16)
            .flat_map(|x| (0..10).map(move |y| (x, y)))
            .filter(|&(x, y)| fb.get_pixel(x, y) == Some(RED))
            .count();
        assert_eq!(lit, 1);
    }

    #[test]
    fn test_vertical_line_includes_both_ends() {
        let mut fb = buffer();
        fb.line(1, 2, 1, 8, RED);
        for y in 0..10 {
            let expected = if (2..=8).contains(&y) { Some(RED) } else { Some(Rgb888::BLACK) };
            assert_eq!(fb.get_pixel(1, y), expected, "row {}", y);
        }
    }

    #[test]
    fn test_single_point_line() {
        let mut fb = buffer();
        fb.line(0, 0, 0, 0, RED);
        assert_eq!(fb.get_pixel(0, 0), Some(RED));
        assert_eq!(fb.get_pixel(1, 0), Some(Rgb888::BLACK));
    }

    #[test]
    fn test_text_is_transparent() {
        let mut fb = buffer();
        fb.fill(Rgb888::BLUE);
        fb.text("1", 3, 2, RED);
        // top of the stem
        assert_eq!(fb.get_pixel(5, 2), Some(RED));
        // foot
        assert_eq!(fb.get_pixel(4, 8), Some(RED));
        assert_eq!(fb.get_pixel(6, 8), Some(RED));
        // left of the stem stays background
        assert_eq!(fb.get_pixel(3, 2), Some(Rgb888::BLUE));
    }

    #[test]
    fn test_suppressed_present_keeps_buffer() {
        let mut fb = buffer().with_off_color(Rgb888::new(1, 2, 3));
        fb.pixel(4, 4, RED);
        fb.set_power(DisplayPowerState::Suppressed);
        fb.present().unwrap();

        assert!(fb
            .sink()
            .last_frame()
            .iter()
            .all(|&c| c == Rgb888::new(1, 2, 3)));
        assert_eq!(fb.get_pixel(4, 4), Some(RED));

        fb.set_power(DisplayPowerState::Enabled);
        fb.present().unwrap();
        assert_eq!(fb.sink().presented(4, 4), Some(RED));
        assert_eq!(fb.sink().frames(), 2);
    }

    #[test]
    fn test_brightness_and_rotation() {
        let mut fb = buffer().with_brightness(0.5).with_rotation(true);
        fb.pixel(0, 0, Rgb888::new(200, 100, 10));
        fb.present().unwrap();

        assert_eq!(fb.sink().presented(15, 9), Some(Rgb888::new(100, 50, 5)));
        assert_eq!(fb.sink().presented(0, 0), Some(Rgb888::BLACK));
    }

    #[test]
    fn test_terminal_sink_output() {
        let mut fb = FrameBuffer::new(16, 10, TerminalSink::new(Vec::new()));
        fb.pixel(0, 0, RED);
        fb.present().unwrap();

        let out = String::from_utf8(fb.sink_mut().out.clone()).unwrap();
        assert_eq!(out.lines().filter(|l| !l.is_empty()).count(), 10);
        assert!(out.starts_with("\x1b[38;2;200;0;0m██"));
    }
}
