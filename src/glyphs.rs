//! Compact 5×8 digit font.
//!
//! The renderer's pixel corrections assume the classic 5×7 LCD glyphs: five
//! columns, seven inked rows, a blank eighth row, one column of spacing. In
//! that font the "1" has a three-pixel foot on its seventh row, and the
//! renderer clears the two outer foot pixels so the digit stays narrow.
//!
//! Only `0`–`9` are mapped. Anything else is drawn as `0`.

use embedded_graphics::{
    geometry::Size,
    image::ImageRaw,
    mono_font::{mapping::StrGlyphMapping, DecorationDimensions, MonoFont},
};

/// Glyph width in pixels.
pub const GLYPH_WIDTH: u32 = 5;
/// Glyph height in pixels, including the blank last row.
pub const GLYPH_HEIGHT: u32 = 8;
/// Horizontal distance between two glyph origins.
pub const ADVANCE: u32 = GLYPH_WIDTH + 1;

const DIGIT_MAPPING: StrGlyphMapping<'static> = StrGlyphMapping::new("0123456789", 0);

// Ten glyphs side by side, 50 px wide, each row padded to 7 bytes, MSB first.
const DIGITS_5X8_DATA: &[u8] = &[
    0b01110001, 0b00011101, 0b11110001, 0b01111100, 0b11111111, 0b01110011, 0b10000000,
    0b10001011, 0b00100010, 0b00010011, 0b01000001, 0b00000001, 0b10001100, 0b01000000,
    0b10011001, 0b00000010, 0b00100101, 0b01111010, 0b00000001, 0b10001100, 0b01000000,
    0b10101001, 0b00011100, 0b01101001, 0b00000111, 0b11000010, 0b01110011, 0b11000000,
    0b11001001, 0b00100000, 0b00011111, 0b10000110, 0b00100100, 0b10001000, 0b01000000,
    0b10001001, 0b00100001, 0b00010001, 0b01000110, 0b00101000, 0b10001000, 0b10000000,
    0b01110011, 0b10111110, 0b11100001, 0b00111001, 0b11010000, 0b01110111, 0b00000000,
    0b00000000, 0b00000000, 0b00000000, 0b00000000, 0b00000000, 0b00000000, 0b00000000,
];

/// Digits-only 5×8 font with a 6 px advance.
pub const DIGITS_5X8: MonoFont<'static> = MonoFont {
    image: ImageRaw::new(DIGITS_5X8_DATA, GLYPH_WIDTH * 10),
    glyph_mapping: &DIGIT_MAPPING,
    character_size: Size::new(GLYPH_WIDTH, GLYPH_HEIGHT),
    character_spacing: 1,
    baseline: 6,
    underline: DecorationDimensions::default_underline(GLYPH_HEIGHT),
    strikethrough: DecorationDimensions::default_strikethrough(GLYPH_HEIGHT),
};
