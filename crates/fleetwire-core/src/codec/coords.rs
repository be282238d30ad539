//! Coordinate format normalization. Every helper produces signed
//! decimal degrees (WGS84), negative for south/west.

use crate::error::DecodeError;

use super::bcd;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    pub fn from_char(letter: char) -> Option<Self> {
        match letter {
            'N' => Some(Hemisphere::North),
            'S' => Some(Hemisphere::South),
            'E' => Some(Hemisphere::East),
            'W' => Some(Hemisphere::West),
            _ => None,
        }
    }

    fn negative(self) -> bool {
        matches!(self, Hemisphere::South | Hemisphere::West)
    }
}

/// Apply a hemisphere letter to a magnitude.
pub fn apply_hemisphere(value: f64, hemisphere: Hemisphere) -> f64 {
    if hemisphere.negative() {
        -value.abs()
    } else {
        value.abs()
    }
}

/// `DDMM.mmmm` (or `DDDMM.mmmm`) packed as one number: integer degrees
/// in the hundreds, decimal minutes below. `4717.1234` -> 47°17.1234'.
pub fn degree_minute_decimal(raw: f64) -> f64 {
    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    degrees + minutes / 60.0
}

/// Separate degree and decimal-minute fields.
pub fn degrees_minutes(degrees: u32, minutes: f64) -> f64 {
    f64::from(degrees) + minutes / 60.0
}

/// Sign-magnitude raw value: the bit at `value_bits` is an explicit
/// sign, the bits below are the magnitude, scaled down by `divisor`.
pub fn sign_magnitude(raw: u32, value_bits: u32, divisor: f64) -> f64 {
    let magnitude = f64::from(raw & ((1u32 << value_bits) - 1)) / divisor;
    if raw & (1 << value_bits) != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// BCD-packed `DD MM mm mm ...`: first byte pair is whole degrees, the
/// second whole minutes, remaining digits are the minute fraction.
pub fn bcd_degrees_minutes(bytes: &[u8]) -> Result<f64, DecodeError> {
    if bytes.len() < 2 {
        return Err(DecodeError::malformed("BCD coordinate needs 2+ bytes"));
    }
    let degrees = f64::from(bcd::value(bytes[0])?);
    let mut minutes = f64::from(bcd::value(bytes[1])?);
    let mut scale = 0.01;
    for &byte in &bytes[2..] {
        minutes += f64::from(bcd::value(byte)?) * scale;
        scale /= 100.0;
    }
    Ok(degrees + minutes / 60.0)
}
