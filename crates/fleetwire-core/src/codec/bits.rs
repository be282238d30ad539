//! Bit-level access: word slicing helpers plus a persistent-cursor
//! reader for frames that pack consecutive fields of mixed bit widths.

use crate::error::DecodeError;

/// Whether `bit` is set in `value`.
pub fn check(value: u64, bit: u32) -> bool {
    value & (1 << bit) != 0
}

/// Bits `[from, to)` of `value`, shifted down.
pub fn between(value: u64, from: u32, to: u32) -> u64 {
    (value >> from) & ((1 << (to - from)) - 1)
}

/// Bits `[0, to)` of `value`.
pub fn to(value: u64, to: u32) -> u64 {
    between(value, 0, to)
}

/// Bits from `from` upward.
pub fn from(value: u64, from: u32) -> u64 {
    value >> from
}

/// Reader extracting arbitrary-width fields from a byte slice with a
/// persistent bit cursor, most significant bit first.
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    pub fn remaining_bits(&self) -> usize {
        self.data.len() * 8 - self.bit_pos
    }

    /// Unsigned field of `width` bits (1..=64).
    pub fn read_unsigned(&mut self, width: u32) -> Result<u64, DecodeError> {
        debug_assert!(width >= 1 && width <= 64);
        if self.remaining_bits() < width as usize {
            return Err(DecodeError::FrameTruncated {
                needed: width as usize,
                remaining: self.remaining_bits(),
            });
        }
        let mut result = 0u64;
        for _ in 0..width {
            let byte = self.data[self.bit_pos / 8];
            let bit = (byte >> (7 - self.bit_pos % 8)) & 1;
            result = (result << 1) | u64::from(bit);
            self.bit_pos += 1;
        }
        Ok(result)
    }

    /// Signed field of `width` bits, two's complement sign-extended.
    pub fn read_signed(&mut self, width: u32) -> Result<i64, DecodeError> {
        let raw = self.read_unsigned(width)?;
        if width == 64 {
            return Ok(raw as i64);
        }
        let sign = 1u64 << (width - 1);
        if raw & sign != 0 {
            Ok((raw | !((1u64 << width) - 1)) as i64)
        } else {
            Ok(raw as i64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_slicing() {
        let value = 0b1011_0100;
        assert!(check(value, 2));
        assert!(!check(value, 0));
        assert_eq!(between(value, 2, 6), 0b1101);
        assert_eq!(to(value, 3), 0b100);
        assert_eq!(from(value, 4), 0b1011);
    }

    #[test]
    fn mixed_width_consecutive_fields() {
        // 0xB4 0x3F = 1011 0100 0011 1111
        let mut reader = BitReader::new(&[0xB4, 0x3F]);
        assert_eq!(reader.read_unsigned(3).unwrap(), 0b101);
        assert_eq!(reader.read_unsigned(5).unwrap(), 0b10100);
        assert_eq!(reader.read_unsigned(8).unwrap(), 0x3F);
        assert_eq!(reader.remaining_bits(), 0);
    }

    #[test]
    fn signed_fields_sign_extend() {
        // 111111 (6 bits) == -1, 0111 (4 bits) == 7
        let mut reader = BitReader::new(&[0b1111_1101, 0b1100_0000]);
        assert_eq!(reader.read_signed(6).unwrap(), -1);
        assert_eq!(reader.read_signed(4).unwrap(), 7);
    }

    #[test]
    fn overrun_is_truncation() {
        let mut reader = BitReader::new(&[0xFF]);
        reader.read_unsigned(6).unwrap();
        assert!(reader.read_unsigned(3).is_err());
        // cursor untouched by the failed read
        assert_eq!(reader.read_unsigned(2).unwrap(), 0b11);
    }
}
