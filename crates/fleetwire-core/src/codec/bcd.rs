//! Binary-Coded Decimal: each nibble encodes one decimal digit.

use crate::error::DecodeError;

fn nibble(value: u8) -> Result<u8, DecodeError> {
    if value > 9 {
        return Err(DecodeError::malformed(format!(
            "invalid BCD nibble 0x{value:x}"
        )));
    }
    Ok(value)
}

/// Decode one BCD byte into its two-digit value, e.g. `0x23` -> 23.
pub fn value(byte: u8) -> Result<u8, DecodeError> {
    Ok(nibble(byte >> 4)? * 10 + nibble(byte & 0x0f)?)
}

/// Decode `bytes` as one BCD-packed unsigned integer, two digits per
/// byte, most significant first. Used for packed dates and odometers.
pub fn decode_u64(bytes: &[u8]) -> Result<u64, DecodeError> {
    let mut result = 0u64;
    for &byte in bytes {
        result = result * 100 + u64::from(value(byte)?);
    }
    Ok(result)
}

/// Decode `bytes` into the string of all nibble digits, preserving
/// leading zeros. Identifier fields (imeis) need the textual form.
pub fn decode_string(bytes: &[u8]) -> Result<String, DecodeError> {
    let mut digits = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        digits.push(char::from(b'0' + nibble(byte >> 4)?));
        digits.push(char::from(b'0' + nibble(byte & 0x0f)?));
    }
    Ok(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_value_pairs() {
        assert_eq!(value(0x23).unwrap(), 23);
        assert_eq!(value(0x05).unwrap(), 5);
        assert_eq!(value(0x09).unwrap(), 9);
    }

    #[test]
    fn packed_integer() {
        assert_eq!(decode_u64(&[0x01, 0x23, 0x45]).unwrap(), 12345);
        assert_eq!(decode_u64(&[]).unwrap(), 0);
    }

    #[test]
    fn digit_string_preserves_leading_zeros() {
        assert_eq!(decode_string(&[0x03, 0x59, 0x58]).unwrap(), "035958");
    }

    #[test]
    fn rejects_hex_nibbles() {
        assert!(value(0x2a).is_err());
        assert!(decode_string(&[0x1f]).is_err());
    }
}
