//! Escaped byte streams: an escape byte remaps the byte that follows
//! so that frame delimiters never appear inside a frame body.
//!
//! Decoders working on such streams de-escape the body once, up front,
//! so every multi-byte field read sees logical bytes.

use crate::error::DecodeError;

/// One protocol's escape convention.
///
/// Decoding `escape, 0x00` yields the literal escape byte when
/// `literal_zero` is set; any other escaped byte is remapped by
/// subtracting `offset` (the encoder added it to move the byte out of
/// the reserved range).
#[derive(Debug, Clone, Copy)]
pub struct EscapeScheme {
    pub escape: u8,
    pub literal_zero: bool,
    pub offset: u8,
}

impl EscapeScheme {
    /// Logical bytes of an escaped stream. A trailing lone escape byte
    /// is a truncation of the current frame.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<u8>, DecodeError> {
        let mut out = Vec::with_capacity(data.len());
        let mut iter = data.iter();
        while let Some(&byte) = iter.next() {
            if byte != self.escape {
                out.push(byte);
                continue;
            }
            let &next = iter.next().ok_or(DecodeError::FrameTruncated {
                needed: 1,
                remaining: 0,
            })?;
            if next == 0x00 && self.literal_zero {
                out.push(self.escape);
            } else {
                out.push(next.wrapping_sub(self.offset));
            }
        }
        Ok(out)
    }

    /// Escape every occurrence of a reserved byte in `data`.
    pub fn encode(&self, data: &[u8], reserved: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len());
        for &byte in data {
            if byte == self.escape && self.literal_zero {
                out.push(self.escape);
                out.push(0x00);
            } else if reserved.contains(&byte) {
                out.push(self.escape);
                out.push(byte.wrapping_add(self.offset));
            } else {
                out.push(byte);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::EscapeScheme;

    const DLE: EscapeScheme = EscapeScheme {
        escape: 0x1B,
        literal_zero: true,
        offset: 0,
    };

    #[test]
    fn escape_zero_yields_literal_escape_byte() {
        let logical = DLE.decode(&[0x01, 0x1B, 0x00, 0x02]).unwrap();
        assert_eq!(logical, vec![0x01, 0x1B, 0x02]);
    }

    #[test]
    fn offset_remapping() {
        let scheme = EscapeScheme {
            escape: 0x10,
            literal_zero: false,
            offset: 0x20,
        };
        // 0x10 0x24 -> 0x04 (a frame terminator moved out of range)
        let logical = scheme.decode(&[0x31, 0x10, 0x24, 0x32]).unwrap();
        assert_eq!(logical, vec![0x31, 0x04, 0x32]);
    }

    #[test]
    fn trailing_escape_is_truncation() {
        assert!(DLE.decode(&[0x01, 0x1B]).is_err());
    }

    #[test]
    fn encode_round_trips() {
        let scheme = EscapeScheme {
            escape: 0x10,
            literal_zero: false,
            offset: 0x20,
        };
        let reserved = [0x01, 0x04, 0x10, 0x11, 0x13];
        let payload = [0x31, 0x04, 0x10, 0x55];
        let wire = scheme.encode(&payload, &reserved);
        assert_eq!(wire, vec![0x31, 0x10, 0x24, 0x10, 0x30, 0x55]);
        assert_eq!(scheme.decode(&wire).unwrap(), payload.to_vec());
    }
}
