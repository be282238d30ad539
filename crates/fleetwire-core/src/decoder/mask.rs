//! Bitmask-conditional field tables.
//!
//! Many binary layouts gate optional field groups behind bits of a
//! leading mask. Instead of nested "if bit set, read" chains, a
//! decoder declares one ordered table of (bit, read-fn) entries and
//! evaluates it in a fixed loop, so presence, width and order are
//! testable independently of the surrounding frame.

use crate::codec::bits;
use crate::codec::reader::FrameReader;
use crate::error::DecodeError;

/// One gated field group: `read` runs only when `bit` is set in the
/// frame's mask.
pub struct MaskField<T> {
    pub bit: u32,
    pub read: fn(&mut FrameReader<'_>, &mut T) -> Result<(), DecodeError>,
}

/// Evaluate a mask table in ascending bit order. Tables must be
/// declared sorted by bit; field order on the wire is the bit order.
pub fn read_mask_fields<T>(
    mask: u64,
    fields: &[MaskField<T>],
    reader: &mut FrameReader<'_>,
    target: &mut T,
) -> Result<(), DecodeError> {
    let mut previous = None;
    for field in fields {
        debug_assert!(
            previous.map_or(true, |bit| field.bit > bit),
            "mask table not in ascending bit order"
        );
        previous = Some(field.bit);
        if bits::check(mask, field.bit) {
            (field.read)(reader, target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Target {
        field0: Option<u8>,
        field1: Option<u16>,
        field2: Option<u32>,
    }

    fn table() -> [MaskField<Target>; 3] {
        [
            MaskField {
                bit: 0,
                read: |r, t| {
                    t.field0 = Some(r.read_u8()?);
                    Ok(())
                },
            },
            MaskField {
                bit: 1,
                read: |r, t| {
                    t.field1 = Some(r.read_u16_be()?);
                    Ok(())
                },
            },
            MaskField {
                bit: 2,
                read: |r, t| {
                    t.field2 = Some(r.read_u32_be()?);
                    Ok(())
                },
            },
        ]
    }

    #[test]
    fn mask_gates_exactly_the_set_bits() {
        // 0b101 over 1/2/4-byte fields: 5 bytes consumed, middle absent
        let data = [0x0A, 0x00, 0x00, 0x00, 0x07, 0xFF];
        let mut reader = FrameReader::new(&data);
        let mut target = Target::default();
        read_mask_fields(0b0000_0101, &table(), &mut reader, &mut target).unwrap();

        assert_eq!(reader.position(), 5);
        assert_eq!(target.field0, Some(0x0A));
        assert_eq!(target.field1, None);
        assert_eq!(target.field2, Some(7));
    }

    #[test]
    fn empty_mask_consumes_nothing() {
        let data = [0x01, 0x02];
        let mut reader = FrameReader::new(&data);
        let mut target = Target::default();
        read_mask_fields(0, &table(), &mut reader, &mut target).unwrap();
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn truncated_gated_field_fails_the_frame() {
        let data = [0x0A, 0x00];
        let mut reader = FrameReader::new(&data);
        let mut target = Target::default();
        let err = read_mask_fields(0b101, &table(), &mut reader, &mut target).unwrap_err();
        assert!(matches!(err, DecodeError::FrameTruncated { .. }));
    }
}
