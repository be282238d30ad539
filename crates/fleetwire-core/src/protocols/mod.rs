//! Built-in protocol adapters.
//!
//! Four adapters cover the structural patterns the rest of the
//! protocol family is built from: fixed-layout binary with deferred
//! identity (gt06), self-describing tag streams with batches and
//! photo reassembly (galileosky), escaped streams with mask-gated
//! field groups and delta frames (mxt), and delimited text sentences
//! (gps103).
//!
//! mxt frames share the 0x01 start byte with galileosky, so mxt
//! registers no magic; the listener port, which takes precedence
//! during selection, tells the two apart.

pub mod galileosky;
pub mod gps103;
pub mod gt06;
pub mod mxt;

use crate::decoder::{DecoderRegistry, Selector};

pub const PORT_GPS103: u16 = 5001;
pub const PORT_GT06: u16 = 5023;
pub const PORT_GALILEOSKY: u16 = 5034;
pub const PORT_MXT: u16 = 5075;

/// Registry with every built-in protocol registered.
pub fn registry() -> DecoderRegistry {
    let mut registry = DecoderRegistry::new();
    registry.register(
        "gps103",
        &[
            Selector::TextPrefix("##,"),
            Selector::TextPrefix("imei:"),
            Selector::Port(PORT_GPS103),
        ],
        || Box::new(gps103::Gps103Decoder::new()),
    );
    registry.register(
        "gt06",
        &[
            Selector::Magic(&gt06::layout::HEADER),
            Selector::Magic(&gt06::layout::HEADER_EXTENDED),
            Selector::Port(PORT_GT06),
        ],
        || Box::new(gt06::Gt06Decoder::new()),
    );
    registry.register(
        "galileosky",
        &[
            Selector::Magic(&[galileosky::layout::HEADER_DATA]),
            Selector::Port(PORT_GALILEOSKY),
        ],
        || Box::new(galileosky::GalileoskyDecoder::new()),
    );
    registry.register("mxt", &[Selector::Port(PORT_MXT)], || {
        Box::new(mxt::MxtDecoder::new())
    });
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::checksum::CRC16_XMODEM;

    #[test]
    fn builtins_are_registered() {
        let registry = registry();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["gps103", "gt06", "galileosky", "mxt"]);
    }

    fn mxt_frame() -> Vec<u8> {
        let mut logical = vec![0x55];
        logical.extend_from_slice(&88_100u32.to_le_bytes());
        logical.push(mxt::layout::MSG_POSITION);
        logical.push(1);
        let crc = CRC16_XMODEM.compute(&logical);
        logical.extend_from_slice(&crc.to_le_bytes());

        let mut frame = vec![mxt::layout::FRAME_START];
        frame.extend_from_slice(&mxt::layout::ESCAPE.encode(&logical, &mxt::layout::RESERVED));
        frame.push(mxt::layout::FRAME_END);
        frame
    }

    #[test]
    fn selection_by_magic_or_prefix() {
        let registry = registry();
        let decoder = registry.select(&[0x78, 0x78, 0x0d], None).unwrap();
        assert_eq!(decoder.protocol(), "gt06");
        let decoder = registry.select(b"##,imei:123,A;", None).unwrap();
        assert_eq!(decoder.protocol(), "gps103");
        let decoder = registry.select(&[0x01, 0x20, 0x00], None).unwrap();
        assert_eq!(decoder.protocol(), "galileosky");
    }

    #[test]
    fn listener_port_splits_the_shared_start_byte() {
        let registry = registry();
        let frame = mxt_frame();
        assert_eq!(frame[0], galileosky::layout::HEADER_DATA);

        let decoder = registry.select(&frame, Some(PORT_MXT)).unwrap();
        assert_eq!(decoder.protocol(), "mxt");
        let decoder = registry.select(&[0x01, 0x20, 0x00], Some(PORT_GALILEOSKY)).unwrap();
        assert_eq!(decoder.protocol(), "galileosky");
    }
}
