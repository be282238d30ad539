//! mxt: escaped binary stream with mask-gated field groups.
//!
//! Frames are DLE-escaped between 0x01/0x04 markers and carry a
//! CRC16-XMODEM that is strictly verified (this family's firmware is
//! reliable, unlike gt06). A position frame is either absolute or a
//! delta against the previous absolute fix held by the decoder
//! instance; optional telemetry groups are gated by an info-group
//! mask evaluated from an ordered field table.

pub mod layout;

mod decoder;

pub use decoder::MxtDecoder;
