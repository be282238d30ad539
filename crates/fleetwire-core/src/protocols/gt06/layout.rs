//! Wire constants for the gt06 envelope.
//!
//! Frame: `78 78 | length | type | content | serial u16 | crc u16 | 0D 0A`
//! where `length` counts type through crc and the CRC16-X25 runs from
//! the length byte through the serial. The `79 79` variant widens the
//! length field to u16 for content over 255 bytes; a device that logs
//! in through it stays in that framing for the whole connection.

pub const HEADER: [u8; 2] = [0x78, 0x78];
pub const HEADER_EXTENDED: [u8; 2] = [0x79, 0x79];
pub const FOOTER: [u8; 2] = [0x0d, 0x0a];

/// Bytes outside the `length` count: header, length byte, footer.
pub const OVERHEAD: usize = 5;
/// Smallest well-formed frame (empty content).
pub const MIN_FRAME: usize = OVERHEAD + 5;

pub const MSG_LOGIN: u8 = 0x01;
pub const MSG_GPS_LBS_1: u8 = 0x12;
pub const MSG_STATUS: u8 = 0x13;
pub const MSG_GPS_LBS_STATUS_1: u8 = 0x16;

/// Latitude/longitude fixed-point divisor (degrees * 30000 * 60).
pub const COORD_DIVISOR: f64 = 1_800_000.0;
