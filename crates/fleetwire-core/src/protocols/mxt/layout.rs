//! Wire constants for the mxt escaped frame.
//!
//! Wire: `01 | escaped(body + crc16-xmodem LE) | 04`. Logical body:
//! descriptor u8, device u32 LE, type u8, sequence u8, packed date
//! u32 LE, coordinates (absolute i32 LE pair or delta i16/i8 fields),
//! flags u32 LE, info-group mask u8, gated groups in bit order.

use crate::codec::escape::EscapeScheme;

pub const FRAME_START: u8 = 0x01;
pub const FRAME_END: u8 = 0x04;

/// DLE escaping: reserved bytes are sent as `10, byte+20`.
pub const ESCAPE: EscapeScheme = EscapeScheme {
    escape: 0x10,
    literal_zero: false,
    offset: 0x20,
};
pub const RESERVED: [u8; 5] = [FRAME_START, FRAME_END, 0x10, 0x11, 0x13];

pub const MSG_POSITION: u8 = 0x02;
pub const MSG_POSITION_DELTA: u8 = 0x03;
pub const MSG_ACK: u8 = 0xfe;

/// Packed date bit layout (years since 2000).
pub const DATE_YEAR_FROM: u32 = 26;
pub const DATE_MONTH_FROM: u32 = 22;
pub const DATE_DAY_FROM: u32 = 17;
pub const DATE_HOUR_FROM: u32 = 12;
pub const DATE_MINUTE_FROM: u32 = 6;

pub const COORD_DIVISOR: f64 = 1e6;
