//! Wire constants and the tag table.
//!
//! Data frame: `01 | length u16 LE (bit 15: archive) | tags | crc u16 LE`.
//! Photo frame: `07 | length u16 LE | part u8 (bit 7: final) | payload | crc`.

pub const HEADER_DATA: u8 = 0x01;
pub const HEADER_PHOTO: u8 = 0x07;
pub const ACK_HEADER: u8 = 0x02;

pub const FINAL_PART_FLAG: u8 = 0x80;

pub const TAG_VERSION_HW: u8 = 0x01;
pub const TAG_VERSION_FW: u8 = 0x02;
pub const TAG_IMEI: u8 = 0x03;
pub const TAG_DEVICE_ID: u8 = 0x04;
pub const TAG_INDEX: u8 = 0x10;
pub const TAG_TIME: u8 = 0x20;
pub const TAG_COORDS: u8 = 0x30;
pub const TAG_SPEED_COURSE: u8 = 0x33;
pub const TAG_ALTITUDE: u8 = 0x34;
pub const TAG_HDOP: u8 = 0x35;
pub const TAG_STATUS: u8 = 0x40;
pub const TAG_POWER: u8 = 0x41;
pub const TAG_BATTERY: u8 = 0x42;
pub const TAG_TEMPERATURE: u8 = 0x43;
pub const TAG_OUTPUT: u8 = 0x45;
pub const TAG_INPUT: u8 = 0x46;
pub const TAG_ADC_FIRST: u8 = 0x50;
pub const TAG_ADC_LAST: u8 = 0x57;

/// Value length for every known tag. Tags outside this table cannot
/// be skipped safely; hitting one fails the rest of the frame.
pub fn tag_length(tag: u8) -> Option<usize> {
    match tag {
        TAG_VERSION_HW | TAG_VERSION_FW | TAG_HDOP | TAG_TEMPERATURE => Some(1),
        TAG_DEVICE_ID | TAG_INDEX | TAG_ALTITUDE | TAG_STATUS | TAG_POWER | TAG_BATTERY
        | TAG_OUTPUT | TAG_INPUT => Some(2),
        TAG_ADC_FIRST..=TAG_ADC_LAST => Some(2),
        TAG_TIME | TAG_SPEED_COURSE => Some(4),
        TAG_COORDS => Some(9),
        TAG_IMEI => Some(15),
        _ => None,
    }
}
