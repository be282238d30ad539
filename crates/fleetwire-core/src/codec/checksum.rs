//! Checksum and CRC family shared by the protocol decoders.
//!
//! Computation and verification are deliberately separate: many field
//! devices emit non-compliant checksums, so whether a mismatch rejects
//! the frame is a per-protocol decision made in the decoder.

/// Table-driven parametric CRC16.
pub struct Crc16 {
    init: u16,
    ref_in: bool,
    ref_out: bool,
    xor_out: u16,
    table: [u16; 256],
}

const fn make_table(poly: u16) -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut j = 0;
        while j < 8 {
            let overflow = crc & 0x8000 != 0;
            crc <<= 1;
            if overflow {
                crc ^= poly;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

const fn reverse(value: u16, bits: u32) -> u16 {
    let mut result = 0u16;
    let mut remain = value;
    let mut i = 0;
    while i < bits {
        result = (result << 1) | (remain & 1);
        remain >>= 1;
        i += 1;
    }
    result
}

impl Crc16 {
    pub const fn new(poly: u16, init: u16, ref_in: bool, ref_out: bool, xor_out: u16) -> Self {
        Crc16 {
            init,
            ref_in,
            ref_out,
            xor_out,
            table: make_table(poly),
        }
    }

    pub fn compute(&self, data: &[u8]) -> u16 {
        let mut crc = self.init;
        for &byte in data {
            let b = if self.ref_in {
                reverse(byte as u16, 8) as u8
            } else {
                byte
            };
            crc = (crc << 8) ^ self.table[usize::from((crc >> 8) as u8 ^ b)];
        }
        if self.ref_out {
            crc = reverse(crc, 16);
        }
        crc ^ self.xor_out
    }
}

pub static CRC16_CCITT_FALSE: Crc16 = Crc16::new(0x1021, 0xFFFF, false, false, 0x0000);
pub static CRC16_X25: Crc16 = Crc16::new(0x1021, 0xFFFF, true, true, 0xFFFF);
pub static CRC16_XMODEM: Crc16 = Crc16::new(0x1021, 0x0000, false, false, 0x0000);
pub static CRC16_KERMIT: Crc16 = Crc16::new(0x1021, 0x0000, true, true, 0x0000);
pub static CRC16_MODBUS: Crc16 = Crc16::new(0x8005, 0xFFFF, true, true, 0x0000);

/// XOR of all bytes.
pub fn xor(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, &b| acc ^ b)
}

/// Additive sum modulo 256.
pub fn sum_mod256(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// NMEA-style trailer for a text sentence body: `*XX` with the XOR of
/// the ASCII bytes in upper-case hex.
pub fn nmea(sentence: &str) -> String {
    format!("*{:02X}", xor(sentence.as_bytes()))
}

/// Luhn check digit for a numeric identifier without its check digit.
/// Legacy 14-digit idents are extended to 15 by appending this digit.
pub fn luhn(mut value: u64) -> u64 {
    let mut checksum = 0;
    let mut i = 0;
    while value != 0 {
        let mut digit = value % 10;
        if i % 2 == 0 {
            digit *= 2;
            if digit >= 10 {
                digit = 1 + digit % 10;
            }
        }
        checksum += digit;
        value /= 10;
        i += 1;
    }
    (10 - checksum % 10) % 10
}

#[cfg(test)]
mod tests {
    use super::*;

    // Standard check value: CRC over "123456789".
    const CHECK_INPUT: &[u8] = b"123456789";

    #[test]
    fn crc16_check_values() {
        assert_eq!(CRC16_CCITT_FALSE.compute(CHECK_INPUT), 0x29B1);
        assert_eq!(CRC16_X25.compute(CHECK_INPUT), 0x906E);
        assert_eq!(CRC16_XMODEM.compute(CHECK_INPUT), 0x31C3);
        assert_eq!(CRC16_KERMIT.compute(CHECK_INPUT), 0x2189);
        assert_eq!(CRC16_MODBUS.compute(CHECK_INPUT), 0x4B37);
    }

    #[test]
    fn xor_and_sum() {
        assert_eq!(xor(&[0x01, 0x02, 0x04]), 0x07);
        assert_eq!(sum_mod256(&[0xFF, 0x02]), 0x01);
    }

    #[test]
    fn nmea_trailer() {
        assert_eq!(nmea("GPRMC"), format!("*{:02X}", xor(b"GPRMC")));
    }

    #[test]
    fn luhn_check_digit() {
        assert_eq!(luhn(49015420323751), 8);
        assert_eq!(luhn(35958601582980), 2);
    }
}
