use crate::codec::bits;
use crate::codec::checksum::CRC16_XMODEM;
use crate::codec::datetime::DateBuilder;
use crate::codec::reader::FrameReader;
use crate::codec::units;
use crate::decoder::mask::{read_mask_fields, MaskField};
use crate::decoder::{DecodeContext, Decoded, FrameDecoder};
use crate::error::DecodeError;
use crate::identity::IdStrategy;
use crate::model::{
    prefixed, CellTower, Network, Position, KEY_BATTERY, KEY_HDOP, KEY_INPUT, KEY_ODOMETER,
    KEY_OUTPUT, KEY_POWER, KEY_SATELLITES, PREFIX_ADC, PREFIX_TEMP,
};

use super::layout;

const PROTOCOL: &str = "mxt";

fn read_cell(reader: &mut FrameReader<'_>, position: &mut Position) -> Result<(), DecodeError> {
    let mcc = reader.read_u16_le()?;
    let mnc = reader.read_u8()?;
    let lac = reader.read_u16_le()?;
    let cell_id = reader.read_u16_le()?;
    position.network = Some(Network::single_cell(CellTower {
        mcc,
        mnc: mnc.into(),
        lac: lac.into(),
        cell_id: cell_id.into(),
        signal: None,
    }));
    Ok(())
}

fn read_gps_quality(
    reader: &mut FrameReader<'_>,
    position: &mut Position,
) -> Result<(), DecodeError> {
    position.set(KEY_SATELLITES, reader.read_u8()?);
    position.set(KEY_HDOP, f64::from(reader.read_u8()?) * 0.1);
    Ok(())
}

fn read_motion(reader: &mut FrameReader<'_>, position: &mut Position) -> Result<(), DecodeError> {
    position.speed = units::knots_from_kph(f64::from(reader.read_u16_le()?) * 0.1);
    position.course = f64::from(reader.read_u16_le()?) * 0.1;
    position.altitude = f64::from(reader.read_i16_le()?);
    Ok(())
}

fn read_adc(reader: &mut FrameReader<'_>, position: &mut Position) -> Result<(), DecodeError> {
    position.set(&prefixed(PREFIX_ADC, 0), reader.read_u16_le()?);
    position.set(&prefixed(PREFIX_ADC, 1), reader.read_u16_le()?);
    Ok(())
}

fn read_power(reader: &mut FrameReader<'_>, position: &mut Position) -> Result<(), DecodeError> {
    position.set(KEY_POWER, f64::from(reader.read_u16_le()?) / 1000.0);
    position.set(KEY_BATTERY, f64::from(reader.read_u16_le()?) / 1000.0);
    Ok(())
}

fn read_odometer(reader: &mut FrameReader<'_>, position: &mut Position) -> Result<(), DecodeError> {
    position.set(KEY_ODOMETER, reader.read_u32_le()?);
    Ok(())
}

fn read_io(reader: &mut FrameReader<'_>, position: &mut Position) -> Result<(), DecodeError> {
    position.set(KEY_INPUT, reader.read_u8()?);
    position.set(KEY_OUTPUT, reader.read_u8()?);
    Ok(())
}

fn read_temperature(
    reader: &mut FrameReader<'_>,
    position: &mut Position,
) -> Result<(), DecodeError> {
    position.set(&prefixed(PREFIX_TEMP, 1), i32::from(reader.read_i8()?));
    Ok(())
}

/// Info groups in ascending bit order; wire order equals bit order.
static GROUPS: [MaskField<Position>; 8] = [
    MaskField { bit: 0, read: read_cell },
    MaskField { bit: 1, read: read_gps_quality },
    MaskField { bit: 2, read: read_motion },
    MaskField { bit: 3, read: read_adc },
    MaskField { bit: 4, read: read_power },
    MaskField { bit: 5, read: read_odometer },
    MaskField { bit: 6, read: read_io },
    MaskField { bit: 7, read: read_temperature },
];

fn ack(descriptor: u8, sequence: u8) -> Vec<u8> {
    let mut logical = vec![descriptor, layout::MSG_ACK, sequence];
    let crc = CRC16_XMODEM.compute(&logical);
    logical.extend_from_slice(&crc.to_le_bytes());

    let mut frame = vec![layout::FRAME_START];
    frame.extend_from_slice(&layout::ESCAPE.encode(&logical, &layout::RESERVED));
    frame.push(layout::FRAME_END);
    frame
}

/// Previous absolute fix, the baseline delta frames apply to.
#[derive(Debug, Clone, Copy)]
struct Baseline {
    latitude: f64,
    longitude: f64,
    speed: f64,
    course: f64,
}

pub struct MxtDecoder {
    last: Option<Baseline>,
}

impl MxtDecoder {
    pub fn new() -> Self {
        MxtDecoder { last: None }
    }
}

impl Default for MxtDecoder {
    fn default() -> Self {
        MxtDecoder::new()
    }
}

impl FrameDecoder for MxtDecoder {
    fn protocol(&self) -> &'static str {
        PROTOCOL
    }

    fn decode(
        &mut self,
        ctx: &mut DecodeContext<'_>,
        frame: &[u8],
    ) -> Result<Decoded, DecodeError> {
        if frame.len() < 4
            || frame[0] != layout::FRAME_START
            || frame[frame.len() - 1] != layout::FRAME_END
        {
            return Err(DecodeError::malformed("bad mxt framing"));
        }
        let logical = layout::ESCAPE.decode(&frame[1..frame.len() - 1])?;
        if logical.len() < 2 {
            return Err(DecodeError::FrameTruncated {
                needed: 2,
                remaining: logical.len(),
            });
        }
        let (body, crc_bytes) = logical.split_at(logical.len() - 2);
        let expected = u16::from_le_bytes([crc_bytes[0], crc_bytes[1]]);
        let computed = CRC16_XMODEM.compute(body);
        if expected != computed {
            return Err(DecodeError::ChecksumMismatch { expected, computed });
        }

        let mut reader = FrameReader::new(body);
        let descriptor = reader.read_u8()?;
        let device = reader.read_u32_le()?.to_string();
        let device_id = ctx.resolve(IdStrategy::Exact(&device))?.device_id();
        let msg_type = reader.read_u8()?;
        let sequence = reader.read_u8()?;

        let mut position = Position::new(PROTOCOL, device_id);
        let packed = u64::from(reader.read_u32_le()?);
        let time = DateBuilder::new()
            .date(
                bits::from(packed, layout::DATE_YEAR_FROM) as i32,
                bits::between(packed, layout::DATE_MONTH_FROM, layout::DATE_YEAR_FROM) as u8,
                bits::between(packed, layout::DATE_DAY_FROM, layout::DATE_MONTH_FROM) as u8,
            )?
            .time(
                bits::between(packed, layout::DATE_HOUR_FROM, layout::DATE_DAY_FROM) as u8,
                bits::between(packed, layout::DATE_MINUTE_FROM, layout::DATE_HOUR_FROM) as u8,
                bits::to(packed, layout::DATE_MINUTE_FROM) as u8,
            )?
            .build();
        position.set_time(time);

        match msg_type {
            layout::MSG_POSITION => {
                position.latitude = f64::from(reader.read_i32_le()?) / layout::COORD_DIVISOR;
                position.longitude = f64::from(reader.read_i32_le()?) / layout::COORD_DIVISOR;
            }
            layout::MSG_POSITION_DELTA => {
                let base = self
                    .last
                    .ok_or_else(|| DecodeError::malformed("delta frame without baseline"))?;
                position.latitude =
                    base.latitude + f64::from(reader.read_i16_le()?) / layout::COORD_DIVISOR;
                position.longitude =
                    base.longitude + f64::from(reader.read_i16_le()?) / layout::COORD_DIVISOR;
                position.speed = (base.speed + f64::from(reader.read_i8()?)).max(0.0);
                position.course = (base.course + f64::from(reader.read_i8()?)).rem_euclid(360.0);
            }
            other => {
                return Err(DecodeError::malformed(format!(
                    "unsupported mxt message 0x{other:02x}"
                )));
            }
        }

        let flags = u64::from(reader.read_u32_le()?);
        position.valid = bits::check(flags, 0);
        let mask = u64::from(reader.read_u8()?);
        read_mask_fields(mask, &GROUPS, &mut reader, &mut position)?;

        self.last = Some(Baseline {
            latitude: position.latitude,
            longitude: position.longitude,
            speed: position.speed,
            course: position.course,
        });
        Ok(Decoded::position(position).with_reply(ack(descriptor, sequence)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MemoryIdentityStore;
    use crate::media::MemoryMediaSink;
    use crate::model::Value;
    use time::macros::datetime;

    fn packed_date(year: u32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> u32 {
        (year - 2000) << 26 | month << 22 | day << 17 | hour << 12 | minute << 6 | second
    }

    fn framed(device: u32, msg_type: u8, sequence: u8, body: &[u8]) -> Vec<u8> {
        let mut logical = vec![0x55];
        logical.extend_from_slice(&device.to_le_bytes());
        logical.push(msg_type);
        logical.push(sequence);
        logical.extend_from_slice(body);
        let crc = CRC16_XMODEM.compute(&logical);
        logical.extend_from_slice(&crc.to_le_bytes());

        let mut frame = vec![layout::FRAME_START];
        frame.extend_from_slice(&layout::ESCAPE.encode(&logical, &layout::RESERVED));
        frame.push(layout::FRAME_END);
        frame
    }

    fn absolute_body(mask: u8, groups: &[u8]) -> Vec<u8> {
        let mut body = packed_date(2023, 5, 9, 18, 30, 0).to_le_bytes().to_vec();
        body.extend_from_slice(&48_850_000i32.to_le_bytes());
        body.extend_from_slice(&2_350_000i32.to_le_bytes());
        body.extend_from_slice(&1u32.to_le_bytes()); // valid
        body.push(mask);
        body.extend_from_slice(groups);
        body
    }

    fn context<'a>(
        store: &'a MemoryIdentityStore,
        sink: &'a MemoryMediaSink,
    ) -> DecodeContext<'a> {
        DecodeContext::new(store, sink)
    }

    #[test]
    fn absolute_position_with_gated_groups() {
        let store = MemoryIdentityStore::new();
        let device_id = store.register("88100");
        let sink = MemoryMediaSink::new();
        let mut ctx = context(&store, &sink);
        let mut decoder = MxtDecoder::new();

        // gps quality (bit 1) and power (bit 4)
        let groups = [8u8, 12, 0x2e, 0x30, 0xa8, 0x0f]; // 8 sats, hdop 1.2, 12.334 V, 4.008 V
        let frame = framed(88_100, layout::MSG_POSITION, 7, &absolute_body(0b0001_0010, &groups));
        let decoded = decoder.decode(&mut ctx, &frame).unwrap();

        let position = &decoded.positions[0];
        assert_eq!(position.device_id, device_id);
        assert!(position.valid);
        assert_eq!(position.device_time, Some(datetime!(2023-05-09 18:30:00 UTC)));
        assert!((position.latitude - 48.85).abs() < 1e-9);
        assert_eq!(position.attribute(KEY_SATELLITES), Some(&Value::Int(8)));
        assert_eq!(position.attribute(KEY_POWER), Some(&Value::Float(12.334)));
        assert!(position.attribute(KEY_INPUT).is_none());

        // reply is a well-formed escaped ack
        let reply = decoded.reply.unwrap();
        assert_eq!(reply[0], layout::FRAME_START);
        assert_eq!(*reply.last().unwrap(), layout::FRAME_END);
        let logical = layout::ESCAPE.decode(&reply[1..reply.len() - 1]).unwrap();
        assert_eq!(logical[1], layout::MSG_ACK);
        assert_eq!(logical[2], 7);
    }

    #[test]
    fn delta_applies_to_previous_absolute() {
        let store = MemoryIdentityStore::new();
        store.register("88100");
        let sink = MemoryMediaSink::new();
        let mut ctx = context(&store, &sink);
        let mut decoder = MxtDecoder::new();

        let frame = framed(88_100, layout::MSG_POSITION, 1, &absolute_body(0, &[]));
        decoder.decode(&mut ctx, &frame).unwrap();

        let mut body = packed_date(2023, 5, 9, 18, 30, 30).to_le_bytes().to_vec();
        body.extend_from_slice(&150i16.to_le_bytes()); // +0.000150 deg
        body.extend_from_slice(&(-75i16).to_le_bytes());
        body.push(5); // +5 knots
        body.push((-10i8) as u8);
        body.extend_from_slice(&1u32.to_le_bytes());
        body.push(0);
        let frame = framed(88_100, layout::MSG_POSITION_DELTA, 2, &body);
        let decoded = decoder.decode(&mut ctx, &frame).unwrap();

        let position = &decoded.positions[0];
        assert!((position.latitude - 48.850150).abs() < 1e-9);
        assert!((position.longitude - 2.349925).abs() < 1e-9);
        assert_eq!(position.speed, 5.0);
        assert_eq!(position.course, 350.0);
    }

    #[test]
    fn delta_without_baseline_is_rejected() {
        let store = MemoryIdentityStore::new();
        store.register("88100");
        let sink = MemoryMediaSink::new();
        let mut ctx = context(&store, &sink);
        let mut decoder = MxtDecoder::new();

        let mut body = packed_date(2023, 5, 9, 18, 30, 30).to_le_bytes().to_vec();
        body.extend_from_slice(&[0; 6]);
        body.extend_from_slice(&1u32.to_le_bytes());
        body.push(0);
        let frame = framed(88_100, layout::MSG_POSITION_DELTA, 2, &body);
        assert!(decoder.decode(&mut ctx, &frame).is_err());
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let store = MemoryIdentityStore::new();
        store.register("88100");
        let sink = MemoryMediaSink::new();
        let mut ctx = context(&store, &sink);
        let mut decoder = MxtDecoder::new();

        let mut frame = framed(88_100, layout::MSG_POSITION, 1, &absolute_body(0, &[]));
        // flip a payload byte that needs no escaping
        frame[2] ^= 0x01;
        let err = decoder.decode(&mut ctx, &frame).unwrap_err();
        assert!(matches!(err, DecodeError::ChecksumMismatch { .. }));
    }
}
