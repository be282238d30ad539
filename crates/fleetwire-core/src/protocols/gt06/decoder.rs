use time::UtcOffset;

use crate::codec::checksum::CRC16_X25;
use crate::codec::datetime::DateBuilder;
use crate::codec::reader::FrameReader;
use crate::codec::{bcd, bits, units};
use crate::decoder::{DecodeContext, Decoded, FrameDecoder};
use crate::error::DecodeError;
use crate::identity::IdStrategy;
use crate::model::{
    Alarm, CellTower, Network, Position, Value, KEY_BATTERY_LEVEL, KEY_CHARGE, KEY_IGNITION,
    KEY_RSSI, KEY_SATELLITES, KEY_STATUS,
};

use super::layout;

const PROTOCOL: &str = "gt06";

/// Device attribute holding the UTC offset in whole seconds, used
/// when a login carries no timezone extension.
const ATTR_UTC_OFFSET: &str = "utcOffset";

/// Acknowledgment envelope for one message type: same frame shape as
/// inbound traffic, empty content, serial echoed. `extended` selects
/// the `79 79` u16-length framing negotiated at login.
fn ack(extended: bool, msg_type: u8, serial: u16) -> Vec<u8> {
    let mut frame = Vec::with_capacity(11);
    if extended {
        frame.extend_from_slice(&layout::HEADER_EXTENDED);
        frame.extend_from_slice(&5u16.to_be_bytes());
    } else {
        frame.extend_from_slice(&layout::HEADER);
        frame.push(0x05);
    }
    frame.push(msg_type);
    frame.extend_from_slice(&serial.to_be_bytes());
    let crc = CRC16_X25.compute(&frame[2..]);
    frame.extend_from_slice(&crc.to_be_bytes());
    frame.extend_from_slice(&layout::FOOTER);
    frame
}

fn status_alarm(code: u64) -> Option<Alarm> {
    match code {
        1 => Some(Alarm::Vibration),
        2 => Some(Alarm::PowerCut),
        3 => Some(Alarm::LowBattery),
        4 => Some(Alarm::Sos),
        _ => None,
    }
}

fn event_alarm(code: u8) -> Option<Alarm> {
    match code {
        0x01 => Some(Alarm::Sos),
        0x02 => Some(Alarm::PowerCut),
        0x03 => Some(Alarm::Vibration),
        0x04 | 0x05 => Some(Alarm::Geofence),
        0x06 => Some(Alarm::Overspeed),
        _ => None,
    }
}

pub struct Gt06Decoder;

impl Gt06Decoder {
    pub fn new() -> Self {
        Gt06Decoder
    }

    fn decode_login(
        &self,
        ctx: &mut DecodeContext<'_>,
        mut reader: FrameReader<'_>,
        serial: u16,
        extended: bool,
    ) -> Result<Decoded, DecodeError> {
        let identity = ctx.identity();
        let digits = bcd::decode_string(reader.read_slice(8)?)?;
        // 15-digit imei packed into 16 nibbles with a leading zero
        let imei = digits.strip_prefix('0').unwrap_or(&digits).to_string();
        let session = ctx.resolve(IdStrategy::LuhnExtended(&imei))?;
        session.extended_mode = extended;

        if reader.remaining() >= 2 {
            reader.skip(2)?; // device type code
        }
        if reader.remaining() >= 2 {
            let extension = u64::from(reader.read_u16_be()?);
            // decimal-packed HHMM in the upper 12 bits, bit 3 is the sign
            let packed = bits::from(extension, 4) as i32;
            let mut seconds = ((packed / 100) * 60 + packed % 100) * 60;
            if bits::check(extension, 3) {
                seconds = -seconds;
            }
            session.time_offset = UtcOffset::from_whole_seconds(seconds).ok();
        }
        // firmware that omits the extension can still be pinned to a
        // timezone through a device attribute
        if session.time_offset.is_none() {
            if let Some(Value::Int(seconds)) =
                identity.lookup_attribute(session.device_id(), ATTR_UTC_OFFSET)
            {
                session.time_offset = i32::try_from(seconds)
                    .ok()
                    .and_then(|seconds| UtcOffset::from_whole_seconds(seconds).ok());
            }
        }
        Ok(Decoded::reply(ack(extended, layout::MSG_LOGIN, serial)))
    }

    fn decode_status(
        &self,
        ctx: &mut DecodeContext<'_>,
        mut reader: FrameReader<'_>,
        serial: u16,
    ) -> Result<Decoded, DecodeError> {
        let info = u64::from(reader.read_u8()?);
        let battery = reader.read_u8()?;
        let rssi = reader.read_u8()?;

        let (device_id, extended) = {
            let session = ctx
                .session()
                .ok_or_else(|| DecodeError::malformed("status frame before login"))?;
            (session.device_id(), session.extended_mode)
        };

        let mut position = Position::new(PROTOCOL, device_id);
        ctx.carry_forward(&mut position, None);
        position.set(KEY_STATUS, info);
        position.set(KEY_IGNITION, bits::check(info, 1));
        position.set(KEY_CHARGE, bits::check(info, 2));
        position.set(KEY_BATTERY_LEVEL, battery);
        position.set(KEY_RSSI, rssi);
        if let Some(alarm) = status_alarm(bits::between(info, 3, 6)) {
            position.add_alarm(alarm);
        }
        Ok(Decoded::position(position).with_reply(ack(extended, layout::MSG_STATUS, serial)))
    }

    fn decode_position(
        &self,
        ctx: &mut DecodeContext<'_>,
        mut reader: FrameReader<'_>,
        msg_type: u8,
        serial: u16,
    ) -> Result<Decoded, DecodeError> {
        let (device_id, offset, extended) = {
            let session = ctx
                .session()
                .ok_or_else(|| DecodeError::malformed("position frame before login"))?;
            (
                session.device_id(),
                session.time_offset.unwrap_or(UtcOffset::UTC),
                session.extended_mode,
            )
        };

        let mut position = Position::new(PROTOCOL, device_id);
        let time = DateBuilder::with_offset(offset)
            .date(
                i32::from(reader.read_u8()?),
                reader.read_u8()?,
                reader.read_u8()?,
            )?
            .time(reader.read_u8()?, reader.read_u8()?, reader.read_u8()?)?
            .build();
        position.set_time(time);

        let gps = u64::from(reader.read_u8()?);
        position.set(KEY_SATELLITES, bits::to(gps, 4));

        let latitude = f64::from(reader.read_u32_be()?) / layout::COORD_DIVISOR;
        let longitude = f64::from(reader.read_u32_be()?) / layout::COORD_DIVISOR;
        position.speed = units::knots_from_kph(f64::from(reader.read_u8()?));

        let flags = u64::from(reader.read_u16_be()?);
        position.course = bits::to(flags, 10) as f64;
        position.valid = bits::check(flags, 12);
        position.latitude = if bits::check(flags, 10) {
            latitude
        } else {
            -latitude
        };
        position.longitude = if bits::check(flags, 11) {
            -longitude
        } else {
            longitude
        };

        if msg_type == layout::MSG_GPS_LBS_STATUS_1 {
            reader.skip(1)?; // lbs block length
            let mcc = reader.read_u16_be()?;
            let mnc = reader.read_u8()?;
            let lac = reader.read_u16_be()?;
            let cell_id = reader.read_u24_be()?;
            position.network = Some(Network::single_cell(CellTower {
                mcc,
                mnc: mnc.into(),
                lac: lac.into(),
                cell_id: cell_id.into(),
                signal: None,
            }));

            let info = u64::from(reader.read_u8()?);
            position.set(KEY_STATUS, info);
            position.set(KEY_IGNITION, bits::check(info, 1));
            position.set(KEY_CHARGE, bits::check(info, 2));
            position.set(KEY_BATTERY_LEVEL, reader.read_u8()?);
            position.set(KEY_RSSI, reader.read_u8()?);
            if let Some(alarm) = event_alarm(reader.read_u8()?) {
                position.add_alarm(alarm);
            }

            return Ok(Decoded::position(position)
                .with_reply(ack(extended, layout::MSG_GPS_LBS_STATUS_1, serial)));
        }
        Ok(Decoded::position(position))
    }
}

impl Default for Gt06Decoder {
    fn default() -> Self {
        Gt06Decoder::new()
    }
}

impl FrameDecoder for Gt06Decoder {
    fn protocol(&self) -> &'static str {
        PROTOCOL
    }

    fn decode(
        &mut self,
        ctx: &mut DecodeContext<'_>,
        frame: &[u8],
    ) -> Result<Decoded, DecodeError> {
        let total = frame.len();
        if total < layout::MIN_FRAME || frame[total - 2..] != layout::FOOTER {
            return Err(DecodeError::malformed("bad gt06 envelope"));
        }
        let extended = frame[..2] == layout::HEADER_EXTENDED;
        if !extended && frame[..2] != layout::HEADER {
            return Err(DecodeError::malformed("bad gt06 envelope"));
        }
        let (length, type_at) = if extended {
            (usize::from(u16::from_be_bytes([frame[2], frame[3]])), 4)
        } else {
            (usize::from(frame[2]), 3)
        };
        if total != length + layout::OVERHEAD + usize::from(extended) {
            return Err(DecodeError::malformed(format!(
                "length {length} does not match frame of {total} bytes"
            )));
        }

        let expected = u16::from_be_bytes([frame[total - 4], frame[total - 3]]);
        let computed = CRC16_X25.compute(&frame[2..total - 4]);
        if expected != computed {
            // advisory: these devices frequently ship broken CRCs
            log::warn!(
                "gt06 checksum mismatch (frame {expected:#06x}, computed {computed:#06x}), \
                 accepting frame"
            );
        }

        let msg_type = frame[type_at];
        let serial = u16::from_be_bytes([frame[total - 6], frame[total - 5]]);
        let reader = FrameReader::new(&frame[type_at + 1..total - 6]);

        match msg_type {
            layout::MSG_LOGIN => self.decode_login(ctx, reader, serial, extended),
            layout::MSG_STATUS => self.decode_status(ctx, reader, serial),
            layout::MSG_GPS_LBS_1 | layout::MSG_GPS_LBS_STATUS_1 => {
                self.decode_position(ctx, reader, msg_type, serial)
            }
            other => {
                log::debug!("gt06 message 0x{other:02x} not handled, frame dropped");
                Ok(Decoded::none())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MemoryIdentityStore;
    use crate::media::MemoryMediaSink;
    use time::macros::datetime;

    fn frame(msg_type: u8, content: &[u8], serial: u16) -> Vec<u8> {
        let length = (content.len() + 5) as u8;
        let mut frame = vec![0x78, 0x78, length, msg_type];
        frame.extend_from_slice(content);
        frame.extend_from_slice(&serial.to_be_bytes());
        let crc = CRC16_X25.compute(&frame[2..]);
        frame.extend_from_slice(&crc.to_be_bytes());
        frame.extend_from_slice(&[0x0d, 0x0a]);
        frame
    }

    fn extended_frame(msg_type: u8, content: &[u8], serial: u16) -> Vec<u8> {
        let length = (content.len() + 5) as u16;
        let mut frame = vec![0x79, 0x79];
        frame.extend_from_slice(&length.to_be_bytes());
        frame.push(msg_type);
        frame.extend_from_slice(content);
        frame.extend_from_slice(&serial.to_be_bytes());
        let crc = CRC16_X25.compute(&frame[2..]);
        frame.extend_from_slice(&crc.to_be_bytes());
        frame.extend_from_slice(&[0x0d, 0x0a]);
        frame
    }

    fn login_frame() -> Vec<u8> {
        // imei 359586015829802 as 16 BCD nibbles with leading zero
        let content = [
            0x03, 0x59, 0x58, 0x60, 0x15, 0x82, 0x98, 0x02, 0x10, 0x01,
        ];
        frame(layout::MSG_LOGIN, &content, 1)
    }

    fn gps_content() -> Vec<u8> {
        let mut content = vec![
            0x17, 0x05, 0x09, 0x12, 0x1e, 0x00, // 2023-05-09 18:30:00
            0xc7, // gps length / 7 satellites
        ];
        content.extend_from_slice(&((22.522_f64 * 1_800_000.0) as u32).to_be_bytes());
        content.extend_from_slice(&((114.012_f64 * 1_800_000.0) as u32).to_be_bytes());
        content.push(60); // km/h
        // course 90, bit 10 set (north), bit 12 set (valid)
        content.extend_from_slice(&(0b0001_0100_0000_0000u16 | 90).to_be_bytes());
        content
    }

    #[test]
    fn login_resolves_legacy_imei_and_acks() {
        let store = MemoryIdentityStore::new();
        let device_id = store.register("359586015829802");
        let sink = MemoryMediaSink::new();
        let mut ctx = DecodeContext::new(&store, &sink);
        let mut decoder = Gt06Decoder::new();

        let decoded = decoder.decode(&mut ctx, &login_frame()).unwrap();
        assert!(decoded.positions.is_empty());
        let reply = decoded.reply.unwrap();
        assert_eq!(&reply[..2], &[0x78, 0x78]);
        assert_eq!(reply[3], layout::MSG_LOGIN);
        assert_eq!(ctx.session().unwrap().device_id(), device_id);
    }

    #[test]
    fn position_after_login() {
        let store = MemoryIdentityStore::new();
        store.register("359586015829802");
        let sink = MemoryMediaSink::new();
        let mut ctx = DecodeContext::new(&store, &sink);
        let mut decoder = Gt06Decoder::new();

        decoder.decode(&mut ctx, &login_frame()).unwrap();
        let decoded = decoder
            .decode(&mut ctx, &frame(layout::MSG_GPS_LBS_1, &gps_content(), 2))
            .unwrap();

        assert!(decoded.reply.is_none());
        let position = &decoded.positions[0];
        assert!(position.valid);
        assert_eq!(position.device_time, Some(datetime!(2023-05-09 18:30:00 UTC)));
        assert!((position.latitude - 22.522).abs() < 1e-5);
        assert!((position.longitude - 114.012).abs() < 1e-5);
        assert!((position.speed - units::knots_from_kph(60.0)).abs() < 1e-9);
        assert_eq!(position.course, 90.0);
        assert_eq!(position.attribute(KEY_SATELLITES), Some(&Value::Int(7)));
    }

    #[test]
    fn position_before_login_is_rejected() {
        let store = MemoryIdentityStore::new();
        let sink = MemoryMediaSink::new();
        let mut ctx = DecodeContext::new(&store, &sink);
        let mut decoder = Gt06Decoder::new();

        let err = decoder
            .decode(&mut ctx, &frame(layout::MSG_GPS_LBS_1, &gps_content(), 2))
            .unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn corrupted_checksum_is_advisory() {
        let store = MemoryIdentityStore::new();
        store.register("359586015829802");
        let sink = MemoryMediaSink::new();
        let mut ctx = DecodeContext::new(&store, &sink);
        let mut decoder = Gt06Decoder::new();

        let mut bytes = login_frame();
        let crc_at = bytes.len() - 4;
        bytes[crc_at] ^= 0xff;
        assert!(decoder.decode(&mut ctx, &bytes).is_ok());
    }

    #[test]
    fn extended_envelope_login_switches_the_session_and_the_acks() {
        let store = MemoryIdentityStore::new();
        store.register("359586015829802");
        let sink = MemoryMediaSink::new();
        let mut ctx = DecodeContext::new(&store, &sink);
        let mut decoder = Gt06Decoder::new();

        let content = [0x03, 0x59, 0x58, 0x60, 0x15, 0x82, 0x98, 0x02];
        let decoded = decoder
            .decode(&mut ctx, &extended_frame(layout::MSG_LOGIN, &content, 1))
            .unwrap();
        assert_eq!(&decoded.reply.unwrap()[..2], &[0x79, 0x79]);
        assert!(ctx.session().unwrap().extended_mode);

        let decoded = decoder
            .decode(
                &mut ctx,
                &extended_frame(layout::MSG_STATUS, &[0x06, 0x04, 0x03, 0x00, 0x01], 2),
            )
            .unwrap();
        assert_eq!(decoded.positions.len(), 1);
        let reply = decoded.reply.unwrap();
        assert_eq!(&reply[..2], &[0x79, 0x79]);
        assert_eq!(reply[4], layout::MSG_STATUS);
    }

    #[test]
    fn login_without_timezone_extension_uses_the_device_attribute() {
        let store = MemoryIdentityStore::new();
        let device_id = store.register("359586015829802");
        store.set_attribute(device_id, "utcOffset", 28_800i64); // +08:00
        let sink = MemoryMediaSink::new();
        let mut ctx = DecodeContext::new(&store, &sink);
        let mut decoder = Gt06Decoder::new();

        // imei only, no device type or timezone fields
        let content = [0x03, 0x59, 0x58, 0x60, 0x15, 0x82, 0x98, 0x02];
        decoder
            .decode(&mut ctx, &frame(layout::MSG_LOGIN, &content, 1))
            .unwrap();
        let decoded = decoder
            .decode(&mut ctx, &frame(layout::MSG_GPS_LBS_1, &gps_content(), 2))
            .unwrap();

        assert_eq!(
            decoded.positions[0].device_time,
            Some(datetime!(2023-05-09 18:30:00 +8))
        );
    }

    #[test]
    fn status_carries_forward_last_location() {
        let store = MemoryIdentityStore::new();
        let device_id = store.register("359586015829802");
        let mut last = Position::new(PROTOCOL, device_id);
        last.valid = true;
        last.latitude = 22.5;
        last.longitude = 114.0;
        store.record_location(&last);

        let sink = MemoryMediaSink::new();
        let mut ctx = DecodeContext::new(&store, &sink);
        let mut decoder = Gt06Decoder::new();
        decoder.decode(&mut ctx, &login_frame()).unwrap();

        // ignition + charging, battery level 4, rssi 3, no alarm, english
        let decoded = decoder
            .decode(
                &mut ctx,
                &frame(layout::MSG_STATUS, &[0x06, 0x04, 0x03, 0x00, 0x01], 3),
            )
            .unwrap();

        let position = &decoded.positions[0];
        assert!(position.outdated);
        assert_eq!(position.latitude, 22.5);
        assert_eq!(position.attribute(KEY_IGNITION), Some(&Value::Bool(true)));
        assert_eq!(position.attribute(KEY_CHARGE), Some(&Value::Bool(true)));
        assert_eq!(decoded.reply.unwrap()[3], layout::MSG_STATUS);
    }
}
