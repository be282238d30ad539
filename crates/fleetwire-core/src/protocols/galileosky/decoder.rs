use std::collections::BTreeSet;

use crate::codec::checksum::CRC16_MODBUS;
use crate::codec::reader::FrameReader;
use crate::codec::{bits, datetime, units};
use crate::decoder::{DecodeContext, Decoded, FrameDecoder};
use crate::error::DecodeError;
use crate::identity::IdStrategy;
use crate::model::{
    prefixed, Position, KEY_BATTERY, KEY_HDOP, KEY_INDEX, KEY_INPUT, KEY_OUTPUT, KEY_POWER,
    KEY_SATELLITES, KEY_STATUS, KEY_VERSION_FW, KEY_VERSION_HW, PREFIX_ADC, PREFIX_TEMP,
};
use crate::reassembly::{Progress, Transfer, TransferKind};

use super::layout;

const PROTOCOL: &str = "galileosky";

/// Acks echo the checksum of the frame being acknowledged.
fn ack(checksum: u16) -> Vec<u8> {
    let mut frame = vec![layout::ACK_HEADER];
    frame.extend_from_slice(&checksum.to_le_bytes());
    frame
}

/// Outbound request for the next photo part.
fn request_part(next_index: u32) -> Vec<u8> {
    let mut frame = vec![layout::HEADER_PHOTO, next_index as u8];
    let crc = CRC16_MODBUS.compute(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}

/// Envelope check shared by data and photo frames: body length and
/// whether the CRC16-MODBUS trailer matches.
fn envelope(frame: &[u8]) -> Result<(usize, u16, bool), DecodeError> {
    let mut reader = FrameReader::new(frame);
    reader.skip(1)?;
    let length_field = u64::from(reader.read_u16_le()?);
    let body_len = bits::to(length_field, 15) as usize;
    if frame.len() != body_len + 5 {
        return Err(DecodeError::malformed(format!(
            "length {body_len} does not match frame of {} bytes",
            frame.len()
        )));
    }
    let expected = u16::from_le_bytes([frame[frame.len() - 2], frame[frame.len() - 1]]);
    let computed = CRC16_MODBUS.compute(&frame[..frame.len() - 2]);
    Ok((body_len, expected, expected == computed))
}

fn apply_tag(
    ctx: &mut DecodeContext<'_>,
    reader: &mut FrameReader<'_>,
    tag: u8,
    position: &mut Position,
) -> Result<(), DecodeError> {
    match tag {
        layout::TAG_VERSION_HW => position.set(KEY_VERSION_HW, reader.read_u8()?),
        layout::TAG_VERSION_FW => position.set(KEY_VERSION_FW, reader.read_u8()?),
        layout::TAG_IMEI => {
            let imei = reader.read_ascii(15)?;
            ctx.resolve(IdStrategy::Exact(&imei))?;
        }
        layout::TAG_DEVICE_ID => position.set("deviceType", reader.read_u16_le()?),
        layout::TAG_INDEX => position.set(KEY_INDEX, reader.read_u16_le()?),
        layout::TAG_TIME => {
            let time = datetime::from_unix_seconds(i64::from(reader.read_u32_le()?))?;
            position.set_time(time);
        }
        layout::TAG_COORDS => {
            let flags = reader.read_u8()?;
            position.valid = flags & 0xf0 == 0;
            position.set(KEY_SATELLITES, flags & 0x0f);
            position.latitude = f64::from(reader.read_i32_le()?) / 1e6;
            position.longitude = f64::from(reader.read_i32_le()?) / 1e6;
        }
        layout::TAG_SPEED_COURSE => {
            position.speed = units::knots_from_kph(f64::from(reader.read_u16_le()?) * 0.1);
            position.course = f64::from(reader.read_u16_le()?) * 0.1;
        }
        layout::TAG_ALTITUDE => position.altitude = f64::from(reader.read_i16_le()?),
        layout::TAG_HDOP => position.set(KEY_HDOP, f64::from(reader.read_u8()?) * 0.1),
        layout::TAG_STATUS => position.set(KEY_STATUS, reader.read_u16_le()?),
        layout::TAG_POWER => position.set(KEY_POWER, f64::from(reader.read_u16_le()?) / 1000.0),
        layout::TAG_BATTERY => position.set(KEY_BATTERY, f64::from(reader.read_u16_le()?) / 1000.0),
        layout::TAG_TEMPERATURE => {
            position.set(&prefixed(PREFIX_TEMP, 1), i32::from(reader.read_i8()?));
        }
        layout::TAG_OUTPUT => position.set(KEY_OUTPUT, reader.read_u16_le()?),
        layout::TAG_INPUT => position.set(KEY_INPUT, reader.read_u16_le()?),
        layout::TAG_ADC_FIRST..=layout::TAG_ADC_LAST => {
            let index = u32::from(tag - layout::TAG_ADC_FIRST);
            position.set(&prefixed(PREFIX_ADC, index), reader.read_u16_le()?);
        }
        other => return Err(DecodeError::UnknownTag { tag: other }),
    }
    Ok(())
}

pub struct GalileoskyDecoder;

impl GalileoskyDecoder {
    pub fn new() -> Self {
        GalileoskyDecoder
    }

    fn decode_data(
        &mut self,
        ctx: &mut DecodeContext<'_>,
        frame: &[u8],
    ) -> Result<Decoded, DecodeError> {
        let (body_len, expected, crc_ok) = envelope(frame)?;
        let reply = ack(expected);
        if !crc_ok {
            log::warn!(
                "galileosky checksum mismatch (frame {expected:#06x}), body dropped, frame acked"
            );
            return Ok(Decoded::reply(reply));
        }

        let mut reader = FrameReader::new(&frame[3..3 + body_len]);
        let mut seen = BTreeSet::new();
        let mut records = Vec::new();
        let mut current = Position::new(PROTOCOL, 0);
        let mut any_tags = false;

        while reader.remaining() > 0 {
            let tag = reader.read_u8()?;
            if layout::tag_length(tag).is_none() {
                return Err(DecodeError::UnknownTag { tag });
            }
            // a repeated tag starts the next record of the batch;
            // fields the device does not resend carry over
            if !seen.insert(tag) {
                records.push(current.clone());
                seen.clear();
                seen.insert(tag);
            }
            apply_tag(ctx, &mut reader, tag, &mut current)?;
            any_tags = true;
        }
        if any_tags {
            records.push(current);
        }
        // identification-only frames produce no telemetry, and a
        // record that never received a timestamp (own or carried over
        // within the batch) is dropped rather than emitted with blank
        // times; the device resends it in its next archive batch
        records.retain(|record| record.fix_time.is_some());

        let device_id = ctx
            .session()
            .map(|session| session.device_id())
            .ok_or_else(|| DecodeError::malformed("data frame before identification"))?;
        for position in &mut records {
            position.device_id = device_id;
        }
        Ok(Decoded::positions(records).with_reply(reply))
    }

    fn decode_photo(
        &mut self,
        ctx: &mut DecodeContext<'_>,
        frame: &[u8],
    ) -> Result<Decoded, DecodeError> {
        let (body_len, expected, crc_ok) = envelope(frame)?;
        let reply = ack(expected);
        if !crc_ok {
            log::warn!(
                "galileosky checksum mismatch (frame {expected:#06x}), photo part dropped"
            );
            return Ok(Decoded::reply(reply));
        }
        if body_len < 1 {
            return Err(DecodeError::malformed("empty photo frame"));
        }
        let part = frame[3];
        let payload = &frame[4..3 + body_len];
        let final_chunk = part & layout::FINAL_PART_FLAG != 0;
        let index = u32::from(part & !layout::FINAL_PART_FLAG);

        let media = ctx.media();
        let session = ctx
            .session()
            .ok_or_else(|| DecodeError::malformed("photo frame before identification"))?;
        let device_id = session.device_id();
        let unique_id = session.unique_id().to_string();

        let slot = session.transfer(TransferKind::Photo);
        let transfer = slot.get_or_insert_with(|| Transfer::begin(TransferKind::Photo, None));
        match transfer.append(index, payload, final_chunk)? {
            Progress::Incomplete { next_index } => Ok(Decoded::reply(request_part(next_index))),
            Progress::Complete => {
                let transfer = slot
                    .take()
                    .ok_or_else(|| DecodeError::malformed("photo slot empty"))?;
                let reference = transfer.finish(media, &unique_id)?;
                let mut position = Position::new(PROTOCOL, device_id);
                ctx.carry_forward(&mut position, None);
                position.media = Some(reference);
                Ok(Decoded::position(position).with_reply(reply))
            }
        }
    }
}

impl Default for GalileoskyDecoder {
    fn default() -> Self {
        GalileoskyDecoder::new()
    }
}

impl FrameDecoder for GalileoskyDecoder {
    fn protocol(&self) -> &'static str {
        PROTOCOL
    }

    fn decode(
        &mut self,
        ctx: &mut DecodeContext<'_>,
        frame: &[u8],
    ) -> Result<Decoded, DecodeError> {
        match frame.first() {
            Some(&layout::HEADER_DATA) => self.decode_data(ctx, frame),
            Some(&layout::HEADER_PHOTO) => self.decode_photo(ctx, frame),
            _ => Err(DecodeError::malformed("bad galileosky header")),
        }
    }
}
