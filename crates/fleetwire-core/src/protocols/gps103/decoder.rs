use crate::codec::coords::{apply_hemisphere, degree_minute_decimal, Hemisphere};
use crate::codec::datetime::DateBuilder;
use crate::codec::text::{first_match, FieldKind, SentenceMatch, SentencePattern};
use crate::decoder::{DecodeContext, Decoded, FrameDecoder};
use crate::error::DecodeError;
use crate::identity::IdStrategy;
use crate::model::{Alarm, CellTower, Network, Position};

const PROTOCOL: &str = "gps103";

const REPLY_LOAD: &[u8] = b"LOAD";
const REPLY_ON: &[u8] = b"ON";

fn alarm_for(keyword: &str) -> Option<Alarm> {
    match keyword {
        "help me" => Some(Alarm::Sos),
        "low battery" => Some(Alarm::LowBattery),
        "move" => Some(Alarm::Movement),
        "speed" => Some(Alarm::Overspeed),
        "stockade" => Some(Alarm::Geofence),
        "door alarm" => Some(Alarm::Tampering),
        "sensor alarm" => Some(Alarm::Vibration),
        "ac alarm" => Some(Alarm::PowerCut),
        _ => None,
    }
}

fn two_digits(text: &str, at: usize) -> Result<u8, DecodeError> {
    text.get(at..at + 2)
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| DecodeError::malformed("bad digit group"))
}

fn hemisphere(letter: Option<String>) -> Result<Hemisphere, DecodeError> {
    letter
        .and_then(|text| text.chars().next())
        .and_then(Hemisphere::from_char)
        .ok_or_else(|| DecodeError::malformed("bad hemisphere letter"))
}

pub struct Gps103Decoder {
    gps: Vec<SentencePattern>,
    lbs: SentencePattern,
}

impl Gps103Decoder {
    pub fn new() -> Self {
        let head = || {
            SentencePattern::new(',')
                .field(FieldKind::Prefix("imei:"))
                .field(FieldKind::Any) // event keyword
                .field(FieldKind::Int) // local time YYMMDDHHMM
                .field(FieldKind::Any) // phone / serial, usually empty
        };
        Gps103Decoder {
            gps: vec![head()
                .field(FieldKind::Literal("F"))
                .field(FieldKind::Float) // utc hhmmss.sss
                .field(FieldKind::OneOf(&["A", "V"]))
                .field(FieldKind::Float)
                .field(FieldKind::OneOf(&["N", "S"]))
                .field(FieldKind::Float)
                .field(FieldKind::OneOf(&["E", "W"]))
                .optional(FieldKind::Float) // speed, knots
                .optional(FieldKind::Float) // course
                .allow_trailing()],
            lbs: head()
                .field(FieldKind::Literal("L"))
                .optional(FieldKind::HexInt) // lac
                .optional(FieldKind::HexInt) // cell id
                .allow_trailing(),
        }
    }

    fn decode_gps(
        &self,
        ctx: &mut DecodeContext<'_>,
        mut m: SentenceMatch,
    ) -> Result<Decoded, DecodeError> {
        let imei = m
            .next_str()
            .ok_or_else(|| DecodeError::malformed("missing imei"))?;
        let device_id = ctx.resolve(IdStrategy::LuhnExtended(&imei))?.device_id();
        let mut position = Position::new(PROTOCOL, device_id);

        let keyword = m.next_str().unwrap_or_default();
        if let Some(alarm) = alarm_for(&keyword) {
            position.add_alarm(alarm);
        }

        // date from the device-local stamp, time of day from the UTC field
        let local = m
            .next_str()
            .ok_or_else(|| DecodeError::malformed("missing local time"))?;
        m.skip(2); // phone column and the F marker
        let utc = m
            .next_str()
            .ok_or_else(|| DecodeError::malformed("missing utc time"))?;
        let time = DateBuilder::new()
            .date(
                i32::from(two_digits(&local, 0)?),
                two_digits(&local, 2)?,
                two_digits(&local, 4)?,
            )?
            .time(
                two_digits(&utc, 0)?,
                two_digits(&utc, 2)?,
                two_digits(&utc, 4)?,
            )?
            .build();
        position.set_time(time);

        position.valid = m.next_str().as_deref() == Some("A");
        let latitude = m
            .next_f64()
            .ok_or_else(|| DecodeError::malformed("missing latitude"))?;
        let lat_hemisphere = hemisphere(m.next_str())?;
        let longitude = m
            .next_f64()
            .ok_or_else(|| DecodeError::malformed("missing longitude"))?;
        let lon_hemisphere = hemisphere(m.next_str())?;
        position.latitude = apply_hemisphere(degree_minute_decimal(latitude), lat_hemisphere);
        position.longitude = apply_hemisphere(degree_minute_decimal(longitude), lon_hemisphere);
        position.speed = m.next_f64().unwrap_or(0.0);
        position.course = m.next_f64().unwrap_or(0.0);

        Ok(Decoded::position(position))
    }

    fn decode_lbs(
        &self,
        ctx: &mut DecodeContext<'_>,
        mut m: SentenceMatch,
    ) -> Result<Decoded, DecodeError> {
        let imei = m
            .next_str()
            .ok_or_else(|| DecodeError::malformed("missing imei"))?;
        let device_id = ctx.resolve(IdStrategy::LuhnExtended(&imei))?.device_id();
        let mut position = Position::new(PROTOCOL, device_id);

        let keyword = m.next_str().unwrap_or_default();
        if let Some(alarm) = alarm_for(&keyword) {
            position.add_alarm(alarm);
        }

        let local = m
            .next_str()
            .ok_or_else(|| DecodeError::malformed("missing local time"))?;
        let time = DateBuilder::new()
            .date(
                i32::from(two_digits(&local, 0)?),
                two_digits(&local, 2)?,
                two_digits(&local, 4)?,
            )?
            .time(two_digits(&local, 6)?, two_digits(&local, 8)?, 0)?
            .build();
        ctx.carry_forward(&mut position, Some(time));

        m.skip(2); // phone column and the L marker
        if let (Some(lac), Some(cell_id)) = (m.next_hex(), m.next_hex()) {
            position.network = Some(Network::single_cell(CellTower {
                mcc: 0,
                mnc: 0,
                lac: lac as u32,
                cell_id: cell_id as u64,
                signal: None,
            }));
        }
        Ok(Decoded::position(position))
    }
}

impl Default for Gps103Decoder {
    fn default() -> Self {
        Gps103Decoder::new()
    }
}

impl FrameDecoder for Gps103Decoder {
    fn protocol(&self) -> &'static str {
        PROTOCOL
    }

    fn decode(
        &mut self,
        ctx: &mut DecodeContext<'_>,
        frame: &[u8],
    ) -> Result<Decoded, DecodeError> {
        let text = std::str::from_utf8(frame)
            .map_err(|_| DecodeError::malformed("sentence is not utf-8"))?
            .trim()
            .trim_end_matches(';');

        if let Some(rest) = text.strip_prefix("##,") {
            // handshake: the LOAD reply goes out even for an unknown
            // device, otherwise the tracker keeps retransmitting
            if let Some(imei) = rest.strip_prefix("imei:").and_then(|r| r.split(',').next()) {
                if ctx.resolve(IdStrategy::LuhnExtended(imei)).is_err() {
                    log::debug!("gps103 handshake from unknown device {imei}");
                }
            }
            return Ok(Decoded::reply(REPLY_LOAD.to_vec()));
        }

        if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
            // bare-imei heartbeat, same generic-reply rule
            if ctx.resolve(IdStrategy::LuhnExtended(text)).is_err() {
                log::debug!("gps103 heartbeat from unknown device {text}");
            }
            return Ok(Decoded::reply(REPLY_ON.to_vec()));
        }

        if let Some(m) = first_match(&self.gps, text) {
            return self.decode_gps(ctx, m);
        }
        if let Some(m) = self.lbs.matches(text) {
            return self.decode_lbs(ctx, m);
        }
        Err(DecodeError::malformed("unrecognized sentence"))
    }
}
