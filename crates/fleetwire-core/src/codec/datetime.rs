//! Date assembly for wire formats that split or pack timestamp fields.

use time::{Date, Month, OffsetDateTime, Time, UtcOffset};

use crate::error::DecodeError;

/// Builder assembling a timestamp from separately decoded fields.
/// Two-digit years are taken as 2000-relative, the convention across
/// tracker firmware.
pub struct DateBuilder {
    date: Date,
    time: Time,
    offset: UtcOffset,
}

impl DateBuilder {
    pub fn new() -> Self {
        DateBuilder {
            date: OffsetDateTime::UNIX_EPOCH.date(),
            time: Time::MIDNIGHT,
            offset: UtcOffset::UTC,
        }
    }

    pub fn with_offset(offset: UtcOffset) -> Self {
        DateBuilder {
            offset,
            ..DateBuilder::new()
        }
    }

    pub fn date(mut self, year: i32, month: u8, day: u8) -> Result<Self, DecodeError> {
        let year = if (0..100).contains(&year) {
            year + 2000
        } else {
            year
        };
        let month = Month::try_from(month)
            .map_err(|_| DecodeError::malformed(format!("invalid month {month}")))?;
        self.date = Date::from_calendar_date(year, month, day)
            .map_err(|err| DecodeError::malformed(format!("invalid date: {err}")))?;
        Ok(self)
    }

    pub fn time(mut self, hour: u8, minute: u8, second: u8) -> Result<Self, DecodeError> {
        self.time = Time::from_hms(hour, minute, second)
            .map_err(|err| DecodeError::malformed(format!("invalid time: {err}")))?;
        Ok(self)
    }

    pub fn millis(mut self, millis: u16) -> Result<Self, DecodeError> {
        self.time = self
            .time
            .replace_millisecond(millis)
            .map_err(|err| DecodeError::malformed(format!("invalid millis: {err}")))?;
        Ok(self)
    }

    pub fn build(self) -> OffsetDateTime {
        self.date.with_time(self.time).assume_offset(self.offset)
    }
}

impl Default for DateBuilder {
    fn default() -> Self {
        DateBuilder::new()
    }
}

/// Timestamp from whole seconds since the Unix epoch.
pub fn from_unix_seconds(seconds: i64) -> Result<OffsetDateTime, DecodeError> {
    OffsetDateTime::from_unix_timestamp(seconds)
        .map_err(|err| DecodeError::malformed(format!("invalid unix time: {err}")))
}

/// Timestamp from milliseconds since the Unix epoch.
pub fn from_unix_millis(millis: i64) -> Result<OffsetDateTime, DecodeError> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .map_err(|err| DecodeError::malformed(format!("invalid unix time: {err}")))
}
