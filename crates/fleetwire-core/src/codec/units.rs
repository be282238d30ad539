//! Unit conversions. Canonical storage units are knots (speed),
//! meters (distance) and milliseconds (duration).

const KNOTS_IN_KPH: f64 = 1.852;
const KNOTS_IN_MPH: f64 = 1.150779;
const METERS_IN_MILE: f64 = 1609.344;
const MPS_TO_KNOTS: f64 = 3.6 / KNOTS_IN_KPH;

pub fn knots_from_kph(value: f64) -> f64 {
    value / KNOTS_IN_KPH
}

pub fn knots_from_mph(value: f64) -> f64 {
    value / KNOTS_IN_MPH
}

pub fn knots_from_mps(value: f64) -> f64 {
    value * MPS_TO_KNOTS
}

pub fn kph_from_knots(value: f64) -> f64 {
    value * KNOTS_IN_KPH
}

pub fn mph_from_knots(value: f64) -> f64 {
    value * KNOTS_IN_MPH
}

pub fn meters_from_miles(value: f64) -> f64 {
    value * METERS_IN_MILE
}

pub fn millis_from_hours(value: f64) -> i64 {
    (value * 3_600_000.0) as i64
}
