//! Device identity resolution.
//!
//! Trackers identify themselves in wildly different shapes: full
//! 15-digit imeis, legacy 14-digit idents missing the Luhn check
//! digit, hex serials padded with 0xF nibbles, truncated ids, or no
//! id at all (one device per transport source). Each shape is a
//! distinct, named strategy rather than a fallback chain, so a
//! decoder states exactly which quirk its protocol has.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::codec::checksum;
use crate::model::{Position, Value};

/// External device registry seam.
pub trait IdentityStore {
    /// Resolve a unique id (or its alternate form) to an internal
    /// device id.
    fn lookup(&self, unique_id: &str, alternate: Option<&str>) -> Option<u64>;

    /// Last known position for carry-forward when a frame reports
    /// telemetry without a fresh fix.
    fn last_known_location(&self, device_id: u64) -> Option<Position>;

    /// Per-device configuration flag (e.g. whether the device expects
    /// acknowledgments, or has an extended mode enabled).
    fn lookup_attribute(&self, device_id: u64, key: &str) -> Option<Value>;
}

/// How the current frame identifies its device.
#[derive(Debug, Clone, Copy)]
pub enum IdStrategy<'a> {
    /// The id is used as-is.
    Exact(&'a str),
    /// Legacy 14-digit ident: the registry may hold either the short
    /// form or the 15-digit form with the Luhn check digit appended.
    LuhnExtended(&'a str),
    /// Hex-nibble serial, high nibble first, terminated by 0xF.
    HexSerial(&'a [u8]),
    /// Truncated id, disambiguated against full ids already seen on
    /// this context.
    ShortId(&'a str),
    /// No id field at all: the transport source address is the
    /// identity (connectionless protocols, one device per source).
    Source,
}

/// 15-digit form of a 14-digit ident, or `None` when the input is not
/// a 14-digit number.
pub fn luhn_extended(unique_id: &str) -> Option<String> {
    if unique_id.len() != 14 || !unique_id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u64 = unique_id.parse().ok()?;
    Some(format!("{unique_id}{}", checksum::luhn(value)))
}

/// Decode a hex-nibble serial, stopping at the first 0xF nibble.
pub fn hex_serial(bytes: &[u8]) -> String {
    let mut digits = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        for nibble in [byte >> 4, byte & 0x0f] {
            if nibble == 0x0f {
                return digits;
            }
            digits.push(char::from_digit(u32::from(nibble), 16).unwrap_or('0'));
        }
    }
    digits
}

#[derive(Debug, Default)]
struct StoreInner {
    by_unique: BTreeMap<String, u64>,
    last_location: BTreeMap<u64, Position>,
    attributes: BTreeMap<(u64, String), Value>,
    next_id: u64,
}

/// In-memory registry backing tests and the replay tool. With
/// auto-registration enabled, an unknown unique id is assigned the
/// next internal id on first lookup instead of failing.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    inner: Mutex<StoreInner>,
    auto_register: bool,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        MemoryIdentityStore::default()
    }

    pub fn auto_registering() -> Self {
        MemoryIdentityStore {
            auto_register: true,
            ..MemoryIdentityStore::default()
        }
    }

    fn inner(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, unique_id: &str) -> u64 {
        let mut inner = self.inner();
        if let Some(&id) = inner.by_unique.get(unique_id) {
            return id;
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.by_unique.insert(unique_id.to_string(), id);
        id
    }

    pub fn set_attribute(&self, device_id: u64, key: &str, value: impl Into<Value>) {
        self.inner()
            .attributes
            .insert((device_id, key.to_string()), value.into());
    }

    /// Remember a decoded position as the device's last known
    /// location for later carry-forward.
    pub fn record_location(&self, position: &Position) {
        self.inner()
            .last_location
            .insert(position.device_id, position.clone());
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn lookup(&self, unique_id: &str, alternate: Option<&str>) -> Option<u64> {
        {
            let inner = self.inner();
            if let Some(&id) = inner.by_unique.get(unique_id) {
                return Some(id);
            }
            if let Some(alternate) = alternate {
                if let Some(&id) = inner.by_unique.get(alternate) {
                    return Some(id);
                }
            }
        }
        if self.auto_register {
            return Some(self.register(unique_id));
        }
        None
    }

    fn last_known_location(&self, device_id: u64) -> Option<Position> {
        self.inner().last_location.get(&device_id).cloned()
    }

    fn lookup_attribute(&self, device_id: u64, key: &str) -> Option<Value> {
        self.inner()
            .attributes
            .get(&(device_id, key.to_string()))
            .cloned()
    }
}
