//! Per-device session state.

use time::UtcOffset;

use crate::reassembly::{Transfer, TransferKind};

/// Resolved identity plus the mutable per-device state decoders share
/// across frames on one connection.
///
/// Created by identity resolution; lifetime is managed by the caller
/// (connection close or idle timeout). The core only reads and writes
/// fields on a session handed to it.
#[derive(Debug)]
pub struct DeviceSession {
    device_id: u64,
    unique_id: String,

    /// Device-local clock offset, cached from a login/handshake frame
    /// so later frames with local timestamps resolve to UTC.
    pub time_offset: Option<UtcOffset>,
    /// Protocol-specific mode toggle negotiated at login (compressed
    /// or extended framing variants).
    pub extended_mode: bool,

    photo: Option<Transfer>,
    audio: Option<Transfer>,
}

impl DeviceSession {
    pub fn new(device_id: u64, unique_id: impl Into<String>) -> Self {
        DeviceSession {
            device_id,
            unique_id: unique_id.into(),
            time_offset: None,
            extended_mode: false,
            photo: None,
            audio: None,
        }
    }

    pub fn device_id(&self) -> u64 {
        self.device_id
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// In-progress transfer slot for one kind. Photo and audio slots
    /// are independent; a device may upload both concurrently.
    pub fn transfer(&mut self, kind: TransferKind) -> &mut Option<Transfer> {
        match kind {
            TransferKind::Photo => &mut self.photo,
            TransferKind::Audio => &mut self.audio,
        }
    }

    /// Discard in-progress transfers without emitting anything. Called
    /// on connection close.
    pub fn abandon_transfers(&mut self) {
        self.photo = None;
        self.audio = None;
    }
}
