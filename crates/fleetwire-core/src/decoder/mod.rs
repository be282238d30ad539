//! Decoder contract and dispatch.
//!
//! A [`FrameDecoder`] is a pure transform from one framed byte buffer
//! to zero or more Positions plus an optional outbound reply. One
//! decoder instance exists per connection and owns any cross-frame
//! state (delta baselines, pending identity); shared per-device state
//! lives on the [`DeviceSession`] inside the [`DecodeContext`].
//!
//! The [`DecoderRegistry`] maps protocol-identifying selectors (magic
//! bytes, text prefix, listener port) to constructors; selection
//! happens once per connection, not per frame.

pub mod mask;

use std::collections::BTreeSet;

use time::OffsetDateTime;

use crate::error::DecodeError;
use crate::identity::{self, IdStrategy, IdentityStore};
use crate::media::MediaSink;
use crate::model::Position;
use crate::session::DeviceSession;

/// Outcome of one decode call.
#[derive(Debug, Default)]
pub struct Decoded {
    pub positions: Vec<Position>,
    /// Outbound bytes for the transport to write back, produced
    /// independent of whether the body decoded.
    pub reply: Option<Vec<u8>>,
}

impl Decoded {
    pub fn none() -> Self {
        Decoded::default()
    }

    pub fn position(position: Position) -> Self {
        Decoded {
            positions: vec![position],
            reply: None,
        }
    }

    pub fn positions(positions: Vec<Position>) -> Self {
        Decoded {
            positions,
            reply: None,
        }
    }

    pub fn reply(bytes: Vec<u8>) -> Self {
        Decoded {
            positions: Vec::new(),
            reply: Some(bytes),
        }
    }

    pub fn with_reply(mut self, bytes: Vec<u8>) -> Self {
        self.reply = Some(bytes);
        self
    }
}

/// Per-connection decode context: external seams plus the resolved
/// session. Owned by whatever drives the decoder; frames for one
/// connection must be processed sequentially through the same context.
pub struct DecodeContext<'a> {
    identity: &'a dyn IdentityStore,
    media: &'a dyn MediaSink,
    source: Option<String>,
    session: Option<DeviceSession>,
    seen_ids: BTreeSet<String>,
}

impl<'a> DecodeContext<'a> {
    pub fn new(identity: &'a dyn IdentityStore, media: &'a dyn MediaSink) -> Self {
        DecodeContext {
            identity,
            media,
            source: None,
            session: None,
            seen_ids: BTreeSet::new(),
        }
    }

    /// Transport source address, required by the [`IdStrategy::Source`]
    /// resolution strategy.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn identity(&self) -> &'a dyn IdentityStore {
        self.identity
    }

    pub fn media(&self) -> &'a dyn MediaSink {
        self.media
    }

    /// The session resolved by an earlier frame, if any. Protocols
    /// with deferred identity call this for telemetry frames.
    pub fn session(&mut self) -> Option<&mut DeviceSession> {
        self.session.as_mut()
    }

    /// Resolve the device identified by `strategy` and establish (or
    /// reuse) the session. Failure drops the frame: no Position, no
    /// device-specific ack.
    pub fn resolve(&mut self, strategy: IdStrategy<'_>) -> Result<&mut DeviceSession, DecodeError> {
        let (unique_id, alternate) = match strategy {
            IdStrategy::Exact(id) => (id.to_string(), None),
            IdStrategy::LuhnExtended(id) => (id.to_string(), identity::luhn_extended(id)),
            IdStrategy::HexSerial(bytes) => (identity::hex_serial(bytes), None),
            IdStrategy::ShortId(id) => {
                let full = self
                    .seen_ids
                    .iter()
                    .find(|seen| seen.ends_with(id))
                    .cloned();
                (full.unwrap_or_else(|| id.to_string()), None)
            }
            IdStrategy::Source => {
                let source = self
                    .source
                    .clone()
                    .ok_or_else(|| DecodeError::malformed("no transport source identity"))?;
                (source, None)
            }
        };

        let reuse = self
            .session
            .as_ref()
            .is_some_and(|session| session.unique_id() == unique_id);
        if !reuse {
            let device_id = self
                .identity
                .lookup(&unique_id, alternate.as_deref())
                .ok_or_else(|| {
                    log::warn!("unknown device {unique_id}, frame dropped");
                    DecodeError::UnknownDevice {
                        unique_id: unique_id.clone(),
                    }
                })?;
            self.session = Some(DeviceSession::new(device_id, unique_id.clone()));
        }
        self.seen_ids.insert(unique_id);
        self.session
            .as_mut()
            .ok_or_else(|| DecodeError::malformed("session not established"))
    }

    /// Populate `position` from the device's last known location when
    /// the frame carries no fresh fix.
    pub fn carry_forward(&self, position: &mut Position, device_time: Option<OffsetDateTime>) {
        let last = self.identity.last_known_location(position.device_id);
        position.carry_forward(last.as_ref(), device_time);
    }

    /// Connection close: discard in-progress transfers without
    /// emitting and drop the session.
    pub fn close(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.abandon_transfers();
        }
        self.session = None;
    }
}

pub trait FrameDecoder {
    fn protocol(&self) -> &'static str;

    /// Decode one already-delimited frame. Errors are local to the
    /// frame; context and decoder state stay usable for the next one.
    fn decode(
        &mut self,
        ctx: &mut DecodeContext<'_>,
        frame: &[u8],
    ) -> Result<Decoded, DecodeError>;
}

/// Protocol-identifying selector checked at connection acceptance.
#[derive(Debug, Clone, Copy)]
pub enum Selector {
    /// Frame starts with these magic bytes.
    Magic(&'static [u8]),
    /// Frame starts with this ASCII prefix (text protocols).
    TextPrefix(&'static str),
    /// Connection arrived on this listener port.
    Port(u16),
}

impl Selector {
    fn matches(&self, frame: &[u8], port: Option<u16>) -> bool {
        match self {
            Selector::Magic(magic) => frame.starts_with(magic),
            Selector::TextPrefix(prefix) => frame.starts_with(prefix.as_bytes()),
            Selector::Port(own) => port == Some(*own),
        }
    }
}

struct Registration {
    name: &'static str,
    selectors: &'static [Selector],
    build: fn() -> Box<dyn FrameDecoder>,
}

/// Registry of available protocols; selection happens once per
/// connection and yields a fresh decoder instance owning its state.
#[derive(Default)]
pub struct DecoderRegistry {
    entries: Vec<Registration>,
}

impl DecoderRegistry {
    pub fn new() -> Self {
        DecoderRegistry::default()
    }

    pub fn register(
        &mut self,
        name: &'static str,
        selectors: &'static [Selector],
        build: fn() -> Box<dyn FrameDecoder>,
    ) {
        self.entries.push(Registration {
            name,
            selectors,
            build,
        });
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.name)
    }

    /// Fresh decoder instance for a protocol by name.
    pub fn by_name(&self, name: &str) -> Option<Box<dyn FrameDecoder>> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| (entry.build)())
    }

    /// Select a decoder for a new connection from its first frame and
    /// the listener port. A port registration is the strongest signal:
    /// protocols sharing magic bytes are told apart by the port they
    /// were registered for, so port entries are checked first.
    pub fn select(&self, first_frame: &[u8], port: Option<u16>) -> Option<Box<dyn FrameDecoder>> {
        if let Some(port) = port {
            let by_port = self.entries.iter().find(|entry| {
                entry
                    .selectors
                    .iter()
                    .any(|selector| matches!(selector, Selector::Port(own) if *own == port))
            });
            if let Some(entry) = by_port {
                return Some((entry.build)());
            }
        }
        self.entries
            .iter()
            .find(|entry| {
                entry
                    .selectors
                    .iter()
                    .any(|selector| selector.matches(first_frame, None))
            })
            .map(|entry| (entry.build)())
    }
}
