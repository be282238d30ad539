//! Fleetwire core: the decoding heart of a fleet-telemetry ingestion
//! server.
//!
//! Transport listeners hand this crate already-delimited frames from
//! GPS/IoT trackers; a protocol decoder (selected once per connection
//! through the registry) resolves the device's identity, runs its
//! layout-specific algorithm on top of the shared codec primitives,
//! optionally drives the transfer reassembler, and emits canonical
//! [`Position`] records plus optional acknowledgment bytes.
//!
//! Invariants:
//! - A decode failure is local to one frame: session and decoder state
//!   stay usable for the next frame, and devices never affect each
//!   other's state.
//! - Emitted positions always carry a resolved, non-zero device id;
//!   frames without a fresh fix carry the last known location forward
//!   and are marked `outdated`.
//! - Serialized output is deterministic apart from the arrival clock
//!   (`server_time`).
//!
//! Out of scope by design: sockets and framing, persistence, alerting,
//! and command scheduling. Those live in the surrounding server; this
//! crate is a pure, CPU-bound transform with two narrow seams
//! ([`identity::IdentityStore`], [`media::MediaSink`]).
//!
//! # Examples
//! ```
//! use fleetwire_core::decoder::DecodeContext;
//! use fleetwire_core::identity::MemoryIdentityStore;
//! use fleetwire_core::media::MemoryMediaSink;
//! use fleetwire_core::protocols;
//!
//! let store = MemoryIdentityStore::auto_registering();
//! let sink = MemoryMediaSink::new();
//! let mut ctx = DecodeContext::new(&store, &sink);
//!
//! let mut decoder = protocols::registry().by_name("gps103").expect("builtin");
//! let decoded = decoder
//!     .decode(&mut ctx, b"##,imei:359586015829802,A;")
//!     .expect("handshake");
//! assert_eq!(decoded.reply.as_deref(), Some(&b"LOAD"[..]));
//! ```

pub mod codec;
pub mod decoder;
pub mod error;
pub mod identity;
pub mod media;
pub mod model;
pub mod protocols;
pub mod reassembly;
pub mod session;

pub use decoder::{DecodeContext, Decoded, DecoderRegistry, FrameDecoder, Selector};
pub use error::{DecodeError, MediaError};
pub use model::{Alarm, CellTower, Network, Position, Value, WifiAccessPoint};
pub use session::DeviceSession;
